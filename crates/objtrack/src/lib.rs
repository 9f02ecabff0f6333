//! Single-object tracking on video frames.
//!
//! This crate ties the `objtrack-*` crates together behind a
//! [`TrackingEngine`] with three interchangeable modes:
//! - [`TrackingMode::Marker`]: fiducial dictionary markers, then 2D-code
//!   finder patterns, then a dark-square contour fallback.
//! - [`TrackingMode::Markerless`]: normalized cross-correlation against a
//!   template captured with [`RegionSelector`] or [`TrackingEngine::set_template`].
//! - [`TrackingMode::Segmentation`]: boxes around objects decoded from an
//!   external segmentation payload.
//!
//! ## Quickstart
//!
//! ```no_run
//! use objtrack::{interop, Rect, TrackerConfig, TrackingEngine, TrackingMode};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let first = interop::load_frame("frame_000.png")?;
//! let mut engine = TrackingEngine::new(&TrackerConfig::default());
//! engine.set_mode(TrackingMode::Markerless);
//! engine.set_template(Rect::new(120.0, 80.0, 64.0, 64.0), &first.view());
//!
//! let next = interop::load_frame("frame_001.png")?;
//! let outcome = engine.process_frame(&next.view());
//! println!("found: {}", outcome.result.is_found());
//! interop::save_frame(&outcome.annotated, "frame_001_tracked.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `objtrack::core`: frames, geometry, detection results, drawing, logger.
//! - `objtrack::marker`: marker cascade and its stages.
//! - `objtrack::template`: correlation tracker.
//! - `objtrack::segment`: segmentation tracker and payload decoders.
//! - `objtrack::interop` (feature `image`): `image` crate conversions.
//! - `objtrack::run` (feature `image`): batch runner used by the CLI.

pub use objtrack_core as core;
pub use objtrack_marker as marker;
pub use objtrack_segment as segment;
pub use objtrack_template as template;

pub use objtrack_core::{DetectionResult, Frame, FrameView, Geometry, MarkerKind, PixelFormat, Rect};

mod config;
mod engine;
mod mode;
mod selector;

pub use config::{ConfigError, TrackerConfig};
pub use engine::{FrameOutcome, TrackingEngine};
pub use mode::{ParseModeError, TrackingMode};
pub use selector::{
    DisplayScale, RegionSelector, SelectionOutcome, SelectionState, SelectorParams, TemplateSink,
};

#[cfg(feature = "image")]
pub mod interop;
#[cfg(feature = "image")]
pub mod run;
