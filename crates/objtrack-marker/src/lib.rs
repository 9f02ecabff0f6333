//! Marker detection cascade: square fiducials, 2D codes and a contour fallback.
//!
//! Each backend implements [`MarkerDetector`]. [`MarkerCascade`] probes the
//! configured backends once, keeps those that are available and, per frame,
//! returns the first hit in priority order:
//!
//! 1. [`FiducialDetector`] decodes dictionary markers found as convex quads,
//! 2. [`CodeDetector`] locates QR-style codes by their finder patterns,
//! 3. [`ContourFallback`] accepts the first dark, roughly square blob.
//!
//! ```no_run
//! use objtrack_core::{Frame, PixelFormat};
//! use objtrack_marker::{MarkerCascade, MarkerCascadeParams};
//!
//! let cascade = MarkerCascade::new(&MarkerCascadeParams::default());
//! let frame = Frame::filled(320, 240, PixelFormat::Rgb, 255);
//! let mut out = frame.clone();
//! let result = cascade.detect_and_annotate(&frame.view(), &mut out);
//! println!("found: {}", result.is_found());
//! ```

mod cascade;
mod code;
pub mod contour;
mod decode;
mod dictionary;
mod error;
mod fallback;
mod fiducial;
mod matcher;
mod threshold;

pub use cascade::{annotate, MarkerCascade, MarkerCascadeParams, MarkerDetector, MarkerHit, CENTER_DOT_RADIUS};
pub use code::{CodeDetector, CodeParams};
pub use decode::{CellDecodeParams, QuadDecode, QuadDecoder};
pub use dictionary::{Dictionary, DictionaryError};
pub use error::{BackendUnavailable, DetectionFailure};
pub use fallback::{ContourFallback, ContourFallbackParams};
pub use fiducial::{FiducialDetector, FiducialParams};
pub use matcher::{rotate_code_u64, Match, Matcher};
pub use threshold::{otsu_threshold, BinaryMask};
