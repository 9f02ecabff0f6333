//! Core types for single-object tracking on video frames.
//!
//! This crate is small and backend-agnostic: frame views with grayscale
//! conversion, image-space geometry, the per-frame [`DetectionResult`],
//! annotation drawing, a 4-point homography and a logger. Detectors and
//! trackers live in the sibling `objtrack-*` crates.

pub mod draw;

mod detection;
mod frame;
mod geometry;
mod homography;
mod image;
mod logger;

pub use detection::{DetectionResult, Geometry, InvalidDetection, MarkerKind};
pub use frame::{Frame, FrameError, FrameView, PixelFormat};
pub use geometry::{PixelRect, Polygon4, Rect};
pub use homography::{homography_from_4pt, Homography};
pub use image::{sample_mean_3x3, GrayImage, GrayImageView};

pub use draw::Color;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level, LOG_ENV};
