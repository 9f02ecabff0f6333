//! Segmentation-mask tracking scaffold.
//!
//! A [`SegmentationDecoder`] turns an opaque payload into [`SegmentObject`]s
//! (centroid and/or mask). [`SegmentationTracker`] draws a fixed-size box
//! around every object centre; when the payload produced nothing it becomes
//! the [`SegmentationTracker::Stub`] and reports a placeholder region flagged
//! with [`objtrack_core::DetectionResult::is_placeholder`].

mod decoder;
mod object;
mod tracker;

pub use decoder::{DecodeError, JsonSegmentationDecoder, SegmentationDecoder};
pub use object::{SegmentMask, SegmentObject};
pub use tracker::{SegmentationParams, SegmentationTracker};
