//! Correlation-based template tracking.
//!
//! A [`TemplateTracker`] holds one grayscale patch captured from a frame and,
//! per frame, scores every offset with zero-mean normalized cross-correlation
//! ([`ncc`]). The first global maximum above
//! [`TemplateParams::accept_threshold`] is reported.

pub mod ncc;
mod tracker;

pub use ncc::MatchPeak;
pub use tracker::{Template, TemplateParams, TemplateTracker};
