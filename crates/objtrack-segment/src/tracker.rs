use log::{info, warn};
use objtrack_core::{
    draw::{draw_rect, fill_circle},
    Color, DetectionResult, Frame, FrameView, Geometry, Rect,
};
use serde::{Deserialize, Serialize};

use crate::{SegmentObject, SegmentationDecoder};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationParams {
    /// Offset from the centroid to the box's top-left corner.
    pub box_half_size: f32,
    /// Side of the box drawn around each centroid.
    pub box_size: f32,
    /// Placeholder origin as a fraction of the frame size.
    pub placeholder_origin_frac: f32,
    /// Placeholder extent as a fraction of the frame size.
    pub placeholder_size_frac: f32,
    pub box_thickness: u32,
    pub center_dot_radius: f32,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            box_half_size: 50.0,
            box_size: 100.0,
            placeholder_origin_frac: 0.3,
            placeholder_size_frac: 0.4,
            box_thickness: 2,
            center_dot_radius: 5.0,
        }
    }
}

/// Segmentation-driven tracking over externally decoded objects.
#[derive(Clone, Debug, PartialEq)]
pub enum SegmentationTracker {
    /// A payload is loaded but yielded no objects; a fixed region stands in.
    Stub,
    /// Objects decoded from the payload.
    Decoded(Vec<SegmentObject>),
}

impl SegmentationTracker {
    /// Decode `payload`, falling back to [`SegmentationTracker::Stub`] on any failure.
    pub fn from_payload(payload: &[u8], decoder: &dyn SegmentationDecoder) -> Self {
        match decoder.decode(payload) {
            Ok(objects) if !objects.is_empty() => {
                info!("segmentation payload decoded: {} objects", objects.len());
                Self::Decoded(objects)
            }
            Ok(_) => {
                warn!("segmentation payload has no objects; using placeholder region");
                Self::Stub
            }
            Err(e) => {
                warn!("segmentation payload not decoded ({e}); using placeholder region");
                Self::Stub
            }
        }
    }

    pub fn is_stub(&self) -> bool {
        matches!(self, Self::Stub)
    }

    pub fn objects(&self) -> &[SegmentObject] {
        match self {
            Self::Stub => &[],
            Self::Decoded(objects) => objects,
        }
    }

    /// Draw every object with a centre (or the placeholder) and report the first one.
    pub fn track(
        &self,
        frame: &FrameView<'_>,
        out: &mut Frame,
        params: &SegmentationParams,
    ) -> DetectionResult {
        if frame.is_empty() {
            return DetectionResult::not_found();
        }
        match self {
            Self::Stub => {
                let rect = placeholder_rect(frame.width(), frame.height(), params);
                draw_box(out, &rect, params);
                DetectionResult::found(None, Geometry::Rect(rect)).as_placeholder()
            }
            Self::Decoded(objects) => {
                let mut first = None;
                let centers = objects
                    .iter()
                    .filter_map(SegmentObject::center)
                    .filter(|c| c.x.is_finite() && c.y.is_finite());
                for center in centers {
                    let rect = Rect::new(
                        (center.x - params.box_half_size).max(0.0),
                        (center.y - params.box_half_size).max(0.0),
                        params.box_size,
                        params.box_size,
                    );
                    draw_rect(out, &rect, Color::MAGENTA, params.box_thickness);
                    fill_circle(out, center, params.center_dot_radius, Color::MAGENTA);
                    first.get_or_insert(rect);
                }
                first.map_or_else(DetectionResult::not_found, |rect| {
                    DetectionResult::found(None, Geometry::Rect(rect))
                })
            }
        }
    }
}

fn placeholder_rect(width: usize, height: usize, params: &SegmentationParams) -> Rect {
    let (w, h) = (width as f32, height as f32);
    Rect::new(
        (w * params.placeholder_origin_frac).floor(),
        (h * params.placeholder_origin_frac).floor(),
        (w * params.placeholder_size_frac).floor(),
        (h * params.placeholder_size_frac).floor(),
    )
}

fn draw_box(out: &mut Frame, rect: &Rect, params: &SegmentationParams) {
    draw_rect(out, rect, Color::MAGENTA, params.box_thickness);
    fill_circle(out, rect.center(), params.center_dot_radius, Color::MAGENTA);
}
