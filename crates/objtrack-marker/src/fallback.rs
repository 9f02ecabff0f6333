//! Last-resort detector: the first dark, roughly square blob in the frame.

use objtrack_core::{Geometry, GrayImageView, MarkerKind, Rect};
use serde::{Deserialize, Serialize};

use crate::contour::{approx_poly_dp, bounding_rect, find_contours, Retrieval};
use crate::threshold::BinaryMask;
use crate::{BackendUnavailable, DetectionFailure, MarkerDetector, MarkerHit};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourFallbackParams {
    pub enabled: bool,
    /// Pixels at or below this level are foreground.
    pub threshold: u8,
    pub min_area: f64,
    pub max_area: f64,
    pub approx_epsilon_frac: f64,
    pub min_vertices: usize,
    pub max_vertices: usize,
    /// Accepted bounding-box `width / height` range.
    pub min_aspect: f32,
    pub max_aspect: f32,
}

impl Default for ContourFallbackParams {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 127,
            min_area: 500.0,
            max_area: 50_000.0,
            approx_epsilon_frac: 0.02,
            min_vertices: 4,
            max_vertices: 6,
            min_aspect: 0.7,
            max_aspect: 1.3,
        }
    }
}

#[derive(Debug)]
pub struct ContourFallback {
    params: ContourFallbackParams,
}

impl ContourFallback {
    pub fn new(params: ContourFallbackParams) -> Result<Self, BackendUnavailable> {
        if !params.enabled {
            return Err(BackendUnavailable::Disabled {
                stage: MarkerKind::Contour,
            });
        }
        Ok(Self { params })
    }
}

impl MarkerDetector for ContourFallback {
    fn name(&self) -> &'static str {
        "contour"
    }

    fn kind(&self) -> MarkerKind {
        MarkerKind::Contour
    }

    fn detect(&self, gray: &GrayImageView<'_>) -> Result<Option<MarkerHit>, DetectionFailure> {
        let p = &self.params;
        let mask = BinaryMask::threshold_inv(gray, p.threshold);

        for contour in find_contours(&mask, Retrieval::External) {
            let area = contour.area();
            if area < p.min_area || area > p.max_area {
                continue;
            }
            let approx = approx_poly_dp(&contour.points, p.approx_epsilon_frac * contour.perimeter());
            if approx.len() < p.min_vertices || approx.len() > p.max_vertices {
                continue;
            }
            let bb = bounding_rect(&approx);
            let aspect = bb.width as f32 / bb.height as f32;
            if aspect < p.min_aspect || aspect > p.max_aspect {
                continue;
            }

            let rect = Rect::new(bb.x as f32, bb.y as f32, bb.width as f32, bb.height as f32);
            return Ok(Some(MarkerHit::new(MarkerKind::Contour, Geometry::Rect(rect))));
        }

        Ok(None)
    }
}
