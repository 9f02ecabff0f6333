//! Square fiducial detection: candidate quads from contours, decoded against a dictionary.

use log::trace;
use nalgebra::Point2;
use objtrack_core::{Geometry, GrayImageView, MarkerKind, Polygon4};
use serde::{Deserialize, Serialize};

use crate::contour::{approx_poly_dp, find_contours, is_convex, Retrieval};
use crate::decode::{CellDecodeParams, QuadDecoder};
use crate::threshold::{otsu_threshold, BinaryMask};
use crate::{BackendUnavailable, DetectionFailure, Dictionary, MarkerDetector, MarkerHit, Matcher};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiducialParams {
    pub enabled: bool,
    /// Marker dictionary; the stage is unavailable without one.
    pub dictionary: Option<Dictionary>,
    /// Hamming budget; defaults to the dictionary's `max_correction_bits`.
    pub max_hamming: Option<u8>,
    /// Contours shorter than this are not considered.
    pub min_perimeter_px: f64,
    /// Polygon approximation tolerance relative to the contour perimeter.
    pub approx_epsilon_frac: f64,
    pub decode: CellDecodeParams,
}

impl Default for FiducialParams {
    fn default() -> Self {
        Self {
            enabled: true,
            dictionary: None,
            max_hamming: None,
            min_perimeter_px: 40.0,
            approx_epsilon_frac: 0.03,
            decode: CellDecodeParams::default(),
        }
    }
}

#[derive(Debug)]
pub struct FiducialDetector {
    params: FiducialParams,
    matcher: Matcher,
}

impl FiducialDetector {
    pub fn new(params: FiducialParams) -> Result<Self, BackendUnavailable> {
        if !params.enabled {
            return Err(BackendUnavailable::Disabled {
                stage: MarkerKind::Fiducial,
            });
        }
        let dict = params
            .dictionary
            .clone()
            .ok_or(BackendUnavailable::MissingDictionary)?;
        let max_hamming = params.max_hamming.unwrap_or(dict.max_correction_bits);
        let matcher = Matcher::new(dict, max_hamming)?;
        Ok(Self { params, matcher })
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }
}

impl MarkerDetector for FiducialDetector {
    fn name(&self) -> &'static str {
        "fiducial"
    }

    fn kind(&self) -> MarkerKind {
        MarkerKind::Fiducial
    }

    fn detect(&self, gray: &GrayImageView<'_>) -> Result<Option<MarkerHit>, DetectionFailure> {
        const MIN_SIDE: usize = 8;
        if gray.width < MIN_SIDE || gray.height < MIN_SIDE {
            return Err(DetectionFailure::FrameTooSmall {
                width: gray.width,
                height: gray.height,
                min: MIN_SIDE,
            });
        }

        let mut decoder =
            QuadDecoder::new(&self.params.decode, &self.matcher).ok_or(DetectionFailure::Backend {
                stage: self.name(),
                reason: "sampling grid does not fit the canonical square".into(),
            })?;

        let mask = BinaryMask::threshold_inv(gray, otsu_threshold(gray));
        let contours = find_contours(&mask, Retrieval::External);
        trace!("fiducial: {} external contours", contours.len());

        for contour in &contours {
            let perimeter = contour.perimeter();
            if perimeter < self.params.min_perimeter_px {
                continue;
            }
            let approx = approx_poly_dp(
                &contour.points,
                self.params.approx_epsilon_frac * perimeter,
            );
            if approx.len() != 4 || !is_convex(&approx) {
                continue;
            }

            let corners = order_corners(&approx);
            if let Some(det) = decoder.decode(gray, &corners) {
                return Ok(Some(
                    MarkerHit::new(MarkerKind::Fiducial, Geometry::Quad(Polygon4::new(corners)))
                        .with_marker_id(det.matched.id)
                        .with_score(det.score),
                ));
            }
        }

        Ok(None)
    }
}

/// Clockwise (y-down) corners starting at the one nearest the image origin.
fn order_corners(quad: &[Point2<i32>]) -> [Point2<f32>; 4] {
    let mut corners = [0, 1, 2, 3].map(|k| Point2::new(quad[k].x as f32, quad[k].y as f32));
    if Polygon4::new(corners).signed_area() < 0.0 {
        corners.reverse();
    }
    let first = (0..4)
        .min_by(|&a, &b| {
            let sa = corners[a].x + corners[a].y;
            let sb = corners[b].x + corners[b].y;
            sa.total_cmp(&sb)
        })
        .unwrap_or(0);
    corners.rotate_left(first);
    corners
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::testutil::{build_marker_image, paste_on_white};

    fn dictionary() -> Dictionary {
        Dictionary {
            name: "test_4x4".into(),
            marker_size: 4,
            max_correction_bits: 0,
            codes: vec![0b1011_0010_0111_0001, 0b0110_1001_1100_0011],
        }
    }

    fn params() -> FiducialParams {
        FiducialParams {
            dictionary: Some(dictionary()),
            ..FiducialParams::default()
        }
    }

    #[test]
    fn construction_requires_a_dictionary() {
        let err = FiducialDetector::new(FiducialParams::default()).unwrap_err();
        assert_eq!(err, BackendUnavailable::MissingDictionary);

        let disabled = FiducialParams {
            enabled: false,
            ..params()
        };
        assert!(matches!(
            FiducialDetector::new(disabled),
            Err(BackendUnavailable::Disabled { .. })
        ));
    }

    #[test]
    fn detects_marker_on_white_background() {
        let detector = FiducialDetector::new(params()).expect("detector");
        let marker = build_marker_image(dictionary().codes[1], 4, 1, 12);
        let img = paste_on_white(&marker, 200, 160, 40, 30);

        let hit = detector.detect(&img.view()).expect("no failure").expect("hit");
        assert_eq!(hit.kind, MarkerKind::Fiducial);
        assert_eq!(hit.marker_id, Some(1));

        let Geometry::Quad(poly) = hit.geometry else {
            panic!("expected quad geometry");
        };
        let expected = [(40.0, 30.0), (111.0, 30.0), (111.0, 101.0), (40.0, 101.0)];
        for (c, (ex, ey)) in poly.corners.iter().zip(expected) {
            assert!((c.x - ex).abs() <= 1.0 && (c.y - ey).abs() <= 1.0, "corner {c:?}");
        }
    }

    #[test]
    fn plain_square_is_not_a_fiducial() {
        let detector = FiducialDetector::new(params()).expect("detector");
        let square = objtrack_core::GrayImage {
            width: 60,
            height: 60,
            data: vec![0; 3600],
        };
        let img = paste_on_white(&square, 160, 120, 30, 30);
        assert_eq!(detector.detect(&img.view()), Ok(None));
    }

    #[test]
    fn tiny_frame_is_a_failure_not_a_panic() {
        let detector = FiducialDetector::new(params()).expect("detector");
        let data = [0u8; 4];
        let view = GrayImageView {
            width: 2,
            height: 2,
            data: &data,
        };
        assert!(matches!(
            detector.detect(&view),
            Err(DetectionFailure::FrameTooSmall { .. })
        ));
    }
}
