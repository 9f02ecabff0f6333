//! Reading marker bits from an image quad.
//!
//! The quad is mapped from a canonical square of side
//! [`CellDecodeParams::canonical_px`]. Every cell of the
//! `(bits + 2·border)²` grid is sampled at its centre; a finer 3×-subdivided
//! grid provides the samples for the Otsu threshold. Border cells must be dark
//! (after optional polarity inversion), inner cells form the code.

use nalgebra::Point2;
use objtrack_core::{homography_from_4pt, sample_mean_3x3, GrayImageView, Homography};
use serde::{Deserialize, Serialize};

use crate::threshold::otsu_threshold_from_samples;
use crate::{Match, Matcher};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellDecodeParams {
    /// Marker border width in cells.
    pub border_bits: usize,
    /// Fraction of the quad side to ignore near its edges.
    pub inset_frac: f32,
    /// Minimum fraction of border cells that must read dark.
    pub min_border_score: f32,
    /// Side of the canonical square the quad is mapped from.
    pub canonical_px: f32,
}

impl Default for CellDecodeParams {
    fn default() -> Self {
        Self {
            border_bits: 1,
            inset_frac: 0.0,
            min_border_score: 0.85,
            canonical_px: 96.0,
        }
    }
}

/// A dictionary marker read from one quad.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadDecode {
    pub matched: Match,
    /// `border_score` discounted by the fraction of corrected bits.
    pub score: f32,
    pub border_score: f32,
    /// Observed inner bits (row-major, dark = 1).
    pub code: u64,
    /// The marker read as light-on-dark.
    pub inverted: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CellRole {
    Border,
    /// Bit index in the code.
    Bit(u32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Reading {
    code: u64,
    border_score: f32,
    inverted: bool,
}

const MIN_SIDE_PX: f32 = 12.0;
const THRESHOLD_SUBDIV: usize = 3;

/// Canonical-space sample positions and what each cell means.
#[derive(Debug)]
struct CellLayout {
    roles: Vec<CellRole>,
    centers: Vec<Point2<f32>>,
    threshold_probes: Vec<Point2<f32>>,
    has_border: bool,
}

impl CellLayout {
    fn new(params: &CellDecodeParams, bits: usize) -> Option<Self> {
        let border = params.border_bits;
        let cells = bits + 2 * border;
        if cells == 0 || bits * bits > 64 {
            return None;
        }

        let inset = (params.inset_frac * params.canonical_px).max(0.0);
        let side = params.canonical_px - 2.0 * inset;
        if side < MIN_SIDE_PX {
            return None;
        }

        let on_border = |c: usize| c < border || c >= cells - border;
        let roles = grid_indices(cells)
            .map(|(cx, cy)| {
                if on_border(cx) || on_border(cy) {
                    CellRole::Border
                } else {
                    CellRole::Bit(((cy - border) * bits + (cx - border)) as u32)
                }
            })
            .collect();

        Some(Self {
            roles,
            centers: centers(inset, side, cells),
            threshold_probes: centers(inset, side, cells * THRESHOLD_SUBDIV),
            has_border: border > 0,
        })
    }

    /// Classify cell samples at `threshold`; `None` when the border is not dark enough.
    fn read(&self, samples: &[u8], threshold: u8, inverted: bool, min_border: f32) -> Option<Reading> {
        let mut code = 0u64;
        let (mut dark_border, mut border_cells) = (0u32, 0u32);

        for (&role, &v) in self.roles.iter().zip(samples) {
            let dark = (v < threshold) != inverted;
            match role {
                CellRole::Border => {
                    border_cells += 1;
                    dark_border += u32::from(dark);
                }
                CellRole::Bit(i) if dark => code |= 1 << i,
                CellRole::Bit(_) => {}
            }
        }

        let border_score = if self.has_border {
            dark_border as f32 / border_cells.max(1) as f32
        } else {
            1.0
        };
        (border_score >= min_border).then_some(Reading {
            code,
            border_score,
            inverted,
        })
    }
}

fn grid_indices(n: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..n).flat_map(move |y| (0..n).map(move |x| (x, y)))
}

/// Row-major centres of an `n × n` grid covering `[start, start + side]²`.
fn centers(start: f32, side: f32, n: usize) -> Vec<Point2<f32>> {
    let step = side / n as f32;
    grid_indices(n)
        .map(|(x, y)| Point2::new(start + (x as f32 + 0.5) * step, start + (y as f32 + 0.5) * step))
        .collect()
}

/// Reusable decoder for quads against one dictionary.
pub struct QuadDecoder<'a> {
    params: &'a CellDecodeParams,
    matcher: &'a Matcher,
    layout: CellLayout,
    canonical: [Point2<f32>; 4],
    cell_samples: Vec<u8>,
    probe_samples: Vec<u8>,
}

impl<'a> QuadDecoder<'a> {
    /// `None` when the cell grid does not fit the canonical square.
    pub fn new(params: &'a CellDecodeParams, matcher: &'a Matcher) -> Option<Self> {
        let layout = CellLayout::new(params, matcher.dictionary().marker_size)?;
        let s = params.canonical_px;
        Some(Self {
            params,
            matcher,
            cell_samples: Vec::with_capacity(layout.centers.len()),
            probe_samples: Vec::with_capacity(layout.threshold_probes.len()),
            layout,
            canonical: [
                Point2::new(0.0, 0.0),
                Point2::new(s, 0.0),
                Point2::new(s, s),
                Point2::new(0.0, s),
            ],
        })
    }

    /// Decode the marker whose outer border is `corners` (clockwise from top-left).
    pub fn decode(&mut self, img: &GrayImageView<'_>, corners: &[Point2<f32>; 4]) -> Option<QuadDecode> {
        let h = homography_from_4pt(&self.canonical, corners)?;
        let reading = self.sample(img, &h)?;

        let matched = self.matcher.match_code(reading.code)?;
        let bits = self.matcher.dictionary().bit_count().max(1) as f32;
        let corrected = matched.hamming as f32 / bits;

        Some(QuadDecode {
            matched,
            score: (reading.border_score * (1.0 - corrected)).clamp(0.0, 1.0),
            border_score: reading.border_score,
            code: reading.code,
            inverted: reading.inverted,
        })
    }

    fn sample(&mut self, img: &GrayImageView<'_>, h: &Homography) -> Option<Reading> {
        self.cell_samples.clear();
        for p in &self.layout.centers {
            let q = h.apply(*p);
            self.cell_samples.push(sample_mean_3x3(img, q.x, q.y)?);
        }

        self.probe_samples.clear();
        self.probe_samples.extend(self.layout.threshold_probes.iter().filter_map(|p| {
            let q = h.apply(*p);
            sample_mean_3x3(img, q.x, q.y)
        }));
        let threshold = if self.probe_samples.is_empty() {
            otsu_threshold_from_samples(&self.cell_samples)
        } else {
            otsu_threshold_from_samples(&self.probe_samples)
        };

        let min_border = self.params.min_border_score;
        [false, true]
            .into_iter()
            .filter_map(|inv| self.layout.read(&self.cell_samples, threshold, inv, min_border))
            .fold(None, |best: Option<Reading>, r| match best {
                Some(b) if b.border_score >= r.border_score => Some(b),
                _ => Some(r),
            })
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::build_marker_image;
    use super::*;
    use crate::{rotate_code_u64, Dictionary};

    fn matcher() -> Matcher {
        let dict = Dictionary {
            name: "test_4x4".into(),
            marker_size: 4,
            max_correction_bits: 1,
            codes: vec![0b1011_0010_0111_0001, 0b0110_1001_1100_0011],
        };
        Matcher::new(dict, 0).expect("matcher")
    }

    fn full_quad(side: f32) -> [Point2<f32>; 4] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(side, 0.0),
            Point2::new(side, side),
            Point2::new(0.0, side),
        ]
    }

    #[test]
    fn layout_marks_outer_ring_as_border() {
        let layout = CellLayout::new(&CellDecodeParams::default(), 4).expect("layout");
        assert_eq!(layout.roles.len(), 36);
        assert_eq!(layout.roles.iter().filter(|r| **r == CellRole::Border).count(), 20);
        assert_eq!(layout.roles[7], CellRole::Bit(0));
        assert_eq!(layout.roles[28], CellRole::Bit(15));
        assert_eq!(layout.threshold_probes.len(), 18 * 18);
    }

    #[test]
    fn layout_rejects_oversized_markers() {
        assert!(CellLayout::new(&CellDecodeParams::default(), 9).is_none());
        let tiny = CellDecodeParams {
            canonical_px: 8.0,
            ..CellDecodeParams::default()
        };
        assert!(CellLayout::new(&tiny, 4).is_none());
    }

    #[test]
    fn decodes_marker_filling_the_quad() {
        let matcher = matcher();
        let params = CellDecodeParams::default();
        let code = matcher.dictionary().codes[1];
        let img = build_marker_image(code, 4, 1, 10);

        let mut decoder = QuadDecoder::new(&params, &matcher).expect("decoder");
        let det = decoder
            .decode(&img.view(), &full_quad(img.width as f32))
            .expect("decode");
        assert_eq!(det.matched.id, 1);
        assert_eq!(det.matched.hamming, 0);
        assert_eq!(det.code, code);
        assert!(!det.inverted);
        assert!((det.score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn reports_rotation_of_turned_marker() {
        let matcher = matcher();
        let params = CellDecodeParams::default();
        let base = matcher.dictionary().codes[0];
        let img = build_marker_image(rotate_code_u64(base, 4, 2), 4, 1, 10);

        let mut decoder = QuadDecoder::new(&params, &matcher).expect("decoder");
        let det = decoder
            .decode(&img.view(), &full_quad(img.width as f32))
            .expect("decode");
        assert_eq!(det.matched.id, 0);
        assert_eq!(det.matched.rotation, 2);
    }

    #[test]
    fn blank_patch_does_not_decode() {
        let matcher = matcher();
        let params = CellDecodeParams::default();
        let img = objtrack_core::GrayImage {
            width: 60,
            height: 60,
            data: vec![255; 3600],
        };
        let mut decoder = QuadDecoder::new(&params, &matcher).expect("decoder");
        assert!(decoder.decode(&img.view(), &full_quad(60.0)).is_none());
    }
}
