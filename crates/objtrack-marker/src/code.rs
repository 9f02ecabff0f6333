//! 2D-code localisation from the three finder patterns.
//!
//! Rows are scanned for the 1:1:3:1:1 dark/light run signature of a finder
//! pattern. Each row hit is cross-checked vertically and then horizontally
//! through its estimated centre; confirmed centres are merged across rows.
//! The three best-agreeing centres give the code's orientation and, with
//! the module size, its four outer corners. Nothing is decoded.

use log::trace;
use nalgebra::{Point2, Vector2};
use objtrack_core::{Geometry, GrayImageView, MarkerKind, Polygon4};
use serde::{Deserialize, Serialize};

use crate::threshold::{otsu_threshold, BinaryMask};
use crate::{BackendUnavailable, DetectionFailure, MarkerDetector, MarkerHit};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeParams {
    pub enabled: bool,
    /// Allowed deviation of each run from its ideal length, in modules.
    pub max_variance: f32,
    /// Row hits a finder centre needs before it is used.
    pub min_confirmations: usize,
    /// Only the most confirmed centres are combined into triples.
    pub max_candidates: usize,
}

impl Default for CodeParams {
    fn default() -> Self {
        Self {
            enabled: true,
            max_variance: 0.5,
            min_confirmations: 2,
            max_candidates: 8,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct FinderCenter {
    center: Point2<f32>,
    module: f32,
    hits: usize,
}

#[derive(Debug)]
pub struct CodeDetector {
    params: CodeParams,
}

impl CodeDetector {
    pub fn new(params: CodeParams) -> Result<Self, BackendUnavailable> {
        if !params.enabled {
            return Err(BackendUnavailable::Disabled {
                stage: MarkerKind::Code,
            });
        }
        Ok(Self { params })
    }
}

impl MarkerDetector for CodeDetector {
    fn name(&self) -> &'static str {
        "code"
    }

    fn kind(&self) -> MarkerKind {
        MarkerKind::Code
    }

    fn detect(&self, gray: &GrayImageView<'_>) -> Result<Option<MarkerHit>, DetectionFailure> {
        const MIN_SIDE: usize = 21;
        if gray.width < MIN_SIDE || gray.height < MIN_SIDE {
            return Err(DetectionFailure::FrameTooSmall {
                width: gray.width,
                height: gray.height,
                min: MIN_SIDE,
            });
        }

        let mask = BinaryMask::threshold_inv(gray, otsu_threshold(gray));
        let scanner = FinderScanner {
            mask: &mask,
            max_variance: self.params.max_variance,
        };
        let mut centers = scanner.scan();
        centers.retain(|c| c.hits >= self.params.min_confirmations);
        trace!("code: {} finder candidates", centers.len());

        let Some([a, b, c]) = select_triple(&mut centers, self.params.max_candidates) else {
            return Ok(None);
        };
        let corners = outer_corners(a, b, c);
        Ok(Some(MarkerHit::new(
            MarkerKind::Code,
            Geometry::Quad(Polygon4::new(corners)),
        )))
    }
}

struct FinderScanner<'a> {
    mask: &'a BinaryMask,
    max_variance: f32,
}

impl FinderScanner<'_> {
    fn scan(&self) -> Vec<FinderCenter> {
        let (w, h) = (self.mask.width, self.mask.height);
        let mut centers = Vec::new();

        for y in 0..h {
            let mut counts = [0usize; 5];
            let mut state = 0usize;
            for x in 0..w {
                if self.mask.is_set(x, y) {
                    if state & 1 == 1 {
                        state += 1;
                    }
                    counts[state] += 1;
                } else if state & 1 == 1 {
                    counts[state] += 1;
                } else if state == 4 {
                    if self.run_ratio_ok(&counts) && self.confirm(&counts, y, x, &mut centers) {
                        counts = [0; 5];
                        state = 0;
                    } else {
                        counts = [counts[2], counts[3], counts[4], 1, 0];
                        state = 3;
                    }
                } else {
                    state += 1;
                    counts[state] += 1;
                }
            }
            if state == 4 && self.run_ratio_ok(&counts) {
                self.confirm(&counts, y, w, &mut centers);
            }
        }

        centers
    }

    fn run_ratio_ok(&self, counts: &[usize; 5]) -> bool {
        let total: usize = counts.iter().sum();
        if total < 7 || counts.iter().any(|&c| c == 0) {
            return false;
        }
        let module = total as f32 / 7.0;
        let tol = module * self.max_variance;
        let expected = [1.0, 1.0, 3.0, 1.0, 1.0];
        counts
            .iter()
            .zip(expected)
            .all(|(&c, e)| (module * e - c as f32).abs() < tol * e)
    }

    fn confirm(
        &self,
        counts: &[usize; 5],
        y: usize,
        end_x: usize,
        centers: &mut Vec<FinderCenter>,
    ) -> bool {
        let total: usize = counts.iter().sum();
        let cx = center_from_end(counts, end_x);
        let Some(cy) = self.cross_check(cx as usize, y, counts[2], total, Axis::Vertical) else {
            return false;
        };
        let Some(cx) = self.cross_check(cx as usize, cy as usize, counts[2], total, Axis::Horizontal)
        else {
            return false;
        };

        let module = total as f32 / 7.0;
        let center = Point2::new(cx, cy);
        if let Some(existing) = centers.iter_mut().find(|c| {
            (c.center - center).abs().max() <= module && (c.module - module).abs() <= 1.0
        }) {
            let n = existing.hits as f32;
            existing.center = Point2::from((existing.center.coords * n + center.coords) / (n + 1.0));
            existing.module = (existing.module * n + module) / (n + 1.0);
            existing.hits += 1;
        } else {
            centers.push(FinderCenter {
                center,
                module,
                hits: 1,
            });
        }
        true
    }

    /// Re-measure the run pattern through `(x, y)` along `axis`; returns the refined centre.
    fn cross_check(
        &self,
        x: usize,
        y: usize,
        max_count: usize,
        original_total: usize,
        axis: Axis,
    ) -> Option<f32> {
        let (len, fixed, start) = match axis {
            Axis::Vertical => (self.mask.height, x, y),
            Axis::Horizontal => (self.mask.width, y, x),
        };
        let dark = |pos: usize| match axis {
            Axis::Vertical => self.mask.is_set(fixed, pos),
            Axis::Horizontal => self.mask.is_set(pos, fixed),
        };
        if start >= len || !dark(start) {
            return None;
        }

        let mut counts = [0usize; 5];

        // Backwards from the centre: centre, light ring, outer dark ring.
        let mut pos = start as isize;
        while pos >= 0 && dark(pos as usize) {
            counts[2] += 1;
            pos -= 1;
        }
        while pos >= 0 && !dark(pos as usize) && counts[1] <= max_count {
            counts[1] += 1;
            pos -= 1;
        }
        if pos < 0 || counts[1] > max_count {
            return None;
        }
        while pos >= 0 && dark(pos as usize) && counts[0] <= max_count {
            counts[0] += 1;
            pos -= 1;
        }
        if counts[0] > max_count {
            return None;
        }

        // Forwards.
        let mut pos = start + 1;
        while pos < len && dark(pos) {
            counts[2] += 1;
            pos += 1;
        }
        if pos == len {
            return None;
        }
        while pos < len && !dark(pos) && counts[3] <= max_count {
            counts[3] += 1;
            pos += 1;
        }
        if pos == len || counts[3] > max_count {
            return None;
        }
        while pos < len && dark(pos) && counts[4] <= max_count {
            counts[4] += 1;
            pos += 1;
        }
        if counts[4] > max_count {
            return None;
        }

        let total: usize = counts.iter().sum();
        if 5 * total.abs_diff(original_total) >= 2 * original_total {
            return None;
        }
        self.run_ratio_ok(&counts)
            .then(|| center_from_end(&counts, pos))
    }
}

#[derive(Clone, Copy)]
enum Axis {
    Vertical,
    Horizontal,
}

/// Centre of the middle run, given the index just past the last run.
fn center_from_end(counts: &[usize; 5], end: usize) -> f32 {
    end as f32 - counts[4] as f32 - counts[3] as f32 - counts[2] as f32 / 2.0
}

/// Pick the three centres that best form the right-isosceles layout of a code.
fn select_triple(centers: &mut [FinderCenter], max_candidates: usize) -> Option<[FinderCenter; 3]> {
    if centers.len() < 3 {
        return None;
    }
    centers.sort_by(|a, b| b.hits.cmp(&a.hits));
    let pool = &centers[..centers.len().min(max_candidates.max(3))];

    let mut best: Option<([FinderCenter; 3], f32)> = None;
    for i in 0..pool.len() {
        for j in i + 1..pool.len() {
            for k in j + 1..pool.len() {
                let Some((tri, cost)) = orient_triple(pool[i], pool[j], pool[k]) else {
                    continue;
                };
                if best.as_ref().map_or(true, |(_, c)| cost < *c) {
                    best = Some((tri, cost));
                }
            }
        }
    }
    best.map(|(tri, _)| tri)
}

/// Order as `[top-left, top-right, bottom-left]` with a layout cost, or `None`
/// when the three centres cannot be finder patterns of the same code.
fn orient_triple(
    p: FinderCenter,
    q: FinderCenter,
    r: FinderCenter,
) -> Option<([FinderCenter; 3], f32)> {
    let modules = [p.module, q.module, r.module];
    let mean_module = modules.iter().sum::<f32>() / 3.0;
    if modules
        .iter()
        .any(|m| (m - mean_module).abs() > 0.5 * mean_module)
    {
        return None;
    }

    let d_pq = (p.center - q.center).norm();
    let d_qr = (q.center - r.center).norm();
    let d_rp = (r.center - p.center).norm();

    // The corner finder sits opposite the longest side.
    let (a, b, c) = if d_qr >= d_pq && d_qr >= d_rp {
        (p, q, r)
    } else if d_rp >= d_pq && d_rp >= d_qr {
        (q, r, p)
    } else {
        (r, p, q)
    };

    let ab = b.center - a.center;
    let ac = c.center - a.center;
    let (lab, lac) = (ab.norm(), ac.norm());
    if lab < 7.0 * mean_module || lac < 7.0 * mean_module {
        return None;
    }
    let ratio = lab / lac;
    if !(0.7..=1.0 / 0.7).contains(&ratio) {
        return None;
    }
    let cos = ab.dot(&ac) / (lab * lac);
    if cos.abs() > 0.35 {
        return None;
    }

    // Clockwise in y-down coordinates: top-left -> top-right -> bottom-left.
    let cross = ab.x * ac.y - ab.y * ac.x;
    let tri = if cross > 0.0 { [a, b, c] } else { [a, c, b] };
    Some((tri, (1.0 - ratio).abs() + cos.abs()))
}

/// Outer corners (TL, TR, BR, BL) from the three finder centres.
fn outer_corners(tl: FinderCenter, tr: FinderCenter, bl: FinderCenter) -> [Point2<f32>; 4] {
    let module = (tl.module + tr.module + bl.module) / 3.0;
    let u = unit(tr.center - tl.center) * (3.5 * module);
    let v = unit(bl.center - tl.center) * (3.5 * module);
    let br = tr.center + (bl.center - tl.center);
    [
        tl.center - u - v,
        tr.center + u - v,
        br + u + v,
        bl.center - u + v,
    ]
}

fn unit(v: Vector2<f32>) -> Vector2<f32> {
    let n = v.norm();
    if n > f32::EPSILON {
        v / n
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objtrack_core::GrayImage;

    /// White canvas with the three finder patterns of a 21-module code at `(x0, y0)`.
    fn code_image(width: usize, height: usize, x0: usize, y0: usize, module: usize) -> GrayImage {
        let mut data = vec![255u8; width * height];
        let mut paint = |mx: usize, my: usize| {
            for yy in 0..module {
                for xx in 0..module {
                    data[(y0 + my * module + yy) * width + x0 + mx * module + xx] = 0;
                }
            }
        };
        for (ox, oy) in [(0, 0), (14, 0), (0, 14)] {
            for my in 0..7 {
                for mx in 0..7 {
                    let ring = mx == 0 || my == 0 || mx == 6 || my == 6;
                    let core = (2..=4).contains(&mx) && (2..=4).contains(&my);
                    if ring || core {
                        paint(ox + mx, oy + my);
                    }
                }
            }
        }
        // A few data modules so the code is not just three squares.
        for (mx, my) in [(9, 9), (10, 12), (15, 16), (18, 10), (12, 19)] {
            paint(mx, my);
        }
        GrayImage {
            width,
            height,
            data,
        }
    }

    #[test]
    fn locates_outer_corners_of_upright_code() {
        let img = code_image(160, 160, 30, 30, 4);
        let detector = CodeDetector::new(CodeParams::default()).expect("detector");
        let hit = detector.detect(&img.view()).expect("no failure").expect("hit");

        assert_eq!(hit.kind, MarkerKind::Code);
        let Geometry::Quad(poly) = hit.geometry else {
            panic!("expected quad");
        };
        let expected = [(30.0, 30.0), (114.0, 30.0), (114.0, 114.0), (30.0, 114.0)];
        for (c, (ex, ey)) in poly.corners.iter().zip(expected) {
            assert!(
                (c.x - ex).abs() <= 3.0 && (c.y - ey).abs() <= 3.0,
                "corner {c:?} expected ({ex}, {ey})"
            );
        }
        let center = poly.center();
        assert!((center.x - 72.0).abs() <= 2.0 && (center.y - 72.0).abs() <= 2.0);
    }

    #[test]
    fn two_finder_patterns_are_not_enough() {
        let mut img = code_image(160, 160, 30, 30, 4);
        // Erase the bottom-left finder.
        for y in 86..114 {
            img.data[y * 160 + 30..y * 160 + 58].fill(255);
        }
        let detector = CodeDetector::new(CodeParams::default()).expect("detector");
        assert_eq!(detector.detect(&img.view()), Ok(None));
    }

    #[test]
    fn run_ratio_accepts_scaled_finder_rows() {
        let mask = BinaryMask {
            width: 1,
            height: 1,
            data: vec![0],
        };
        let scanner = FinderScanner {
            mask: &mask,
            max_variance: 0.5,
        };
        assert!(scanner.run_ratio_ok(&[4, 4, 12, 4, 4]));
        assert!(scanner.run_ratio_ok(&[3, 4, 11, 4, 3]));
        assert!(!scanner.run_ratio_ok(&[4, 4, 4, 4, 4]));
        assert!(!scanner.run_ratio_ok(&[0, 4, 12, 4, 4]));
    }

    #[test]
    fn disabled_stage_is_unavailable() {
        let params = CodeParams {
            enabled: false,
            ..CodeParams::default()
        };
        assert!(CodeDetector::new(params).is_err());
    }
}
