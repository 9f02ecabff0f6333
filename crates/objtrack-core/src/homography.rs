//! Projective maps between quadrilaterals.
//!
//! Maps are built in closed form through the unit square: the square-to-quad
//! map of each side is composed as `dst ∘ src⁻¹`.

use nalgebra::{Matrix3, Point2, Vector3};

const EPS: f64 = 1e-12;

/// 3x3 projective map, normalized so that `h[(2, 2)] == 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    /// Map `p`; points on the line at infinity come out non-finite.
    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(f64::from(p.x), f64::from(p.y), 1.0);
        Point2::new((v.x / v.z) as f32, (v.y / v.z) as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().and_then(normalized).map(Self::new)
    }
}

fn normalized(h: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let s = h[(2, 2)];
    (s.abs() > EPS).then(|| h / s)
}

/// Map taking `(0,0), (1,0), (1,1), (0,1)` to `q[0..4]`.
fn unit_square_to(q: &[Point2<f32>; 4]) -> Option<Matrix3<f64>> {
    let [x0, x1, x2, x3] = q.map(|p| f64::from(p.x));
    let [y0, y1, y2, y3] = q.map(|p| f64::from(p.y));

    let sx = x0 - x1 + x2 - x3;
    let sy = y0 - y1 + y2 - y3;
    let (dx1, dx2) = (x1 - x2, x3 - x2);
    let (dy1, dy2) = (y1 - y2, y3 - y2);

    let den = dx1 * dy2 - dx2 * dy1;
    if den.abs() < EPS {
        return None;
    }
    let g = (sx * dy2 - dx2 * sy) / den;
    let h = (dx1 * sy - sx * dy1) / den;

    Some(Matrix3::new(
        x1 - x0 + g * x1, x3 - x0 + h * x3, x0, //
        y1 - y0 + g * y1, y3 - y0 + h * y3, y0, //
        g, h, 1.0,
    ))
}

/// Homography with `dst[k] ~ H * src[k]` for the four corner pairs.
///
/// Both quads must list their corners in the same cyclic order. `None` when
/// either quad is degenerate (three collinear corners or fewer distinct ones).
pub fn homography_from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    let from_src = unit_square_to(src)?.try_inverse()?;
    let to_dst = unit_square_to(dst)?;
    normalized(to_dst * from_src).map(Homography::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point2<f32>, b: Point2<f32>) -> bool {
        (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3
    }

    fn square(side: f32) -> [Point2<f32>; 4] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(side, 0.0),
            Point2::new(side, side),
            Point2::new(0.0, side),
        ]
    }

    #[test]
    fn corners_map_exactly() {
        let quad = [
            Point2::new(40.0, 31.0),
            Point2::new(118.0, 22.0),
            Point2::new(125.0, 97.0),
            Point2::new(35.0, 110.0),
        ];
        let h = homography_from_4pt(&square(96.0), &quad).expect("map");
        for (s, d) in square(96.0).iter().zip(&quad) {
            assert!(close(h.apply(*s), *d), "{:?} -> {:?}", s, h.apply(*s));
        }
    }

    #[test]
    fn recovers_known_perspective_map() {
        let truth = Homography::new(Matrix3::new(
            0.8, 0.05, 120.0, //
            -0.02, 1.1, 80.0, //
            0.0009, -0.0004, 1.0,
        ));
        let src = square(60.0);
        let dst = src.map(|p| truth.apply(p));

        let h = homography_from_4pt(&src, &dst).expect("map");
        for p in [Point2::new(15.0, 45.0), Point2::new(30.0, 30.0)] {
            assert!(close(h.apply(p), truth.apply(p)));
        }
        let inv = h.inverse().expect("invertible");
        assert!(close(inv.apply(dst[2]), src[2]));
    }

    #[test]
    fn parallelogram_is_affine() {
        let quad = [
            Point2::new(10.0, 10.0),
            Point2::new(50.0, 20.0),
            Point2::new(60.0, 60.0),
            Point2::new(20.0, 50.0),
        ];
        let h = homography_from_4pt(&square(1.0), &quad).expect("map");
        assert!(h.h[(2, 0)].abs() < 1e-9 && h.h[(2, 1)].abs() < 1e-9);
    }

    #[test]
    fn degenerate_quad_has_no_map() {
        let collapsed = [Point2::new(5.0_f32, 5.0); 4];
        assert!(homography_from_4pt(&square(10.0), &collapsed).is_none());
        assert!(homography_from_4pt(&collapsed, &square(10.0)).is_none());
    }
}
