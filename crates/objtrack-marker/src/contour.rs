//! Border following on binary masks and polygon helpers for the results.
//!
//! [`find_contours`] is the Suzuki–Abe topological border follower: every
//! foreground component gets an outer border, every background hole inside
//! one gets a hole border, and each border remembers its parent. Callers
//! choose which outer borders they want through [`Retrieval`].

use nalgebra::Point2;

use crate::BinaryMask;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Which outer borders [`find_contours`] returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Retrieval {
    /// Only outer borders not enclosed by any other component.
    External,
    /// Every outer border, including components nested inside holes.
    AllOuter,
}

/// Closed pixel chain along a component border, in tracing order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contour {
    pub points: Vec<Point2<i32>>,
}

impl Contour {
    /// Enclosed area (shoelace over the border pixel centers).
    pub fn area(&self) -> f64 {
        polygon_area(&self.points)
    }

    /// Closed arc length.
    pub fn perimeter(&self) -> f64 {
        arc_length(&self.points)
    }
}

/// Integer bounding box; width and height count pixels (`max - min + 1`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

// Neighbour offsets (dy, dx), clockwise in y-down coordinates, starting east.
const OFFSETS: [(isize, isize); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];
const EAST: usize = 0;
const WEST: usize = 4;

/// Trace component borders of `mask`.
#[cfg_attr(feature = "tracing", instrument(level = "trace", skip(mask), fields(w = mask.width, h = mask.height)))]
pub fn find_contours(mask: &BinaryMask, mode: Retrieval) -> Vec<Contour> {
    // One pixel of background padding so tracing never leaves the buffer.
    let w = mask.width + 2;
    let h = mask.height + 2;
    let mut f = vec![0i32; w * h];
    for y in 0..mask.height {
        for x in 0..mask.width {
            if mask.is_set(x, y) {
                f[(y + 1) * w + x + 1] = 1;
            }
        }
    }

    // Border 1 is the frame, treated as a hole with no parent.
    let mut is_hole = vec![false, true];
    let mut parent = vec![0usize, 0];
    let mut nbd: i32 = 1;
    let mut out = Vec::new();

    for i in 1..h - 1 {
        let mut lnbd: i32 = 1;
        for j in 1..w - 1 {
            let idx = i * w + j;
            let v = f[idx];
            if v == 0 {
                continue;
            }

            let outer = v == 1 && f[idx - 1] == 0;
            let hole = !outer && v >= 1 && f[idx + 1] == 0;

            if outer || hole {
                if hole && v > 1 {
                    lnbd = v;
                }
                nbd += 1;

                let prev = lnbd as usize;
                let p = if hole != is_hole[prev] {
                    prev
                } else {
                    parent[prev]
                };
                is_hole.push(hole);
                parent.push(p);

                let keep = outer
                    && match mode {
                        Retrieval::External => p == 1,
                        Retrieval::AllOuter => true,
                    };
                let start = if outer { WEST } else { EAST };
                let points = follow_border(&mut f, w, i, j, start, nbd, keep);
                if keep {
                    out.push(Contour { points });
                }
            }

            let v = f[idx];
            if v != 1 {
                lnbd = v.abs();
            }
        }
    }

    out
}

#[inline]
fn step(w: usize, i: usize, j: usize, dir: usize) -> usize {
    let (di, dj) = OFFSETS[dir];
    (i as isize + di) as usize * w + (j as isize + dj) as usize
}

fn direction_between(w: usize, from: usize, to: usize) -> usize {
    let (fi, fj) = ((from / w) as isize, (from % w) as isize);
    let (ti, tj) = ((to / w) as isize, (to % w) as isize);
    let d = (ti - fi, tj - fj);
    OFFSETS.iter().position(|&o| o == d).unwrap_or(EAST)
}

fn follow_border(
    f: &mut [i32],
    w: usize,
    i: usize,
    j: usize,
    start_dir: usize,
    nbd: i32,
    collect: bool,
) -> Vec<Point2<i32>> {
    let origin = i * w + j;
    let to_point = |idx: usize| Point2::new((idx % w) as i32 - 1, (idx / w) as i32 - 1);

    let first = (0..8)
        .map(|k| (start_dir + k) % 8)
        .find(|&d| f[step(w, i, j, d)] != 0);
    let Some(first_dir) = first else {
        // Isolated pixel.
        f[origin] = -nbd;
        return if collect {
            vec![to_point(origin)]
        } else {
            Vec::new()
        };
    };

    let second = step(w, i, j, first_dir);
    let mut points = Vec::new();
    if collect {
        points.push(to_point(origin));
    }

    let mut prev = second;
    let mut cur = origin;
    loop {
        let (ci, cj) = (cur / w, cur % w);
        let back = direction_between(w, cur, prev);

        // Counterclockwise sweep starting just after the previous pixel.
        let mut east_was_zero = false;
        let mut next = prev;
        for k in 1..=8 {
            let d = (back + 8 - k) % 8;
            let n = step(w, ci, cj, d);
            if f[n] != 0 {
                next = n;
                break;
            }
            if d == EAST {
                east_was_zero = true;
            }
        }

        if east_was_zero {
            f[cur] = -nbd;
        } else if f[cur] == 1 {
            f[cur] = nbd;
        }

        if next == origin && cur == second {
            break;
        }
        prev = cur;
        cur = next;
        if collect {
            points.push(to_point(cur));
        }
    }

    points
}

/// Absolute shoelace area of a closed polygon.
pub fn polygon_area(points: &[Point2<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut acc = 0i64;
    for (k, a) in points.iter().enumerate() {
        let b = points[(k + 1) % points.len()];
        acc += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
    }
    (acc as f64).abs() * 0.5
}

/// Length of the closed chain through `points`.
pub fn arc_length(points: &[Point2<i32>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let mut len = 0.0;
    for (k, a) in points.iter().enumerate() {
        let b = points[(k + 1) % points.len()];
        let dx = (b.x - a.x) as f64;
        let dy = (b.y - a.y) as f64;
        len += (dx * dx + dy * dy).sqrt();
    }
    len
}

pub fn bounding_rect(points: &[Point2<i32>]) -> IntRect {
    let Some(first) = points.first() else {
        return IntRect {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        };
    };
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
    for p in points {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    IntRect {
        x: x0,
        y: y0,
        width: x1 - x0 + 1,
        height: y1 - y0 + 1,
    }
}

/// Douglas–Peucker simplification of a closed polygon.
///
/// The chain is split between two far-apart anchor points, each half is
/// simplified independently, and the kept vertices come back in contour order
/// starting at the first anchor.
pub fn approx_poly_dp(points: &[Point2<i32>], epsilon: f64) -> Vec<Point2<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let farthest_from = |origin: Point2<i32>| {
        let mut best = (0usize, -1i64);
        for (k, p) in points.iter().enumerate() {
            let dx = (p.x - origin.x) as i64;
            let dy = (p.y - origin.y) as i64;
            let d = dx * dx + dy * dy;
            if d > best.1 {
                best = (k, d);
            }
        }
        best.0
    };
    let a = farthest_from(points[0]);
    let b = farthest_from(points[a]);
    if a == b {
        return vec![points[a]];
    }

    let mut keep = vec![false; n];
    keep[a] = true;
    keep[b] = true;
    simplify_chain(points, a, b, epsilon, &mut keep);
    simplify_chain(points, b, a, epsilon, &mut keep);

    (0..n)
        .map(|k| (a + k) % n)
        .filter(|&k| keep[k])
        .map(|k| points[k])
        .collect()
}

fn simplify_chain(points: &[Point2<i32>], from: usize, to: usize, eps: f64, keep: &mut [bool]) {
    let n = points.len();
    let mut stack = vec![(from, to)];
    while let Some((s, e)) = stack.pop() {
        let span = (e + n - s) % n;
        if span < 2 {
            continue;
        }
        let (ps, pe) = (points[s], points[e]);
        let mut best = (s, -1.0f64);
        for k in 1..span {
            let idx = (s + k) % n;
            let d = distance_to_segment(points[idx], ps, pe);
            if d > best.1 {
                best = (idx, d);
            }
        }
        if best.1 > eps {
            keep[best.0] = true;
            stack.push((s, best.0));
            stack.push((best.0, e));
        }
    }
}

fn distance_to_segment(p: Point2<i32>, a: Point2<i32>, b: Point2<i32>) -> f64 {
    let (px, py) = (p.x as f64, p.y as f64);
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (dx, dy) = (b.x as f64 - ax, b.y as f64 - ay);
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-12 {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }
    ((px - ax) * dy - (py - ay) * dx).abs() / len
}

/// True when the closed polygon turns the same way at every vertex.
pub fn is_convex(points: &[Point2<i32>]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0i64;
    for k in 0..n {
        let a = points[k];
        let b = points[(k + 1) % n];
        let c = points[(k + 2) % n];
        let cross =
            (b.x - a.x) as i64 * (c.y - b.y) as i64 - (b.y - a.y) as i64 * (c.x - b.x) as i64;
        if cross == 0 {
            continue;
        }
        if sign == 0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    sign != 0
}
