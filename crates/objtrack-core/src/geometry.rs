//! Axis-aligned rectangles and four-corner polygons in image coordinates.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in (sub)pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalized rectangle spanned by two arbitrary corner points.
    pub fn from_corners(a: Point2<f32>, b: Point2<f32>) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    #[inline]
    pub fn center(&self) -> Point2<f32> {
        Point2::new(self.x + 0.5 * self.width, self.y + 0.5 * self.height)
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Scale both position and size per axis.
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        Self {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
        }
    }

    /// Corners in TL, TR, BR, BL order.
    pub fn to_polygon(&self) -> Polygon4 {
        let (x0, y0) = (self.x, self.y);
        let (x1, y1) = (self.x + self.width, self.y + self.height);
        Polygon4::new([
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ])
    }

    /// Clamp to a `frame_width × frame_height` pixel grid.
    ///
    /// The origin is truncated to whole pixels and moved inside the frame
    /// (`x, y >= 0`); the size is truncated and capped so the rectangle ends at
    /// the frame border at the latest. The result can have zero area.
    pub fn clamp_to(&self, frame_width: usize, frame_height: usize) -> PixelRect {
        let x = to_pixel(self.x).min(frame_width);
        let y = to_pixel(self.y).min(frame_height);
        let width = to_pixel(self.width).min(frame_width - x);
        let height = to_pixel(self.height).min(frame_height - y);
        PixelRect {
            x,
            y,
            width,
            height,
        }
    }
}

#[inline]
fn to_pixel(v: f32) -> usize {
    if v.is_finite() && v > 0.0 {
        v as usize
    } else {
        0
    }
}

/// Integer rectangle on the pixel grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelRect {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(
            self.x as f32,
            self.y as f32,
            self.width as f32,
            self.height as f32,
        )
    }

    #[inline]
    pub fn center(&self) -> Point2<f32> {
        self.to_rect().center()
    }
}

/// Four ordered corners of a detected target.
///
/// Winding depends on the detector that produced the polygon.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Polygon4 {
    pub corners: [Point2<f32>; 4],
}

impl Polygon4 {
    pub fn new(corners: [Point2<f32>; 4]) -> Self {
        Self { corners }
    }

    /// Mean of the four corners.
    pub fn center(&self) -> Point2<f32> {
        let mut cx = 0.0;
        let mut cy = 0.0;
        for p in &self.corners {
            cx += p.x;
            cy += p.y;
        }
        Point2::new(cx / 4.0, cy / 4.0)
    }

    /// Tight axis-aligned bounds.
    pub fn bounding_rect(&self) -> Rect {
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for p in &self.corners {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Signed shoelace area (positive for clockwise winding in y-down images).
    pub fn signed_area(&self) -> f32 {
        let mut acc = 0.0;
        for k in 0..4 {
            let a = self.corners[k];
            let b = self.corners[(k + 1) % 4];
            acc += a.x * b.y - b.x * a.y;
        }
        0.5 * acc
    }
}
