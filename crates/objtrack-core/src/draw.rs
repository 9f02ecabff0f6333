//! Annotation primitives used to mark detections on output frames.
//!
//! Shapes are clipped against the frame first and then rasterised with
//! `imageproc::drawing` on an `image` buffer wrapping the frame's samples.

use image::{ImageBuffer, Luma, Pixel, Rgb, Rgba};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::{Frame, PixelFormat, Polygon4, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub [u8; 3]);

impl Color {
    pub const GREEN: Color = Color([0, 255, 0]);
    pub const RED: Color = Color([255, 0, 0]);
    pub const CYAN: Color = Color([0, 255, 255]);
    pub const MAGENTA: Color = Color([255, 0, 255]);
    pub const YELLOW: Color = Color([255, 255, 0]);
}

#[derive(Clone, Copy, Debug)]
enum Shape {
    Segment((f32, f32), (f32, f32)),
    Disc((i32, i32), i32),
}

/// Straight segment, `thickness` parallel one-pixel strokes wide.
pub fn draw_line(frame: &mut Frame, p0: Point2<f32>, p1: Point2<f32>, color: Color, thickness: u32) {
    let shapes = strokes(frame, p0, p1, thickness);
    render(frame, &shapes, color);
}

pub fn draw_polygon(frame: &mut Frame, poly: &Polygon4, color: Color, thickness: u32) {
    let c = &poly.corners;
    let shapes: Vec<Shape> = (0..4)
        .flat_map(|k| strokes(frame, c[k], c[(k + 1) % 4], thickness))
        .collect();
    render(frame, &shapes, color);
}

/// Outline of `rect`, inclusive of its far edge.
pub fn draw_rect(frame: &mut Frame, rect: &Rect, color: Color, thickness: u32) {
    draw_polygon(frame, &rect.to_polygon(), color, thickness);
}

/// Disc of `radius` pixels; skipped when it cannot touch the frame.
pub fn fill_circle(frame: &mut Frame, center: Point2<f32>, radius: f32, color: Color) {
    let (w, h) = (frame.width() as f32, frame.height() as f32);
    let r = if radius.is_finite() { radius.max(0.0).min(w + h) } else { 0.0 };
    let (cx, cy) = (center.x.round(), center.y.round());
    if !(cx >= -r && cx < w + r && cy >= -r && cy < h + r) {
        return;
    }
    render(frame, &[Shape::Disc((cx as i32, cy as i32), r.round() as i32)], color);
}

/// One segment per stroke, offset along the normal and clipped to the frame.
fn strokes(frame: &Frame, p0: Point2<f32>, p1: Point2<f32>, thickness: u32) -> Vec<Shape> {
    let t = thickness.max(1) as i32;
    let dir = p1 - p0;
    let normal = if dir.norm() > f32::EPSILON {
        Vector2::new(-dir.y, dir.x) / dir.norm()
    } else {
        Vector2::new(1.0, 0.0)
    };
    let lo = -(t - 1) / 2;
    (lo..lo + t)
        .filter_map(|k| {
            let off = normal * k as f32;
            clip_segment(frame, p0 + off, p1 + off)
        })
        .map(|(a, b)| Shape::Segment((a.x.round(), a.y.round()), (b.x.round(), b.y.round())))
        .collect()
}

/// Liang-Barsky clip against the frame, padded by one pixel.
fn clip_segment(frame: &Frame, p0: Point2<f32>, p1: Point2<f32>) -> Option<(Point2<f32>, Point2<f32>)> {
    let p0 = p0.cast::<f64>();
    let p1 = p1.cast::<f64>();
    if !(p0.x.is_finite() && p0.y.is_finite() && p1.x.is_finite() && p1.y.is_finite()) {
        return None;
    }
    let (x_max, y_max) = (frame.width() as f64, frame.height() as f64);
    let d = p1 - p0;
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for (p, q) in [
        (-d.x, p0.x + 1.0),
        (d.x, x_max - p0.x),
        (-d.y, p0.y + 1.0),
        (d.y, y_max - p0.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some(((p0 + d * t0).cast::<f32>(), (p0 + d * t1).cast::<f32>()))
}

fn render(frame: &mut Frame, shapes: &[Shape], color: Color) {
    if shapes.is_empty() {
        return;
    }
    let (Ok(w), Ok(h)) = (u32::try_from(frame.width()), u32::try_from(frame.height())) else {
        return;
    };
    let [r, g, b] = color.0;
    let data = std::mem::take(frame.samples_mut());
    let painted = match frame.format() {
        PixelFormat::Gray => paint(w, h, data, Luma([crate::frame::luma(r, g, b)]), shapes),
        PixelFormat::Rgb => paint(w, h, data, Rgb([r, g, b]), shapes),
        PixelFormat::Rgba => paint(w, h, data, Rgba([r, g, b, 255]), shapes),
    };
    *frame.samples_mut() = painted;
}

fn paint<P>(w: u32, h: u32, data: Vec<u8>, px: P, shapes: &[Shape]) -> Vec<u8>
where
    P: Pixel<Subpixel = u8>,
{
    // The frame guarantees `data.len() == w * h * channels`.
    let Some(mut img) = ImageBuffer::<P, Vec<u8>>::from_raw(w, h, data) else {
        return Vec::new();
    };
    for shape in shapes {
        match *shape {
            Shape::Segment(a, b) => draw_line_segment_mut(&mut img, a, b, px),
            Shape::Disc(c, r) => draw_filled_circle_mut(&mut img, c, r, px),
        }
    }
    img.into_raw()
}
