//! Conversions between `image` buffers and the core frame types.

use image::{ImageReader, Rgba, RgbaImage};
use objtrack_core::{Frame, FrameError, FrameView, GrayImageView, PixelFormat};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum InteropError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Borrow an `image::GrayImage` as a core grayscale view.
pub fn gray_view(img: &image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Borrow an RGBA image as a frame.
pub fn rgba_frame_view(img: &RgbaImage) -> Result<FrameView<'_>, FrameError> {
    FrameView::new(
        img.width() as usize,
        img.height() as usize,
        PixelFormat::Rgba,
        img.as_raw(),
    )
}

/// Borrow a grayscale image as a single-channel frame.
pub fn gray_frame_view(img: &image::GrayImage) -> Result<FrameView<'_>, FrameError> {
    FrameView::new(
        img.width() as usize,
        img.height() as usize,
        PixelFormat::Gray,
        img.as_raw(),
    )
}

/// Expand any frame to RGBA (gray is replicated, alpha is opaque).
pub fn frame_to_rgba(frame: &Frame) -> RgbaImage {
    let ch = frame.format().channels();
    let width = frame.width();
    RgbaImage::from_fn(frame.width() as u32, frame.height() as u32, |x, y| {
        let i = (y as usize * width + x as usize) * ch;
        let px = &frame.data()[i..i + ch];
        match frame.format() {
            PixelFormat::Gray => Rgba([px[0], px[0], px[0], 255]),
            PixelFormat::Rgb => Rgba([px[0], px[1], px[2], 255]),
            PixelFormat::Rgba => Rgba([px[0], px[1], px[2], px[3]]),
        }
    })
}

/// Decode an image file into an owned RGBA frame.
pub fn load_frame(path: impl AsRef<Path>) -> Result<Frame, InteropError> {
    let img = ImageReader::open(path)?.decode()?.to_rgba8();
    let (w, h) = (img.width() as usize, img.height() as usize);
    Ok(Frame::new(w, h, PixelFormat::Rgba, img.into_raw())?)
}

/// Encode a frame; the format follows the file extension.
pub fn save_frame(frame: &Frame, path: impl AsRef<Path>) -> Result<(), InteropError> {
    frame_to_rgba(frame).save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use objtrack_core::PixelRect;

    #[test]
    fn rgba_view_shares_dimensions() {
        let img = RgbaImage::from_pixel(7, 5, Rgba([10, 20, 30, 255]));
        let view = rgba_frame_view(&img).expect("view");
        assert_eq!((view.width(), view.height(), view.channels()), (7, 5, 4));
        assert_eq!(view.to_gray().data.len(), 35);
    }

    #[test]
    fn gray_views_borrow_samples() {
        let img = image::GrayImage::from_fn(4, 3, |x, y| image::Luma([(x + 4 * y) as u8]));
        assert_eq!(gray_view(&img).data, img.as_raw().as_slice());
        let frame = gray_frame_view(&img).expect("view");
        assert_eq!(frame.as_gray().expect("gray").data[11], 11);
    }

    #[test]
    fn gray_frame_expands_to_opaque_rgba() {
        let mut frame = Frame::filled(3, 2, PixelFormat::Gray, 0);
        frame.fill_rect(PixelRect::new(1, 1, 1, 1), 200);
        let rgba = frame_to_rgba(&frame);
        assert_eq!(rgba.get_pixel(1, 1), &Rgba([200, 200, 200, 255]));
        assert_eq!(rgba.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn save_then_load_keeps_pixels() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("frame.png");
        let mut data = vec![40u8; 16 * 8 * 3];
        data[(2 * 16 + 3) * 3..][..3].copy_from_slice(&[255, 0, 0]);
        let frame = Frame::new(16, 8, PixelFormat::Rgb, data).expect("frame");
        save_frame(&frame, &path).expect("save");

        let loaded = load_frame(&path).expect("load");
        assert_eq!(loaded.format(), PixelFormat::Rgba);
        assert_eq!(loaded.pixel(3, 2), &[255, 0, 0, 255]);
        assert_eq!(loaded.pixel(0, 0), &[40, 40, 40, 255]);
    }
}
