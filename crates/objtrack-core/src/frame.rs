//! Interleaved 8-bit video frames and their grayscale conversion.

use serde::{Deserialize, Serialize};

use crate::{GrayImage, GrayImageView, PixelRect};

/// Sample layout of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Gray,
    Rgb,
    Rgba,
}

impl PixelFormat {
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }

    pub fn from_channels(channels: usize) -> Option<Self> {
        match channels {
            1 => Some(PixelFormat::Gray),
            3 => Some(PixelFormat::Rgb),
            4 => Some(PixelFormat::Rgba),
            _ => None,
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum FrameError {
    #[error("invalid frame buffer length (expected {expected} bytes, got {got})")]
    InvalidBuffer { expected: usize, got: usize },

    #[error("invalid frame dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },

    #[error("unsupported channel count {0} (expected 1, 3 or 4)")]
    UnsupportedChannels(usize),
}

fn expected_len(width: usize, height: usize, format: PixelFormat) -> Result<usize, FrameError> {
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(format.channels()))
        .ok_or(FrameError::InvalidDimensions { width, height })
}

/// Borrowed frame, row-major, channels interleaved.
#[derive(Clone, Copy, Debug)]
pub struct FrameView<'a> {
    width: usize,
    height: usize,
    format: PixelFormat,
    data: &'a [u8],
}

impl<'a> FrameView<'a> {
    pub fn new(
        width: usize,
        height: usize,
        format: PixelFormat,
        data: &'a [u8],
    ) -> Result<Self, FrameError> {
        let expected = expected_len(width, height, format)?;
        if data.len() != expected {
            return Err(FrameError::InvalidBuffer {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Build from a channel count instead of a [`PixelFormat`].
    pub fn from_channels(
        width: usize,
        height: usize,
        channels: usize,
        data: &'a [u8],
    ) -> Result<Self, FrameError> {
        let format =
            PixelFormat::from_channels(channels).ok_or(FrameError::UnsupportedChannels(channels))?;
        Self::new(width, height, format, data)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.format.channels()
    }

    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Borrow the samples as a grayscale view when the frame is single-channel.
    pub fn as_gray(&self) -> Option<GrayImageView<'a>> {
        (self.format == PixelFormat::Gray).then_some(GrayImageView {
            width: self.width,
            height: self.height,
            data: self.data,
        })
    }

    /// Luma conversion (BT.601, 14-bit fixed point); single-channel data is copied unchanged.
    pub fn to_gray(&self) -> GrayImage {
        let data = match self.format {
            PixelFormat::Gray => self.data.to_vec(),
            PixelFormat::Rgb | PixelFormat::Rgba => self
                .data
                .chunks_exact(self.channels())
                .map(|px| luma(px[0], px[1], px[2]))
                .collect(),
        };
        GrayImage {
            width: self.width,
            height: self.height,
            data,
        }
    }

    /// Copy a sub-rectangle keeping the pixel format. `rect` must lie inside the frame.
    pub fn crop(&self, rect: PixelRect) -> Frame {
        let ch = self.channels();
        let stride = self.width * ch;
        let mut data = Vec::with_capacity(rect.area() * ch);
        for y in rect.y..rect.y + rect.height {
            let start = y * stride + rect.x * ch;
            data.extend_from_slice(&self.data[start..start + rect.width * ch]);
        }
        Frame {
            width: rect.width,
            height: rect.height,
            format: self.format,
            data,
        }
    }

    pub fn to_owned_frame(&self) -> Frame {
        Frame {
            width: self.width,
            height: self.height,
            format: self.format,
            data: self.data.to_vec(),
        }
    }
}

/// Owned frame; used for annotated output and captured patches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    format: PixelFormat,
    data: Vec<u8>,
}

impl Frame {
    pub fn new(
        width: usize,
        height: usize,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, FrameError> {
        FrameView::new(width, height, format, &data)?;
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Frame filled with a single value in every channel.
    pub fn filled(width: usize, height: usize, format: PixelFormat, value: u8) -> Self {
        Self {
            width,
            height,
            format,
            data: vec![value; width * height * format.channels()],
        }
    }

    #[inline]
    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            width: self.width,
            height: self.height,
            format: self.format,
            data: &self.data,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Sample buffer; its length must stay `width * height * channels`.
    #[inline]
    pub(crate) fn samples_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Samples of the pixel at `(x, y)`.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let ch = self.format.channels();
        let i = (y * self.width + x) * ch;
        &self.data[i..i + ch]
    }

    /// Paint an axis-aligned block with one value in every channel (test/synthesis helper).
    pub fn fill_rect(&mut self, rect: PixelRect, value: u8) {
        let ch = self.format.channels();
        let x1 = (rect.x + rect.width).min(self.width);
        let y1 = (rect.y + rect.height).min(self.height);
        for y in rect.y.min(y1)..y1 {
            let start = (y * self.width + rect.x.min(x1)) * ch;
            let end = (y * self.width + x1) * ch;
            self.data[start..end].fill(value);
        }
    }
}

#[inline]
pub(crate) fn luma(r: u8, g: u8, b: u8) -> u8 {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    ((R * r as u32 + G * g as u32 + B * b as u32 + (1 << 13)) >> 14) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_buffer_length() {
        let data = vec![0u8; 10];
        let err = FrameView::new(2, 2, PixelFormat::Rgb, &data).unwrap_err();
        assert_eq!(
            err,
            FrameError::InvalidBuffer {
                expected: 12,
                got: 10
            }
        );
        assert!(matches!(
            FrameView::from_channels(2, 2, 2, &data),
            Err(FrameError::UnsupportedChannels(2))
        ));
    }

    #[test]
    fn gray_conversion_is_idempotent_for_every_format() {
        let gray: Vec<u8> = (0..12).map(|v| v * 20).collect();
        let rgb: Vec<u8> = gray.iter().flat_map(|&v| [v, v, v]).collect();
        let rgba: Vec<u8> = gray.iter().flat_map(|&v| [v, v, v, 255]).collect();

        for (format, data) in [
            (PixelFormat::Gray, &gray),
            (PixelFormat::Rgb, &rgb),
            (PixelFormat::Rgba, &rgba),
        ] {
            let view = FrameView::new(4, 3, format, data).expect("frame");
            let once = view.to_gray();
            let again = FrameView::new(4, 3, PixelFormat::Gray, &once.data)
                .expect("gray frame")
                .to_gray();
            assert_eq!(once, again, "{format:?}");
            assert_eq!(once.data, gray, "{format:?}");
        }
    }

    #[test]
    fn luma_weights_match_bt601() {
        assert_eq!(luma(255, 0, 0), 76);
        assert_eq!(luma(0, 255, 0), 150);
        assert_eq!(luma(0, 0, 255), 29);
        assert_eq!(luma(255, 255, 255), 255);
    }

    #[test]
    fn crop_keeps_channels() {
        let data: Vec<u8> = (0..4 * 4 * 3).map(|v| v as u8).collect();
        let view = FrameView::new(4, 4, PixelFormat::Rgb, &data).expect("frame");
        let patch = view.crop(PixelRect::new(1, 1, 2, 2));
        assert_eq!(patch.width(), 2);
        assert_eq!(patch.pixel(0, 0), &[15, 16, 17]);
        assert_eq!(patch.pixel(1, 1), &[30, 31, 32]);
    }
}
