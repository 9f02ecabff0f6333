use crate::PixelRect;

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    /// Row-major, `width * height` samples.
    pub data: &'a [u8],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }
}

impl<'a> GrayImageView<'a> {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn row(&self, y: usize) -> &'a [u8] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    /// Copy a sub-rectangle. `rect` must lie inside the image.
    pub fn crop(&self, rect: PixelRect) -> GrayImage {
        let mut data = Vec::with_capacity(rect.area());
        for y in rect.y..rect.y + rect.height {
            data.extend_from_slice(&self.row(y)[rect.x..rect.x + rect.width]);
        }
        GrayImage {
            width: rect.width,
            height: rect.height,
            data,
        }
    }
}

/// Mean of the 3×3 neighbourhood of the pixel containing `(x, y)`.
///
/// `None` when any of the nine pixels falls outside the image.
pub fn sample_mean_3x3(img: &GrayImageView<'_>, x: f32, y: f32) -> Option<u8> {
    let (cx, cy) = (x.floor(), y.floor());
    if cx < 1.0 || cy < 1.0 || cx + 1.0 >= img.width as f32 || cy + 1.0 >= img.height as f32 {
        return None;
    }
    let (cx, cy) = (cx as usize, cy as usize);
    let sum: u32 = (cy - 1..=cy + 1)
        .flat_map(|row| &img.row(row)[cx - 1..=cx + 1])
        .map(|&v| u32::from(v))
        .sum();
    Some((sum / 9) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_copies_rows() {
        let data: Vec<u8> = (0..16).collect();
        let view = GrayImageView {
            width: 4,
            height: 4,
            data: &data,
        };
        let c = view.crop(PixelRect::new(1, 2, 2, 2));
        assert_eq!(c.data, vec![9, 10, 13, 14]);
    }

    #[test]
    fn mean_3x3_rejects_border() {
        let data = [50u8; 9];
        let view = GrayImageView {
            width: 3,
            height: 3,
            data: &data,
        };
        assert_eq!(sample_mean_3x3(&view, 1.2, 1.7), Some(50));
        assert_eq!(sample_mean_3x3(&view, 0.0, 1.0), None);
    }
}
