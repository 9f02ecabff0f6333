use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::DecodeError;

/// Binary mask; any non-zero sample belongs to the object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl SegmentMask {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, DecodeError> {
        let mask = Self {
            width,
            height,
            data,
        };
        mask.validate()?;
        Ok(mask)
    }

    pub fn validate(&self) -> Result<(), DecodeError> {
        let expected = self
            .width
            .checked_mul(self.height)
            .ok_or(DecodeError::MaskTooLarge {
                width: self.width,
                height: self.height,
            })?;
        if self.data.len() != expected {
            return Err(DecodeError::MaskSize {
                width: self.width,
                height: self.height,
                expected,
                got: self.data.len(),
            });
        }
        Ok(())
    }

    /// Number of object pixels.
    pub fn area(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Centroid from first-order moments, `None` for an empty or inconsistent mask.
    pub fn centroid(&self) -> Option<Point2<f32>> {
        self.validate().ok()?;
        let (mut m00, mut m10, mut m01) = (0u64, 0u64, 0u64);
        for (y, row) in self.data.chunks_exact(self.width.max(1)).enumerate() {
            for (x, &v) in row.iter().enumerate() {
                if v != 0 {
                    m00 += 1;
                    m10 += x as u64;
                    m01 += y as u64;
                }
            }
        }
        (m00 > 0).then(|| Point2::new(m10 as f32 / m00 as f32, m01 as f32 / m00 as f32))
    }
}

/// One segmented object: an explicit centroid, a mask, or both.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub centroid: Option<Point2<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<SegmentMask>,
}

impl SegmentObject {
    pub fn from_centroid(centroid: Point2<f32>) -> Self {
        Self {
            centroid: Some(centroid),
            mask: None,
        }
    }

    pub fn from_mask(mask: SegmentMask) -> Self {
        Self {
            centroid: None,
            mask: Some(mask),
        }
    }

    /// Explicit centroid, else the mask's.
    pub fn center(&self) -> Option<Point2<f32>> {
        self.centroid
            .or_else(|| self.mask.as_ref().and_then(SegmentMask::centroid))
    }
}
