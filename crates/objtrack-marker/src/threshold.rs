//! Global thresholding: Otsu level selection and inverse binarization.

use objtrack_core::GrayImageView;

/// Otsu threshold over a set of sample intensities.
pub(crate) fn otsu_threshold_from_samples(samples: &[u8]) -> u8 {
    let mut hist = [0u32; 256];
    for &v in samples {
        hist[usize::from(v)] += 1;
    }
    otsu_from_histogram(&hist)
}

/// Otsu threshold of a whole image.
pub fn otsu_threshold(img: &GrayImageView<'_>) -> u8 {
    otsu_threshold_from_samples(img.data)
}

/// Level maximizing the between-class variance of `value <= t` against the rest.
///
/// Empty histograms give 127, a single level gives itself and two levels give
/// their midpoint.
fn otsu_from_histogram(hist: &[u32; 256]) -> u8 {
    let occupied = || hist.iter().enumerate().filter(|&(_, &h)| h > 0).map(|(v, _)| v);
    let (Some(lo), Some(hi)) = (occupied().next(), occupied().last()) else {
        return 127;
    };
    if lo == hi {
        return lo as u8;
    }
    if occupied().count() <= 2 {
        return ((lo + hi) / 2) as u8;
    }

    let total: u64 = hist.iter().map(|&h| u64::from(h)).sum();
    let weighted: u64 = hist
        .iter()
        .enumerate()
        .map(|(v, &h)| v as u64 * u64::from(h))
        .sum();

    let (mut below, mut below_sum) = (0u64, 0u64);
    let mut best = (f64::NEG_INFINITY, 127u8);
    for (t, &h) in hist.iter().enumerate() {
        below += u64::from(h);
        below_sum += t as u64 * u64::from(h);
        if below == 0 {
            continue;
        }
        let above = total - below;
        if above == 0 {
            break;
        }
        let gap = below_sum as f64 / below as f64 - (weighted - below_sum) as f64 / above as f64;
        let between = below as f64 * above as f64 * gap * gap;
        if between > best.0 {
            best = (between, t as u8);
        }
    }
    best.1
}

/// Binary image where dark pixels (`value <= threshold`) are foreground.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryMask {
    pub width: usize,
    pub height: usize,
    /// Row-major, `1` for foreground and `0` for background.
    pub data: Vec<u8>,
}

impl BinaryMask {
    /// Inverse binary threshold: pixels above `threshold` become background.
    pub fn threshold_inv(img: &GrayImageView<'_>, threshold: u8) -> Self {
        let data = img.data.iter().map(|&v| u8::from(v <= threshold)).collect();
        Self {
            width: img.width,
            height: img.height,
            data,
        }
    }

    #[inline]
    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.data[y * self.width + x] != 0
    }
}
