//! Zero-mean normalized cross-correlation over every valid template offset.
//!
//! Window sums and sums of squares come from integer integral images, and the
//! template statistics are computed once per [`TemplatePlan`], so each offset
//! only pays for the cross term. All sums are exact integers; the score is
//! formed in `f64` at the end:
//!
//! ```text
//! score = (n·ΣTI − ΣT·ΣI) / sqrt((n·ΣT² − (ΣT)²) · (n·ΣI² − (ΣI)²))
//! ```
//!
//! The cross term is computed directly, so a pass costs `O(W·H·w·h)`
//! multiply-adds: about 5·10⁹ for a 200×200 template on a 640×480 frame.
//! Keep templates small when frames arrive at video rate.

use objtrack_core::GrayImageView;

/// Best-scoring offset of a correlation pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchPeak {
    pub x: usize,
    pub y: usize,
    pub score: f32,
}

/// Summed-area tables of pixel values and squared values.
pub struct IntegralImage {
    stride: usize,
    sum: Vec<u64>,
    sum_sq: Vec<u64>,
}

impl IntegralImage {
    pub fn new(img: &GrayImageView<'_>) -> Self {
        let stride = img.width + 1;
        let mut sum = vec![0u64; stride * (img.height + 1)];
        let mut sum_sq = vec![0u64; stride * (img.height + 1)];
        for y in 0..img.height {
            let mut row = 0u64;
            let mut row_sq = 0u64;
            for (x, &v) in img.row(y).iter().enumerate() {
                let v = v as u64;
                row += v;
                row_sq += v * v;
                let i = (y + 1) * stride + x + 1;
                sum[i] = sum[i - stride] + row;
                sum_sq[i] = sum_sq[i - stride] + row_sq;
            }
        }
        Self {
            stride,
            sum,
            sum_sq,
        }
    }

    /// `(Σv, Σv²)` over the `w × h` window at `(x, y)`.
    #[inline]
    pub fn window(&self, x: usize, y: usize, w: usize, h: usize) -> (u64, u64) {
        let s = self.stride;
        let (a, b) = (y * s + x, y * s + x + w);
        let (c, d) = ((y + h) * s + x, (y + h) * s + x + w);
        (
            self.sum[d] + self.sum[a] - self.sum[b] - self.sum[c],
            self.sum_sq[d] + self.sum_sq[a] - self.sum_sq[b] - self.sum_sq[c],
        )
    }
}

/// Precomputed template statistics.
pub struct TemplatePlan<'a> {
    tpl: GrayImageView<'a>,
    n: i128,
    sum: i128,
    var: i128,
    flat_tolerance: f64,
}

impl<'a> TemplatePlan<'a> {
    /// `None` for an empty template.
    pub fn new(tpl: GrayImageView<'a>, flat_tolerance: f32) -> Option<Self> {
        if tpl.is_empty() {
            return None;
        }
        let n = (tpl.width * tpl.height) as i128;
        let sum: i128 = tpl.data.iter().map(|&v| v as i128).sum();
        let sum_sq: i128 = tpl.data.iter().map(|&v| (v as i128) * (v as i128)).sum();
        Some(Self {
            tpl,
            n,
            sum,
            var: n * sum_sq - sum * sum,
            flat_tolerance: flat_tolerance as f64,
        })
    }

    pub fn width(&self) -> usize {
        self.tpl.width
    }

    pub fn height(&self) -> usize {
        self.tpl.height
    }

    /// Score of the window at `(x, y)`; the window must lie inside `img`.
    pub fn score_at(&self, img: &GrayImageView<'_>, integral: &IntegralImage, x: usize, y: usize) -> f32 {
        let (w, h) = (self.tpl.width, self.tpl.height);
        let (win_sum, win_sq) = integral.window(x, y, w, h);
        let (win_sum, win_sq) = (win_sum as i128, win_sq as i128);
        let win_var = self.n * win_sq - win_sum * win_sum;

        if self.var == 0 || win_var == 0 {
            let both_flat = self.var == 0 && win_var == 0;
            let mean_diff = (self.sum - win_sum) as f64 / self.n as f64;
            return if both_flat && mean_diff.abs() <= self.flat_tolerance {
                1.0
            } else {
                0.0
            };
        }

        let mut cross: u64 = 0;
        for ty in 0..h {
            let t_row = self.tpl.row(ty);
            let i_row = &img.row(y + ty)[x..x + w];
            cross += t_row
                .iter()
                .zip(i_row)
                .map(|(&t, &i)| t as u64 * i as u64)
                .sum::<u64>();
        }

        let num = (self.n * cross as i128 - self.sum * win_sum) as f64;
        let den = ((self.var as f64) * (win_var as f64)).sqrt();
        (num / den).clamp(-1.0, 1.0) as f32
    }

    /// Global maximum over all offsets, first in raster order on ties.
    ///
    /// `None` when the template does not fit inside `img`.
    pub fn best_match(&self, img: &GrayImageView<'_>) -> Option<MatchPeak> {
        let (w, h) = (self.tpl.width, self.tpl.height);
        if w > img.width || h > img.height {
            return None;
        }

        let integral = IntegralImage::new(img);
        let mut best: Option<MatchPeak> = None;
        for y in 0..=img.height - h {
            for x in 0..=img.width - w {
                let score = self.score_at(img, &integral, x, y);
                if best.map_or(true, |b| score > b.score) {
                    best = Some(MatchPeak { x, y, score });
                }
            }
        }
        best
    }
}
