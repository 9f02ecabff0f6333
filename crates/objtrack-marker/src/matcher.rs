//! Dictionary matching and rotation helpers.

use crate::{BackendUnavailable, Dictionary};

/// A dictionary match for an observed marker code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    /// Marker id (index into the dictionary codes).
    pub id: u32,
    /// Rotation `0..=3` such that `observed == rotate(dict_code, rotation)`.
    pub rotation: u8,
    /// Hamming distance between observed and dictionary code (after rotation).
    pub hamming: u8,
}

/// Brute-force matcher over all ids and the four rotations of each.
#[derive(Clone, Debug)]
pub struct Matcher {
    dict: Dictionary,
    max_hamming: u8,
    rotated: Vec<[u64; 4]>,
}

impl Matcher {
    /// Build a matcher; fails when the dictionary cannot back a detector.
    pub fn new(dict: Dictionary, max_hamming: u8) -> Result<Self, BackendUnavailable> {
        dict.validate()?;

        let n = dict.marker_size;
        let rotated = dict
            .codes
            .iter()
            .map(|&base| [0, 1, 2, 3].map(|rot| rotate_code_u64(base, n, rot)))
            .collect();

        Ok(Self {
            dict,
            max_hamming,
            rotated,
        })
    }

    #[inline]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    #[inline]
    pub fn max_hamming(&self) -> u8 {
        self.max_hamming
    }

    /// Best match within `max_hamming`; ties keep the lowest id and rotation.
    pub fn match_code(&self, observed: u64) -> Option<Match> {
        let mut best: Option<Match> = None;

        for (id, rots) in self.rotated.iter().enumerate() {
            for (rot, &cand) in rots.iter().enumerate() {
                let h = (observed ^ cand).count_ones() as u8;
                if h > self.max_hamming {
                    continue;
                }
                if best.map_or(true, |prev| h < prev.hamming) {
                    best = Some(Match {
                        id: id as u32,
                        rotation: rot as u8,
                        hamming: h,
                    });
                    if h == 0 {
                        return best;
                    }
                }
            }
        }

        best
    }
}

/// Rotate a code stored in row-major bits: `idx = y * N + x`.
pub fn rotate_code_u64(code: u64, n: usize, rot: u8) -> u64 {
    let rot = rot & 3;
    if rot == 0 {
        return code;
    }

    let mut out = 0u64;
    for y in 0..n {
        for x in 0..n {
            let (sx, sy) = match rot {
                1 => (y, n - 1 - x),
                2 => (n - 1 - x, n - 1 - y),
                _ => (n - 1 - y, x),
            };
            out |= ((code >> (sy * n + sx)) & 1) << (y * n + x);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict_4x4() -> Dictionary {
        Dictionary {
            name: "test_4x4".into(),
            marker_size: 4,
            max_correction_bits: 1,
            codes: vec![0b1011_0010_0111_0001, 0b0110_1001_1100_0011],
        }
    }

    #[test]
    fn rotate_four_times_is_identity() {
        let code = 0x0123_4567_89ab_cdef_u64;
        let r = (0..4).fold(code, |c, _| rotate_code_u64(c, 8, 1));
        assert_eq!(code, r);
    }

    #[test]
    fn matcher_finds_rotated_code() {
        let dict = dict_4x4();
        let base = dict.codes[1];
        let matcher = Matcher::new(dict, 0).expect("matcher");

        let observed = rotate_code_u64(base, 4, 3);
        let m = matcher.match_code(observed).expect("match");
        assert_eq!(m.id, 1);
        assert_eq!(rotate_code_u64(base, 4, m.rotation), observed);
        assert_eq!(m.hamming, 0);
    }

    #[test]
    fn matcher_respects_hamming_budget() {
        let dict = dict_4x4();
        let flipped = dict.codes[0] ^ 0b1;
        let strict = Matcher::new(dict.clone(), 0).expect("matcher");
        let tolerant = Matcher::new(dict, 1).expect("matcher");

        assert!(strict.match_code(flipped).is_none());
        let m = tolerant.match_code(flipped).expect("match");
        assert_eq!((m.id, m.hamming), (0, 1));
    }

    #[test]
    fn empty_dictionary_is_rejected() {
        let dict = Dictionary {
            codes: Vec::new(),
            ..dict_4x4()
        };
        assert!(matches!(
            Matcher::new(dict, 0),
            Err(BackendUnavailable::EmptyDictionary { .. })
        ));
    }
}
