//! Dictionary metadata and packed marker codes.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::BackendUnavailable;

#[derive(thiserror::Error, Debug)]
pub enum DictionaryError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A square fiducial dictionary (ArUco-style).
///
/// Dictionaries are data: load them from JSON shaped like
/// `{"name": "...", "marker_size": 6, "max_correction_bits": 5, "codes": [..]}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    /// Human-readable name (for debugging/logging).
    pub name: String,
    /// Marker side length (number of inner bits per side).
    pub marker_size: usize,
    /// Maximum error-correcting Hamming distance supported by the dictionary.
    #[serde(default)]
    pub max_correction_bits: u8,
    /// One `u64` per marker id, encoding the inner `marker_size × marker_size` bits.
    ///
    /// Bits are stored in row-major order with **black = 1**.
    pub codes: Vec<u64>,
}

impl Dictionary {
    /// Total number of inner bits per marker.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }

    /// Load a dictionary from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DictionaryError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Check that the dictionary can back a detector.
    pub fn validate(&self) -> Result<(), BackendUnavailable> {
        if self.codes.is_empty() || self.marker_size == 0 {
            return Err(BackendUnavailable::EmptyDictionary {
                name: self.name.clone(),
            });
        }
        let bits = self.bit_count();
        if bits > 64 {
            return Err(BackendUnavailable::UnsupportedMarkerSize {
                name: self.name.clone(),
                bits,
            });
        }
        Ok(())
    }
}
