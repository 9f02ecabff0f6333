use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Active tracking strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMode {
    /// Fiducial / 2D-code / contour cascade.
    #[default]
    Marker,
    /// Correlation against a captured template.
    Markerless,
    /// Boxes around decoded segmentation objects.
    #[serde(alias = "sam2")]
    Segmentation,
}

impl TrackingMode {
    pub const ALL: [TrackingMode; 3] = [
        TrackingMode::Marker,
        TrackingMode::Markerless,
        TrackingMode::Segmentation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TrackingMode::Marker => "marker",
            TrackingMode::Markerless => "markerless",
            TrackingMode::Segmentation => "segmentation",
        }
    }
}

impl fmt::Display for TrackingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown tracking mode `{0}` (expected marker, markerless, segmentation or sam2)")]
pub struct ParseModeError(pub String);

impl FromStr for TrackingMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "marker" => Ok(TrackingMode::Marker),
            "markerless" => Ok(TrackingMode::Markerless),
            "segmentation" | "sam2" => Ok(TrackingMode::Segmentation),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}
