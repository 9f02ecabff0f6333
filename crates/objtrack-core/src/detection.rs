use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{Polygon4, Rect};

/// Which marker backend produced a detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// Square fiducial decoded against a dictionary.
    Fiducial,
    /// 2D barcode located by its finder patterns.
    Code,
    /// Dark square-ish blob from the contour fallback.
    Contour,
}

/// Shape of a detection in image coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    Quad(Polygon4),
    Rect(Rect),
}

impl Geometry {
    pub fn center(&self) -> Point2<f32> {
        match self {
            Geometry::Quad(p) => p.center(),
            Geometry::Rect(r) => r.center(),
        }
    }

    pub fn bounding_rect(&self) -> Rect {
        match self {
            Geometry::Quad(p) => p.bounding_rect(),
            Geometry::Rect(r) => *r,
        }
    }
}

/// Per-frame outcome of any tracking strategy.
///
/// A result without a detection never carries geometry and a detection always
/// does; the fields are only reachable through the two constructors, and
/// deserialization checks the same rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDetection")]
pub struct DetectionResult {
    found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<MarkerKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    marker_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    score: Option<f32>,
    #[serde(default)]
    placeholder: bool,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum InvalidDetection {
    #[error("a detection must carry geometry")]
    MissingGeometry,
    #[error("a result without a detection cannot carry `{0}`")]
    UnexpectedField(&'static str),
}

#[derive(Deserialize)]
struct RawDetection {
    found: bool,
    #[serde(default)]
    kind: Option<MarkerKind>,
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    marker_id: Option<u32>,
    #[serde(default)]
    score: Option<f32>,
    #[serde(default)]
    placeholder: bool,
}

impl TryFrom<RawDetection> for DetectionResult {
    type Error = InvalidDetection;

    fn try_from(raw: RawDetection) -> Result<Self, Self::Error> {
        if !raw.found {
            let extra = [
                ("kind", raw.kind.is_some()),
                ("geometry", raw.geometry.is_some()),
                ("marker_id", raw.marker_id.is_some()),
                ("score", raw.score.is_some()),
                ("placeholder", raw.placeholder),
            ]
            .into_iter()
            .find_map(|(name, set)| set.then_some(name));
            return match extra {
                Some(name) => Err(InvalidDetection::UnexpectedField(name)),
                None => Ok(Self::not_found()),
            };
        }
        let geometry = raw.geometry.ok_or(InvalidDetection::MissingGeometry)?;
        Ok(Self {
            found: true,
            kind: raw.kind,
            geometry: Some(geometry),
            marker_id: raw.marker_id,
            score: raw.score,
            placeholder: raw.placeholder,
        })
    }
}

impl DetectionResult {
    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn found(kind: Option<MarkerKind>, geometry: Geometry) -> Self {
        Self {
            found: true,
            kind,
            geometry: Some(geometry),
            ..Self::default()
        }
    }

    pub fn with_marker_id(mut self, id: u32) -> Self {
        if self.found {
            self.marker_id = Some(id);
        }
        self
    }

    pub fn with_score(mut self, score: f32) -> Self {
        if self.found {
            self.score = Some(score);
        }
        self
    }

    /// Mark the geometry as a fixed stand-in rather than a measurement.
    pub fn as_placeholder(mut self) -> Self {
        if self.found {
            self.placeholder = true;
        }
        self
    }

    #[inline]
    pub fn is_found(&self) -> bool {
        self.found
    }

    #[inline]
    pub fn kind(&self) -> Option<MarkerKind> {
        self.kind
    }

    #[inline]
    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    pub fn center(&self) -> Option<Point2<f32>> {
        self.geometry.map(|g| g.center())
    }

    #[inline]
    pub fn marker_id(&self) -> Option<u32> {
        self.marker_id
    }

    #[inline]
    pub fn score(&self) -> Option<f32> {
        self.score
    }

    #[inline]
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}
