//! Priority-ordered marker detection with graceful degradation.

use log::{debug, warn};
use objtrack_core::{
    draw::{draw_polygon, draw_rect, fill_circle},
    Color, DetectionResult, Frame, FrameView, Geometry, GrayImage, GrayImageView, MarkerKind,
};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    BackendUnavailable, CodeDetector, CodeParams, ContourFallback, ContourFallbackParams,
    DetectionFailure, FiducialDetector, FiducialParams,
};

/// Radius of the dot drawn at a detection's centre.
pub const CENTER_DOT_RADIUS: f32 = 5.0;

/// One stage's detection, before it becomes a [`DetectionResult`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerHit {
    pub kind: MarkerKind,
    pub geometry: Geometry,
    pub marker_id: Option<u32>,
    pub score: Option<f32>,
}

impl MarkerHit {
    pub fn new(kind: MarkerKind, geometry: Geometry) -> Self {
        Self {
            kind,
            geometry,
            marker_id: None,
            score: None,
        }
    }

    pub fn with_marker_id(mut self, id: u32) -> Self {
        self.marker_id = Some(id);
        self
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    pub fn to_result(&self) -> DetectionResult {
        let mut r = DetectionResult::found(Some(self.kind), self.geometry);
        if let Some(id) = self.marker_id {
            r = r.with_marker_id(id);
        }
        if let Some(score) = self.score {
            r = r.with_score(score);
        }
        r
    }
}

/// A single stage of the cascade.
pub trait MarkerDetector: Send + Sync {
    fn name(&self) -> &'static str;

    fn kind(&self) -> MarkerKind;

    /// `Ok(None)` means "nothing here"; `Err` means the stage could not run on this frame.
    fn detect(&self, gray: &GrayImageView<'_>) -> Result<Option<MarkerHit>, DetectionFailure>;
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerCascadeParams {
    pub fiducial: FiducialParams,
    pub code: CodeParams,
    pub contour: ContourFallbackParams,
}

/// Runs the available stages in order and stops at the first hit.
pub struct MarkerCascade {
    stages: Vec<Box<dyn MarkerDetector>>,
    unavailable: Vec<(MarkerKind, BackendUnavailable)>,
}

impl MarkerCascade {
    /// Probe every stage once; unavailable ones are logged and left out.
    pub fn new(params: &MarkerCascadeParams) -> Self {
        let mut cascade = Self {
            stages: Vec::new(),
            unavailable: Vec::new(),
        };
        cascade.probe(
            MarkerKind::Fiducial,
            FiducialDetector::new(params.fiducial.clone()),
        );
        cascade.probe(MarkerKind::Code, CodeDetector::new(params.code.clone()));
        cascade.probe(
            MarkerKind::Contour,
            ContourFallback::new(params.contour.clone()),
        );
        cascade
    }

    /// Cascade over caller-provided stages, in the given order.
    pub fn from_stages(stages: Vec<Box<dyn MarkerDetector>>) -> Self {
        Self {
            stages,
            unavailable: Vec::new(),
        }
    }

    fn probe<D: MarkerDetector + 'static>(
        &mut self,
        kind: MarkerKind,
        stage: Result<D, BackendUnavailable>,
    ) {
        match stage {
            Ok(d) => self.stages.push(Box::new(d)),
            Err(e) => {
                warn!("{kind:?} marker stage unavailable: {e}");
                self.unavailable.push((kind, e));
            }
        }
    }

    /// Names of the stages that will run, in priority order.
    pub fn available_stages(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn unavailable(&self) -> &[(MarkerKind, BackendUnavailable)] {
        &self.unavailable
    }

    /// First hit of the cascade on a grayscale image.
    pub fn detect_gray(&self, gray: &GrayImageView<'_>) -> Option<MarkerHit> {
        for stage in &self.stages {
            match stage.detect(gray) {
                Ok(Some(hit)) => return Some(hit),
                Ok(None) => {}
                Err(e) => debug!("{} stage failed: {e}", stage.name()),
            }
        }
        None
    }

    /// Detect on `frame` without drawing.
    pub fn detect(&self, frame: &FrameView<'_>) -> DetectionResult {
        if frame.is_empty() {
            return DetectionResult::not_found();
        }
        let converted: GrayImage;
        let gray = match frame.as_gray() {
            Some(view) => view,
            None => {
                converted = frame.to_gray();
                converted.view()
            }
        };
        self.detect_gray(&gray)
            .map_or_else(DetectionResult::not_found, |hit| hit.to_result())
    }

    /// Detect on `frame` and annotate `out` when something is found.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all, fields(w = frame.width(), h = frame.height())))]
    pub fn detect_and_annotate(&self, frame: &FrameView<'_>, out: &mut Frame) -> DetectionResult {
        let result = self.detect(frame);
        annotate(out, &result);
        result
    }
}

/// Draw a marker result: outline by kind plus a centre dot.
pub fn annotate(out: &mut Frame, result: &DetectionResult) {
    let (Some(geometry), Some(kind)) = (result.geometry(), result.kind()) else {
        return;
    };
    let (color, thickness) = match kind {
        MarkerKind::Fiducial => (Color::GREEN, 3),
        MarkerKind::Code => (Color::RED, 3),
        MarkerKind::Contour => (Color::GREEN, 2),
    };
    match geometry {
        Geometry::Quad(poly) => draw_polygon(out, poly, color, thickness),
        Geometry::Rect(rect) => draw_rect(out, rect, color, thickness),
    }
    fill_circle(out, geometry.center(), CENTER_DOT_RADIUS, color);
}
