use log::{debug, info};
use objtrack_core::{
    draw::{draw_rect, fill_circle},
    Color, DetectionResult, Frame, FrameView, Geometry, GrayImage, PixelRect, Rect,
};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::ncc::{MatchPeak, TemplatePlan};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateParams {
    /// A match is reported only when its score is strictly above this.
    pub accept_threshold: f32,
    /// Largest mean difference at which two flat patches still match.
    pub flat_tolerance: f32,
    pub box_thickness: u32,
    pub center_dot_radius: f32,
}

impl Default for TemplateParams {
    fn default() -> Self {
        Self {
            accept_threshold: 0.6,
            flat_tolerance: 1.0,
            box_thickness: 2,
            center_dot_radius: 5.0,
        }
    }
}

impl TemplateParams {
    #[inline]
    pub fn accepts(&self, score: f32) -> bool {
        score > self.accept_threshold
    }
}

/// Grayscale patch captured from a frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    source: PixelRect,
    gray: GrayImage,
}

impl Template {
    /// Crop `rect` (clamped to the frame) and convert it to grayscale.
    pub fn capture(rect: &Rect, frame: &FrameView<'_>) -> Self {
        let source = rect.clamp_to(frame.width(), frame.height());
        let gray = frame.crop(source).view().to_gray();
        Self { source, gray }
    }

    /// Clamped rectangle the patch was copied from.
    pub fn source(&self) -> PixelRect {
        self.source
    }

    pub fn width(&self) -> usize {
        self.gray.width
    }

    pub fn height(&self) -> usize {
        self.gray.height
    }

    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    pub fn is_degenerate(&self) -> bool {
        self.gray.width == 0 || self.gray.height == 0
    }
}

/// Single-template tracker: one full correlation pass per frame.
#[derive(Clone, Debug, Default)]
pub struct TemplateTracker {
    params: TemplateParams,
    template: Option<Template>,
}

impl TemplateTracker {
    pub fn new(params: TemplateParams) -> Self {
        Self {
            params,
            template: None,
        }
    }

    pub fn params(&self) -> &TemplateParams {
        &self.params
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    pub fn has_template(&self) -> bool {
        self.template.is_some()
    }

    /// Capture a new template, replacing the previous one. Returns the clamped rect.
    pub fn set_template(&mut self, rect: Rect, frame: &FrameView<'_>) -> PixelRect {
        self.template = None;
        let template = Template::capture(&rect, frame);
        let source = template.source();
        info!(
            "template set: {}x{} at ({}, {})",
            source.width, source.height, source.x, source.y
        );
        self.template = Some(template);
        source
    }

    pub fn clear(&mut self) {
        self.template = None;
    }

    /// Best offset of the template in `frame`, accepted or not.
    pub fn locate(&self, frame: &FrameView<'_>) -> Option<MatchPeak> {
        let template = self.template.as_ref()?;
        if template.is_degenerate() || frame.is_empty() {
            return None;
        }
        let plan = TemplatePlan::new(template.gray.view(), self.params.flat_tolerance)?;

        let converted: GrayImage;
        let gray = match frame.as_gray() {
            Some(view) => view,
            None => {
                converted = frame.to_gray();
                converted.view()
            }
        };
        plan.best_match(&gray)
    }

    /// Locate the template and, when accepted, draw a box and centre dot on `out`.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all, fields(w = frame.width(), h = frame.height())))]
    pub fn track(&self, frame: &FrameView<'_>, out: &mut Frame) -> DetectionResult {
        let Some(template) = self.template.as_ref() else {
            return DetectionResult::not_found();
        };
        let Some(peak) = self.locate(frame) else {
            debug!(
                "no correlation pass: template {}x{} on frame {}x{}",
                template.width(),
                template.height(),
                frame.width(),
                frame.height()
            );
            return DetectionResult::not_found();
        };
        if !self.params.accepts(peak.score) {
            debug!("best score {:.3} at ({}, {}) rejected", peak.score, peak.x, peak.y);
            return DetectionResult::not_found();
        }

        let rect = Rect::new(
            peak.x as f32,
            peak.y as f32,
            template.width() as f32,
            template.height() as f32,
        );
        draw_rect(out, &rect, Color::CYAN, self.params.box_thickness);
        fill_circle(out, rect.center(), self.params.center_dot_radius, Color::CYAN);

        DetectionResult::found(None, Geometry::Rect(rect)).with_score(peak.score)
    }
}
