//! Mode state machine that dispatches each frame to the active strategy.

use log::info;
use objtrack_core::{DetectionResult, Frame, FrameView, PixelRect, Rect};
use objtrack_marker::MarkerCascade;
use objtrack_segment::{
    JsonSegmentationDecoder, SegmentationDecoder, SegmentationParams, SegmentationTracker,
};
use objtrack_template::{Template, TemplateParams, TemplateTracker};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{TemplateSink, TrackerConfig, TrackingMode};

/// Result of one [`TrackingEngine::process_frame`] call.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameOutcome {
    pub result: DetectionResult,
    /// Copy of the input with the strategy's annotations drawn on it.
    pub annotated: Frame,
}

/// Everything that is discarded on a mode switch.
#[derive(Debug)]
struct Session {
    mode: TrackingMode,
    template: TemplateTracker,
    segmentation: Option<SegmentationTracker>,
}

impl Session {
    fn new(mode: TrackingMode, template: &TemplateParams) -> Self {
        Self {
            mode,
            template: TemplateTracker::new(template.clone()),
            segmentation: None,
        }
    }
}

pub struct TrackingEngine {
    cascade: MarkerCascade,
    template_params: TemplateParams,
    segmentation_params: SegmentationParams,
    decoder: Box<dyn SegmentationDecoder>,
    session: Session,
}

impl Default for TrackingEngine {
    fn default() -> Self {
        Self::new(&TrackerConfig::default())
    }
}

impl TrackingEngine {
    /// Build the marker cascade once and start a session in `config.mode`.
    pub fn new(config: &TrackerConfig) -> Self {
        let cascade = MarkerCascade::new(&config.marker);
        info!(
            "marker stages: [{}], starting in {} mode",
            cascade.available_stages().join(", "),
            config.mode
        );
        Self {
            cascade,
            template_params: config.template.clone(),
            segmentation_params: config.segmentation.clone(),
            decoder: Box::new(JsonSegmentationDecoder),
            session: Session::new(config.mode, &config.template),
        }
    }

    /// Replace the segmentation payload decoder.
    pub fn with_decoder<D: SegmentationDecoder + 'static>(mut self, decoder: D) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    pub fn mode(&self) -> TrackingMode {
        self.session.mode
    }

    /// Switch mode. Always starts a fresh session, even for the current mode.
    pub fn set_mode(&mut self, mode: TrackingMode) {
        info!("tracking mode {} -> {mode}", self.session.mode);
        self.session = Session::new(mode, &self.template_params);
    }

    /// Capture a template from `frame`. Used by markerless mode until the next mode switch.
    pub fn set_template(&mut self, rect: Rect, frame: &FrameView<'_>) -> PixelRect {
        self.session.template.set_template(rect, frame)
    }

    pub fn has_template(&self) -> bool {
        self.session.template.has_template()
    }

    pub fn template(&self) -> Option<&Template> {
        self.session.template.template()
    }

    /// Decode `payload` for segmentation mode. Undecodable payloads yield the stub tracker.
    pub fn load_segmentation_data(&mut self, payload: &[u8]) {
        self.session.segmentation = None;
        let tracker = SegmentationTracker::from_payload(payload, self.decoder.as_ref());
        self.session.segmentation = Some(tracker);
    }

    pub fn segmentation(&self) -> Option<&SegmentationTracker> {
        self.session.segmentation.as_ref()
    }

    pub fn cascade(&self) -> &MarkerCascade {
        &self.cascade
    }

    /// Run the active strategy on `src`.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all, fields(mode = %self.session.mode, w = src.width(), h = src.height())))]
    pub fn process_frame(&self, src: &FrameView<'_>) -> FrameOutcome {
        let mut annotated = src.to_owned_frame();
        if src.is_empty() {
            return FrameOutcome {
                result: DetectionResult::not_found(),
                annotated,
            };
        }

        let result = match self.session.mode {
            TrackingMode::Marker => self.cascade.detect_and_annotate(src, &mut annotated),
            TrackingMode::Markerless => self.session.template.track(src, &mut annotated),
            TrackingMode::Segmentation => match &self.session.segmentation {
                Some(tracker) => tracker.track(src, &mut annotated, &self.segmentation_params),
                None => DetectionResult::not_found(),
            },
        };
        FrameOutcome { result, annotated }
    }
}

impl TemplateSink for TrackingEngine {
    fn set_template(&mut self, rect: Rect, frame: &FrameView<'_>) {
        TrackingEngine::set_template(self, rect, frame);
    }
}
