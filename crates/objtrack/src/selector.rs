//! Pointer-driven selection of a template region.
//!
//! [`RegionSelector`] is a two-state machine (`Idle` / `Dragging`). Pointer
//! positions arrive in display space and are mapped into frame space with a
//! [`DisplayScale`]. Releasing a drag whose rectangle is larger than
//! [`SelectorParams::min_size`] on both axes hands the rectangle to a
//! [`TemplateSink`] together with the current frame.

use log::debug;
use nalgebra::Point2;
use objtrack_core::{draw::draw_rect, Color, Frame, FrameView, Rect};
use objtrack_template::TemplateTracker;
use serde::{Deserialize, Serialize};

/// Receiver of an accepted selection.
pub trait TemplateSink {
    fn set_template(&mut self, rect: Rect, frame: &FrameView<'_>);
}

impl TemplateSink for TemplateTracker {
    fn set_template(&mut self, rect: Rect, frame: &FrameView<'_>) {
        TemplateTracker::set_template(self, rect, frame);
    }
}

/// Per-axis factor from display coordinates to frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayScale {
    pub sx: f32,
    pub sy: f32,
}

impl Default for DisplayScale {
    fn default() -> Self {
        Self::identity()
    }
}

impl DisplayScale {
    pub fn identity() -> Self {
        Self { sx: 1.0, sy: 1.0 }
    }

    /// `frame / display` per axis; a zero-sized display axis maps 1:1.
    pub fn new(frame_width: usize, frame_height: usize, display_width: f32, display_height: f32) -> Self {
        let axis = |frame: usize, display: f32| {
            if display > 0.0 {
                frame as f32 / display
            } else {
                1.0
            }
        };
        Self {
            sx: axis(frame_width, display_width),
            sy: axis(frame_height, display_height),
        }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        Point2::new(p.x * self.sx, p.y * self.sy)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorParams {
    /// Both sides must be strictly larger than this (frame pixels).
    pub min_size: f32,
    pub overlay_thickness: u32,
}

impl Default for SelectorParams {
    fn default() -> Self {
        Self {
            min_size: 10.0,
            overlay_thickness: 2,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum SelectionState {
    #[default]
    Idle,
    /// `anchor` and `current` are in frame coordinates.
    Dragging { anchor: Point2<f32>, current: Rect },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SelectionOutcome {
    /// No drag was in progress.
    Ignored,
    /// The drag ended but the rectangle was too small.
    Discarded(Rect),
    /// The rectangle was handed to the sink.
    Accepted(Rect),
}

#[derive(Clone, Debug, Default)]
pub struct RegionSelector {
    params: SelectorParams,
    scale: DisplayScale,
    state: SelectionState,
}

impl RegionSelector {
    pub fn new(params: SelectorParams) -> Self {
        Self {
            params,
            scale: DisplayScale::identity(),
            state: SelectionState::Idle,
        }
    }

    pub fn params(&self) -> &SelectorParams {
        &self.params
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn scale(&self) -> DisplayScale {
        self.scale
    }

    pub fn set_scale(&mut self, scale: DisplayScale) {
        self.scale = scale;
    }

    /// Rectangle of the drag in progress, if any.
    pub fn current_rect(&self) -> Option<Rect> {
        match self.state {
            SelectionState::Dragging { current, .. } => Some(current),
            SelectionState::Idle => None,
        }
    }

    /// Start a drag at display position `p`. Ignored while already dragging.
    pub fn begin_drag(&mut self, p: Point2<f32>) -> bool {
        if matches!(self.state, SelectionState::Dragging { .. }) {
            return false;
        }
        let anchor = self.scale.apply(p);
        self.state = SelectionState::Dragging {
            anchor,
            current: Rect::from_corners(anchor, anchor),
        };
        true
    }

    /// Move the free corner of the drag to display position `p`.
    pub fn update_drag(&mut self, p: Point2<f32>) -> Option<Rect> {
        let SelectionState::Dragging { anchor, current } = &mut self.state else {
            return None;
        };
        *current = Rect::from_corners(*anchor, self.scale.apply(p));
        Some(*current)
    }

    /// Finish the drag at display position `p`; always returns to `Idle`.
    pub fn end_drag<S>(&mut self, p: Point2<f32>, sink: &mut S, frame: &FrameView<'_>) -> SelectionOutcome
    where
        S: TemplateSink + ?Sized,
    {
        let Some(rect) = self.update_drag(p) else {
            return SelectionOutcome::Ignored;
        };
        self.state = SelectionState::Idle;

        let min = self.params.min_size;
        if rect.width > min && rect.height > min {
            sink.set_template(rect, frame);
            SelectionOutcome::Accepted(rect)
        } else {
            debug!(
                "selection {:.1}x{:.1} discarded (min {min})",
                rect.width, rect.height
            );
            SelectionOutcome::Discarded(rect)
        }
    }

    /// Abandon the drag in progress.
    pub fn cancel(&mut self) -> bool {
        let was_dragging = matches!(self.state, SelectionState::Dragging { .. });
        self.state = SelectionState::Idle;
        was_dragging
    }

    /// Outline the drag in progress on `out`.
    pub fn draw_overlay(&self, out: &mut Frame) {
        if let Some(rect) = self.current_rect() {
            draw_rect(out, &rect, Color::YELLOW, self.params.overlay_thickness);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objtrack_core::PixelFormat;

    #[derive(Default)]
    struct Recorder(Vec<Rect>);

    impl TemplateSink for Recorder {
        fn set_template(&mut self, rect: Rect, _: &FrameView<'_>) {
            self.0.push(rect);
        }
    }

    fn p(x: f32, y: f32) -> Point2<f32> {
        Point2::new(x, y)
    }

    #[test]
    fn small_drag_is_discarded() {
        let frame = Frame::filled(64, 64, PixelFormat::Gray, 0);
        let mut sel = RegionSelector::default();
        let mut sink = Recorder::default();

        assert!(sel.begin_drag(p(10.0, 10.0)));
        let out = sel.end_drag(p(12.0, 12.0), &mut sink, &frame.view());
        assert_eq!(out, SelectionOutcome::Discarded(Rect::new(10.0, 10.0, 2.0, 2.0)));
        assert!(sink.0.is_empty());
        assert_eq!(sel.state(), SelectionState::Idle);
    }

    #[test]
    fn drag_is_normalized_and_accepted() {
        let frame = Frame::filled(64, 64, PixelFormat::Gray, 0);
        let mut sel = RegionSelector::default();
        let mut sink = Recorder::default();

        sel.begin_drag(p(30.0, 40.0));
        assert_eq!(sel.update_drag(p(20.0, 20.0)), Some(Rect::new(20.0, 20.0, 10.0, 20.0)));
        let out = sel.end_drag(p(10.0, 10.0), &mut sink, &frame.view());
        assert_eq!(out, SelectionOutcome::Accepted(Rect::new(10.0, 10.0, 20.0, 30.0)));
        assert_eq!(sink.0, vec![Rect::new(10.0, 10.0, 20.0, 30.0)]);
    }

    #[test]
    fn exactly_min_size_is_rejected() {
        let frame = Frame::filled(64, 64, PixelFormat::Gray, 0);
        let mut sel = RegionSelector::default();
        let mut sink = Recorder::default();
        sel.begin_drag(p(0.0, 0.0));
        let out = sel.end_drag(p(10.0, 30.0), &mut sink, &frame.view());
        assert!(matches!(out, SelectionOutcome::Discarded(_)));
    }

    #[test]
    fn display_scale_maps_into_frame_space() {
        let frame = Frame::filled(640, 480, PixelFormat::Gray, 0);
        let mut sel = RegionSelector::default();
        sel.set_scale(DisplayScale::new(640, 480, 320.0, 240.0));
        let mut sink = Recorder::default();

        sel.begin_drag(p(10.0, 10.0));
        let out = sel.end_drag(p(20.0, 30.0), &mut sink, &frame.view());
        assert_eq!(out, SelectionOutcome::Accepted(Rect::new(20.0, 20.0, 20.0, 40.0)));
    }

    #[test]
    fn zero_display_size_is_identity() {
        assert_eq!(DisplayScale::new(640, 480, 0.0, 240.0), DisplayScale { sx: 1.0, sy: 2.0 });
    }

    #[test]
    fn events_in_wrong_state_are_ignored() {
        let frame = Frame::filled(64, 64, PixelFormat::Gray, 0);
        let mut sel = RegionSelector::default();
        let mut sink = Recorder::default();

        assert_eq!(sel.update_drag(p(5.0, 5.0)), None);
        assert_eq!(
            sel.end_drag(p(50.0, 50.0), &mut sink, &frame.view()),
            SelectionOutcome::Ignored
        );
        assert!(!sel.cancel());

        sel.begin_drag(p(1.0, 1.0));
        assert!(!sel.begin_drag(p(40.0, 40.0)));
        assert!(sel.cancel());
        assert_eq!(sel.current_rect(), None);
        assert!(sink.0.is_empty());
    }

    #[test]
    fn overlay_draws_only_while_dragging() {
        let frame = Frame::filled(64, 64, PixelFormat::Rgb, 0);
        let mut sel = RegionSelector::default();
        let mut out = frame.clone();
        sel.draw_overlay(&mut out);
        assert_eq!(out, frame);

        sel.begin_drag(p(10.0, 10.0));
        sel.update_drag(p(40.0, 40.0));
        sel.draw_overlay(&mut out);
        assert_eq!(out.pixel(10, 10), &[255, 255, 0]);
        assert_eq!(out.pixel(25, 25), &[0, 0, 0]);
    }

    #[test]
    fn template_tracker_is_a_sink() {
        let frame = Frame::filled(64, 64, PixelFormat::Gray, 3);
        let mut tracker = TemplateTracker::default();
        let mut sel = RegionSelector::default();
        sel.begin_drag(p(5.0, 5.0));
        sel.end_drag(p(30.0, 30.0), &mut tracker, &frame.view());
        assert!(tracker.has_template());
    }
}
