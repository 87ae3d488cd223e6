//! The carousel component: one slide sequence, one index controller and one
//! gesture interpreter, kept consistent with each other.

use std::time::Instant;

use tracing::{debug, info};

use crate::builder::SlideSequence;
use crate::clock::Clock;
use crate::config::Configuration;
use crate::controller::{SlideChange, SlideController};
use crate::events::Command;
use crate::gesture::{
    CaptureFlag, GestureInterpreter, GestureOutcome, PointerCapture, PointerEvent,
    SwipeDirection, TrackStyle,
};
use crate::render::{Frame, RenderSettings, project};

#[derive(Debug)]
pub struct Carousel<C = CaptureFlag> {
    sequence: SlideSequence,
    controller: SlideController,
    gestures: GestureInterpreter,
    track: TrackStyle,
    capture: C,
    settings: RenderSettings,
    clock: Clock,
}

impl Carousel<CaptureFlag> {
    pub fn new(cfg: &Configuration, clock: Clock) -> Self {
        Self::with_capture(cfg, clock, CaptureFlag::default())
    }
}

impl<C: PointerCapture> Carousel<C> {
    pub fn with_capture(cfg: &Configuration, clock: Clock, capture: C) -> Self {
        Self {
            sequence: SlideSequence::empty(),
            controller: SlideController::new(cfg.autoplay_interval()),
            gestures: GestureInterpreter::new(cfg.swipe_threshold),
            track: TrackStyle::default(),
            capture,
            settings: cfg.render_settings(),
            clock,
        }
    }

    pub fn sequence(&self) -> &SlideSequence {
        &self.sequence
    }

    pub fn controller(&self) -> &SlideController {
        &self.controller
    }

    pub fn capture(&self) -> &C {
        &self.capture
    }

    pub fn is_dragging(&self) -> bool {
        self.gestures.is_dragging()
    }

    pub fn autoplay_deadline(&self) -> Option<Instant> {
        self.controller.autoplay_deadline()
    }

    /// Swap in a rebuilt sequence and start over from its first slide.
    pub fn set_sequence(&mut self, sequence: SlideSequence, now: Instant) {
        self.cancel_drag(now);
        info!(slides = sequence.len(), "showing new slide sequence");
        self.controller.set_sequence(sequence.len(), now);
        self.sequence = sequence;
    }

    pub fn next(&mut self, now: Instant) -> Option<SlideChange> {
        self.controller.next(now)
    }

    pub fn prev(&mut self, now: Instant) -> Option<SlideChange> {
        self.controller.prev(now)
    }

    pub fn jump_to(&mut self, index: usize, now: Instant) -> Option<SlideChange> {
        self.controller.jump_to(index, now)
    }

    /// Advance on autoplay if it is due.
    pub fn tick(&mut self, now: Instant) -> Option<SlideChange> {
        self.controller.on_tick(now)
    }

    pub fn pointer(&mut self, event: PointerEvent, now: Instant) -> GestureOutcome {
        let outcome = self
            .gestures
            .handle(event, &mut self.track, &mut self.capture);
        match outcome {
            GestureOutcome::Started => self.controller.suspend(),
            GestureOutcome::Swipe(direction) => {
                let change = match direction {
                    SwipeDirection::Next => self.controller.next(now),
                    SwipeDirection::Prev => self.controller.prev(now),
                };
                debug!(?direction, ?change, "swipe committed");
                self.controller.resume(now);
            }
            GestureOutcome::SnapBack => self.controller.resume(now),
            GestureOutcome::Dragging { .. } | GestureOutcome::Ignored => {}
        }
        outcome
    }

    /// Apply a navigation or gesture command. Returns whether the visible
    /// state may have changed.
    pub fn apply(&mut self, command: &Command, now: Instant) -> bool {
        match command {
            Command::Next => self.next(now).is_some(),
            Command::Prev => self.prev(now).is_some(),
            Command::JumpTo(index) => self.jump_to(*index, now).is_some(),
            Command::Pointer(event) => self.pointer(*event, now) != GestureOutcome::Ignored,
            Command::Reload | Command::Shutdown => false,
        }
    }

    pub fn frame(&self) -> Frame {
        project(
            &self.sequence,
            self.controller.current(),
            &self.track,
            &self.settings,
            &self.clock,
        )
    }

    /// Stop autoplay and close any open drag, releasing pointer capture.
    pub fn teardown(&mut self) {
        if self.gestures.is_dragging() {
            self.gestures
                .handle(PointerEvent::Cancel, &mut self.track, &mut self.capture);
        }
        self.capture.release();
        self.controller.stop();
        debug!("carousel torn down");
    }

    fn cancel_drag(&mut self, now: Instant) {
        if self.gestures.is_dragging() {
            self.pointer(PointerEvent::Cancel, now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::PointerButton;
    use crate::photo::{RawPhotoDescriptor, normalize};
    use std::time::Duration;

    fn carousel(len: usize) -> (Carousel, Instant) {
        let cfg = Configuration::default();
        let clock = cfg.clock();
        let mut carousel = Carousel::new(&cfg, clock);
        let photos: Vec<_> = (0..len)
            .map(|i| normalize(RawPhotoDescriptor::new(format!("{i}.jpg")), &clock))
            .collect();
        let now = Instant::now();
        carousel.set_sequence(photos.into(), now);
        (carousel, now)
    }

    #[test]
    fn drag_holds_autoplay_until_release() {
        let (mut c, t0) = carousel(3);
        assert!(c.autoplay_deadline().is_some());
        c.pointer(PointerEvent::mouse_down(PointerButton::Primary, 300.0), t0);
        assert!(c.autoplay_deadline().is_none());
        assert!(c.capture().is_held());

        c.pointer(PointerEvent::Move { x: 200.0 }, t0);
        let frame = c.frame();
        assert_eq!(frame.track.unwrap().drag_offset_px, Some(-100.0));

        let t1 = t0 + Duration::from_millis(800);
        c.pointer(PointerEvent::End { x: 200.0 }, t1);
        assert_eq!(c.controller().current(), 1);
        assert!(!c.capture().is_held());
        assert_eq!(c.autoplay_deadline(), Some(t1 + Duration::from_millis(5000)));
        assert_eq!(c.frame().track.unwrap().drag_offset_px, None);
    }

    #[test]
    fn small_drag_keeps_slide() {
        let (mut c, t0) = carousel(3);
        c.pointer(PointerEvent::touch_start(100.0), t0);
        c.pointer(PointerEvent::End { x: 60.0 }, t0);
        assert_eq!(c.controller().current(), 0);
        assert!(c.autoplay_deadline().is_some());
    }

    #[test]
    fn teardown_releases_everything() {
        let (mut c, t0) = carousel(4);
        c.pointer(PointerEvent::mouse_down(PointerButton::Primary, 10.0), t0);
        c.teardown();
        assert!(!c.is_dragging());
        assert!(!c.capture().is_held());
        assert!(c.autoplay_deadline().is_none());
    }

    #[test]
    fn new_sequence_interrupts_drag() {
        let (mut c, t0) = carousel(4);
        c.jump_to(2, t0).unwrap();
        c.pointer(PointerEvent::mouse_down(PointerButton::Primary, 10.0), t0);
        let (fresh, _) = carousel(2);
        c.set_sequence(fresh.sequence().clone(), t0);
        assert!(!c.is_dragging());
        assert!(!c.capture().is_held());
        assert_eq!(c.controller().current(), 0);
        assert!(c.autoplay_deadline().is_some());
    }
}
