//! Drag/swipe interpretation over an abstract pointer source.
//!
//! Adapters translate touch or mouse input into [`PointerEvent`]s. The
//! interpreter turns a session of those into live track offsets while the
//! pointer moves and into a single navigation decision on release.

use tracing::debug;

/// Default minimum travel, in pixels, that counts as a swipe.
pub const DEFAULT_SWIPE_THRESHOLD: f64 = 50.0;

/// Transition applied to the track when it is not being dragged.
pub const DEFAULT_TRACK_TRANSITION: &str = "transform 0.5s ease-in-out";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Touch,
    Mouse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
    Other(u16),
}

impl From<u16> for PointerButton {
    fn from(code: u16) -> Self {
        match code {
            0 => Self::Primary,
            1 => Self::Middle,
            2 => Self::Secondary,
            other => Self::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Start {
        kind: PointerKind,
        button: PointerButton,
        x: f64,
    },
    Move {
        x: f64,
    },
    End {
        x: f64,
    },
    /// The session was interrupted before a release was seen.
    Cancel,
}

impl PointerEvent {
    pub fn touch_start(x: f64) -> Self {
        Self::Start {
            kind: PointerKind::Touch,
            button: PointerButton::Primary,
            x,
        }
    }

    pub fn mouse_down(button: PointerButton, x: f64) -> Self {
        Self::Start {
            kind: PointerKind::Mouse,
            button,
            x,
        }
    }
}

/// Tracking that keeps delivering move/end events once the pointer leaves
/// the widget (a window-level listener in a browser host).
pub trait PointerCapture {
    fn acquire(&mut self);
    fn release(&mut self);
}

/// Capture target that only records whether it is held.
#[derive(Debug, Default)]
pub struct CaptureFlag {
    held: bool,
    acquisitions: u64,
}

impl CaptureFlag {
    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn acquisitions(&self) -> u64 {
        self.acquisitions
    }
}

impl PointerCapture for CaptureFlag {
    fn acquire(&mut self) {
        self.held = true;
        self.acquisitions += 1;
        debug!("pointer capture acquired");
    }

    fn release(&mut self) {
        if self.held {
            debug!("pointer capture released");
        }
        self.held = false;
    }
}

/// Visual state of the paging strip that the interpreter manipulates.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackStyle {
    pub transition: String,
    /// Pixels added to the slide position while a drag is in progress.
    pub live_offset: Option<f64>,
}

impl Default for TrackStyle {
    fn default() -> Self {
        Self {
            transition: DEFAULT_TRACK_TRANSITION.to_string(),
            live_offset: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    /// Dragged leftwards; show the following slide.
    Next,
    /// Dragged rightwards; show the preceding slide.
    Prev,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureOutcome {
    Ignored,
    /// A session opened; autoplay must be held until it closes.
    Started,
    Dragging { offset: f64 },
    Swipe(SwipeDirection),
    /// The session closed without a swipe; the current slide stays.
    SnapBack,
}

#[derive(Debug, Clone)]
struct DragSession {
    kind: PointerKind,
    start_x: f64,
    saved_transition: String,
}

#[derive(Debug)]
pub struct GestureInterpreter {
    threshold: f64,
    session: Option<DragSession>,
}

impl Default for GestureInterpreter {
    fn default() -> Self {
        Self::new(DEFAULT_SWIPE_THRESHOLD)
    }
}

impl GestureInterpreter {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            session: None,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn handle(
        &mut self,
        event: PointerEvent,
        track: &mut TrackStyle,
        capture: &mut impl PointerCapture,
    ) -> GestureOutcome {
        match event {
            PointerEvent::Start { kind, button, x } => self.start(kind, button, x, track, capture),
            PointerEvent::Move { x } => match &self.session {
                Some(session) => {
                    let offset = x - session.start_x;
                    track.live_offset = Some(offset);
                    GestureOutcome::Dragging { offset }
                }
                None => GestureOutcome::Ignored,
            },
            PointerEvent::End { x } => match self.close(track, capture) {
                Some(session) => {
                    let diff = session.start_x - x;
                    debug!(start_x = session.start_x, end_x = x, diff, "drag ended");
                    if diff.abs() > self.threshold {
                        if diff > 0.0 {
                            GestureOutcome::Swipe(SwipeDirection::Next)
                        } else {
                            GestureOutcome::Swipe(SwipeDirection::Prev)
                        }
                    } else {
                        GestureOutcome::SnapBack
                    }
                }
                None => GestureOutcome::Ignored,
            },
            PointerEvent::Cancel => match self.close(track, capture) {
                Some(session) => {
                    debug!(kind = ?session.kind, "drag cancelled");
                    GestureOutcome::SnapBack
                }
                None => GestureOutcome::Ignored,
            },
        }
    }

    fn start(
        &mut self,
        kind: PointerKind,
        button: PointerButton,
        x: f64,
        track: &mut TrackStyle,
        capture: &mut impl PointerCapture,
    ) -> GestureOutcome {
        if kind == PointerKind::Mouse && button != PointerButton::Primary {
            debug!(?button, "ignoring non-primary mouse button");
            return GestureOutcome::Ignored;
        }
        if self.session.is_some() {
            debug!(?kind, "drag already in progress; ignoring additional pointer");
            return GestureOutcome::Ignored;
        }
        let saved_transition = std::mem::replace(&mut track.transition, "none".to_string());
        if kind == PointerKind::Mouse {
            capture.acquire();
        }
        debug!(?kind, start_x = x, "drag started");
        self.session = Some(DragSession {
            kind,
            start_x: x,
            saved_transition,
        });
        GestureOutcome::Started
    }

    /// End the open session, if any, undoing everything `start` changed.
    fn close(
        &mut self,
        track: &mut TrackStyle,
        capture: &mut impl PointerCapture,
    ) -> Option<DragSession> {
        let session = self.session.take()?;
        capture.release();
        track.live_offset = None;
        track.transition = session.saved_transition.clone();
        Some(session)
    }
}
