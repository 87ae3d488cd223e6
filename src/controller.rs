//! Current slide position and the autoplay timer.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No slides; navigation is a no-op.
    Idle,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Next,
    Prev,
    Jump,
    Autoplay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideChange {
    pub from: usize,
    pub to: usize,
    pub cause: Navigation,
}

/// The single autoplay timer, held as a deadline.
#[derive(Debug)]
struct AutoplayTimer {
    interval: Option<Duration>,
    deadline: Option<Instant>,
    generation: u64,
}

impl AutoplayTimer {
    fn stop(&mut self) {
        if self.deadline.take().is_some() {
            debug!(generation = self.generation, "autoplay stopped");
        }
    }

    fn start(&mut self, len: usize, now: Instant) {
        self.stop();
        match self.interval {
            Some(interval) if len > 1 => match now.checked_add(interval) {
                Some(deadline) => {
                    self.generation += 1;
                    self.deadline = Some(deadline);
                    debug!(
                        generation = self.generation,
                        interval_ms = interval.as_millis() as u64,
                        "autoplay started"
                    );
                }
                None => warn!(
                    interval = %humantime::format_duration(interval),
                    "autoplay interval out of range; autoplay stays off"
                ),
            },
            _ => debug!(len, "autoplay disabled or not enough slides"),
        }
    }
}

/// Owns the current slide position and the autoplay timer.
///
/// Every navigation stops autoplay before it mutates the index and re-arms
/// it afterwards, so the next tick is always a full interval away from a
/// manual step.
#[derive(Debug)]
pub struct SlideController {
    current: usize,
    len: usize,
    autoplay: AutoplayTimer,
    suspended: bool,
}

impl SlideController {
    /// `autoplay` of `None` or zero disables timed advancement.
    pub fn new(autoplay: Option<Duration>) -> Self {
        Self {
            current: 0,
            len: 0,
            autoplay: AutoplayTimer {
                interval: autoplay.filter(|d| !d.is_zero()),
                deadline: None,
                generation: 0,
            },
            suspended: false,
        }
    }

    pub fn state(&self) -> ControllerState {
        if self.len == 0 {
            ControllerState::Idle
        } else {
            ControllerState::Active
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// When the next autoplay tick is due, if one is armed.
    pub fn autoplay_deadline(&self) -> Option<Instant> {
        self.autoplay.deadline
    }

    /// Number of times autoplay has been armed.
    pub fn autoplay_generation(&self) -> u64 {
        self.autoplay.generation
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Adopt a rebuilt sequence of `len` slides and restart from the first.
    pub fn set_sequence(&mut self, len: usize, now: Instant) {
        self.autoplay.stop();
        self.len = len;
        self.current = 0;
        debug!(len, "slide sequence replaced");
        self.restart_autoplay(now);
    }

    pub fn next(&mut self, now: Instant) -> Option<SlideChange> {
        self.step(Navigation::Next, now)
    }

    pub fn prev(&mut self, now: Instant) -> Option<SlideChange> {
        self.step(Navigation::Prev, now)
    }

    /// Show slide `index`; out-of-range requests are logged and ignored.
    pub fn jump_to(&mut self, index: usize, now: Instant) -> Option<SlideChange> {
        if index >= self.len {
            warn!(index, len = self.len, "attempted to show invalid slide index");
            return None;
        }
        self.autoplay.stop();
        let from = self.current;
        self.current = index;
        self.restart_autoplay(now);
        Some(SlideChange {
            from,
            to: index,
            cause: Navigation::Jump,
        })
    }

    /// Advance if the autoplay deadline has passed.
    pub fn on_tick(&mut self, now: Instant) -> Option<SlideChange> {
        match self.autoplay.deadline {
            Some(deadline) if deadline <= now => self.step(Navigation::Autoplay, now),
            _ => None,
        }
    }

    /// Hold autoplay while a drag session is open.
    pub fn suspend(&mut self) {
        self.suspended = true;
        self.autoplay.stop();
    }

    pub fn resume(&mut self, now: Instant) {
        self.suspended = false;
        self.restart_autoplay(now);
    }

    /// Cancel autoplay for teardown.
    pub fn stop(&mut self) {
        self.suspended = false;
        self.autoplay.stop();
    }

    fn step(&mut self, cause: Navigation, now: Instant) -> Option<SlideChange> {
        self.autoplay.stop();
        let change = if self.len == 0 {
            self.current = 0;
            None
        } else {
            let from = self.current;
            self.current = match cause {
                Navigation::Prev => (from + self.len - 1) % self.len,
                _ => (from + 1) % self.len,
            };
            debug!(from, to = self.current, ?cause, "slide changed");
            Some(SlideChange {
                from,
                to: self.current,
                cause,
            })
        };
        self.restart_autoplay(now);
        change
    }

    fn restart_autoplay(&mut self, now: Instant) {
        if self.suspended {
            return;
        }
        self.autoplay.start(self.len, now);
    }
}
