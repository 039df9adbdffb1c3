// Double-click disambiguation: {Idle, Armed(target, t)} state machine

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use super::object::ObjectId;

/// Default window in which a second click on the same object means "edit".
pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(300);

/// Monotonic time source for click timing.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-advanced clock; clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickState {
    Idle,
    Armed { target: ObjectId, at: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickKind {
    /// Ordinary click: select or start a drag.
    Single,
    /// Second click on the same object inside the window.
    Double,
}

/// Classifies primary-button presses on placed marks.
///
/// A press on a mark arms the tracker; a press on the same mark strictly
/// inside the window is a double click and disarms it (so a third press
/// starts over). A press on anything else disarms.
#[derive(Debug, Clone)]
pub struct ClickTracker {
    state: ClickState,
    window: Duration,
}

impl Default for ClickTracker {
    fn default() -> Self {
        Self::new(DOUBLE_CLICK_WINDOW)
    }
}

impl ClickTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            state: ClickState::Idle,
            window,
        }
    }

    pub fn state(&self) -> ClickState {
        self.state
    }

    /// Feed one press. `target` is the placed mark under the pointer, or
    /// `None` for the background or empty canvas.
    pub fn press(&mut self, target: Option<ObjectId>, now: Duration) -> ClickKind {
        let Some(target) = target else {
            self.state = ClickState::Idle;
            return ClickKind::Single;
        };

        match self.state {
            ClickState::Armed { target: armed, at }
                if armed == target && now.saturating_sub(at) < self.window =>
            {
                self.state = ClickState::Idle;
                ClickKind::Double
            }
            _ => {
                self.state = ClickState::Armed { target, at: now };
                ClickKind::Single
            }
        }
    }

    /// Forget any armed target (e.g. the canvas was cleared).
    pub fn reset(&mut self) {
        self.state = ClickState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ObjectId = ObjectId(1);
    const B: ObjectId = ObjectId(2);

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_second_press_inside_window_is_double() {
        let mut tracker = ClickTracker::default();
        assert_eq!(tracker.press(Some(A), ms(0)), ClickKind::Single);
        assert_eq!(tracker.press(Some(A), ms(299)), ClickKind::Double);
        assert_eq!(tracker.state(), ClickState::Idle);
    }

    #[test]
    fn test_press_at_window_edge_rearms() {
        let mut tracker = ClickTracker::default();
        tracker.press(Some(A), ms(0));
        assert_eq!(tracker.press(Some(A), ms(300)), ClickKind::Single);
        assert_eq!(
            tracker.state(),
            ClickState::Armed {
                target: A,
                at: ms(300)
            }
        );
    }

    #[test]
    fn test_different_target_rearms() {
        let mut tracker = ClickTracker::default();
        tracker.press(Some(A), ms(0));
        assert_eq!(tracker.press(Some(B), ms(50)), ClickKind::Single);
        assert_eq!(tracker.press(Some(B), ms(100)), ClickKind::Double);
    }

    #[test]
    fn test_background_press_disarms() {
        let mut tracker = ClickTracker::default();
        tracker.press(Some(A), ms(0));
        tracker.press(None, ms(10));
        assert_eq!(tracker.press(Some(A), ms(20)), ClickKind::Single);
    }

    #[test]
    fn test_triple_press_is_double_then_single() {
        let mut tracker = ClickTracker::default();
        tracker.press(Some(A), ms(0));
        assert_eq!(tracker.press(Some(A), ms(100)), ClickKind::Double);
        assert_eq!(tracker.press(Some(A), ms(200)), ClickKind::Single);
    }
}
