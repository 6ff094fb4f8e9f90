/// Hold time that turns a press into a long press.
pub const LONG_PRESS_MS: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture<T> {
    Click(T),
    LongPress(T),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Press<T> {
    Idle,
    Pressed { target: T, since: f64 },
}

/// Click vs long press on a target, polled from the frame loop instead of
/// a timeout.
///
/// ┌───────────────────────────────────────────────────────┐
/// │  Idle ── press ──► Pressed                            │
/// │  Pressed ── poll, held ≥ 500 ms ──► LongPress → Idle  │
/// │  Pressed ── release, held < 500 ms ──► Click → Idle   │
/// │  Idle ── release ──► nothing                          │
/// └───────────────────────────────────────────────────────┘
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressTracker<T> {
    state: Press<T>,
}

impl<T> Default for PressTracker<T> {
    fn default() -> Self {
        PressTracker { state: Press::Idle }
    }
}

impl<T: Copy> PressTracker<T> {
    pub fn press(&mut self, target: T, now_ms: f64) {
        self.state = Press::Pressed {
            target,
            since: now_ms,
        };
    }

    /// Fires the long press once the hold time has passed.
    pub fn poll(&mut self, now_ms: f64) -> Option<Gesture<T>> {
        match self.state {
            Press::Pressed { target, since } if now_ms - since >= LONG_PRESS_MS => {
                self.state = Press::Idle;
                Some(Gesture::LongPress(target))
            }
            _ => None,
        }
    }

    pub fn release(&mut self, now_ms: f64) -> Option<Gesture<T>> {
        let gesture = match self.state {
            Press::Idle => None,
            // released before a frame got to poll it
            Press::Pressed { target, since } if now_ms - since >= LONG_PRESS_MS => {
                Some(Gesture::LongPress(target))
            }
            Press::Pressed { target, .. } => Some(Gesture::Click(target)),
        };
        self.state = Press::Idle;
        gesture
    }

    pub fn cancel(&mut self) {
        self.state = Press::Idle;
    }

    pub fn is_pressed(&self) -> bool {
        matches!(self.state, Press::Pressed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_press_is_a_click() {
        let mut tracker = PressTracker::default();
        tracker.press(7, 1_000.0);
        assert_eq!(tracker.poll(1_200.0), None);
        assert_eq!(tracker.release(1_300.0), Some(Gesture::Click(7)));
        assert!(!tracker.is_pressed());
    }

    #[test]
    fn holding_fires_the_long_press_once() {
        let mut tracker = PressTracker::default();
        tracker.press(3, 0.0);
        assert_eq!(tracker.poll(LONG_PRESS_MS), Some(Gesture::LongPress(3)));
        assert_eq!(tracker.poll(LONG_PRESS_MS + 16.0), None);
        // the release after a long press does nothing
        assert_eq!(tracker.release(900.0), None);
    }

    #[test]
    fn late_release_without_a_poll_is_still_a_long_press() {
        let mut tracker = PressTracker::default();
        tracker.press('a', 0.0);
        assert_eq!(tracker.release(650.0), Some(Gesture::LongPress('a')));
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut tracker = PressTracker::<u32>::default();
        assert_eq!(tracker.release(10.0), None);
        tracker.press(1, 0.0);
        tracker.cancel();
        assert_eq!(tracker.release(10.0), None);
    }
}
