//! Registry of every game instance on the page and the per-frame fan out.
//!
//! The browser side (`engine::FrameLoop`) feeds `tick` with the
//! `requestAnimationFrame` timestamp; everything here is plain data so the
//! frame bookkeeping is testable without a browser.

use crate::engine::{Frame, Game, Renderer, MAX_FRAME_DELTA};
use std::cell::RefCell;
use std::rc::Rc;

/// Speed at the very top of the page.
pub const BASE_SPEED: f64 = 1.6;
/// Extra speed gained by scrolling all the way down.
pub const SCROLL_BONUS: f64 = 6.0;

pub type SharedGame = Rc<RefCell<dyn Game>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(pub usize);

struct Slot {
    id: InstanceId,
    game: SharedGame,
    renderer: Option<Renderer>,
    visible: bool,
}

#[derive(Default)]
pub struct Scheduler {
    slots: Vec<Slot>,
    next_id: usize,
    last_frame: Option<f64>,
}

/// Scroll position → swimmer speed. 0 % scrolled gives [`BASE_SPEED`], the
/// bottom of the page gives `BASE_SPEED + SCROLL_BONUS`.
pub fn scroll_speed(scroll_y: f64, scroll_height: f64, viewport_height: f64) -> f64 {
    let total = (scroll_height - viewport_height).max(1.0);
    let progress = (scroll_y / total).clamp(0.0, 1.0);
    BASE_SPEED + progress * SCROLL_BONUS
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler::default()
    }

    /// Add a game. `renderer` is `None` for headless instances (tests) which
    /// are updated but never drawn.
    pub fn register(
        &mut self,
        game: SharedGame,
        renderer: Option<Renderer>,
        visible: bool,
    ) -> InstanceId {
        let id = InstanceId(self.next_id);
        self.next_id += 1;
        self.slots.push(Slot {
            id,
            game,
            renderer,
            visible,
        });
        id
    }

    pub fn unregister(&mut self, id: InstanceId) {
        self.slots.retain(|slot| slot.id != id);
    }

    pub fn set_visible(&mut self, id: InstanceId, visible: bool) {
        if let Some(slot) = self.slots.iter_mut().find(|slot| slot.id == id) {
            slot.visible = visible;
        }
    }

    pub fn is_visible(&self, id: InstanceId) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.id == id && slot.visible)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Compute the next frame without touching any game. The first frame
    /// after construction has a zero delta.
    pub fn advance(&mut self, now_ms: f64, speed: f64) -> Frame {
        let delta = match self.last_frame {
            Some(last) => ((now_ms - last) / 1000.0).clamp(0.0, MAX_FRAME_DELTA),
            None => 0.0,
        };
        self.last_frame = Some(now_ms);
        let mut frame = Frame::new(delta, speed).at(now_ms);
        frame.round_active = self.any_busy();
        frame
    }

    /// Update then draw every visible instance. Hidden ones cost nothing,
    /// unless they are busy: a running round is updated off-screen so it can
    /// end on time, it is just not drawn.
    pub fn tick(&mut self, now_ms: f64, speed: f64) -> Frame {
        let frame = self.advance(now_ms, speed);
        for slot in self.slots.iter() {
            // a listener holding the game this instant just skips one frame
            let Ok(mut game) = slot.game.try_borrow_mut() else {
                continue;
            };
            if !slot.visible && !game.is_busy() {
                continue;
            }
            game.update(&frame);
            if let (true, Some(renderer)) = (slot.visible, &slot.renderer) {
                game.draw(renderer);
            }
        }
        frame
    }

    fn any_busy(&self) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.game.try_borrow().map(|g| g.is_busy()).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[derive(Default)]
    struct Counter {
        updates: usize,
        last_delta: f64,
        busy: bool,
        saw_round: bool,
    }

    impl Game for Counter {
        fn update(&mut self, frame: &Frame) {
            self.updates += 1;
            self.last_delta = frame.delta;
            self.saw_round = frame.round_active;
        }

        fn draw(&self, _renderer: &Renderer) {}

        fn is_busy(&self) -> bool {
            self.busy
        }
    }

    #[test]
    fn hidden_instances_are_skipped() {
        let mut scheduler = Scheduler::new();
        let shown = Rc::new(RefCell::new(Counter::default()));
        let hidden = Rc::new(RefCell::new(Counter::default()));
        scheduler.register(shown.clone(), None, true);
        let hidden_id = scheduler.register(hidden.clone(), None, false);

        scheduler.tick(0.0, BASE_SPEED);
        scheduler.tick(16.0, BASE_SPEED);
        assert_eq!(shown.borrow().updates, 2);
        assert_eq!(hidden.borrow().updates, 0);

        scheduler.set_visible(hidden_id, true);
        scheduler.tick(32.0, BASE_SPEED);
        assert_eq!(hidden.borrow().updates, 1);
    }

    #[test]
    fn busy_instances_keep_updating_off_screen() {
        let mut scheduler = Scheduler::new();
        let round = Rc::new(RefCell::new(Counter {
            busy: true,
            ..Counter::default()
        }));
        scheduler.register(round.clone(), None, false);

        scheduler.tick(0.0, BASE_SPEED);
        assert_eq!(round.borrow().updates, 1);
        round.borrow_mut().busy = false;
        scheduler.tick(16.0, BASE_SPEED);
        assert_eq!(round.borrow().updates, 1);
    }

    #[test]
    fn delta_is_clamped_after_a_long_pause() {
        let mut scheduler = Scheduler::new();
        let game = Rc::new(RefCell::new(Counter::default()));
        scheduler.register(game.clone(), None, true);

        scheduler.tick(1_000.0, BASE_SPEED);
        assert_relative_eq!(game.borrow().last_delta, 0.0);
        scheduler.tick(1_016.0, BASE_SPEED);
        assert_relative_eq!(game.borrow().last_delta, 0.016);
        scheduler.tick(61_016.0, BASE_SPEED);
        assert_relative_eq!(game.borrow().last_delta, MAX_FRAME_DELTA);
    }

    #[test]
    fn busy_games_flag_the_frame_for_everyone() {
        let mut scheduler = Scheduler::new();
        let player = Rc::new(RefCell::new(Counter::default()));
        let overlay = Rc::new(RefCell::new(Counter::default()));
        scheduler.register(player.clone(), None, true);
        scheduler.register(overlay.clone(), None, true);

        scheduler.tick(0.0, BASE_SPEED);
        assert!(!overlay.borrow().saw_round);

        player.borrow_mut().busy = true;
        scheduler.tick(16.0, BASE_SPEED);
        assert!(overlay.borrow().saw_round);
    }

    #[test]
    fn scroll_speed_ramps_with_page_position() {
        assert_relative_eq!(scroll_speed(0.0, 5_000.0, 1_000.0), BASE_SPEED);
        assert_relative_eq!(scroll_speed(2_000.0, 5_000.0, 1_000.0), BASE_SPEED + 3.0);
        assert_relative_eq!(scroll_speed(9_999.0, 5_000.0, 1_000.0), BASE_SPEED + SCROLL_BONUS);
        // page shorter than the viewport
        assert_relative_eq!(scroll_speed(0.0, 500.0, 1_000.0), BASE_SPEED);
    }

    #[test]
    fn unregister_removes_the_slot() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.register(Rc::new(RefCell::new(Counter::default())), None, true);
        assert_eq!(scheduler.len(), 1);
        scheduler.unregister(id);
        assert!(scheduler.is_empty());
        assert!(!scheduler.is_visible(id));
    }
}
