//! Endless side-scrolling swimmer living in the thin divider strips between
//! page sections. One instance per divider, all driven by the page scheduler.

pub mod obstacle;
pub mod state;

use crate::engine::{Frame, Game, Point, Rect, Renderer, TextStyle};
use obstacle::{Arena, Obstacle, RockKind};
use rand::rngs::StdRng;
use rand::Rng;
use state::{GameOver, Idle, IsAlive, Keys, Running, Step, SwimmerContext, SwimmerState};
use web_sys::HtmlImageElement;

const BUBBLE_COUNT: usize = 10;

/// ┌──────────────── State Transition Flow ──────────────────┐
/// │  From State  →  Event    →  To State                    │
/// ├─────────────────────────────────────────────────────────┤
/// │  Idle        →  Start    →  Running                     │
/// │  Idle        →  Update   →  Running (first frame)       │
/// │  Running     →  Update   →  Running | GameOver          │
/// │  Running     →  Hit      →  Running | GameOver          │
/// │  GameOver    →  Restart  →  Idle (fresh context)        │
/// │  -------        ------                                  │
/// │  any         →  Steer / Resize → same state             │
/// └─────────────────────────────────────────────────────────┘
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start,
    Update(Step),
    Hit,
    Restart,
    /// normalized 0..1 target height
    Steer(f64),
    Resize(Arena),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    GameOver,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SwimmerStateMachine {
    Idle(SwimmerState<Idle>),
    Running(SwimmerState<Running>),
    GameOver(SwimmerState<GameOver>),
}

impl Default for SwimmerStateMachine {
    fn default() -> Self {
        SwimmerStateMachine::Idle(SwimmerState::new(Arena::default()))
    }
}

impl From<SwimmerState<Idle>> for SwimmerStateMachine {
    fn from(state: SwimmerState<Idle>) -> Self {
        SwimmerStateMachine::Idle(state)
    }
}

impl From<SwimmerState<Running>> for SwimmerStateMachine {
    fn from(state: SwimmerState<Running>) -> Self {
        SwimmerStateMachine::Running(state)
    }
}

impl From<SwimmerState<GameOver>> for SwimmerStateMachine {
    fn from(state: SwimmerState<GameOver>) -> Self {
        SwimmerStateMachine::GameOver(state)
    }
}

impl From<IsAlive> for SwimmerStateMachine {
    fn from(is_alive: IsAlive) -> Self {
        match is_alive {
            IsAlive::Swimming(running) => running.into(),
            IsAlive::Caught(over) => over.into(),
        }
    }
}

impl SwimmerStateMachine {
    pub fn new(arena: Arena) -> Self {
        SwimmerState::new(arena).into()
    }

    // consumes self: the old state can't be observed after a transition
    pub fn transition(self, event: Event, rng: &mut impl Rng) -> Self {
        use SwimmerStateMachine as M;
        match (self, event) {
            (M::Idle(state), Event::Start) => state.start().into(),
            (M::Idle(state), Event::Update(step)) => state.start().update(&step, rng).into(),
            (M::Running(state), Event::Update(step)) => state.update(&step, rng).into(),
            (M::Running(state), Event::Hit) => state.hit().into(),
            (M::GameOver(state), Event::Restart) => state.restart().into(),
            (M::Idle(state), Event::Steer(y)) => state.steer(y).into(),
            (M::Running(state), Event::Steer(y)) => state.steer(y).into(),
            (M::Idle(state), Event::Resize(arena)) => state.resize(arena).into(),
            (M::Running(state), Event::Resize(arena)) => state.resize(arena).into(),
            (M::GameOver(state), Event::Resize(arena)) => state.resize(arena).into(),
            // everything else (e.g. Hit while GameOver) keeps the state
            (state, _) => state,
        }
    }

    pub fn context(&self) -> &SwimmerContext {
        match self {
            SwimmerStateMachine::Idle(state) => state.context(),
            SwimmerStateMachine::Running(state) => state.context(),
            SwimmerStateMachine::GameOver(state) => state.context(),
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            SwimmerStateMachine::Idle(_) => Phase::Idle,
            SwimmerStateMachine::Running(_) => Phase::Running,
            SwimmerStateMachine::GameOver(_) => Phase::GameOver,
        }
    }
}

/// Decorative bubble in normalized coordinates.
#[derive(Debug, Clone, PartialEq)]
struct Bubble {
    x: f64,
    y: f64,
    radius: f64,
    rise: f64,
}

impl Bubble {
    fn random(rng: &mut impl Rng) -> Self {
        Bubble {
            x: rng.gen(),
            y: rng.gen(),
            radius: 0.6 + rng.gen::<f64>() * 1.6,
            rise: 0.02 + rng.gen::<f64>() * 0.06,
        }
    }

    fn update(&mut self, dt: f64, drift: f64, rng: &mut impl Rng) {
        self.y -= self.rise * dt * 30.0;
        self.x -= drift * dt * (0.4 + rng.gen::<f64>() * 0.2);
        if self.y < -0.05 {
            self.y = 1.0 + rng.gen::<f64>() * 0.1;
            self.x = rng.gen();
        }
        if self.x < -0.05 {
            self.x = 1.0 + rng.gen::<f64>() * 0.05;
        }
    }
}

pub struct SwimmerGame {
    machine: SwimmerStateMachine,
    rng: StdRng,
    keys: Keys,
    bubbles: Vec<Bubble>,
    sprite: Option<HtmlImageElement>,
    /// seconds of animation time, drives bobbing and streaks
    clock: f64,
}

impl SwimmerGame {
    pub fn new(arena: Arena, mut rng: StdRng) -> Self {
        let bubbles = (0..BUBBLE_COUNT).map(|_| Bubble::random(&mut rng)).collect();
        SwimmerGame {
            machine: SwimmerStateMachine::new(arena),
            rng,
            keys: Keys::default(),
            bubbles,
            sprite: None,
            clock: 0.0,
        }
    }

    fn send(&mut self, event: Event) {
        let machine = std::mem::take(&mut self.machine);
        self.machine = machine.transition(event, &mut self.rng);
    }

    pub fn start(&mut self) {
        self.send(Event::Start);
    }

    pub fn resize(&mut self, width: f64, height: f64, dpr: f64, viewport_width: f64) {
        let arena = Arena {
            width,
            height,
            dpr,
            viewport_width,
            ..self.context().arena
        };
        self.send(Event::Resize(arena));
    }

    /// Pointer / touch: `y` in canvas pixels.
    pub fn steer_to(&mut self, y: f64) {
        let height = self.context().arena.height.max(1.0);
        self.send(Event::Steer(y / height));
    }

    /// Returns whether the key is one the swimmer reacts to.
    pub fn key(&mut self, key: &str, pressed: bool) -> bool {
        match key {
            "ArrowUp" => self.keys.up = pressed,
            "ArrowDown" => self.keys.down = pressed,
            _ => return false,
        }
        true
    }

    /// Any click restarts a finished run.
    pub fn click(&mut self) {
        if self.phase() == Phase::GameOver {
            tracing::debug!(score = self.score(), "swimmer restart");
            self.send(Event::Restart);
        }
    }

    pub fn hit(&mut self) {
        self.send(Event::Hit);
    }

    /// Use a loaded image for the fish; its aspect ratio resizes the hitbox.
    pub fn set_sprite(&mut self, image: HtmlImageElement) {
        let (w, h) = (image.natural_width(), image.natural_height());
        if w > 0 && h > 0 {
            let arena = self.context().arena.with_fish_aspect(w as f64 / h as f64);
            self.send(Event::Resize(arena));
        }
        self.sprite = Some(image);
    }

    pub fn context(&self) -> &SwimmerContext {
        self.machine.context()
    }

    pub fn phase(&self) -> Phase {
        self.machine.phase()
    }

    pub fn score(&self) -> u32 {
        self.context().score
    }

    pub fn lives(&self) -> u8 {
        self.context().lives
    }

    fn draw_rock(&self, renderer: &Renderer, rock: &Obstacle) {
        let Rect {
            x,
            y,
            width: w,
            height: h,
        } = rock.bounds;
        let color = if rock.hit { "#e74c3c" } else { "#5d6d7e" };
        let points = match rock.kind {
            RockKind::Top => vec![
                Point { x, y },
                Point { x: x + w, y },
                Point { x: x + w * 0.85, y: y + h * 0.9 },
                Point { x: x + w * 0.5, y: y + h },
                Point { x: x + w * 0.15, y: y + h * 0.8 },
            ],
            RockKind::Bottom => vec![
                Point { x, y: y + h },
                Point { x: x + w * 0.1, y: y + h * 0.25 },
                Point { x: x + w * 0.45, y },
                Point { x: x + w * 0.9, y: y + h * 0.2 },
                Point { x: x + w, y: y + h },
            ],
            RockKind::Mid => vec![
                Point { x: x + w * 0.2, y },
                Point { x: x + w * 0.8, y: y + h * 0.05 },
                Point { x: x + w, y: y + h * 0.5 },
                Point { x: x + w * 0.75, y: y + h },
                Point { x: x + w * 0.15, y: y + h * 0.9 },
                Point { x, y: y + h * 0.45 },
            ],
        };
        renderer.fill_polygon(&points, color);
    }

    fn draw_fish(&self, renderer: &Renderer) {
        let fish = self.context().fish_box();
        let bob = (self.clock * 3.0).sin() * fish.height * 0.03;
        let center_y = fish.y + fish.height * 0.5 + bob;
        let yaw = (self.clock * 6.0).sin() * 0.08;

        if let Some(image) = &self.sprite {
            // mirrored so the fish faces the rocks
            let origin = Point {
                x: fish.right(),
                y: center_y,
            };
            renderer.transformed(origin, (-1.0, 1.0), yaw, |r| {
                r.draw_image(
                    image,
                    &Rect::new(0.0, -fish.height * 0.5, fish.width, fish.height),
                )
            });
            return;
        }

        let (w, h) = (fish.width, fish.height);
        let origin = Point {
            x: fish.x + w * 0.55,
            y: center_y,
        };
        let tail_swing = (self.clock * 6.0).sin() * h * 0.1;
        renderer.transformed(origin, (1.0, 1.0), 0.0, |r| {
            r.fill_ellipse(Point::default(), w * 0.55, h * 0.35, "#006994");
            r.fill_polygon(
                &[
                    Point { x: w * 0.5, y: 0.0 },
                    Point { x: w * 0.75, y: -h * 0.18 + tail_swing },
                    Point { x: w * 0.75, y: h * 0.18 + tail_swing },
                ],
                "#4ECDC4",
            );
            r.stroke_curve(
                Point { x: -w * 0.1, y: -h * 0.15 },
                Point { x: w * 0.02, y: -h * 0.4 },
                Point { x: w * 0.12, y: -h * 0.15 },
                "rgba(78,205,196,0.9)",
                (h * 0.05).max(1.0),
            );
            let eye = Point {
                x: -w * 0.35,
                y: -h * 0.1,
            };
            r.fill_circle(eye, h * 0.06, "#fff");
            r.fill_circle(eye, h * 0.03, "#003A5C");
        });
    }
}

impl Game for SwimmerGame {
    fn update(&mut self, frame: &Frame) {
        self.clock += frame.delta;
        let step = Step {
            delta: frame.delta,
            speed: frame.speed,
            keys: self.keys,
        };

        let drift = self.context().scroll_distance(&step) / self.context().arena.width.max(1.0);
        for bubble in self.bubbles.iter_mut() {
            bubble.update(frame.delta, drift, &mut self.rng);
        }

        self.send(Event::Update(step));
    }

    fn draw(&self, renderer: &Renderer) {
        let context = self.context();
        let Arena {
            width: w,
            height: h,
            dpr,
            ..
        } = context.arena;
        let area = Rect::new(0.0, 0.0, w, h);

        renderer.clear(&area);
        renderer.fill_vertical_gradient(
            &area,
            &[
                (0.0, "rgba(135,206,235,0.12)"),
                (0.6, "rgba(70,130,180,0.08)"),
                (1.0, "rgba(25,25,112,0.08)"),
            ],
        );

        // parallax streaks
        renderer.layer(0.12, None, |r| {
            let offset = (self.clock * 0.25).fract();
            for i in 0..6 {
                let y = (i as f64 + offset) * (h / 6.0);
                r.fill_rect(&Rect::new(0.0, y, w, dpr), "#ffffff");
            }
        });

        for bubble in &self.bubbles {
            renderer.fill_circle(
                Point {
                    x: (bubble.x * w).floor(),
                    y: (bubble.y * h).floor(),
                },
                bubble.radius * dpr,
                "rgba(255,255,255,0.7)",
            );
        }

        for rock in &context.obstacles {
            self.draw_rock(renderer, rock);
        }

        let trail_len = context.trail.len();
        if trail_len >= 2 {
            for (i, point) in context.trail.iter().enumerate() {
                let a = (i + 1) as f64 / trail_len as f64;
                renderer.layer(0.08 * a, None, |r| {
                    r.fill_ellipse(*point, 10.0 * a * dpr, 6.0 * a * dpr, "#006994")
                });
            }
        }

        // blink while invulnerable
        let blink = context.invulnerable > 0.0 && ((self.clock * 10.0) as i64) % 2 == 0;
        renderer.layer(if blink { 0.4 } else { 1.0 }, None, |r| self.draw_fish(r));

        let hud = (h * 0.18).floor().max(10.0);
        renderer.text(
            &context.score.to_string(),
            Point {
                x: w - 6.0 * dpr,
                y: 2.0 * dpr,
            },
            &TextStyle::new(hud, "rgba(255,255,255,0.9)")
                .align("right")
                .baseline("top"),
        );
        renderer.text(
            &"❤".repeat(context.lives as usize),
            Point {
                x: 6.0 * dpr,
                y: 2.0 * dpr,
            },
            &TextStyle::new(hud * 0.8, "rgba(255,120,120,0.9)").baseline("top"),
        );

        if context.hit_flash > 0.0 {
            let alpha = (0.25 * context.hit_flash / 0.15).min(1.0);
            renderer.fill_rect(&area, &format!("rgba(255, 0, 0, {alpha:.3})"));
        }

        if self.phase() == Phase::GameOver {
            renderer.fill_rect(&area, "rgba(0, 20, 40, 0.55)");
            let center = area.center();
            renderer.text(
                &format!("Game Over · {}", context.score),
                Point {
                    x: center.x,
                    y: center.y - hud * 0.6,
                },
                &TextStyle::new(hud * 1.2, "#ffffff")
                    .bold()
                    .align("center")
                    .baseline("middle"),
            );
            renderer.text(
                "Click to restart",
                Point {
                    x: center.x,
                    y: center.y + hud * 0.7,
                },
                &TextStyle::new(hud * 0.8, "rgba(255,255,255,0.85)")
                    .align("center")
                    .baseline("middle"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn game() -> SwimmerGame {
        SwimmerGame::new(Arena::default(), StdRng::seed_from_u64(42))
    }

    #[test]
    fn first_update_starts_the_run() {
        let mut game = game();
        assert_eq!(game.phase(), Phase::Idle);
        game.update(&Frame::new(0.0, 1.6));
        assert_eq!(game.phase(), Phase::Running);
    }

    #[test]
    fn five_hits_end_the_run_and_click_restarts() {
        let mut game = game();
        game.start();
        for _ in 0..5 {
            game.hit();
            // speed 0 keeps rocks parked offscreen while invulnerability wears off
            for _ in 0..30 {
                game.update(&Frame::new(0.05, 0.0));
            }
        }
        assert_eq!(game.phase(), Phase::GameOver);
        assert_eq!(game.lives(), 0);

        // hits after game over change nothing
        game.hit();
        assert_eq!(game.phase(), Phase::GameOver);

        game.click();
        assert_eq!(game.phase(), Phase::Idle);
        let fresh = SwimmerGame::new(Arena::default(), StdRng::seed_from_u64(1));
        assert_eq!(game.context(), fresh.context());
    }

    #[test]
    fn only_arrow_keys_are_handled() {
        let mut game = game();
        assert!(game.key("ArrowUp", true));
        assert!(!game.key("Space", true));
        game.update(&Frame::new(0.0, 1.6));
        game.update(&Frame::new(0.05, 1.6));
        assert!(game.context().target_y < 0.5);
    }

    #[test]
    fn steering_is_normalized_and_clamped() {
        let mut game = game();
        game.steer_to(30.0);
        approx::assert_relative_eq!(game.context().target_y, 0.25);
        game.steer_to(-50.0);
        approx::assert_relative_eq!(game.context().target_y, 0.0);
    }

    #[test]
    fn resize_keeps_score() {
        let mut game = game();
        game.start();
        game.resize(400.0, 80.0, 2.0, 600.0);
        let arena = game.context().arena;
        assert_eq!((arena.width, arena.height, arena.dpr), (400.0, 80.0, 2.0));
        assert_eq!(arena.difficulty().spawn_rate, 0.8);
        assert_eq!(game.phase(), Phase::Running);
    }
}
