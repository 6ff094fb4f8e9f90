//! Swimmer states are types: a transition can only be reached through the
//! methods below, so e.g. scoring while game over is unrepresentable.
//! - PUBLIC  : SwimmerState and SwimmerContext
//! - PRIVATE : the context mutators

use super::obstacle::{Arena, Obstacle};
use crate::engine::{Point, Rect};
use rand::Rng;
use std::collections::VecDeque;

// tuning
const APPROACH_RATE: f64 = 8.0; // higher = snappier
const KEY_RATE: f64 = 0.8; // normalized height per second
const START_LIVES: u8 = 5;
const INVULNERABLE_SECS: f64 = 1.2;
const HIT_FLASH_SECS: f64 = 0.2;
const POINTS_PER_ROCK: u32 = 10;
const MAX_TRAIL: usize = 10;
const FISH_X: f64 = 0.15; // fraction of the width

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Idle;
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Running;
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GameOver;

/// Held keyboard directions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Keys {
    pub up: bool,
    pub down: bool,
}

/// One simulation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub delta: f64,
    pub speed: f64,
    pub keys: Keys,
}

pub enum IsAlive {
    Swimming(SwimmerState<Running>),
    Caught(SwimmerState<GameOver>),
}

/// Shared data for every state:
/// - physics : fish position + target
/// - world   : rocks + spawn timer
/// - rules   : score, lives, invulnerability
#[derive(Debug, Clone, PartialEq)]
pub struct SwimmerContext {
    pub arena: Arena,
    /// normalized 0..1 of the height
    pub fish_y: f64,
    pub target_y: f64,
    pub obstacles: Vec<Obstacle>,
    pub spawn_timer: f64,
    pub score: u32,
    pub lives: u8,
    pub invulnerable: f64,
    pub hit_flash: f64,
    pub trail: VecDeque<Point>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwimmerState<S> {
    context: SwimmerContext,
    // type-level tag only, never read
    _state: S,
}

impl<S> SwimmerState<S> {
    pub fn context(&self) -> &SwimmerContext {
        &self.context
    }

    pub fn resize(mut self, arena: Arena) -> Self {
        self.context.arena = arena;
        self
    }
}

impl SwimmerState<Idle> {
    pub fn new(arena: Arena) -> Self {
        SwimmerState {
            context: SwimmerContext::fresh(arena),
            _state: Idle,
        }
    }

    pub fn steer(mut self, target_y: f64) -> Self {
        self.context = self.context.steer(target_y);
        self
    }

    pub fn start(self) -> SwimmerState<Running> {
        SwimmerState {
            context: self.context,
            _state: Running,
        }
    }
}

impl SwimmerState<Running> {
    pub fn steer(mut self, target_y: f64) -> Self {
        self.context = self.context.steer(target_y);
        self
    }

    /// Returns an enum because a step can:
    /// - keep swimming
    /// - lose the last life
    pub fn update(mut self, step: &Step, rng: &mut impl Rng) -> IsAlive {
        let caught = self.context.advance(step, rng);
        if caught {
            IsAlive::Caught(self.end())
        } else {
            IsAlive::Swimming(self)
        }
    }

    /// Take one hit unless still invulnerable.
    pub fn hit(mut self) -> IsAlive {
        if self.context.take_hit() {
            IsAlive::Caught(self.end())
        } else {
            IsAlive::Swimming(self)
        }
    }

    fn end(self) -> SwimmerState<GameOver> {
        SwimmerState {
            context: self.context,
            _state: GameOver,
        }
    }
}

impl SwimmerState<GameOver> {
    /// Everything but the arena goes back to its initial value.
    pub fn restart(self) -> SwimmerState<Idle> {
        SwimmerState::new(self.context.arena)
    }
}

impl SwimmerContext {
    fn fresh(arena: Arena) -> Self {
        SwimmerContext {
            arena,
            fish_y: 0.5,
            target_y: 0.5,
            obstacles: Vec::new(),
            spawn_timer: 0.0,
            score: 0,
            lives: START_LIVES,
            invulnerable: 0.0,
            hit_flash: 0.0,
            trail: VecDeque::with_capacity(MAX_TRAIL + 1),
        }
    }

    /// Fixed-size fish hitbox in canvas pixels.
    pub fn fish_box(&self) -> Rect {
        let Arena {
            width: w,
            height: h,
            dpr,
            fish_aspect,
            ..
        } = self.arena;
        let fish_height = (10.0 * dpr).max((h * 0.4).floor());
        let fish_width = (fish_height * fish_aspect).floor();
        Rect::new(
            (w * FISH_X).floor(),
            (self.fish_y * h - fish_height * 0.5).floor(),
            fish_width,
            fish_height,
        )
    }

    /// Pixels the world scrolls by in this step.
    pub fn scroll_distance(&self, step: &Step) -> f64 {
        step.speed * (self.arena.height / 80.0) * 60.0 * step.delta
    }

    fn steer(mut self, target_y: f64) -> Self {
        self.target_y = target_y.clamp(0.0, 1.0);
        self
    }

    /// Returns true when that was the last life.
    fn take_hit(&mut self) -> bool {
        if self.invulnerable > 0.0 {
            return false;
        }
        self.hit_flash = HIT_FLASH_SECS;
        self.invulnerable = INVULNERABLE_SECS;
        self.lives = self.lives.saturating_sub(1);
        self.lives == 0
    }

    /// Advance one step. Returns true when the last life was lost.
    fn advance(&mut self, step: &Step, rng: &mut impl Rng) -> bool {
        let dt = step.delta;

        // exponential smoothing towards the target, never overshoots
        self.fish_y += (self.target_y - self.fish_y) * (dt * APPROACH_RATE).min(1.0);

        if step.keys.up {
            self.target_y = (self.target_y - KEY_RATE * dt).max(0.0);
        }
        if step.keys.down {
            self.target_y = (self.target_y + KEY_RATE * dt).min(1.0);
        }

        if self.invulnerable > 0.0 {
            self.invulnerable = (self.invulnerable - dt).max(0.0);
        }

        self.spawn_timer -= dt * step.speed * self.arena.difficulty().spawn_rate * 0.6;
        if self.spawn_timer <= 0.0 {
            self.spawn_timer = 1.6 + rng.gen::<f64>();
            self.obstacles.push(Obstacle::spawn(&self.arena, rng));
        }

        let distance = self.scroll_distance(step);
        let fish = self.fish_box();
        for rock in self.obstacles.iter_mut() {
            rock.hit = false;
            rock.bounds.x -= distance;
            if !rock.scored && rock.bounds.right() < fish.x {
                rock.scored = true;
                self.score += POINTS_PER_ROCK;
            }
        }
        self.obstacles.retain(|rock| rock.bounds.right() >= -10.0);

        let mut caught = false;
        for index in 0..self.obstacles.len() {
            if self.invulnerable > 0.0 || !fish.intersects(&self.obstacles[index].bounds) {
                continue;
            }
            self.obstacles[index].hit = true;
            if self.take_hit() {
                caught = true;
                break;
            }
        }

        self.trail.push_back(Point {
            x: fish.x + fish.width * 0.2,
            y: fish.y + fish.height * 0.5,
        });
        while self.trail.len() > MAX_TRAIL {
            self.trail.pop_front();
        }

        if self.hit_flash > 0.0 {
            self.hit_flash = (self.hit_flash - dt).max(0.0);
        }

        caught
    }
}
