//! Decorative fish drifting across the whole viewport on a fixed,
//! click-through canvas. Interaction comes from window listeners and a
//! hit test against the sprites.

pub mod press;

use crate::engine::{Frame, Game, Point, Rect, Renderer, TextStyle};
use press::{Gesture, PressTracker};
use rand::rngs::StdRng;
use rand::Rng;

pub const MAX_SPRITES: usize = 15;
const SPRITE_SIZE: f64 = 32.0;
/// ms per 60 fps frame; sprite speeds are px per such frame
const FRAME_MS: f64 = 16.67;
const SWAY: f64 = 15.0;
const FADE_FROM: f64 = 0.8;
const MIN_OPACITY: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteKind {
    pub emoji: &'static str,
    /// drawn mirrored so it faces its direction of travel
    pub flip: bool,
    pub speed: f64,
    pub color: &'static str,
}

const fn kind(emoji: &'static str, flip: bool, speed: f64, color: &'static str) -> SpriteKind {
    SpriteKind {
        emoji,
        flip,
        speed,
        color,
    }
}

pub const SPRITE_KINDS: [SpriteKind; 7] = [
    kind("🐠", true, 1.8, "#4ECDC4"),
    kind("🐟", true, 2.1, "#FF6B6B"),
    kind("🐡", true, 1.5, "#FFE66D"),
    kind("🦈", true, 2.8, "#006994"),
    kind("🐙", false, 1.3, "#8B5CF6"),
    kind("🦐", false, 2.3, "#FFA07A"),
    kind("🦞", false, 1.0, "#DC2626"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Foreground,
    Background,
}

impl Layer {
    pub fn opacity(self) -> f64 {
        match self {
            Layer::Foreground => 0.9,
            Layer::Background => 0.35,
        }
    }

    pub fn max_age_ms(self) -> f64 {
        match self {
            Layer::Foreground => 20_000.0,
            Layer::Background => 12_000.0,
        }
    }

    /// 60 % foreground, 40 % background
    pub fn random(rng: &mut impl Rng) -> Self {
        if rng.gen::<f64>() < 0.6 {
            Layer::Foreground
        } else {
            Layer::Background
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpriteId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub struct AmbientSprite {
    pub id: SpriteId,
    pub kind: SpriteKind,
    pub layer: Layer,
    pub position: Point,
    pub base_y: f64,
    pub speed: f64,
    pub age_ms: f64,
}

impl AmbientSprite {
    /// Returns false once the sprite swam off the right edge or aged out.
    pub fn update(&mut self, dt_ms: f64, viewport_width: f64) -> bool {
        self.position.x += self.speed * dt_ms / FRAME_MS;
        self.position.y = self.base_y + (self.age_ms * 0.002).sin() * SWAY;
        self.age_ms += dt_ms;
        self.position.x <= viewport_width + 50.0 && self.age_ms < self.layer.max_age_ms()
    }

    /// Layer opacity, fading out over the last fifth of its life.
    pub fn opacity(&self) -> f64 {
        let base = self.layer.opacity();
        let age = self.age_ms / self.layer.max_age_ms();
        if age <= FADE_FROM {
            return base;
        }
        let fade = (age - FADE_FROM) / (1.0 - FADE_FROM);
        (base * (1.0 - fade)).max(MIN_OPACITY)
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, SPRITE_SIZE, SPRITE_SIZE)
    }
}

pub struct AmbientOverlay {
    sprites: Vec<AmbientSprite>,
    next_id: u32,
    width: f64,
    height: f64,
    press: PressTracker<SpriteId>,
    hidden: bool,
    now_ms: f64,
    max_sprites: usize,
    rng: StdRng,
}

impl AmbientOverlay {
    /// Starts with a single foreground sprite on the left.
    pub fn new(width: f64, height: f64, max_sprites: usize, rng: StdRng) -> Self {
        let mut overlay = AmbientOverlay {
            sprites: Vec::new(),
            next_id: 0,
            width,
            height,
            press: PressTracker::default(),
            hidden: false,
            now_ms: 0.0,
            max_sprites,
            rng,
        };
        overlay.spawn(
            Point {
                x: 200.0,
                y: height * 0.4,
            },
            Layer::Foreground,
        );
        overlay
    }

    /// `None` once the cap is reached.
    pub fn spawn(&mut self, at: Point, layer: Layer) -> Option<SpriteId> {
        if self.sprites.len() >= self.max_sprites {
            tracing::debug!("overlay full, not spawning");
            return None;
        }
        let kind = SPRITE_KINDS[self.rng.gen_range(0..SPRITE_KINDS.len())];
        let id = SpriteId(self.next_id);
        self.next_id += 1;
        let y = at.y.min(self.height - 100.0).max(50.0);
        self.sprites.push(AmbientSprite {
            id,
            kind,
            layer,
            position: Point {
                x: at.x.min(self.width - 100.0).max(50.0),
                y,
            },
            base_y: y,
            speed: kind.speed + (self.rng.gen::<f64>() - 0.5) * 0.3,
            age_ms: 0.0,
        });
        tracing::debug!(emoji = kind.emoji, ?layer, total = self.sprites.len(), "sprite spawned");
        Some(id)
    }

    pub fn remove(&mut self, id: SpriteId) -> bool {
        let before = self.sprites.len();
        self.sprites.retain(|sprite| sprite.id != id);
        self.sprites.len() != before
    }

    /// Topmost sprite under `at`: foreground before background, newest first.
    pub fn sprite_at(&self, at: Point) -> Option<SpriteId> {
        let hit = |layer: Layer| {
            self.sprites
                .iter()
                .rev()
                .find(|sprite| sprite.layer == layer && sprite.bounds().contains(at))
                .map(|sprite| sprite.id)
        };
        hit(Layer::Foreground).or_else(|| hit(Layer::Background))
    }

    /// Returns true when the press landed on a sprite and should not reach
    /// the page underneath.
    pub fn pointer_down(&mut self, at: Point) -> bool {
        if self.hidden {
            return false;
        }
        match self.sprite_at(at) {
            Some(id) => {
                self.press.press(id, self.now_ms);
                true
            }
            None => false,
        }
    }

    pub fn pointer_up(&mut self, at: Point) {
        if let Some(gesture) = self.press.release(self.now_ms) {
            self.apply(gesture, Some(at));
        }
    }

    fn apply(&mut self, gesture: Gesture<SpriteId>, at: Option<Point>) {
        match (gesture, at) {
            (Gesture::LongPress(id), _) => {
                if self.remove(id) {
                    tracing::debug!(?id, "long press removed sprite");
                }
            }
            (Gesture::Click(_), Some(at)) => {
                let layer = Layer::random(&mut self.rng);
                self.spawn(at, layer);
            }
            (Gesture::Click(_), None) => {}
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    pub fn sprites(&self) -> &[AmbientSprite] {
        &self.sprites
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }
}

impl Game for AmbientOverlay {
    fn update(&mut self, frame: &Frame) {
        if frame.round_active != self.hidden {
            tracing::debug!(hidden = frame.round_active, "overlay visibility");
            self.press.cancel();
        }
        self.hidden = frame.round_active;

        let dt_ms = frame.delta * 1000.0;
        self.now_ms += dt_ms;
        if let Some(gesture) = self.press.poll(self.now_ms) {
            self.apply(gesture, None);
        }

        let width = self.width;
        self.sprites
            .retain_mut(|sprite| sprite.update(dt_ms, width));
    }

    fn draw(&self, renderer: &Renderer) {
        renderer.clear(&Rect::new(0.0, 0.0, self.width, self.height));
        if self.hidden {
            return;
        }
        for layer in [Layer::Background, Layer::Foreground] {
            for sprite in self.sprites.iter().filter(|sprite| sprite.layer == layer) {
                let center = sprite.bounds().center();
                let mirror = if sprite.kind.flip { -1.0 } else { 1.0 };
                renderer.layer(sprite.opacity(), None, |r| {
                    r.transformed(center, (mirror, 1.0), 0.0, |r| {
                        r.text(
                            sprite.kind.emoji,
                            Point::default(),
                            &TextStyle::new(SPRITE_SIZE, sprite.kind.color)
                                .align("center")
                                .baseline("middle"),
                        )
                    })
                });
            }
        }
    }
}
