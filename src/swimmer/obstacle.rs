use crate::engine::Rect;
use rand::Rng;

/// Responsive tuning picked from the viewport width. Small screens get
/// fewer, narrower and shorter rocks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Difficulty {
    pub spawn_rate: f64,
    pub width: f64,
    pub height: f64,
}

impl Difficulty {
    pub fn for_viewport(viewport_width: f64) -> Self {
        if viewport_width <= 768.0 {
            Difficulty {
                spawn_rate: 0.8,
                width: 0.9,
                height: 0.85,
            }
        } else if viewport_width <= 1024.0 {
            Difficulty {
                spawn_rate: 0.9,
                width: 0.95,
                height: 0.9,
            }
        } else {
            Difficulty {
                spawn_rate: 1.0,
                width: 1.0,
                height: 1.0,
            }
        }
    }
}

/// Canvas geometry the swimmer plays in, in device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    pub width: f64,
    pub height: f64,
    pub dpr: f64,
    pub viewport_width: f64,
    /// width / height of the fish sprite
    pub fish_aspect: f64,
}

impl Default for Arena {
    fn default() -> Self {
        Arena {
            width: 800.0,
            height: 120.0,
            dpr: 1.0,
            viewport_width: 1280.0,
            fish_aspect: DEFAULT_FISH_ASPECT,
        }
    }
}

pub const DEFAULT_FISH_ASPECT: f64 = 1.6;

impl Arena {
    pub fn difficulty(&self) -> Difficulty {
        Difficulty::for_viewport(self.viewport_width)
    }

    /// Sprite aspect ratios outside 0.8..=2.2 would make the hitbox silly.
    pub fn with_fish_aspect(mut self, aspect: f64) -> Self {
        self.fish_aspect = aspect.clamp(0.8, 2.2);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RockKind {
    /// hangs from the ceiling
    Top,
    /// sits on the floor
    Bottom,
    /// floats in the middle band
    Mid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub kind: RockKind,
    pub bounds: Rect,
    /// set once the rock's trailing edge passed the fish
    pub scored: bool,
    /// set on the frame the rock hit the fish (draw flashes it)
    pub hit: bool,
}

impl Obstacle {
    pub fn new(kind: RockKind, bounds: Rect) -> Self {
        Obstacle {
            kind,
            bounds,
            scored: false,
            hit: false,
        }
    }

    /// Random rock just beyond the right edge of the arena.
    pub fn spawn(arena: &Arena, rng: &mut impl Rng) -> Self {
        let (w, h) = (arena.width, arena.height);
        let difficulty = arena.difficulty();
        let roll: f64 = rng.gen();
        let width = (10.0 * arena.dpr)
            .max((h * (0.10 + rng.gen::<f64>() * 0.06) * difficulty.width).floor());
        let x = w + width;

        if roll < 0.45 {
            let height = (h * (0.28 + rng.gen::<f64>() * 0.25) * difficulty.height).floor();
            Obstacle::new(RockKind::Top, Rect::new(x, 0.0, width, height))
        } else if roll < 0.9 {
            let height = (h * (0.28 + rng.gen::<f64>() * 0.25) * difficulty.height).floor();
            Obstacle::new(RockKind::Bottom, Rect::new(x, h - height, width, height))
        } else {
            let height = (h * (0.18 + rng.gen::<f64>() * 0.22) * difficulty.height).floor();
            let y = (h * (0.25 + rng.gen::<f64>() * 0.5)).floor();
            Obstacle::new(RockKind::Mid, Rect::new(x, y, width, height))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn difficulty_steps_down_on_small_screens() {
        assert_eq!(Difficulty::for_viewport(375.0).spawn_rate, 0.8);
        assert_eq!(Difficulty::for_viewport(900.0).width, 0.95);
        assert_eq!(Difficulty::for_viewport(1920.0).height, 1.0);
    }

    #[test]
    fn spawned_rocks_start_offscreen_and_stay_in_the_band() {
        let arena = Arena::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let rock = Obstacle::spawn(&arena, &mut rng);
            assert!(rock.bounds.x > arena.width);
            assert!(rock.bounds.width >= 10.0);
            assert!(rock.bounds.y >= 0.0);
            assert!(rock.bounds.height <= arena.height * 0.53);
            match rock.kind {
                RockKind::Top => assert_eq!(rock.bounds.y, 0.0),
                RockKind::Bottom => {
                    approx::assert_relative_eq!(rock.bounds.bottom(), arena.height)
                }
                RockKind::Mid => assert!(rock.bounds.y >= arena.height * 0.25 - 1.0),
            }
            assert!(!rock.scored);
        }
    }

    #[test]
    fn aspect_is_clamped() {
        assert_eq!(Arena::default().with_fish_aspect(5.0).fish_aspect, 2.2);
        assert_eq!(Arena::default().with_fish_aspect(0.1).fish_aspect, 0.8);
    }
}
