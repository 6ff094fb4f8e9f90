use crate::engine::{Point, Rect};
use rand::Rng;
use std::f64::consts::TAU;

const BOB_AMPLITUDE: f64 = 10.0;
const COMBO_WINDOW_SECS: f64 = 3.0;
const COMBO_STEP: f64 = 0.3;
const COMBO_MAX: f64 = 5.0;
pub const MAGNET_RADIUS: f64 = 150.0;
/// fraction of the distance to the player covered per 60 fps frame
const MAGNET_PULL: f64 = 0.08;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoodKind {
    pub name: &'static str,
    pub emoji: &'static str,
    pub points: u32,
    pub color: &'static str,
    pub size: f64,
}

pub const FOOD_KINDS: [FoodKind; 5] = [
    FoodKind {
        name: "flakes",
        emoji: "🐟",
        points: 10,
        color: "#FF6B6B",
        size: 35.0,
    },
    FoodKind {
        name: "worms",
        emoji: "🪱",
        points: 20,
        color: "#4ECDC4",
        size: 30.0,
    },
    FoodKind {
        name: "pellets",
        emoji: "⭕",
        points: 15,
        color: "#45B7D1",
        size: 38.0,
    },
    FoodKind {
        name: "shrimp",
        emoji: "🦐",
        points: 25,
        color: "#FFA07A",
        size: 40.0,
    },
    FoodKind {
        name: "plant",
        emoji: "🌱",
        points: 12,
        color: "#98D8C8",
        size: 32.0,
    },
];

#[derive(Debug, Clone, PartialEq)]
pub struct Food {
    pub kind: FoodKind,
    pub x: f64,
    pub y: f64,
    pub target_y: f64,
    /// radians per 60 fps frame
    pub bob_speed: f64,
    pub bob_phase: f64,
    pub glow: f64,
    pub collected: bool,
}

impl Food {
    /// Random food somewhere inside a `width` × `height` tank.
    pub fn spawn(width: f64, height: f64, rng: &mut impl Rng) -> Self {
        let kind = FOOD_KINDS[rng.gen_range(0..FOOD_KINDS.len())];
        let x = rng.gen::<f64>() * (width - 50.0).max(0.0) + 25.0;
        let target_y = rng.gen::<f64>() * (height - 100.0).max(0.0) + 50.0;
        Food {
            kind,
            x,
            y: target_y,
            target_y,
            bob_speed: 0.02 + rng.gen::<f64>() * 0.03,
            bob_phase: rng.gen::<f64>() * TAU,
            glow: 0.5 + rng.gen::<f64>() * 0.5,
            collected: false,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.kind.size, self.kind.size)
    }

    pub fn bob(&mut self, dt: f64, speed_multiplier: f64) {
        self.bob_phase = (self.bob_phase + self.bob_speed * speed_multiplier * 60.0 * dt) % TAU;
        self.y = self.target_y + self.bob_phase.sin() * BOB_AMPLITUDE;
    }

    pub fn pull_towards(&mut self, target: Point, steps: f64) {
        let center = self.bounds().center();
        if let Some((dx, dy)) = magnet_offset(center, target, steps) {
            self.x += dx;
            self.target_y += dy;
            self.y += dy;
        }
    }
}

/// Offset to apply when `from` is within magnet reach of `to`.
fn magnet_offset(from: Point, to: Point, steps: f64) -> Option<(f64, f64)> {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    if dx.hypot(dy) >= MAGNET_RADIUS {
        return None;
    }
    let pull = (MAGNET_PULL * steps).min(1.0);
    Some((dx * pull, dy * pull))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerUpKind {
    SpeedBoost,
    TimeFreeze,
    Magnet,
    DoublePoints,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 4] = [
        PowerUpKind::SpeedBoost,
        PowerUpKind::TimeFreeze,
        PowerUpKind::Magnet,
        PowerUpKind::DoublePoints,
    ];

    pub fn emoji(self) -> &'static str {
        match self {
            PowerUpKind::SpeedBoost => "💨",
            PowerUpKind::TimeFreeze => "❄️",
            PowerUpKind::Magnet => "🧲",
            PowerUpKind::DoublePoints => "💎",
        }
    }

    pub fn seconds(self) -> f64 {
        match self {
            PowerUpKind::SpeedBoost => 5.0,
            PowerUpKind::TimeFreeze => 3.0,
            PowerUpKind::Magnet => 6.0,
            PowerUpKind::DoublePoints => 8.0,
        }
    }

    pub fn spawn_chance(self) -> f64 {
        match self {
            PowerUpKind::SpeedBoost => 0.1,
            PowerUpKind::TimeFreeze => 0.08,
            PowerUpKind::Magnet => 0.06,
            PowerUpKind::DoublePoints => 0.05,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            PowerUpKind::SpeedBoost => "#FFD700",
            PowerUpKind::TimeFreeze => "#00FFFF",
            PowerUpKind::Magnet => "#FF1493",
            PowerUpKind::DoublePoints => "#9370DB",
        }
    }

    pub fn banner(self) -> &'static str {
        match self {
            PowerUpKind::SpeedBoost => "SPEED BOOST!",
            PowerUpKind::TimeFreeze => "TIME FREEZE!",
            PowerUpKind::Magnet => "MAGNET!",
            PowerUpKind::DoublePoints => "DOUBLE POINTS!",
        }
    }

    fn index(self) -> usize {
        match self {
            PowerUpKind::SpeedBoost => 0,
            PowerUpKind::TimeFreeze => 1,
            PowerUpKind::Magnet => 2,
            PowerUpKind::DoublePoints => 3,
        }
    }
}

pub const POWER_UP_SIZE: f64 = 35.0;
/// px per 60 fps frame
const POWER_UP_FALL: f64 = 1.5;

#[derive(Debug, Clone, PartialEq)]
pub struct PowerUp {
    pub kind: PowerUpKind,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
}

impl PowerUp {
    /// Roll every kind once; at most one power-up per kind per frame.
    pub fn roll(width: f64, steps: f64, rng: &mut impl Rng) -> Vec<PowerUp> {
        let mut spawned = Vec::new();
        for kind in PowerUpKind::ALL {
            if rng.gen::<f64>() < kind.spawn_chance() * 0.1 * steps {
                spawned.push(PowerUp {
                    kind,
                    x: rng.gen::<f64>() * (width - 60.0).max(0.0) + 30.0,
                    y: -50.0,
                    rotation: 0.0,
                });
            }
        }
        spawned
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, POWER_UP_SIZE, POWER_UP_SIZE)
    }

    pub fn fall(&mut self, steps: f64) {
        self.y += POWER_UP_FALL * steps;
        self.rotation += 0.05 * steps;
    }

    pub fn pull_towards(&mut self, target: Point, steps: f64) {
        if let Some((dx, dy)) = magnet_offset(self.bounds().center(), target, steps) {
            self.x += dx;
            self.y += dy;
        }
    }
}

/// Seconds left on each power-up effect. Picking one up again refreshes it.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ActiveEffects {
    remaining: [f64; 4],
}

impl ActiveEffects {
    pub fn activate(&mut self, kind: PowerUpKind) {
        self.remaining[kind.index()] = kind.seconds();
    }

    pub fn is_active(&self, kind: PowerUpKind) -> bool {
        self.remaining[kind.index()] > 0.0
    }

    pub fn remaining(&self, kind: PowerUpKind) -> f64 {
        self.remaining[kind.index()]
    }

    /// Returns the effects that ran out during this step.
    pub fn tick(&mut self, dt: f64) -> Vec<PowerUpKind> {
        let mut expired = Vec::new();
        for kind in PowerUpKind::ALL {
            let left = &mut self.remaining[kind.index()];
            if *left > 0.0 {
                *left = (*left - dt).max(0.0);
                if *left == 0.0 {
                    expired.push(kind);
                }
            }
        }
        expired
    }

    pub fn points_factor(&self) -> f64 {
        if self.is_active(PowerUpKind::DoublePoints) {
            2.0
        } else {
            1.0
        }
    }

    pub fn active(&self) -> impl Iterator<Item = (PowerUpKind, f64)> + '_ {
        PowerUpKind::ALL
            .into_iter()
            .filter(|kind| self.is_active(*kind))
            .map(|kind| (kind, self.remaining(kind)))
    }
}

/// Pickup streak. Collecting again within three seconds keeps it going.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Combo {
    pub streak: u32,
    pub multiplier: f64,
    /// round time of the previous pickup
    last_pickup: Option<f64>,
}

impl Combo {
    pub fn new() -> Self {
        Combo {
            streak: 0,
            multiplier: 1.0,
            last_pickup: None,
        }
    }

    /// Register a pickup at round time `now`. Returns true while comboing.
    pub fn register(&mut self, now: f64) -> bool {
        match self.last_pickup {
            Some(last) if now - last < COMBO_WINDOW_SECS => {
                self.streak += 1;
                self.multiplier = (1.0 + self.streak as f64 * COMBO_STEP).min(COMBO_MAX);
            }
            _ => {
                self.streak = 0;
                self.multiplier = 1.0;
            }
        }
        self.last_pickup = Some(now);
        self.streak > 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: Point,
    pub velocity: Point,
    pub size: f64,
    pub color: &'static str,
    pub life: f64,
}

impl Particle {
    pub fn burst(at: Point, color: &'static str, count: usize, rng: &mut impl Rng) -> Vec<Particle> {
        (0..count)
            .map(|_| Particle {
                position: at,
                velocity: Point {
                    x: (rng.gen::<f64>() - 0.5) * 8.0,
                    y: (rng.gen::<f64>() - 0.5) * 8.0,
                },
                size: rng.gen::<f64>() * 6.0 + 2.0,
                color,
                life: 1.0,
            })
            .collect()
    }

    /// Returns false once the particle has faded out.
    pub fn update(&mut self, steps: f64) -> bool {
        self.position.x += self.velocity.x * steps;
        self.position.y += self.velocity.y * steps;
        self.life -= 0.02 * steps;
        self.size *= 0.99_f64.powf(steps);
        self.life > 0.0
    }
}

/// Rising, fading label: points, combo callouts and power-up banners.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatingText {
    pub text: String,
    pub position: Point,
    pub color: &'static str,
    pub opacity: f64,
    pub scale: f64,
    rise: f64,
    fade: f64,
    grow: f64,
}

impl FloatingText {
    pub fn points(text: String, at: Point, combo: bool) -> Self {
        FloatingText {
            text,
            position: at,
            color: if combo { "#FFD700" } else { "#FFFFFF" },
            opacity: 1.0,
            scale: 1.0,
            rise: 1.5,
            fade: 0.015,
            grow: 0.0,
        }
    }

    pub fn callout(text: String, at: Point, color: &'static str) -> Self {
        FloatingText {
            text,
            position: at,
            color,
            opacity: 1.0,
            scale: 1.0,
            rise: 2.0,
            fade: 0.02,
            grow: 0.02,
        }
    }

    pub fn update(&mut self, steps: f64) -> bool {
        self.position.y -= self.rise * steps;
        self.opacity -= self.fade * steps;
        self.scale += self.grow * steps;
        self.opacity > 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TankBubble {
    pub position: Point,
    pub radius: f64,
    pub speed: f64,
    pub opacity: f64,
}

impl TankBubble {
    pub fn spawn(width: f64, height: f64, rng: &mut impl Rng) -> Self {
        TankBubble {
            position: Point {
                x: rng.gen::<f64>() * width,
                y: height + rng.gen::<f64>() * 100.0,
            },
            radius: 3.0 + rng.gen::<f64>() * 8.0,
            speed: 0.5 + rng.gen::<f64>() * 1.5,
            opacity: 0.3 + rng.gen::<f64>() * 0.4,
        }
    }

    pub fn update(&mut self, width: f64, height: f64, steps: f64, rng: &mut impl Rng) {
        self.position.y -= self.speed * steps;
        if self.position.y < -self.radius {
            self.position.y = height + self.radius;
            self.position.x = rng.gen::<f64>() * width;
        }
    }
}
