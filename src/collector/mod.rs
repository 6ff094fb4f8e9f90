//! Timed food collector. Each `.aquarium-game` container gets one instance,
//! and its ordinal on the page picks the difficulty.

pub mod difficulty;
pub mod entities;
pub mod highscore;
pub mod scoring;

use crate::engine::{Frame, Game, Point, Rect, Renderer, TextStyle};
use difficulty::DifficultyProfile;
use entities::{
    ActiveEffects, Combo, FloatingText, Food, Particle, PowerUp, PowerUpKind, TankBubble,
};
use highscore::HighscoreStatus;
use rand::rngs::StdRng;
use scoring::GameSummary;

pub const PLAYER_WIDTH: f64 = 60.0;
pub const PLAYER_HEIGHT: f64 = 40.0;
const PLAYER_START: Point = Point { x: 100.0, y: 200.0 };
/// px a single key press moves the player
const KEY_NUDGE: f64 = 5.0;
/// near misses within this many px still count as a pickup
const PICKUP_PADDING: f64 = 10.0;
const BUBBLE_COUNT: usize = 15;

/// ┌──────────── Round Flow ─────────────┐
/// │  From     →  Event  →  To           │
/// ├─────────────────────────────────────┤
/// │  Idle     →  Start  →  Running      │
/// │  Ended    →  Start  →  Running      │
/// │  Running  →  Stop   →  Idle         │
/// │  Ended    →  Stop   →  Idle         │
/// │  Running  →  Exit   →  Ended        │
/// │  any      →  Reset  →  Idle         │
/// └─────────────────────────────────────┘
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Start,
    /// abandon the round without a summary
    Stop,
    /// end the round now, with a summary
    Exit,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Ended,
}

impl Phase {
    pub fn next(self, event: Event) -> Phase {
        match (self, event) {
            (Phase::Idle | Phase::Ended, Event::Start) => Phase::Running,
            (Phase::Running | Phase::Ended, Event::Stop) => Phase::Idle,
            (Phase::Running, Event::Exit) => Phase::Ended,
            (_, Event::Reset) => Phase::Idle,
            (phase, _) => phase,
        }
    }
}

/// Everything a round owns. Rebuilt on every start, stop and reset.
#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    pub player: Rect,
    pub foods: Vec<Food>,
    pub power_ups: Vec<PowerUp>,
    pub effects: ActiveEffects,
    pub combo: Combo,
    pub particles: Vec<Particle>,
    pub texts: Vec<FloatingText>,
    pub score: u32,
    pub collected: u32,
    pub time_left: u32,
    /// wall-clock seconds since the round started, frozen or not
    pub elapsed: f64,
    /// frame timestamp the round counts from
    started_ms: Option<f64>,
    last_ms: f64,
    /// wall-clock ms spent under a time freeze
    frozen_ms: f64,
    pub summary: Option<GameSummary>,
    pub status: HighscoreStatus,
}

impl Round {
    fn new(profile: &DifficultyProfile) -> Self {
        Round {
            player: Rect::new(PLAYER_START.x, PLAYER_START.y, PLAYER_WIDTH, PLAYER_HEIGHT),
            foods: Vec::new(),
            power_ups: Vec::new(),
            effects: ActiveEffects::default(),
            combo: Combo::new(),
            particles: Vec::new(),
            texts: Vec::new(),
            score: 0,
            collected: 0,
            time_left: profile.time,
            elapsed: 0.0,
            started_ms: None,
            last_ms: 0.0,
            frozen_ms: 0.0,
            summary: None,
            status: HighscoreStatus::Skipped,
        }
    }
}

/// Called once per finished round with the round number and its summary.
pub type RoundEndCallback = Box<dyn FnMut(u32, &GameSummary)>;

pub struct CollectorGame {
    game_number: usize,
    profile: DifficultyProfile,
    width: f64,
    height: f64,
    phase: Phase,
    round: Round,
    rounds_started: u32,
    bubbles: Vec<TankBubble>,
    rng: StdRng,
    on_end: Option<RoundEndCallback>,
    clock: f64,
}

impl CollectorGame {
    pub fn new(game_number: usize, width: f64, height: f64, mut rng: StdRng) -> Self {
        let profile = DifficultyProfile::for_game(game_number);
        let bubbles = (0..BUBBLE_COUNT)
            .map(|_| TankBubble::spawn(width, height, &mut rng))
            .collect();
        CollectorGame {
            game_number,
            profile,
            width,
            height,
            phase: Phase::Idle,
            round: Round::new(&profile),
            rounds_started: 0,
            bubbles,
            rng,
            on_end: None,
            clock: 0.0,
        }
    }

    pub fn on_round_end(&mut self, callback: impl FnMut(u32, &GameSummary) + 'static) {
        self.on_end = Some(Box::new(callback));
    }

    pub fn send(&mut self, event: Event) {
        let from = self.phase;
        let to = from.next(event);
        if to == from && event != Event::Reset {
            return;
        }
        tracing::debug!(game = self.game_number, ?from, ?to, ?event, "collector transition");
        self.phase = to;
        match event {
            Event::Start => self.begin(),
            Event::Exit => self.finish(),
            Event::Stop | Event::Reset => self.round = Round::new(&self.profile),
        }
    }

    pub fn start(&mut self) {
        self.send(Event::Start);
    }

    pub fn stop(&mut self) {
        self.send(Event::Stop);
    }

    pub fn exit(&mut self) {
        self.send(Event::Exit);
    }

    pub fn reset(&mut self) {
        self.send(Event::Reset);
    }

    /// The restart control: a clean slate and straight into a new round.
    pub fn restart(&mut self) {
        self.reset();
        self.start();
    }

    /// A click on the canvas starts a round unless one is running.
    pub fn click(&mut self) -> bool {
        if self.phase == Phase::Running {
            return false;
        }
        self.start();
        true
    }

    /// Arrow keys and WASD nudge the player while a round runs. Returns
    /// whether the key was used.
    pub fn key(&mut self, key: &str) -> bool {
        if self.phase != Phase::Running {
            return false;
        }
        let nudge = if self.round.effects.is_active(PowerUpKind::SpeedBoost) {
            KEY_NUDGE * 2.0
        } else {
            KEY_NUDGE
        };
        let (dx, dy) = match key {
            "ArrowUp" | "w" | "W" => (0.0, -nudge),
            "ArrowDown" | "s" | "S" => (0.0, nudge),
            "ArrowLeft" | "a" | "A" => (-nudge, 0.0),
            "ArrowRight" | "d" | "D" => (nudge, 0.0),
            _ => return false,
        };
        let player = self.round.player;
        self.place_player(player.x + dx, player.y + dy);
        true
    }

    /// Mouse / touch position in canvas pixels; the fish centres on it.
    pub fn pointer(&mut self, at: Point) {
        if self.phase == Phase::Running {
            self.place_player(at.x - PLAYER_WIDTH * 0.5, at.y - PLAYER_HEIGHT * 0.5);
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        let player = self.round.player;
        self.place_player(player.x, player.y);
    }

    /// Highscore progress for `round`. Reports for an older round are dropped.
    pub fn set_status(&mut self, round: u32, status: HighscoreStatus) {
        if round == self.rounds_started && self.phase == Phase::Ended {
            self.round.status = status;
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn profile(&self) -> &DifficultyProfile {
        &self.profile
    }

    pub fn game_number(&self) -> usize {
        self.game_number
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn place_player(&mut self, x: f64, y: f64) {
        let player = &mut self.round.player;
        player.x = x.clamp(0.0, (self.width - player.width).max(0.0));
        player.y = y.clamp(0.0, (self.height - player.height).max(0.0));
    }

    fn begin(&mut self) {
        self.rounds_started += 1;
        self.round = Round::new(&self.profile);
        self.round.foods = (0..self.profile.items)
            .map(|_| Food::spawn(self.width, self.height, &mut self.rng))
            .collect();
        tracing::info!(
            game = self.game_number,
            level = self.profile.level,
            items = self.profile.items,
            "collector round started"
        );
    }

    fn finish(&mut self) {
        let round = &mut self.round;
        let summary = GameSummary::new(
            round.collected,
            self.profile.items,
            round.score,
            self.profile.time,
            round.elapsed.floor() as u32,
        );
        tracing::info!(
            game = self.game_number,
            collected = summary.collected,
            final_score = summary.final_score,
            "collector round ended"
        );
        round.summary = Some(summary.clone());
        if let Some(on_end) = self.on_end.as_mut() {
            on_end(self.rounds_started, &summary);
        }
    }

    fn is_over(&self) -> bool {
        self.round.time_left == 0 || self.round.collected >= self.profile.items
    }

    /// Time is measured on frame timestamps, so a round keeps running while
    /// its canvas is scrolled away or the frame rate drops.
    fn run_clock(&mut self, frame: &Frame) {
        let round = &mut self.round;
        let started = match round.started_ms {
            Some(started) => started,
            None => {
                // the first frame of a round accounts for its own delta
                let started = frame.now_ms - frame.delta * 1000.0;
                round.started_ms = Some(started);
                round.last_ms = started;
                started
            }
        };
        let wall_ms = (frame.now_ms - round.last_ms).max(0.0);
        round.last_ms = frame.now_ms.max(round.last_ms);
        round.elapsed = ((round.last_ms - started) / 1000.0).max(0.0);

        for kind in round.effects.tick(wall_ms / 1000.0) {
            tracing::debug!(?kind, "power-up expired");
        }
        if round.effects.is_active(PowerUpKind::TimeFreeze) {
            round.frozen_ms += wall_ms;
        }
        let counted = ((round.last_ms - started - round.frozen_ms) / 1000.0).max(0.0);
        round.time_left = self.profile.time.saturating_sub(counted.floor() as u32);
    }

    fn collect_food(&mut self, steps: f64, dt: f64) {
        let player = self.round.player;
        let magnet = self.round.effects.is_active(PowerUpKind::Magnet);
        let mut picked = Vec::new();
        for food in self.round.foods.iter_mut() {
            food.bob(dt, self.profile.speed_multiplier);
            if magnet {
                food.pull_towards(player.center(), steps);
            }
            if !food.collected && player.intersects_padded(&food.bounds(), PICKUP_PADDING) {
                food.collected = true;
                picked.push(food.clone());
            }
        }
        self.round.foods.retain(|food| !food.collected);

        for food in picked {
            let round = &mut self.round;
            let comboing = round.combo.register(round.elapsed);
            let base = (food.kind.points as f64 * self.profile.points_multiplier).floor();
            let points =
                (base * round.combo.multiplier * round.effects.points_factor()).floor() as u32;
            round.score += points;
            round.collected += 1;

            let center = food.bounds().center();
            let burst = if comboing { 15 } else { 8 };
            round
                .particles
                .extend(Particle::burst(center, food.kind.color, burst, &mut self.rng));
            round
                .texts
                .push(FloatingText::points(format!("+{points}"), center, comboing));
            if comboing {
                round.texts.push(FloatingText::callout(
                    format!("COMBO x{:.1}!", round.combo.multiplier),
                    Point {
                        x: center.x,
                        y: center.y - 30.0,
                    },
                    "#FFD700",
                ));
            }
        }
    }

    fn collect_power_ups(&mut self, steps: f64) {
        let spawned = PowerUp::roll(self.width, steps, &mut self.rng);
        let round = &mut self.round;
        round.power_ups.extend(spawned);

        let player = round.player;
        let magnet = round.effects.is_active(PowerUpKind::Magnet);
        let mut picked = Vec::new();
        let height = self.height;
        round.power_ups.retain_mut(|power_up| {
            power_up.fall(steps);
            if magnet {
                power_up.pull_towards(player.center(), steps);
            }
            if player.intersects(&power_up.bounds()) {
                picked.push(power_up.kind);
                return false;
            }
            power_up.y <= height
        });

        for kind in picked {
            tracing::debug!(?kind, "power-up collected");
            round.effects.activate(kind);
            round.texts.push(FloatingText::callout(
                kind.banner().to_string(),
                Point {
                    x: player.center().x,
                    y: player.y - 20.0,
                },
                kind.color(),
            ));
        }
    }

    fn draw_tank(&self, renderer: &Renderer, area: &Rect) {
        renderer.fill_vertical_gradient(
            area,
            &[(0.0, "#87CEEB"), (0.5, "#4682B4"), (1.0, "#1E3A5F")],
        );

        // sway grass along the floor
        let sway = (self.clock * 1.5).sin() * 8.0;
        for i in 0..5 {
            let x = 30.0 + i as f64 * 18.0;
            renderer.stroke_curve(
                Point { x, y: area.bottom() },
                Point {
                    x: x + sway,
                    y: area.bottom() - 60.0,
                },
                Point {
                    x: x + sway * 1.5,
                    y: area.bottom() - 110.0 - i as f64 * 6.0,
                },
                "#2E8B57",
                4.0,
            );
        }

        for (offset, rx, ry) in [(0.72, 40.0, 16.0), (0.8, 26.0, 12.0), (0.9, 34.0, 14.0)] {
            renderer.fill_ellipse(
                Point {
                    x: area.width * offset,
                    y: area.bottom() - ry * 0.5,
                },
                rx,
                ry,
                "#5D6D7E",
            );
        }

        for bubble in &self.bubbles {
            renderer.layer(bubble.opacity, None, |r| {
                r.fill_circle(bubble.position, bubble.radius, "rgba(255,255,255,0.6)")
            });
        }
    }

    fn draw_entities(&self, renderer: &Renderer) {
        let round = &self.round;
        for food in &round.foods {
            let center = food.bounds().center();
            renderer.layer(1.0, Some((food.kind.color, 15.0 * food.glow)), |r| {
                r.text(
                    food.kind.emoji,
                    center,
                    &TextStyle::new(food.kind.size, "#ffffff")
                        .align("center")
                        .baseline("middle"),
                )
            });
        }

        for power_up in &round.power_ups {
            let center = power_up.bounds().center();
            renderer.layer(1.0, Some((power_up.kind.color(), 20.0)), |r| {
                r.transformed(center, (1.0, 1.0), power_up.rotation, |r| {
                    r.text(
                        power_up.kind.emoji(),
                        Point::default(),
                        &TextStyle::new(30.0, "#ffffff")
                            .align("center")
                            .baseline("middle"),
                    )
                })
            });
        }

        let boosted = round.effects.is_active(PowerUpKind::SpeedBoost);
        let glow = boosted.then_some(("#FFD700", 20.0));
        renderer.layer(1.0, glow, |r| {
            r.text(
                "🐠",
                round.player.center(),
                &TextStyle::new(PLAYER_HEIGHT, "#ffffff")
                    .align("center")
                    .baseline("middle"),
            )
        });

        for particle in &round.particles {
            renderer.layer(particle.life, None, |r| {
                r.fill_circle(particle.position, particle.size, particle.color)
            });
        }

        for text in &round.texts {
            renderer.layer(text.opacity, None, |r| {
                r.text(
                    &text.text,
                    text.position,
                    &TextStyle::new(20.0 * text.scale, text.color)
                        .bold()
                        .align("center")
                        .baseline("middle"),
                )
            });
        }
    }

    fn draw_hud(&self, renderer: &Renderer, area: &Rect) {
        let round = &self.round;
        let label = TextStyle::new(18.0, "#ffffff").bold().baseline("top");
        renderer.text(&format!("Score: {}", round.score), Point { x: 12.0, y: 10.0 }, &label);
        if round.collected > 0 {
            renderer.text(
                &format!("🐟 {}/{}", round.collected, self.profile.items),
                Point { x: 12.0, y: 34.0 },
                &label,
            );
        }
        let clock_color = if round.effects.is_active(PowerUpKind::TimeFreeze) {
            "#00FFFF"
        } else if round.time_left <= 10 {
            "#FF6B6B"
        } else {
            "#ffffff"
        };
        renderer.text(
            &format!("⏱ {}s", round.time_left),
            Point {
                x: area.right() - 12.0,
                y: 10.0,
            },
            &TextStyle::new(18.0, clock_color).bold().align("right").baseline("top"),
        );

        if round.combo.streak > 0 {
            let fill = (round.combo.multiplier - 1.0) / 4.0;
            let meter = Rect::new(area.center().x - 60.0, 12.0, 120.0, 10.0);
            renderer.fill_rect(&meter, "rgba(0,0,0,0.35)");
            renderer.fill_rect(
                &Rect::new(meter.x, meter.y, meter.width * fill.min(1.0), meter.height),
                "#FFD700",
            );
            renderer.text(
                &format!("x{:.1}", round.combo.multiplier),
                Point {
                    x: meter.center().x,
                    y: meter.bottom() + 4.0,
                },
                &TextStyle::new(14.0, "#FFD700").bold().align("center").baseline("top"),
            );
        }

        for (row, (kind, remaining)) in round.effects.active().enumerate() {
            renderer.text(
                &format!("{} {:.0}s", kind.emoji(), remaining.ceil()),
                Point {
                    x: area.right() - 12.0,
                    y: 36.0 + row as f64 * 22.0,
                },
                &TextStyle::new(16.0, kind.color()).align("right").baseline("top"),
            );
        }
    }

    fn draw_start_hint(&self, renderer: &Renderer, area: &Rect) {
        let center = area.center();
        renderer.fill_rect(area, "rgba(0, 20, 40, 0.35)");
        renderer.text(
            "🐠 Click to start",
            Point {
                x: center.x,
                y: center.y - 16.0,
            },
            &TextStyle::new(28.0, "#ffffff").bold().align("center").baseline("middle"),
        );
        renderer.text(
            &format!(
                "Level {} · {} treats · {} seconds",
                self.profile.level, self.profile.items, self.profile.time
            ),
            Point {
                x: center.x,
                y: center.y + 20.0,
            },
            &TextStyle::new(16.0, "rgba(255,255,255,0.85)")
                .align("center")
                .baseline("middle"),
        );
    }

    fn draw_summary(&self, renderer: &Renderer, area: &Rect, summary: &GameSummary) {
        renderer.fill_rect(area, "rgba(0, 20, 40, 0.7)");
        let center = area.center();
        let (emoji, message) = summary.rating();
        let lines = [
            (format!("{emoji} {message}"), 24.0, "#ffffff"),
            (
                format!(
                    "Collected {}/{} ({:.0}%)",
                    summary.collected,
                    summary.total_items,
                    summary.percentage()
                ),
                18.0,
                "#ffffff",
            ),
            (
                format!(
                    "Score {} + Bonus {} = {}",
                    summary.score, summary.bonus, summary.final_score
                ),
                18.0,
                "#FFD700",
            ),
            (self.round.status.to_string(), 16.0, "#4ECDC4"),
            ("Click to play again".to_string(), 14.0, "rgba(255,255,255,0.75)"),
        ];
        let top = center.y - 70.0;
        for (row, (text, size, color)) in lines.iter().enumerate() {
            if text.is_empty() {
                continue;
            }
            renderer.text(
                text,
                Point {
                    x: center.x,
                    y: top + row as f64 * 34.0,
                },
                &TextStyle::new(*size, *color).bold().align("center").baseline("middle"),
            );
        }
    }
}

impl Game for CollectorGame {
    fn update(&mut self, frame: &Frame) {
        self.clock += frame.delta;
        let steps = frame.steps();
        for bubble in self.bubbles.iter_mut() {
            bubble.update(self.width, self.height, steps, &mut self.rng);
        }

        // effects linger after the round so the last pickups finish animating
        let round = &mut self.round;
        round.particles.retain_mut(|particle| particle.update(steps));
        round.texts.retain_mut(|text| text.update(steps));

        if self.phase != Phase::Running {
            return;
        }
        self.run_clock(frame);
        self.collect_food(steps, frame.delta);
        self.collect_power_ups(steps);
        if self.is_over() {
            self.send(Event::Exit);
        }
    }

    fn draw(&self, renderer: &Renderer) {
        let area = Rect::new(0.0, 0.0, self.width, self.height);
        renderer.clear(&area);
        self.draw_tank(renderer, &area);
        match self.phase {
            Phase::Idle => self.draw_start_hint(renderer, &area),
            Phase::Running => {
                self.draw_entities(renderer);
                self.draw_hud(renderer, &area);
            }
            Phase::Ended => {
                self.draw_entities(renderer);
                if let Some(summary) = &self.round.summary {
                    self.draw_summary(renderer, &area, summary);
                }
            }
        }
    }

    fn is_busy(&self) -> bool {
        self.phase == Phase::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MAX_FRAME_DELTA;
    use entities::FOOD_KINDS;
    use rand::SeedableRng;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn game() -> CollectorGame {
        CollectorGame::new(1, 800.0, 400.0, StdRng::seed_from_u64(5))
    }

    /// quarter-second frames keep the countdown arithmetic exact
    fn quiet_frames(game: &mut CollectorGame, count: usize) {
        for _ in 0..count {
            game.round.foods.clear();
            game.round.power_ups.clear();
            let now = game.round.last_ms + 250.0;
            game.update(&Frame::new(0.25, 1.0).at(now));
        }
    }

    fn food_on_player(game: &CollectorGame) -> Food {
        let player = game.round.player;
        Food {
            kind: FOOD_KINDS[0],
            x: player.x + 10.0,
            y: player.y + 5.0,
            target_y: player.y + 5.0,
            bob_speed: 0.0,
            bob_phase: 0.0,
            glow: 1.0,
            collected: false,
        }
    }

    #[test]
    fn phase_table() {
        assert_eq!(Phase::Idle.next(Event::Start), Phase::Running);
        assert_eq!(Phase::Ended.next(Event::Start), Phase::Running);
        assert_eq!(Phase::Running.next(Event::Start), Phase::Running);
        assert_eq!(Phase::Running.next(Event::Stop), Phase::Idle);
        assert_eq!(Phase::Running.next(Event::Exit), Phase::Ended);
        assert_eq!(Phase::Idle.next(Event::Exit), Phase::Idle);
        assert_eq!(Phase::Ended.next(Event::Reset), Phase::Idle);
    }

    #[test]
    fn starting_spawns_the_profile_items() {
        let mut game = game();
        assert!(game.click());
        assert_eq!(game.phase(), Phase::Running);
        assert_eq!(game.round().foods.len(), 15);
        assert_eq!(game.round().time_left, 90);
        assert!(game.is_busy());
        // clicks during a round are ignored
        assert!(!game.click());
    }

    #[test]
    fn food_is_collected_once_and_removed() {
        let mut game = game();
        game.start();
        game.round.foods = vec![food_on_player(&game)];
        game.round.power_ups.clear();
        game.update(&Frame::new(0.016, 1.0));

        assert_eq!(game.round().collected, 1);
        assert_eq!(game.round().score, 10);
        assert!(game.round().foods.is_empty());
        assert_eq!(game.round().particles.len(), 8);

        game.update(&Frame::new(0.016, 1.0));
        assert_eq!(game.round().collected, 1);
    }

    #[test]
    fn quick_pickups_combo() {
        let mut game = game();
        game.start();
        game.round.power_ups.clear();
        game.round.foods = vec![food_on_player(&game)];
        game.update(&Frame::new(0.016, 1.0));
        game.round.foods = vec![food_on_player(&game)];
        game.update(&Frame::new(0.016, 1.0));

        // 10 + floor(10 * 1.3)
        assert_eq!(game.round().score, 23);
        assert_eq!(game.round().combo.streak, 1);
    }

    #[test]
    fn round_ends_when_everything_is_collected() {
        let mut game = game();
        game.start();
        game.round.collected = 13;
        game.round.foods = vec![food_on_player(&game)];
        game.round.power_ups.clear();
        game.update(&Frame::new(0.016, 1.0));
        assert_eq!(game.phase(), Phase::Running);

        game.round.foods = vec![food_on_player(&game)];
        game.update(&Frame::new(0.016, 1.0));
        assert_eq!(game.phase(), Phase::Ended);
        let summary = game.round().summary.clone().unwrap();
        assert!(summary.perfect);
        assert!(!game.is_busy());
    }

    #[test]
    fn round_ends_exactly_when_the_clock_runs_out() {
        let mut game = game();
        game.start();
        quiet_frames(&mut game, 90 * 4 - 1);
        assert_eq!(game.phase(), Phase::Running);
        assert_eq!(game.round().time_left, 1);

        quiet_frames(&mut game, 1);
        assert_eq!(game.phase(), Phase::Ended);
        let summary = game.round().summary.clone().unwrap();
        assert_eq!(summary.actual_duration, 90);
        assert_eq!(summary.collected, 0);
        assert!(!summary.perfect);
    }

    #[test]
    fn time_freeze_pauses_the_countdown() {
        let mut game = game();
        game.start();
        game.round.effects.activate(PowerUpKind::TimeFreeze);
        quiet_frames(&mut game, 8);
        assert_eq!(game.round().time_left, 90);
        // the freeze runs out on frame 12, frames 12..=16 count
        quiet_frames(&mut game, 8);
        assert_eq!(game.round().time_left, 89);
        approx::assert_relative_eq!(game.round().elapsed, 4.0);
    }

    #[test]
    fn the_clock_follows_frame_timestamps_across_gaps() {
        let mut game = game();
        game.start();
        game.round.power_ups.clear();
        game.update(&Frame::new(0.016, 1.0).at(1_000.0));
        // canvas scrolled away for 30 s, the next frame is clamped
        game.update(&Frame::new(MAX_FRAME_DELTA, 1.0).at(31_000.0));
        assert_eq!(game.round().time_left, 60);
        approx::assert_relative_eq!(game.round().elapsed, 30.016);

        game.update(&Frame::new(MAX_FRAME_DELTA, 1.0).at(95_000.0));
        assert_eq!(game.phase(), Phase::Ended);
        assert_eq!(game.round().summary.as_ref().map(|s| s.actual_duration), Some(94));
    }

    #[test]
    fn exit_reports_and_stop_does_not() {
        let ended = Rc::new(RefCell::new(Vec::new()));
        let sink = ended.clone();
        let mut game = game();
        game.on_round_end(move |round, summary| sink.borrow_mut().push((round, summary.clone())));

        game.start();
        game.stop();
        assert_eq!(game.phase(), Phase::Idle);
        assert!(ended.borrow().is_empty());

        game.start();
        game.exit();
        assert_eq!(game.phase(), Phase::Ended);
        let ended = ended.borrow();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].0, 2);
        assert_eq!(ended[0].1.final_score, ended[0].1.bonus);
    }

    #[test]
    fn status_only_lands_on_its_own_round() {
        let mut game = game();
        game.start();
        game.exit();
        game.set_status(1, HighscoreStatus::Saving);
        assert_eq!(game.round().status, HighscoreStatus::Saving);

        game.start();
        game.exit();
        game.set_status(1, HighscoreStatus::Saved { rank: 1 });
        assert_eq!(game.round().status, HighscoreStatus::Skipped);
    }

    #[test]
    fn reset_equals_fresh_construction() {
        let mut game = game();
        game.start();
        quiet_frames(&mut game, 12);
        game.key("ArrowUp");
        game.reset();

        let fresh = CollectorGame::new(1, 800.0, 400.0, StdRng::seed_from_u64(99));
        assert_eq!(game.phase(), fresh.phase());
        assert_eq!(game.round(), fresh.round());
        assert_eq!(game.profile(), fresh.profile());
    }

    #[test]
    fn restart_goes_straight_into_a_new_round() {
        let mut game = game();
        game.start();
        game.exit();
        game.restart();
        assert_eq!(game.phase(), Phase::Running);
        assert_eq!(game.round().summary, None);
    }

    #[test]
    fn input_moves_the_player_only_while_running() {
        let mut game = game();
        assert!(!game.key("ArrowLeft"));
        game.pointer(Point { x: 400.0, y: 200.0 });
        assert_eq!(game.round().player.x, PLAYER_START.x);

        game.start();
        assert!(game.key("ArrowLeft"));
        assert_eq!(game.round().player.x, PLAYER_START.x - KEY_NUDGE);
        assert!(!game.key("Enter"));

        game.round.effects.activate(PowerUpKind::SpeedBoost);
        game.key("ArrowDown");
        assert_eq!(game.round().player.y, PLAYER_START.y + KEY_NUDGE * 2.0);

        game.pointer(Point { x: 400.0, y: 200.0 });
        assert_eq!(game.round().player.center(), Point { x: 400.0, y: 200.0 });
        game.pointer(Point { x: 5_000.0, y: -20.0 });
        assert_eq!(game.round().player.x, 800.0 - PLAYER_WIDTH);
        assert_eq!(game.round().player.y, 0.0);
    }
}
