use crate::store::{NewHighscore, PERFECT_ITEMS};

/// Bonus on top of the collected points:
/// - 100 for a perfect haul plus 10 per item above it
/// - 2 per second left on the clock
/// - up to 50 proportional to the haul
pub fn calculate_bonus(collected: u32, game_time: u32, actual_duration: u32) -> u32 {
    let perfect = if collected >= PERFECT_ITEMS {
        100 + (collected - PERFECT_ITEMS) * 10
    } else {
        0
    };
    let time_left = (game_time as f64 - actual_duration as f64).max(0.0);
    let time_bonus = (time_left * 2.0).floor() as u32;
    let haul = (collected as f64 / PERFECT_ITEMS as f64 * 50.0).floor() as u32;
    perfect + time_bonus + haul
}

/// Result of a finished collector round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSummary {
    pub collected: u32,
    pub total_items: u32,
    pub score: u32,
    pub bonus: u32,
    pub final_score: u32,
    /// seconds the round allowed
    pub game_time: u32,
    /// whole seconds the round actually lasted
    pub actual_duration: u32,
    /// every item of the round was collected
    pub perfect: bool,
}

impl GameSummary {
    pub fn new(
        collected: u32,
        total_items: u32,
        score: u32,
        game_time: u32,
        actual_duration: u32,
    ) -> Self {
        let bonus = calculate_bonus(collected, game_time, actual_duration);
        GameSummary {
            collected,
            total_items,
            score,
            bonus,
            final_score: score + bonus,
            game_time,
            actual_duration,
            perfect: collected == total_items,
        }
    }

    pub fn percentage(&self) -> f64 {
        if self.total_items == 0 {
            return 0.0;
        }
        self.collected as f64 / self.total_items as f64 * 100.0
    }

    /// Emoji and line shown on the end screen.
    pub fn rating(&self) -> (&'static str, &'static str) {
        match self.percentage() {
            p if p >= 90.0 => ("🏆", "Outstanding! A true aquarium pro!"),
            p if p >= 60.0 => ("👍", "Well done! Keep it up!"),
            _ => ("💪", "Try again, practice makes perfect!"),
        }
    }

    pub fn to_record(&self, player_name: &str) -> NewHighscore {
        NewHighscore {
            player_name: player_name.to_string(),
            score: self.final_score,
            collected_items: self.collected,
            game_time: self.game_time,
            game_duration_actual: self.actual_duration,
            bonus_points: self.bonus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_round_with_time_to_spare() {
        assert_eq!(calculate_bonus(20, 90, 60), 210);
        let summary = GameSummary::new(20, 20, 400, 90, 60);
        assert_eq!(summary.bonus, 210);
        assert_eq!(summary.final_score, 610);
        assert!(summary.perfect);
        assert_eq!(summary.rating().0, "🏆");
    }

    #[test]
    fn overtime_gives_no_time_bonus() {
        // 7 / 20 * 50 = 17.5
        assert_eq!(calculate_bonus(7, 60, 75), 17);
        assert_eq!(calculate_bonus(0, 90, 90), 0);
        assert_eq!(calculate_bonus(22, 75, 75), 120 + 55);
    }

    #[test]
    fn records_carry_the_final_score() {
        let summary = GameSummary::new(12, 18, 300, 85, 85);
        let record = summary.to_record("Nemo");
        assert_eq!(record.score, summary.final_score);
        assert_eq!(record.bonus_points, 30);
        assert!(!summary.perfect);
        assert_eq!(summary.rating().0, "👍");
    }
}
