/// Per-instance tuning, picked once from the game's ordinal on the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyProfile {
    pub level: u8,
    /// food items spawned for a round
    pub items: u32,
    /// round length in seconds
    pub time: u32,
    pub speed_multiplier: f64,
    pub points_multiplier: f64,
}

const fn profile(
    level: u8,
    items: u32,
    time: u32,
    speed_multiplier: f64,
    points_multiplier: f64,
) -> DifficultyProfile {
    DifficultyProfile {
        level,
        items,
        time,
        speed_multiplier,
        points_multiplier,
    }
}

// level | items | seconds | speed | points
const PROFILES: [DifficultyProfile; 6] = [
    profile(1, 15, 90, 1.0, 1.0),
    profile(2, 18, 85, 1.2, 1.5),
    profile(3, 20, 80, 1.4, 2.0),
    profile(4, 22, 75, 1.6, 2.5),
    profile(5, 25, 70, 1.8, 3.0),
    profile(6, 25, 65, 2.0, 4.0),
];

impl DifficultyProfile {
    /// `game_number` is 1-based. Anything past the table uses the hardest
    /// level, 0 is treated as 1.
    pub fn for_game(game_number: usize) -> Self {
        let index = game_number.saturating_sub(1).min(PROFILES.len() - 1);
        PROFILES[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_and_third_games() {
        let first = DifficultyProfile::for_game(1);
        assert_eq!((first.items, first.time), (15, 90));
        let third = DifficultyProfile::for_game(3);
        assert_eq!((third.items, third.time), (20, 80));
        assert_eq!(third.points_multiplier, 2.0);
    }

    #[test]
    fn ordinals_are_clamped() {
        assert_eq!(DifficultyProfile::for_game(0), DifficultyProfile::for_game(1));
        assert_eq!(DifficultyProfile::for_game(6).level, 6);
        assert_eq!(DifficultyProfile::for_game(42), DifficultyProfile::for_game(6));
    }
}
