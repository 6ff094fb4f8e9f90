use fischseite_games::engine::{Frame, Game};
use fischseite_games::swimmer::obstacle::Arena;
use fischseite_games::swimmer::state::SwimmerContext;
use fischseite_games::swimmer::{Phase, SwimmerGame};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn scored(context: &SwimmerContext) -> usize {
    context.obstacles.iter().filter(|rock| rock.scored).count()
}

#[test]
fn every_rock_scores_exactly_once() {
    let mut game = SwimmerGame::new(Arena::default(), StdRng::seed_from_u64(2024));
    let mut total_scored = 0;

    for _ in 0..6_000 {
        let before = game.context().clone();
        game.update(&Frame::new(1.0 / 60.0, 4.0));
        let after = game.context();

        // a spawn resets the timer upwards, rocks only leave from the front
        // and only after they passed the fish
        let spawned = usize::from(after.spawn_timer > before.spawn_timer);
        let removed = before.obstacles.len() + spawned - after.obstacles.len();
        let newly = scored(after) - (scored(&before) - removed);
        assert_eq!(after.score - before.score, 10 * newly as u32);
        total_scored += newly;

        if game.phase() == Phase::GameOver {
            break;
        }
    }

    assert!(total_scored > 0);
    assert_eq!(game.score(), total_scored as u32 * 10);
}

#[test]
fn nothing_moves_after_game_over() {
    let mut game = SwimmerGame::new(Arena::default(), StdRng::seed_from_u64(7));
    game.start();
    for _ in 0..5 {
        game.hit();
        for _ in 0..40 {
            game.update(&Frame::new(0.05, 0.0));
        }
    }
    assert_eq!(game.phase(), Phase::GameOver);

    let frozen = game.context().clone();
    for _ in 0..120 {
        game.update(&Frame::new(1.0 / 60.0, 8.0));
    }
    assert_eq!(game.context(), &frozen);
}

#[test]
fn narrow_viewports_get_smaller_rocks() {
    let phone = Arena {
        viewport_width: 600.0,
        ..Arena::default()
    };
    let desktop = Arena::default();
    assert!(phone.difficulty().width < desktop.difficulty().width);
    assert!(phone.difficulty().spawn_rate < desktop.difficulty().spawn_rate);
}
