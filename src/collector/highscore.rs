//! What happens after a collector round: rank lookup, optional name prompt
//! and submission. Runs as a detached future; the game only ever sees the
//! reported status.

use super::scoring::GameSummary;
use crate::store::{validate_player_name, HighscoreStore, StoreError};
use std::fmt;

/// Best rank that still earns a prompt for an otherwise ordinary round.
pub const PROMPT_RANK: u32 = 10;
/// Collected items that earn a prompt regardless of rank.
pub const PROMPT_COLLECTED: u32 = 15;

/// Rank is `None` when it could not be looked up.
pub fn qualifies(summary: &GameSummary, rank: Option<u32>) -> bool {
    summary.perfect
        || summary.collected >= PROMPT_COLLECTED
        || rank.is_some_and(|rank| (1..=PROMPT_RANK).contains(&rank))
}

/// Asks the player for a name. `None` means they declined.
pub trait NamePrompt {
    fn ask(&self, summary: &GameSummary, rank: Option<u32>) -> Option<String>;
}

pub fn prompt_message(summary: &GameSummary, rank: Option<u32>) -> String {
    let headline = if summary.perfect {
        "🏆 PERFECT SCORE!"
    } else {
        "🎯 GREAT SCORE!"
    };
    let rank = rank.map(|rank| format!("\nRank #{rank}")).unwrap_or_default();
    format!(
        "{headline}\nCollected {}/{} · Score {} + Bonus {} = {}{rank}\n\nYour name for the highscore list (2-30 characters):",
        summary.collected, summary.total_items, summary.score, summary.bonus, summary.final_score,
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighscoreStatus {
    /// round did not qualify or the player declined
    Skipped,
    Saving,
    Saved { rank: u32 },
    Failed(String),
    Offline,
}

impl fmt::Display for HighscoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HighscoreStatus::Skipped => Ok(()),
            HighscoreStatus::Saving => f.write_str("Saving…"),
            HighscoreStatus::Saved { rank } => write!(f, "Saved! Rank #{rank}"),
            HighscoreStatus::Failed(reason) => write!(f, "Error: {reason}"),
            HighscoreStatus::Offline => f.write_str("Offline mode"),
        }
    }
}

/// Rank the round, ask for a name when it qualifies and submit it.
/// `report` sees every intermediate status; the final one is returned.
pub async fn settle_round<S>(
    summary: &GameSummary,
    store: &S,
    prompt: &dyn NamePrompt,
    mut report: impl FnMut(&HighscoreStatus),
) -> HighscoreStatus
where
    S: HighscoreStore + ?Sized,
{
    let (rank, offline) = match store.rank_for_score(summary.final_score).await {
        Ok(rank) => (Some(rank), false),
        Err(StoreError::Offline) => (None, true),
        Err(err) => {
            tracing::warn!("rank lookup failed: {err}");
            (None, false)
        }
    };

    let status = if !qualifies(summary, rank) {
        HighscoreStatus::Skipped
    } else if offline {
        HighscoreStatus::Offline
    } else {
        match prompt.ask(summary, rank) {
            None => HighscoreStatus::Skipped,
            Some(name) => match validate_player_name(&name) {
                Err(err) => HighscoreStatus::Failed(err.to_string()),
                Ok(name) => {
                    report(&HighscoreStatus::Saving);
                    submit(summary, store, &name, rank).await
                }
            },
        }
    };

    tracing::info!(final_score = summary.final_score, %status, "round settled");
    report(&status);
    status
}

async fn submit<S>(summary: &GameSummary, store: &S, name: &str, rank: Option<u32>) -> HighscoreStatus
where
    S: HighscoreStore + ?Sized,
{
    match store.submit_highscore(summary.to_record(name)).await {
        Ok(_) => {
            let rank = match rank {
                Some(rank) => rank,
                None => store
                    .rank_for_score(summary.final_score)
                    .await
                    .unwrap_or(1),
            };
            HighscoreStatus::Saved { rank }
        }
        Err(StoreError::Offline) => HighscoreStatus::Offline,
        Err(err) => {
            tracing::warn!("highscore submit failed: {err}");
            HighscoreStatus::Failed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(collected: u32, total: u32) -> GameSummary {
        GameSummary::new(collected, total, collected * 10, 90, 80)
    }

    #[test]
    fn qualification_rules() {
        assert!(qualifies(&summary(15, 15), None));
        assert!(qualifies(&summary(15, 25), None));
        assert!(qualifies(&summary(3, 25), Some(10)));
        assert!(!qualifies(&summary(3, 25), Some(11)));
        // an unknown rank never qualifies on its own
        assert!(!qualifies(&summary(3, 25), None));
        assert!(!qualifies(&summary(3, 25), Some(0)));
    }

    #[test]
    fn status_texts() {
        assert_eq!(HighscoreStatus::Saving.to_string(), "Saving…");
        assert_eq!(HighscoreStatus::Saved { rank: 3 }.to_string(), "Saved! Rank #3");
        assert_eq!(
            HighscoreStatus::Failed("server answered 500: boom".into()).to_string(),
            "Error: server answered 500: boom"
        );
        assert_eq!(HighscoreStatus::Offline.to_string(), "Offline mode");
        assert_eq!(HighscoreStatus::Skipped.to_string(), "");
    }

    #[test]
    fn prompt_mentions_rank_and_total() {
        let message = prompt_message(&summary(20, 20), Some(2));
        assert!(message.starts_with("🏆 PERFECT SCORE!"));
        assert!(message.contains("Collected 20/20"));
        assert!(message.contains("Rank #2"));
    }
}
