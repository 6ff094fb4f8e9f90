//! Persistence for highscores and guestbook entries.
//!
//! Games never talk to a backend directly, only to the two traits below. The
//! site picks an implementation once:
//!
//! ┌──────────────┬─────────────────────────────────────────────┐
//! │ SupabaseStore│ PostgREST over `fetch` (configured site)    │
//! │ OfflineStore │ every call fails with `StoreError::Offline` │
//! │ MemoryStore  │ in-process tables, same ordering rules      │
//! └──────────────┴─────────────────────────────────────────────┘

pub mod memory;
pub mod supabase;

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PLAYER_NAME_LEN: std::ops::RangeInclusive<usize> = 2..=30;
pub const GUEST_NAME_LEN: std::ops::RangeInclusive<usize> = 1..=50;
pub const GUEST_MESSAGE_LEN: std::ops::RangeInclusive<usize> = 1..=500;
pub const DEFAULT_AVATAR: &str = "🐠";
/// A round that collected this many items counts as perfect.
pub const PERFECT_ITEMS: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("offline mode")]
    Offline,
    #[error("server answered {status}: {body}")]
    Http { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("{0}")]
    Invalid(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Row as inserted into `highscores`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHighscore {
    pub player_name: String,
    pub score: u32,
    pub collected_items: u32,
    /// seconds the round allowed
    pub game_time: u32,
    /// seconds the round actually took
    pub game_duration_actual: u32,
    pub bonus_points: u32,
}

/// Row as read back from `highscores`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighscoreEntry {
    #[serde(default)]
    pub id: Option<i64>,
    pub player_name: String,
    pub score: u32,
    #[serde(default)]
    pub collected_items: u32,
    #[serde(default)]
    pub game_time: u32,
    #[serde(default)]
    pub game_duration_actual: Option<u32>,
    #[serde(default)]
    pub bonus_points: Option<u32>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl HighscoreEntry {
    pub fn is_perfect(&self) -> bool {
        self.collected_items == PERFECT_ITEMS
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGuestbookEntry {
    pub name: String,
    pub message: String,
    pub avatar_emoji: String,
    /// always false on insert; moderators approve out of band
    pub is_approved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestbookEntry {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub message: String,
    #[serde(default)]
    pub avatar_emoji: Option<String>,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Trim and length-check (in characters, not bytes).
fn checked(field: &str, value: &str, range: std::ops::RangeInclusive<usize>) -> StoreResult<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if range.contains(&len) {
        Ok(trimmed.to_string())
    } else {
        Err(StoreError::Invalid(format!(
            "{field} must be {}-{} characters",
            range.start(),
            range.end()
        )))
    }
}

pub fn validate_player_name(name: &str) -> StoreResult<String> {
    checked("Name", name, PLAYER_NAME_LEN)
}

impl NewHighscore {
    pub fn validated(mut self) -> StoreResult<Self> {
        self.player_name = validate_player_name(&self.player_name)?;
        Ok(self)
    }
}

impl NewGuestbookEntry {
    /// Build a pending entry; a blank avatar falls back to the default fish.
    pub fn new(name: &str, message: &str, avatar: &str) -> StoreResult<Self> {
        let avatar = avatar.trim();
        Ok(NewGuestbookEntry {
            name: checked("Name", name, GUEST_NAME_LEN)?,
            message: checked("Message", message, GUEST_MESSAGE_LEN)?,
            avatar_emoji: if avatar.is_empty() {
                DEFAULT_AVATAR.to_string()
            } else {
                avatar.to_string()
            },
            is_approved: false,
        })
    }
}

#[async_trait(?Send)]
pub trait HighscoreStore {
    async fn submit_highscore(&self, record: NewHighscore) -> StoreResult<HighscoreEntry>;
    /// score descending, oldest first among ties
    async fn fetch_top_scores(&self, limit: usize) -> StoreResult<Vec<HighscoreEntry>>;
    /// perfect rounds only, score descending, fastest first among ties
    async fn fetch_perfect_scores(&self, limit: usize) -> StoreResult<Vec<HighscoreEntry>>;
    /// 1 + number of strictly higher scores
    async fn rank_for_score(&self, score: u32) -> StoreResult<u32>;
}

#[async_trait(?Send)]
pub trait GuestbookStore {
    async fn submit_guestbook_entry(&self, entry: NewGuestbookEntry) -> StoreResult<GuestbookEntry>;
    /// approved only, newest first
    async fn fetch_approved_entries(&self, limit: usize) -> StoreResult<Vec<GuestbookEntry>>;
}

/// Both halves of the repository; what the site hands to games.
pub trait Store: HighscoreStore + GuestbookStore {}

impl<T: HighscoreStore + GuestbookStore> Store for T {}

/// Backend used when no credentials are configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineStore;

#[async_trait(?Send)]
impl HighscoreStore for OfflineStore {
    async fn submit_highscore(&self, _record: NewHighscore) -> StoreResult<HighscoreEntry> {
        Err(StoreError::Offline)
    }

    async fn fetch_top_scores(&self, _limit: usize) -> StoreResult<Vec<HighscoreEntry>> {
        Err(StoreError::Offline)
    }

    async fn fetch_perfect_scores(&self, _limit: usize) -> StoreResult<Vec<HighscoreEntry>> {
        Err(StoreError::Offline)
    }

    async fn rank_for_score(&self, _score: u32) -> StoreResult<u32> {
        Err(StoreError::Offline)
    }
}

#[async_trait(?Send)]
impl GuestbookStore for OfflineStore {
    async fn submit_guestbook_entry(&self, _entry: NewGuestbookEntry) -> StoreResult<GuestbookEntry> {
        Err(StoreError::Offline)
    }

    async fn fetch_approved_entries(&self, _limit: usize) -> StoreResult<Vec<GuestbookEntry>> {
        Err(StoreError::Offline)
    }
}

/// Reads degrade to an empty list; the failure is only logged.
pub fn or_empty<T>(result: StoreResult<Vec<T>>, what: &str) -> Vec<T> {
    result.unwrap_or_else(|err| {
        match err {
            StoreError::Offline => tracing::debug!("{what}: offline"),
            err => tracing::warn!("{what} failed: {err}"),
        }
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn player_names_are_trimmed_and_length_checked() {
        assert_eq!(validate_player_name("  Nemo ").unwrap(), "Nemo");
        assert!(validate_player_name(" N ").is_err());
        assert!(validate_player_name(&"x".repeat(31)).is_err());
        // characters, not bytes
        assert!(validate_player_name(&"🐠".repeat(30)).is_ok());
    }

    #[test]
    fn guestbook_entries_default_the_avatar_and_await_approval() {
        let entry = NewGuestbookEntry::new(" Ada ", " Hello! ", "  ").unwrap();
        assert_eq!(entry.name, "Ada");
        assert_eq!(entry.message, "Hello!");
        assert_eq!(entry.avatar_emoji, DEFAULT_AVATAR);
        assert!(!entry.is_approved);

        assert!(NewGuestbookEntry::new("", "hi", "🐙").is_err());
        assert!(NewGuestbookEntry::new("Ada", &"m".repeat(501), "🐙").is_err());
    }

    #[test]
    fn offline_store_always_reports_offline() {
        let store = OfflineStore;
        assert_eq!(block_on(store.rank_for_score(10)), Err(StoreError::Offline));
        assert_eq!(
            or_empty(block_on(store.fetch_approved_entries(5)), "guestbook"),
            Vec::new()
        );
    }

    #[test]
    fn rows_with_missing_optional_columns_decode() {
        let entry: HighscoreEntry =
            serde_json::from_str(r#"{ "player_name": "Dory", "score": 420 }"#).unwrap();
        assert_eq!(entry.score, 420);
        assert_eq!(entry.created_at, None);
        assert!(!entry.is_perfect());
    }
}
