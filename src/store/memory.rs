use super::{
    GuestbookEntry, GuestbookStore, HighscoreEntry, HighscoreStore, NewGuestbookEntry,
    NewHighscore, StoreResult, PERFECT_ITEMS,
};
use async_trait::async_trait;
use std::cell::{Cell, RefCell};

/// In-process tables. Ids increase with insertion and stand in for
/// `created_at` when ordering.
#[derive(Debug, Default)]
pub struct MemoryStore {
    highscores: RefCell<Vec<HighscoreEntry>>,
    guestbook: RefCell<Vec<GuestbookEntry>>,
    next_id: Cell<i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn next_id(&self) -> i64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    /// Moderation happens outside the site; tests use this instead.
    pub fn approve(&self, id: i64) -> bool {
        let mut rows = self.guestbook.borrow_mut();
        match rows.iter_mut().find(|row| row.id == Some(id)) {
            Some(row) => {
                row.is_approved = true;
                true
            }
            None => false,
        }
    }

    pub fn highscore_count(&self) -> usize {
        self.highscores.borrow().len()
    }
}

#[async_trait(?Send)]
impl HighscoreStore for MemoryStore {
    async fn submit_highscore(&self, record: NewHighscore) -> StoreResult<HighscoreEntry> {
        let record = record.validated()?;
        let entry = HighscoreEntry {
            id: Some(self.next_id()),
            player_name: record.player_name,
            score: record.score,
            collected_items: record.collected_items,
            game_time: record.game_time,
            game_duration_actual: Some(record.game_duration_actual),
            bonus_points: Some(record.bonus_points),
            created_at: None,
        };
        self.highscores.borrow_mut().push(entry.clone());
        Ok(entry)
    }

    async fn fetch_top_scores(&self, limit: usize) -> StoreResult<Vec<HighscoreEntry>> {
        let mut rows = self.highscores.borrow().clone();
        rows.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn fetch_perfect_scores(&self, limit: usize) -> StoreResult<Vec<HighscoreEntry>> {
        let mut rows: Vec<_> = self
            .highscores
            .borrow()
            .iter()
            .filter(|row| row.collected_items == PERFECT_ITEMS)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.score.cmp(&a.score).then(a.game_time.cmp(&b.game_time)));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn rank_for_score(&self, score: u32) -> StoreResult<u32> {
        let higher = self
            .highscores
            .borrow()
            .iter()
            .filter(|row| row.score > score)
            .count();
        Ok(higher as u32 + 1)
    }
}

#[async_trait(?Send)]
impl GuestbookStore for MemoryStore {
    async fn submit_guestbook_entry(&self, entry: NewGuestbookEntry) -> StoreResult<GuestbookEntry> {
        let entry = NewGuestbookEntry::new(&entry.name, &entry.message, &entry.avatar_emoji)?;
        let row = GuestbookEntry {
            id: Some(self.next_id()),
            name: entry.name,
            message: entry.message,
            avatar_emoji: Some(entry.avatar_emoji),
            is_approved: false,
            created_at: None,
        };
        self.guestbook.borrow_mut().push(row.clone());
        Ok(row)
    }

    async fn fetch_approved_entries(&self, limit: usize) -> StoreResult<Vec<GuestbookEntry>> {
        Ok(self
            .guestbook
            .borrow()
            .iter()
            .rev()
            .filter(|row| row.is_approved)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn record(name: &str, score: u32, collected: u32, game_time: u32) -> NewHighscore {
        NewHighscore {
            player_name: name.into(),
            score,
            collected_items: collected,
            game_time,
            game_duration_actual: game_time,
            bonus_points: 0,
        }
    }

    #[test]
    fn top_scores_break_ties_by_age() {
        let store = MemoryStore::new();
        block_on(async {
            store.submit_highscore(record("Old", 100, 10, 90)).await.unwrap();
            store.submit_highscore(record("Best", 300, 20, 90)).await.unwrap();
            store.submit_highscore(record("New", 100, 12, 90)).await.unwrap();
            let names: Vec<_> = store
                .fetch_top_scores(10)
                .await
                .unwrap()
                .into_iter()
                .map(|row| row.player_name)
                .collect();
            assert_eq!(names, ["Best", "Old", "New"]);
            assert_eq!(store.fetch_top_scores(1).await.unwrap().len(), 1);
        });
    }

    #[test]
    fn rank_counts_strictly_higher_scores() {
        let store = MemoryStore::new();
        block_on(async {
            assert_eq!(store.rank_for_score(0).await, Ok(1));
            store.submit_highscore(record("A", 200, 10, 90)).await.unwrap();
            store.submit_highscore(record("B", 100, 10, 90)).await.unwrap();
            assert_eq!(store.rank_for_score(100).await, Ok(2));
            assert_eq!(store.rank_for_score(150).await, Ok(2));
            assert_eq!(store.rank_for_score(50).await, Ok(3));
        });
    }

    #[test]
    fn perfect_scores_prefer_faster_rounds() {
        let store = MemoryStore::new();
        block_on(async {
            store.submit_highscore(record("Slow", 500, 20, 90)).await.unwrap();
            store.submit_highscore(record("Fast", 500, 20, 65)).await.unwrap();
            store.submit_highscore(record("Partial", 900, 19, 60)).await.unwrap();
            let rows = store.fetch_perfect_scores(10).await.unwrap();
            let names: Vec<_> = rows.iter().map(|row| row.player_name.as_str()).collect();
            assert_eq!(names, ["Fast", "Slow"]);
        });
    }

    #[test]
    fn invalid_names_are_rejected() {
        let store = MemoryStore::new();
        assert!(block_on(store.submit_highscore(record("X", 1, 1, 90))).is_err());
        assert_eq!(store.highscore_count(), 0);
    }

    #[test]
    fn only_approved_entries_are_listed_newest_first() {
        let store = MemoryStore::new();
        block_on(async {
            let first = store
                .submit_guestbook_entry(NewGuestbookEntry::new("Ada", "first", "").unwrap())
                .await
                .unwrap();
            store
                .submit_guestbook_entry(NewGuestbookEntry::new("Bob", "pending", "🐙").unwrap())
                .await
                .unwrap();
            let third = store
                .submit_guestbook_entry(NewGuestbookEntry::new("Cy", "third", "🦈").unwrap())
                .await
                .unwrap();
            assert!(store.fetch_approved_entries(10).await.unwrap().is_empty());

            assert!(store.approve(first.id.unwrap()));
            assert!(store.approve(third.id.unwrap()));
            let names: Vec<_> = store
                .fetch_approved_entries(10)
                .await
                .unwrap()
                .into_iter()
                .map(|row| row.name)
                .collect();
            assert_eq!(names, ["Cy", "Ada"]);
        });
    }
}
