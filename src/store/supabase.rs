use super::{
    GuestbookEntry, GuestbookStore, HighscoreEntry, HighscoreStore, NewGuestbookEntry,
    NewHighscore, StoreError, StoreResult, PERFECT_ITEMS,
};
use crate::browser::{self, FetchRequest};
use crate::config::SupabaseConfig;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

const HIGHSCORES: &str = "highscores";
const GUESTBOOK: &str = "guestbook";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// PostgREST query string builder.
///
/// `Query::new().eq("is_approved", true).order(&[("created_at", Desc)])`
/// renders `is_approved=eq.true&order=created_at.desc`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Query::default()
    }

    fn push(mut self, key: &str, value: String) -> Self {
        self.params.push((key.to_string(), value));
        self
    }

    pub fn select(self, columns: &str) -> Self {
        self.push("select", columns.to_string())
    }

    pub fn eq(self, column: &str, value: impl fmt::Display) -> Self {
        self.push(column, format!("eq.{value}"))
    }

    pub fn gt(self, column: &str, value: impl fmt::Display) -> Self {
        self.push(column, format!("gt.{value}"))
    }

    pub fn order(self, columns: &[(&str, Direction)]) -> Self {
        let value = columns
            .iter()
            .map(|(column, direction)| match direction {
                Direction::Asc => format!("{column}.asc"),
                Direction::Desc => format!("{column}.desc"),
            })
            .collect::<Vec<_>>()
            .join(",");
        self.push("order", value)
    }

    pub fn limit(self, limit: usize) -> Self {
        self.push("limit", limit.to_string())
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (key, value)) in self.params.iter().enumerate() {
            if index > 0 {
                f.write_str("&")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/12`.
pub fn parse_content_range_total(header: &str) -> StoreResult<u32> {
    header
        .rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse().ok())
        .ok_or_else(|| StoreError::Decode(format!("bad Content-Range '{header}'")))
}

/// Supabase REST backend, one `fetch` per call.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    base_url: String,
    anon_key: String,
}

impl SupabaseStore {
    pub fn new(config: &SupabaseConfig) -> Self {
        SupabaseStore {
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
        }
    }

    pub fn table_url(&self, table: &str, query: &Query) -> String {
        format!("{}/rest/v1/{}?{}", self.base_url, table, query)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.anon_key)
    }

    async fn send(
        &self,
        method: &str,
        url: &str,
        prefer: Option<&str>,
        body: Option<String>,
    ) -> StoreResult<web_sys::Response> {
        let bearer = self.bearer();
        let mut headers = vec![
            ("apikey", self.anon_key.as_str()),
            ("Authorization", bearer.as_str()),
            ("Content-Type", "application/json"),
        ];
        if let Some(prefer) = prefer {
            headers.push(("Prefer", prefer));
        }
        let resp = browser::fetch(FetchRequest {
            method,
            url,
            headers: &headers,
            body,
        })
        .await
        .map_err(|err| StoreError::Transport(format!("{err:#}")))?;

        if resp.ok() {
            Ok(resp)
        } else {
            let body = browser::response_text(&resp).await.unwrap_or_default();
            Err(StoreError::Http {
                status: resp.status(),
                body,
            })
        }
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: Query) -> StoreResult<Vec<T>> {
        let url = self.table_url(table, &query);
        let resp = self.send("GET", &url, None, None).await?;
        browser::response_json(&resp)
            .await
            .map_err(|err| StoreError::Decode(format!("{err:#}")))
    }

    async fn insert<B, T>(&self, table: &str, row: &B) -> StoreResult<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let body = serde_json::to_string(row).map_err(|err| StoreError::Invalid(err.to_string()))?;
        let url = self.table_url(table, &Query::new());
        let resp = self
            .send("POST", &url, Some("return=representation"), Some(body))
            .await?;
        let rows: Vec<T> = browser::response_json(&resp)
            .await
            .map_err(|err| StoreError::Decode(format!("{err:#}")))?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode(format!("insert into {table} returned no row")))
    }

    async fn count(&self, table: &str, query: Query) -> StoreResult<u32> {
        let url = self.table_url(table, &query);
        let resp = self.send("HEAD", &url, Some("count=exact"), None).await?;
        let header = resp
            .headers()
            .get("Content-Range")
            .map_err(|err| StoreError::Decode(format!("{err:?}")))?
            .ok_or_else(|| StoreError::Decode("missing Content-Range".into()))?;
        parse_content_range_total(&header)
    }
}

#[async_trait(?Send)]
impl HighscoreStore for SupabaseStore {
    async fn submit_highscore(&self, record: NewHighscore) -> StoreResult<HighscoreEntry> {
        let record = record.validated()?;
        let saved: HighscoreEntry = self.insert(HIGHSCORES, &record).await?;
        tracing::info!(score = saved.score, "highscore saved");
        Ok(saved)
    }

    async fn fetch_top_scores(&self, limit: usize) -> StoreResult<Vec<HighscoreEntry>> {
        self.select(HIGHSCORES, top_scores_query(limit)).await
    }

    async fn fetch_perfect_scores(&self, limit: usize) -> StoreResult<Vec<HighscoreEntry>> {
        self.select(HIGHSCORES, perfect_scores_query(limit)).await
    }

    async fn rank_for_score(&self, score: u32) -> StoreResult<u32> {
        let higher = self
            .count(HIGHSCORES, Query::new().select("*").gt("score", score))
            .await?;
        Ok(higher + 1)
    }
}

#[async_trait(?Send)]
impl GuestbookStore for SupabaseStore {
    async fn submit_guestbook_entry(&self, entry: NewGuestbookEntry) -> StoreResult<GuestbookEntry> {
        let entry = NewGuestbookEntry::new(&entry.name, &entry.message, &entry.avatar_emoji)?;
        self.insert(GUESTBOOK, &entry).await
    }

    async fn fetch_approved_entries(&self, limit: usize) -> StoreResult<Vec<GuestbookEntry>> {
        self.select(GUESTBOOK, approved_entries_query(limit)).await
    }
}

fn top_scores_query(limit: usize) -> Query {
    Query::new()
        .select("*")
        .order(&[("score", Direction::Desc), ("created_at", Direction::Asc)])
        .limit(limit)
}

fn perfect_scores_query(limit: usize) -> Query {
    Query::new()
        .select("*")
        .eq("collected_items", PERFECT_ITEMS)
        .order(&[("score", Direction::Desc), ("game_time", Direction::Asc)])
        .limit(limit)
}

fn approved_entries_query(limit: usize) -> Query {
    Query::new()
        .select("*")
        .eq("is_approved", true)
        .order(&[("created_at", Direction::Desc)])
        .limit(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SupabaseStore {
        SupabaseStore::new(&SupabaseConfig {
            url: "https://project.supabase.co/".into(),
            anon_key: "anon".into(),
        })
    }

    #[test]
    fn queries_render_postgrest_syntax() {
        assert_eq!(
            top_scores_query(10).to_string(),
            "select=*&order=score.desc,created_at.asc&limit=10"
        );
        assert_eq!(
            perfect_scores_query(5).to_string(),
            "select=*&collected_items=eq.20&order=score.desc,game_time.asc&limit=5"
        );
        assert_eq!(
            approved_entries_query(20).to_string(),
            "select=*&is_approved=eq.true&order=created_at.desc&limit=20"
        );
    }

    #[test]
    fn table_urls_drop_the_trailing_slash() {
        let url = store().table_url(HIGHSCORES, &Query::new().select("*").gt("score", 300));
        assert_eq!(
            url,
            "https://project.supabase.co/rest/v1/highscores?select=*&score=gt.300"
        );
        assert_eq!(store().bearer(), "Bearer anon");
    }

    #[test]
    fn content_range_totals() {
        assert_eq!(parse_content_range_total("0-24/3573"), Ok(3573));
        assert_eq!(parse_content_range_total("*/0"), Ok(0));
        assert!(parse_content_range_total("0-24/*").is_err());
        assert!(parse_content_range_total("garbage").is_err());
    }
}
