//! Scrolling strip of top scores under the collector games.

use crate::browser::{self, html};
use crate::config::BoardConfig;
use crate::store::{or_empty, HighscoreEntry, Store};
use anyhow::{anyhow, Result};
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use web_sys::HtmlElement;

pub const ITEM_HEIGHT: f64 = 50.0;
/// px the strip moves per 60 fps frame
pub const SCROLL_PER_FRAME: f64 = 0.5;

pub fn medal(rank: usize) -> Option<&'static str> {
    match rank {
        1 => Some("🥇"),
        2 => Some("🥈"),
        3 => Some("🥉"),
        _ => None,
    }
}

/// Seconds for one full pass of `count` items.
pub fn scroll_duration_secs(count: usize) -> f64 {
    count as f64 * ITEM_HEIGHT / (SCROLL_PER_FRAME * crate::engine::FRAME_RATE)
}

fn render_item(rank: usize, entry: &HighscoreEntry) -> String {
    let badge = medal(rank)
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{rank}"));
    let star = if entry.is_perfect() { " ⭐" } else { "" };
    format!(
        r#"<div class="highscore-item"><span class="highscore-rank">{badge}</span><span class="highscore-name">{}{star}</span><span class="highscore-score">{}</span></div>"#,
        html::escape(&entry.player_name),
        entry.score,
    )
}

/// Top list markup. The list is written twice so the CSS animation can loop
/// without a visible seam.
pub fn render(entries: &[HighscoreEntry]) -> String {
    if entries.is_empty() {
        return r#"<div class="highscore-empty">No highscores yet. Be the first!</div>"#.to_string();
    }
    let items: String = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| render_item(index + 1, entry))
        .collect();
    format!(
        r#"<div class="highscore-track" style="animation-duration: {:.1}s">{items}{items}</div>"#,
        scroll_duration_secs(entries.len()),
    )
}

/// Row of perfect rounds, fastest first. Empty when there are none.
pub fn render_perfect(entries: &[HighscoreEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let names: String = entries
        .iter()
        .map(|entry| {
            let seconds = entry
                .game_duration_actual
                .map(|secs| format!(" · {secs}s"))
                .unwrap_or_default();
            format!(
                r#"<span class="perfect-entry">{}{seconds}</span>"#,
                html::escape(&entry.player_name),
            )
        })
        .collect();
    format!(r#"<div class="highscore-perfect"><span class="perfect-badge">⭐ 20/20</span>{names}</div>"#)
}

pub struct HighscoreBoard {
    container: HtmlElement,
    store: Rc<dyn Store>,
    limit: usize,
    perfect_limit: usize,
    refresh_secs: u32,
    shown: Cell<bool>,
}

impl HighscoreBoard {
    /// `None` when the page has no board container.
    pub fn attach(config: &BoardConfig, store: Rc<dyn Store>) -> Result<Option<Rc<Self>>> {
        let Ok(element) = browser::element_by_id(&config.container_id) else {
            tracing::debug!(id = %config.container_id, "no highscore board on this page");
            return Ok(None);
        };
        let container = element
            .dyn_into::<HtmlElement>()
            .map_err(|element| anyhow!("Error converting {:#?} to HtmlElement", element))?;
        browser::set_hidden(&container, true);

        let board = Rc::new(HighscoreBoard {
            container,
            store,
            limit: config.limit,
            perfect_limit: config.perfect_limit,
            refresh_secs: config.refresh_secs,
            shown: Cell::new(false),
        });
        board.schedule_refresh()?;
        Ok(Some(board))
    }

    fn schedule_refresh(self: &Rc<Self>) -> Result<()> {
        if self.refresh_secs == 0 {
            return Ok(());
        }
        let board = Rc::downgrade(self);
        browser::set_interval(self.refresh_secs as i32 * 1000, move || {
            if let Some(board) = board.upgrade() {
                if board.shown.get() {
                    board.refresh();
                }
            }
        })?;
        Ok(())
    }

    /// Reveal the board and load fresh scores.
    pub fn show(self: &Rc<Self>) {
        if !self.shown.replace(true) {
            browser::set_hidden(&self.container, false);
        }
        self.refresh();
    }

    pub fn refresh(self: &Rc<Self>) {
        let board = self.clone();
        browser::spawn_local(async move {
            let store = board.store.as_ref();
            let (top, perfect) = futures::join!(
                store.fetch_top_scores(board.limit),
                store.fetch_perfect_scores(board.perfect_limit),
            );
            let top = or_empty(top, "highscore board");
            let perfect = if board.perfect_limit == 0 {
                Vec::new()
            } else {
                or_empty(perfect, "perfect rounds")
            };
            board
                .container
                .set_inner_html(&format!("{}{}", render_perfect(&perfect), render(&top)));
            tracing::debug!(count = top.len(), perfect = perfect.len(), "highscore board refreshed");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, score: u32, collected: u32) -> HighscoreEntry {
        HighscoreEntry {
            id: None,
            player_name: name.to_string(),
            score,
            collected_items: collected,
            game_time: 90,
            game_duration_actual: None,
            bonus_points: None,
            created_at: None,
        }
    }

    #[test]
    fn medals_for_the_podium_only() {
        assert_eq!(medal(1), Some("🥇"));
        assert_eq!(medal(3), Some("🥉"));
        assert_eq!(medal(4), None);
    }

    #[test]
    fn ten_items_scroll_in_about_seventeen_seconds() {
        // 500 px at 30 px/s
        approx::assert_relative_eq!(scroll_duration_secs(10), 500.0 / 30.0);
    }

    #[test]
    fn render_escapes_names_and_marks_perfect_rounds() {
        let markup = render(&[
            entry("<script>", 700, 20),
            entry("Dory", 500, 12),
            entry("Marlin", 400, 9),
            entry("Bruce", 300, 3),
        ]);
        assert!(markup.contains("&lt;script&gt; ⭐"));
        assert!(!markup.contains("<script>"));
        assert!(markup.contains("🥈"));
        assert!(markup.contains("#4"));
        assert!(markup.contains("Dory</span>"));
        // written twice for the seamless loop
        assert_eq!(markup.matches("Marlin").count(), 2);
    }

    #[test]
    fn perfect_row_lists_fastest_rounds_escaped() {
        let mut fast = entry("Gill & co", 450, 20);
        fast.game_duration_actual = Some(41);
        let row = render_perfect(&[fast, entry("Dory", 430, 20)]);
        assert!(row.contains("⭐ 20/20"));
        assert!(row.contains("Gill &amp; co · 41s"));
        assert!(row.contains(r#"<span class="perfect-entry">Dory</span>"#));
        assert!(render_perfect(&[]).is_empty());
    }

    #[test]
    fn star_needs_exactly_twenty_items() {
        assert!(!render(&[entry("Bruce", 900, 21)]).contains("⭐"));
        assert!(!render(&[entry("Bruce", 900, 19)]).contains("⭐"));
    }

    #[test]
    fn empty_board_invites_players() {
        assert!(render(&[]).contains("Be the first"));
    }
}
