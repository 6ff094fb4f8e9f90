use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Page level configuration, embedded in the HTML as
/// `<script type="application/json" id="site-config">`.
///
/// Every field has a default, so `{}` (or no script at all) is a valid
/// configuration that runs the games offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// absent: highscores and guestbook run against the offline store
    pub supabase: Option<SupabaseConfig>,
    pub swimmer_selector: String,
    pub collector_selector: String,
    /// optional PNG used instead of the vector fish
    pub fish_image: Option<String>,
    pub overlay: OverlayConfig,
    pub board: BoardConfig,
    pub guestbook: GuestbookConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub enabled: bool,
    pub max_sprites: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub container_id: String,
    pub limit: usize,
    /// entries in the perfect rounds row, 0 hides it
    pub perfect_limit: usize,
    pub refresh_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuestbookConfig {
    pub form_id: String,
    pub list_id: String,
    pub limit: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            supabase: None,
            swimmer_selector: ".underwater-divider".into(),
            collector_selector: ".aquarium-game".into(),
            fish_image: None,
            overlay: OverlayConfig::default(),
            board: BoardConfig::default(),
            guestbook: GuestbookConfig::default(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        OverlayConfig {
            enabled: true,
            max_sprites: crate::overlay::MAX_SPRITES,
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            container_id: "highscore-board".into(),
            limit: 50,
            perfect_limit: 20,
            refresh_secs: 30,
        }
    }
}

impl Default for GuestbookConfig {
    fn default() -> Self {
        GuestbookConfig {
            form_id: "guestbook-form".into(),
            list_id: "guestbook-entries".into(),
            limit: 20,
        }
    }
}

impl SiteConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(SiteConfig::default());
        }
        serde_json::from_str(trimmed).with_context(|| "parsing site config JSON")
    }

    /// Read the embedded config script. A page without one gets defaults; a
    /// broken one is logged and also falls back to defaults.
    pub fn from_page() -> Self {
        let Ok(element) = crate::browser::element_by_id(crate::browser::html::CONFIG_ID) else {
            tracing::info!("no site config found, using defaults");
            return SiteConfig::default();
        };
        let text = element.text_content().unwrap_or_default();
        SiteConfig::from_json(&text).unwrap_or_else(|err| {
            tracing::warn!("ignoring site config: {err:#}");
            SiteConfig::default()
        })
    }

    pub fn is_online(&self) -> bool {
        self.supabase
            .as_ref()
            .is_some_and(|s| !s.url.is_empty() && !s.anon_key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        assert_eq!(SiteConfig::from_json("{}").unwrap(), SiteConfig::default());
        assert_eq!(SiteConfig::from_json("  ").unwrap(), SiteConfig::default());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = SiteConfig::from_json(
            r##"{
                "supabase": { "url": "https://example.supabase.co", "anon_key": "k" },
                "board": { "limit": 5 },
                "collector_selector": "#game"
            }"##,
        )
        .unwrap();
        assert!(config.is_online());
        assert_eq!(config.board.limit, 5);
        assert_eq!(config.board.refresh_secs, 30);
        assert_eq!(config.board.perfect_limit, 20);
        assert_eq!(config.collector_selector, "#game");
        assert_eq!(config.swimmer_selector, ".underwater-divider");
    }

    #[test]
    fn blank_credentials_mean_offline() {
        let config =
            SiteConfig::from_json(r#"{ "supabase": { "url": "", "anon_key": "" } }"#).unwrap();
        assert!(!config.is_online());
        assert!(!SiteConfig::default().is_online());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(SiteConfig::from_json("{ nope").is_err());
    }
}
