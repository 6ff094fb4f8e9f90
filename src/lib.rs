// ==================== Modules ====================
pub mod board;
pub mod browser;
pub mod collector;
pub mod config;
pub mod engine;
pub mod guestbook;
pub mod overlay;
pub mod scheduler;
pub mod site;
pub mod store;
pub mod swimmer;

// ==================== Imports ====================
use config::SiteConfig;
use once_cell::unsync::OnceCell;
use site::Site;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsValue;

thread_local! {
    // one site per page, alive until the page goes away
    static SITE: OnceCell<Site> = OnceCell::new();
}

// ==================== Main Functions ====================
/// Main entry for Webassembly module
/// - installs panic hook and tracing
/// - reads the embedded site config
/// - discovers games and starts the frame loop
#[wasm_bindgen]
pub fn main_js() -> Result<(), JsValue> {
    init_diagnostics();
    launch(SiteConfig::from_page())
}

/// Start with a config object from JavaScript instead of the embedded one.
#[wasm_bindgen]
pub fn start_with_config(config: JsValue) -> Result<(), JsValue> {
    init_diagnostics();
    let config: SiteConfig = if config.is_undefined() || config.is_null() {
        SiteConfig::default()
    } else {
        serde_wasm_bindgen::from_value(config)?
    };
    launch(config)
}

/// Abandon every running collector round.
#[wasm_bindgen]
pub fn stop_all_games() {
    SITE.with(|site| {
        if let Some(site) = site.get() {
            site.stop_all();
        }
    });
}

/// Reload the approved guestbook entries, e.g. after moderation.
#[wasm_bindgen]
pub fn refresh_guestbook() {
    SITE.with(|site| {
        if let Some(guestbook) = site.get().and_then(Site::guestbook) {
            guestbook.refresh();
        }
    });
}

fn init_diagnostics() {
    // setup better panic messages for debugging
    console_error_panic_hook::set_once();
    // a second call keeps the first subscriber
    let _ = tracing_wasm::try_set_as_global_default();
}

fn launch(config: SiteConfig) -> Result<(), JsValue> {
    SITE.with(|cell| {
        if cell.get().is_some() {
            tracing::warn!("site already started, ignoring second start");
            return Ok(());
        }
        let site = Site::start(config).map_err(|err| JsValue::from_str(&format!("{err:#}")))?;
        // checked above, a second set cannot happen
        let _ = cell.set(site);
        Ok(())
    })
}
