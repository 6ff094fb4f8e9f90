//! The page registry: discovers game containers, builds their canvases,
//! wires listeners and owns everything for the lifetime of the page.

use crate::board::HighscoreBoard;
use crate::browser::{self, html};
use crate::collector::highscore::{prompt_message, settle_round, HighscoreStatus, NamePrompt};
use crate::collector::scoring::GameSummary;
use crate::collector::{CollectorGame, Phase};
use crate::config::SiteConfig;
use crate::engine::{self, FrameLoop, Point, Renderer};
use crate::guestbook::Guestbook;
use crate::overlay::AmbientOverlay;
use crate::scheduler::{InstanceId, Scheduler, SharedGame};
use crate::store::{OfflineStore, Store, SupabaseStore};
use crate::swimmer::obstacle::Arena;
use crate::swimmer::SwimmerGame;
use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Element, Event, HtmlCanvasElement, HtmlElement, IntersectionObserver,
    IntersectionObserverEntry, IntersectionObserverInit, KeyboardEvent, MouseEvent, TouchEvent,
};

const SWIMMER_MIN_HEIGHT: f64 = 60.0;
const COLLECTOR_MIN_HEIGHT: f64 = 400.0;
const VISIBILITY_THRESHOLD: f64 = 0.1;

/// A game, its canvas and the container it lives in.
struct Mounted<G> {
    id: InstanceId,
    game: Rc<RefCell<G>>,
    canvas: HtmlCanvasElement,
    container: Element,
}

// manual impl: G itself need not be Clone
impl<G> Clone for Mounted<G> {
    fn clone(&self) -> Self {
        Mounted {
            id: self.id,
            game: self.game.clone(),
            canvas: self.canvas.clone(),
            container: self.container.clone(),
        }
    }
}

/// Asks through `window.prompt`.
pub struct WindowPrompt;

impl NamePrompt for WindowPrompt {
    fn ask(&self, summary: &GameSummary, rank: Option<u32>) -> Option<String> {
        browser::prompt(&prompt_message(summary, rank), "").unwrap_or_else(|err| {
            tracing::warn!("{err:#}");
            None
        })
    }
}

pub struct Site {
    config: SiteConfig,
    store: Rc<dyn Store>,
    scheduler: Rc<RefCell<Scheduler>>,
    swimmers: Vec<Mounted<SwimmerGame>>,
    collectors: Rc<Vec<Mounted<CollectorGame>>>,
    overlay: Option<Rc<RefCell<AmbientOverlay>>>,
    board: Option<Rc<HighscoreBoard>>,
    guestbook: Option<Rc<Guestbook>>,
    // held so the observer lives as long as the page
    _observer: Option<IntersectionObserver>,
}

fn pick_store(config: &SiteConfig) -> Rc<dyn Store> {
    match &config.supabase {
        Some(supabase) if config.is_online() => {
            tracing::info!(url = %supabase.url, "using supabase store");
            Rc::new(SupabaseStore::new(supabase))
        }
        _ => {
            tracing::info!("no backend configured, running offline");
            Rc::new(OfflineStore)
        }
    }
}

fn mouse_point(event: &MouseEvent) -> (f64, f64) {
    (event.client_x() as f64, event.client_y() as f64)
}

fn touch_point(event: &TouchEvent) -> Option<(f64, f64)> {
    let touch = event
        .touches()
        .get(0)
        .or_else(|| event.changed_touches().get(0))?;
    Some((touch.client_x() as f64, touch.client_y() as f64))
}

/// Swimmer input is page wide: the pointer steers from anywhere on the page
/// and any click restarts a finished game. Listeners stay passive so the
/// page keeps scrolling.
pub fn listen_swimmer_input(
    game: &Rc<RefCell<SwimmerGame>>,
    canvas: &HtmlCanvasElement,
) -> Result<()> {
    let window = browser::window()?;

    let steer = |game: Rc<RefCell<SwimmerGame>>, canvas: HtmlCanvasElement| {
        move |(x, y): (f64, f64)| {
            if canvas.get_bounding_client_rect().height() <= 0.0 {
                return;
            }
            let (_, y) = browser::relative_position(&canvas, x, y, browser::device_pixel_ratio());
            game.borrow_mut().steer_to(y);
        }
    };

    let on_mouse = steer(game.clone(), canvas.clone());
    browser::listen(&window, "mousemove", move |event: MouseEvent| {
        on_mouse(mouse_point(&event));
    })?;
    for kind in ["touchstart", "touchmove"] {
        let on_touch = steer(game.clone(), canvas.clone());
        browser::listen(&window, kind, move |event: TouchEvent| {
            if let Some(point) = touch_point(&event) {
                on_touch(point);
            }
        })?;
    }

    let game = game.clone();
    browser::listen(&window, "click", move |_: MouseEvent| game.borrow_mut().click())
}

impl Site {
    pub fn start(config: SiteConfig) -> Result<Site> {
        let store = pick_store(&config);
        let scheduler = Rc::new(RefCell::new(Scheduler::new()));
        let board = HighscoreBoard::attach(&config.board, store.clone())?;
        let guestbook = Guestbook::attach(&config.guestbook, store.clone())?;

        let mut site = Site {
            swimmers: Vec::new(),
            collectors: Rc::new(Vec::new()),
            overlay: None,
            _observer: None,
            config,
            store,
            scheduler,
            board,
            guestbook,
        };
        site.mount_swimmers()?;
        site.mount_collectors()?;
        if site.config.overlay.enabled {
            site.mount_overlay()?;
        }
        site.listen_keys()?;
        site.listen_resize()?;
        site.observe_visibility();
        FrameLoop::start(site.scheduler.clone())?;

        tracing::info!(
            swimmers = site.swimmers.len(),
            collectors = site.collectors.len(),
            overlay = site.overlay.is_some(),
            online = site.config.is_online(),
            "site started"
        );
        Ok(site)
    }

    fn register(&self, game: SharedGame, canvas: &HtmlCanvasElement, container: &Element) -> Result<InstanceId> {
        let renderer = Renderer::new(browser::context(canvas)?);
        let id = self
            .scheduler
            .borrow_mut()
            .register(game, Some(renderer), false);
        container
            .set_attribute(html::INSTANCE_ATTRIBUTE, &id.0.to_string())
            .map_err(|err| anyhow!("Could not tag container : {:#?}", err))?;
        Ok(id)
    }

    fn mount_swimmers(&mut self) -> Result<()> {
        let (viewport_width, _) = browser::viewport_size()?;
        for container in browser::query_all(&self.config.swimmer_selector)? {
            let canvas = browser::create_canvas(&container, "swimmer-canvas")?;
            let dpr = browser::device_pixel_ratio();
            let (width, height) = browser::fit_canvas(&canvas, &container, dpr, SWIMMER_MIN_HEIGHT)?;
            let arena = Arena {
                width,
                height,
                dpr,
                viewport_width,
                ..Arena::default()
            };
            let game = Rc::new(RefCell::new(SwimmerGame::new(arena, StdRng::from_entropy())));
            let id = self.register(game.clone(), &canvas, &container)?;
            let mounted = Mounted {
                id,
                game,
                canvas,
                container,
            };
            listen_swimmer_input(&mounted.game, &mounted.canvas)?;
            self.swimmers.push(mounted);
        }

        if let Some(source) = self.config.fish_image.clone() {
            let games: Vec<_> = self.swimmers.iter().map(|m| Rc::downgrade(&m.game)).collect();
            browser::spawn_local(async move {
                match engine::load_image(&source).await {
                    Ok(image) => {
                        for game in games.iter().filter_map(Weak::upgrade) {
                            game.borrow_mut().set_sprite(image.clone());
                        }
                    }
                    Err(err) => tracing::warn!("keeping the vector fish: {err:#}"),
                }
            });
        }
        Ok(())
    }

    fn mount_collectors(&mut self) -> Result<()> {
        let mut collectors = Vec::new();
        for (index, container) in browser::query_all(&self.config.collector_selector)?
            .into_iter()
            .enumerate()
        {
            let canvas = browser::create_canvas(&container, "collector-canvas")?;
            let (width, height) = browser::fit_canvas(&canvas, &container, 1.0, COLLECTOR_MIN_HEIGHT)?;
            let game = Rc::new(RefCell::new(CollectorGame::new(
                index + 1,
                width,
                height,
                StdRng::from_entropy(),
            )));
            self.wire_round_end(&game);
            let id = self.register(game.clone(), &canvas, &container)?;
            collectors.push(Mounted {
                id,
                game,
                canvas,
                container,
            });
        }
        self.collectors = Rc::new(collectors);

        for mounted in self.collectors.iter() {
            Self::wire_collector(mounted)?;
            Self::add_controls(mounted, &self.collectors)?;
        }
        Ok(())
    }

    fn wire_round_end(&self, game: &Rc<RefCell<CollectorGame>>) {
        let handle = Rc::downgrade(game);
        let store = self.store.clone();
        let board = self.board.clone();
        game.borrow_mut().on_round_end(move |round, summary| {
            if let Some(board) = &board {
                board.show();
            }
            let (summary, store, board, handle) =
                (summary.clone(), store.clone(), board.clone(), handle.clone());
            browser::spawn_local(async move {
                let report = |status: &HighscoreStatus| {
                    let Some(game) = handle.upgrade() else {
                        return;
                    };
                    if let Ok(mut game) = game.try_borrow_mut() {
                        game.set_status(round, status.clone());
                    };
                };
                let status = settle_round(&summary, store.as_ref(), &WindowPrompt, report).await;
                if let (HighscoreStatus::Saved { .. }, Some(board)) = (&status, &board) {
                    board.refresh();
                }
            });
        });
    }

    fn wire_collector(mounted: &Mounted<CollectorGame>) -> Result<()> {
        let canvas = &mounted.canvas;

        let game = mounted.game.clone();
        browser::listen(canvas, "click", move |_: MouseEvent| {
            game.borrow_mut().click();
        })?;

        let (game, target) = (mounted.game.clone(), canvas.clone());
        browser::listen(canvas, "mousemove", move |event: MouseEvent| {
            let (x, y) = mouse_point(&event);
            let (x, y) = browser::relative_position(&target, x, y, 1.0);
            game.borrow_mut().pointer(Point { x, y });
        })?;

        let (game, target) = (mounted.game.clone(), canvas.clone());
        browser::listen(canvas, "touchmove", move |event: TouchEvent| {
            let Some((x, y)) = touch_point(&event) else {
                return;
            };
            let mut game = game.borrow_mut();
            if game.phase() == Phase::Running {
                event.prevent_default();
                let (x, y) = browser::relative_position(&target, x, y, 1.0);
                game.pointer(Point { x, y });
            }
        })?;
        Ok(())
    }

    /// Stop, stop all and restart buttons under the canvas.
    fn add_controls(
        mounted: &Mounted<CollectorGame>,
        all: &Rc<Vec<Mounted<CollectorGame>>>,
    ) -> Result<()> {
        let bar: HtmlElement = browser::create_element("div")?;
        bar.set_class_name("game-controls");

        let button = |label: &str| -> Result<HtmlElement> {
            let button: HtmlElement = browser::create_element("button")?;
            button.set_class_name("game-control");
            button.set_text_content(Some(label));
            button
                .set_attribute("type", "button")
                .and_then(|_| bar.append_child(&button).map(|_| ()))
                .map_err(|err| anyhow!("Could not add control '{}' : {:#?}", label, err))?;
            Ok(button)
        };

        let stop = button("⏹ Stop")?;
        let game = mounted.game.clone();
        browser::listen(&stop, "click", move |_: Event| {
            game.borrow_mut().stop();
        })?;

        let stop_all = button("⏹ Stop all")?;
        let everyone = Rc::downgrade(all);
        browser::listen(&stop_all, "click", move |_: Event| {
            if let Some(everyone) = everyone.upgrade() {
                for mounted in everyone.iter() {
                    mounted.game.borrow_mut().stop();
                }
            }
        })?;

        let restart = button("🔄 Restart")?;
        let game = mounted.game.clone();
        browser::listen(&restart, "click", move |_: Event| {
            game.borrow_mut().restart();
        })?;

        mounted
            .container
            .append_child(&bar)
            .map_err(|err| anyhow!("Could not add controls : {:#?}", err))?;
        Ok(())
    }

    fn mount_overlay(&mut self) -> Result<()> {
        let document = browser::document()?;
        let body = document.body().ok_or_else(|| anyhow!("No body element"))?;
        let canvas: HtmlCanvasElement = browser::create_element("canvas")?;
        canvas.set_class_name("ambient-overlay");
        let style = canvas.style();
        for (property, value) in [
            ("position", "fixed"),
            ("inset", "0"),
            ("pointer-events", "none"),
            ("z-index", "150"),
        ] {
            style
                .set_property(property, value)
                .map_err(|err| anyhow!("Could not style overlay : {:#?}", err))?;
        }
        body.append_child(&canvas)
            .map_err(|err| anyhow!("Could not add overlay : {:#?}", err))?;

        let (width, height) = browser::viewport_size()?;
        canvas.set_width(width as u32);
        canvas.set_height(height as u32);
        let overlay = Rc::new(RefCell::new(AmbientOverlay::new(
            width,
            height,
            self.config.overlay.max_sprites,
            StdRng::from_entropy(),
        )));
        let renderer = Renderer::new(browser::context(&canvas)?);
        self.scheduler
            .borrow_mut()
            .register(overlay.clone(), Some(renderer), true);

        let window = browser::window()?;
        let target = overlay.clone();
        browser::listen(&window, "mousedown", move |event: MouseEvent| {
            let (x, y) = mouse_point(&event);
            if target.borrow_mut().pointer_down(Point { x, y }) {
                event.prevent_default();
                event.stop_propagation();
            }
        })?;
        let target = overlay.clone();
        browser::listen(&window, "mouseup", move |event: MouseEvent| {
            let (x, y) = mouse_point(&event);
            target.borrow_mut().pointer_up(Point { x, y });
        })?;
        let target = overlay.clone();
        browser::listen(&window, "touchstart", move |event: TouchEvent| {
            if let Some((x, y)) = touch_point(&event) {
                if target.borrow_mut().pointer_down(Point { x, y }) {
                    event.prevent_default();
                }
            }
        })?;
        let target = overlay.clone();
        browser::listen(&window, "touchend", move |event: TouchEvent| {
            if let Some((x, y)) = touch_point(&event) {
                target.borrow_mut().pointer_up(Point { x, y });
            }
        })?;

        // keep the canvas for resizes
        let resize_target = Rc::downgrade(&overlay);
        browser::listen(&window, "resize", move |_: Event| {
            let Ok((width, height)) = browser::viewport_size() else {
                return;
            };
            canvas.set_width(width as u32);
            canvas.set_height(height as u32);
            if let Some(overlay) = resize_target.upgrade() {
                overlay.borrow_mut().resize(width, height);
            }
        })?;

        self.overlay = Some(overlay);
        Ok(())
    }

    /// Keys go to every running collector; the swimmers also follow the
    /// arrows. Page scrolling is only suppressed while a round runs.
    fn listen_keys(&self) -> Result<()> {
        let window = browser::window()?;
        let swimmers: Vec<_> = self.swimmers.iter().map(|m| m.game.clone()).collect();
        let collectors = Rc::downgrade(&self.collectors);
        browser::listen(&window, "keydown", move |event: KeyboardEvent| {
            let key = event.key();
            for swimmer in &swimmers {
                swimmer.borrow_mut().key(&key, true);
            }
            let Some(collectors) = collectors.upgrade() else {
                return;
            };
            let mut used = false;
            for mounted in collectors.iter() {
                used |= mounted.game.borrow_mut().key(&key);
            }
            if used {
                event.prevent_default();
            }
        })?;

        let swimmers: Vec<_> = self.swimmers.iter().map(|m| m.game.clone()).collect();
        browser::listen(&window, "keyup", move |event: KeyboardEvent| {
            let key = event.key();
            for swimmer in &swimmers {
                swimmer.borrow_mut().key(&key, false);
            }
        })?;
        Ok(())
    }

    fn listen_resize(&self) -> Result<()> {
        let window = browser::window()?;
        let swimmers = self.swimmers.clone();
        let collectors = Rc::downgrade(&self.collectors);
        browser::listen(&window, "resize", move |_: Event| {
            let dpr = browser::device_pixel_ratio();
            let viewport_width = browser::viewport_size().map(|(w, _)| w).unwrap_or(0.0);
            for mounted in &swimmers {
                match browser::fit_canvas(&mounted.canvas, &mounted.container, dpr, SWIMMER_MIN_HEIGHT) {
                    Ok((w, h)) => mounted.game.borrow_mut().resize(w, h, dpr, viewport_width),
                    Err(err) => tracing::warn!("{err:#}"),
                }
            }
            let Some(collectors) = collectors.upgrade() else {
                return;
            };
            for mounted in collectors.iter() {
                match browser::fit_canvas(&mounted.canvas, &mounted.container, 1.0, COLLECTOR_MIN_HEIGHT) {
                    Ok((w, h)) => mounted.game.borrow_mut().resize(w, h),
                    Err(err) => tracing::warn!("{err:#}"),
                }
            }
        })
    }

    /// Games only run while their container is on screen. Without
    /// `IntersectionObserver` everything just runs.
    fn observe_visibility(&mut self) {
        let containers: Vec<(InstanceId, Element)> = self
            .swimmers
            .iter()
            .map(|m| (m.id, m.container.clone()))
            .chain(self.collectors.iter().map(|m| (m.id, m.container.clone())))
            .collect();

        let scheduler = self.scheduler.clone();
        let callback = browser::closure_wrap(Box::new(move |entries: js_sys::Array, _: JsValue| {
            let mut scheduler = scheduler.borrow_mut();
            for entry in entries.iter() {
                let Ok(entry) = entry.dyn_into::<IntersectionObserverEntry>() else {
                    continue;
                };
                let id = entry
                    .target()
                    .get_attribute(html::INSTANCE_ATTRIBUTE)
                    .and_then(|value| value.parse::<usize>().ok());
                if let Some(id) = id {
                    scheduler.set_visible(InstanceId(id), entry.is_intersecting());
                }
            }
        }) as Box<dyn FnMut(js_sys::Array, JsValue)>);

        let init = IntersectionObserverInit::new();
        init.set_threshold(&JsValue::from_f64(VISIBILITY_THRESHOLD));
        match IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init) {
            Ok(observer) => {
                for (_, container) in &containers {
                    observer.observe(container);
                }
                // the observer calls back for the lifetime of the page
                callback.forget();
                self._observer = Some(observer);
            }
            Err(err) => {
                tracing::warn!("IntersectionObserver unavailable, all games stay live: {err:?}");
                let mut scheduler = self.scheduler.borrow_mut();
                for (id, _) in containers {
                    scheduler.set_visible(id, true);
                }
            }
        }
    }

    pub fn stop_all(&self) {
        for mounted in self.collectors.iter() {
            mounted.game.borrow_mut().stop();
        }
    }

    pub fn guestbook(&self) -> Option<Rc<Guestbook>> {
        self.guestbook.clone()
    }
}
