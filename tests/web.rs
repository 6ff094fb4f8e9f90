#![cfg(target_arch = "wasm32")]

use fischseite_games::browser;
use fischseite_games::config::SiteConfig;
use fischseite_games::engine::{Frame, Game, Point, Renderer};
use fischseite_games::site::listen_swimmer_input;
use fischseite_games::swimmer::obstacle::Arena;
use fischseite_games::swimmer::{Phase, SwimmerGame};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen_test::*;
use web_sys::{HtmlElement, MouseEvent, MouseEventInit};

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn a_page_without_config_runs_offline() {
    let config = SiteConfig::from_page();
    assert_eq!(config, SiteConfig::default());
    assert!(!config.is_online());
}

#[wasm_bindgen_test]
fn canvases_fill_their_container_with_a_minimum_height() {
    let container: HtmlElement = browser::create_element("div").unwrap();
    container.style().set_property("width", "300px").unwrap();
    browser::document()
        .unwrap()
        .body()
        .unwrap()
        .append_child(&container)
        .unwrap();

    let canvas = browser::create_canvas(&container, "game-canvas").unwrap();
    assert_eq!(canvas.class_name(), "game-canvas");
    assert_eq!(container.child_element_count(), 1);

    let (width, height) = browser::fit_canvas(&canvas, &container, 2.0, 400.0).unwrap();
    assert_eq!(width, 600.0);
    assert_eq!(height, 800.0);
    assert_eq!(canvas.width(), 600);
    assert_eq!(canvas.style().get_property_value("height").unwrap(), "400px");

    container.remove();
}

#[wasm_bindgen_test]
fn escaped_markup_stays_text() {
    let container: HtmlElement = browser::create_element("div").unwrap();
    container.set_inner_html(&browser::html::escape("<b>Nemo</b> & co"));
    assert_eq!(container.text_content().unwrap(), "<b>Nemo</b> & co");
    assert_eq!(container.child_element_count(), 0);
}

#[wasm_bindgen_test]
fn swimmer_input_reaches_it_from_anywhere_on_the_page() {
    let body = browser::document().unwrap().body().unwrap();
    let canvas = browser::create_canvas(&body, "swimmer-canvas").unwrap();
    let game = Rc::new(RefCell::new(SwimmerGame::new(
        Arena::default(),
        StdRng::seed_from_u64(1),
    )));
    listen_swimmer_input(&game, &canvas).unwrap();
    let window = browser::window().unwrap();

    // far below the canvas still steers, clamped to the bottom
    let init = MouseEventInit::new();
    init.set_client_y(10_000);
    let moved = MouseEvent::new_with_mouse_event_init_dict("mousemove", &init).unwrap();
    window.dispatch_event(&moved).unwrap();
    assert_eq!(game.borrow().context().target_y, 1.0);

    {
        let mut game = game.borrow_mut();
        game.start();
        for _ in 0..5 {
            game.hit();
            for _ in 0..40 {
                game.update(&Frame::new(0.05, 0.0));
            }
        }
        assert_eq!(game.phase(), Phase::GameOver);
    }
    let click = MouseEvent::new("click").unwrap();
    window.dispatch_event(&click).unwrap();
    assert_eq!(game.borrow().phase(), Phase::Idle);

    canvas.remove();
}

#[wasm_bindgen_test]
fn transformed_drawing_runs_inside_the_saved_state() {
    let container: HtmlElement = browser::create_element("div").unwrap();
    let canvas = browser::create_canvas(&container, "scratch").unwrap();
    let renderer = Renderer::new(browser::context(&canvas).unwrap());
    let drawn = Cell::new(false);
    renderer.transformed(Point { x: 10.0, y: 20.0 }, (-1.0, 1.0), 0.5, |_| drawn.set(true));
    assert!(drawn.get());
}
