use crate::browser;
use crate::scheduler::Scheduler;
use anyhow::{anyhow, Error, Result};
// web assembly is a single threaded environment, so Rc RefCell > Mutex
use futures::channel::oneshot::channel;
use std::cell::RefCell;
use std::f64::consts::TAU;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{
    // unchecked_ref (unsafe) cast from Javascript type to Rust type
    // - we control the closure creation and specify the expected type
    JsCast,
    JsValue,
};
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

/// Reference frame rate the per-frame tuning constants assume.
pub const FRAME_RATE: f64 = 60.0;

/// Largest delta (seconds) a single frame may advance the simulation by.
/// Anything longer (tab in background, debugger pause) is clamped.
pub const MAX_FRAME_DELTA: f64 = 0.05;

/// Per-frame input handed to every registered game by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// seconds since the previous frame, clamped to [`MAX_FRAME_DELTA`]
    pub delta: f64,
    /// scroll-derived global speed (swimmer only cares about it)
    pub speed: f64,
    /// true while any collector round is running somewhere on the page
    pub round_active: bool,
    /// animation frame timestamp in ms, unclamped
    pub now_ms: f64,
}

impl Frame {
    pub fn new(delta: f64, speed: f64) -> Self {
        Frame {
            delta,
            speed,
            round_active: false,
            now_ms: 0.0,
        }
    }

    pub fn at(self, now_ms: f64) -> Self {
        Frame { now_ms, ..self }
    }

    /// delta expressed in 60 fps frames, for constants tuned "per frame"
    pub fn steps(&self) -> f64 {
        self.delta * FRAME_RATE
    }
}

/// Everything the shared frame loop can drive.
///
/// ┌──────────── per animation frame ────────────┐
/// │ Scheduler::tick                             │
/// │   ├─► visible? ── no ──► skip (no cost)     │
/// │   └─► yes ─► Game::update(&Frame)           │
/// │              Game::draw(&Renderer)          │
/// └─────────────────────────────────────────────┘
pub trait Game {
    fn update(&mut self, frame: &Frame);
    fn draw(&self, renderer: &Renderer);

    /// A game reports busy while a round is in progress; the decorative
    /// overlay hides itself while anything is busy.
    fn is_busy(&self) -> bool {
        false
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width * 0.5,
            y: self.y + self.height * 0.5,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// Axis aligned bounding box overlap, touching edges do not count.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Overlap test with `padding` added to the far edges of both boxes, so a
    /// near miss still counts. Used where precision would frustrate players.
    pub fn intersects_padded(&self, other: &Rect, padding: f64) -> bool {
        self.x < other.right() + padding
            && self.right() + padding > other.x
            && self.y < other.bottom() + padding
            && self.bottom() + padding > other.y
    }
}

/// Thin wrapper over the 2d context. Drawing failures are logged, never
/// propagated: a broken frame is not worth stopping the page for.
pub struct Renderer {
    context: CanvasRenderingContext2d,
}

impl Renderer {
    pub fn new(context: CanvasRenderingContext2d) -> Self {
        Renderer { context }
    }

    pub fn context(&self) -> &CanvasRenderingContext2d {
        &self.context
    }

    pub fn clear(&self, rect: &Rect) {
        self.context
            .clear_rect(rect.x, rect.y, rect.width, rect.height);
    }

    pub fn fill_rect(&self, rect: &Rect, style: &str) {
        self.context.set_fill_style_str(style);
        self.context
            .fill_rect(rect.x, rect.y, rect.width, rect.height);
    }

    /// Fill `rect` with a vertical gradient through `stops` (offset, colour).
    pub fn fill_vertical_gradient(&self, rect: &Rect, stops: &[(f32, &str)]) {
        let gradient = self
            .context
            .create_linear_gradient(rect.x, rect.y, rect.x, rect.bottom());
        for (offset, color) in stops {
            if let Err(err) = gradient.add_color_stop(*offset, color) {
                tracing::debug!("bad gradient stop {color}: {err:?}");
            }
        }
        self.context.set_fill_style_canvas_gradient(&gradient);
        self.context
            .fill_rect(rect.x, rect.y, rect.width, rect.height);
    }

    pub fn fill_circle(&self, center: Point, radius: f64, style: &str) {
        self.context.begin_path();
        if self
            .context
            .arc(center.x, center.y, radius.max(0.0), 0.0, TAU)
            .is_ok()
        {
            self.context.set_fill_style_str(style);
            self.context.fill();
        }
    }

    pub fn fill_ellipse(&self, center: Point, radius_x: f64, radius_y: f64, style: &str) {
        self.context.begin_path();
        if self
            .context
            .ellipse(center.x, center.y, radius_x.max(0.0), radius_y.max(0.0), 0.0, 0.0, TAU)
            .is_ok()
        {
            self.context.set_fill_style_str(style);
            self.context.fill();
        }
    }

    pub fn fill_polygon(&self, points: &[Point], style: &str) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        self.context.begin_path();
        self.context.move_to(first.x, first.y);
        for point in rest {
            self.context.line_to(point.x, point.y);
        }
        self.context.close_path();
        self.context.set_fill_style_str(style);
        self.context.fill();
    }

    pub fn stroke_curve(&self, from: Point, control: Point, to: Point, style: &str, width: f64) {
        self.context.begin_path();
        self.context.move_to(from.x, from.y);
        self.context
            .quadratic_curve_to(control.x, control.y, to.x, to.y);
        self.context.set_stroke_style_str(style);
        self.context.set_line_width(width);
        self.context.stroke();
    }

    pub fn text(&self, text: &str, position: Point, style: &TextStyle) {
        self.context.set_font(&style.font);
        self.context.set_text_align(style.align);
        self.context.set_text_baseline(style.baseline);
        self.context.set_fill_style_str(style.color);
        if let Err(err) = self.context.fill_text(text, position.x, position.y) {
            tracing::debug!("fill_text failed: {err:?}");
        }
    }

    pub fn draw_image(&self, image: &HtmlImageElement, destination: &Rect) {
        if let Err(err) = self
            .context
            .draw_image_with_html_image_element_and_dw_and_dh(
                image,
                destination.x,
                destination.y,
                destination.width,
                destination.height,
            )
        {
            tracing::debug!("draw_image failed: {err:?}");
        }
    }

    /// Run `draw` with the given global alpha and shadow glow, restoring the
    /// context state afterwards.
    pub fn layer(&self, alpha: f64, glow: Option<(&str, f64)>, draw: impl FnOnce(&Renderer)) {
        self.context.save();
        self.context.set_global_alpha(alpha.clamp(0.0, 1.0));
        if let Some((color, blur)) = glow {
            self.context.set_shadow_color(color);
            self.context.set_shadow_blur(blur);
        }
        draw(self);
        self.context.restore();
    }

    /// Run `draw` in a translated / scaled / rotated coordinate space.
    pub fn transformed(
        &self,
        origin: Point,
        scale: (f64, f64),
        rotation: f64,
        draw: impl FnOnce(&Renderer),
    ) {
        self.context.save();
        let moved = self
            .context
            .translate(origin.x, origin.y)
            .and_then(|_| self.context.scale(scale.0, scale.1))
            .and_then(|_| self.context.rotate(rotation));
        if let Err(err) = moved {
            tracing::debug!("could not transform canvas : {err:?}");
        }
        draw(self);
        self.context.restore();
    }
}

pub struct TextStyle {
    pub font: String,
    pub color: &'static str,
    pub align: &'static str,
    pub baseline: &'static str,
}

impl TextStyle {
    pub fn new(size: f64, color: &'static str) -> Self {
        TextStyle {
            font: format!("{}px system-ui, sans-serif", size.floor()),
            color,
            align: "left",
            baseline: "alphabetic",
        }
    }

    pub fn bold(mut self) -> Self {
        self.font = format!("bold {}", self.font);
        self
    }

    pub fn align(mut self, align: &'static str) -> Self {
        self.align = align;
        self
    }

    pub fn baseline(mut self, baseline: &'static str) -> Self {
        self.baseline = baseline;
        self
    }
}

type SharedLoopClosure = Rc<RefCell<Option<browser::LoopClosure>>>;

/// The page's single `requestAnimationFrame` loop.
pub struct FrameLoop;

impl FrameLoop {
    pub fn start(scheduler: Rc<RefCell<Scheduler>>) -> Result<()> {
        let f: SharedLoopClosure = Rc::new(RefCell::new(None));
        let g = f.clone();
        *g.borrow_mut() = Some(browser::create_raf_closure(move |perf: f64| {
            let speed = browser::scroll_speed().unwrap_or(crate::scheduler::BASE_SPEED);
            scheduler.borrow_mut().tick(perf, speed);
            if let Some(next) = f.borrow().as_ref() {
                if let Err(err) = browser::request_animation_frame(next) {
                    tracing::error!("frame loop stopped: {err:#}");
                }
            }
        }));

        browser::request_animation_frame(
            g.borrow()
                .as_ref()
                .ok_or_else(|| anyhow!("FrameLoop: Loop is None"))?,
        )?;
        tracing::info!("frame loop started");

        Ok(())
    }
}

/// Asynchronously load an image from a given source path
/// # Arguments
/// * `source` - string slice to path/url
/// # Returns
/// * `Ok(HtmlImageElement)` - on load success
/// * `Err` - on load fail
pub async fn load_image(source: &str) -> Result<HtmlImageElement> {
    let image = browser::new_image()?;
    let (tx, rx) = channel::<Result<(), Error>>();
    let success_tx = Rc::new(RefCell::new(Some(tx)));
    let error_tx = success_tx.clone();

    let success_callback: Closure<dyn FnMut()> = Closure::once(move || {
        if let Some(tx) = success_tx.borrow_mut().take() {
            let _ = tx.send(Ok(()));
        }
    });

    let source_name = source.to_string();
    let error_callback: Closure<dyn FnMut(JsValue)> = Closure::once(move |err: JsValue| {
        if let Some(tx) = error_tx.borrow_mut().take() {
            let _ = tx.send(Err(anyhow!(
                "Error loading image {}: {:#?}",
                source_name,
                err
            )));
        }
    });

    image.set_onload(Some(success_callback.as_ref().unchecked_ref()));
    image.set_onerror(Some(error_callback.as_ref().unchecked_ref()));
    image.set_src(source);

    // keep callbacks alive until the image loads or errors
    success_callback.forget();
    error_callback.forget();

    // Result<Result<(), Error>, oneshot::Canceled>
    // - first ? yields the channel result
    // - second ? yields the image load result
    rx.await??;

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rects_touching_at_an_edge_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&Rect::new(9.0, 9.0, 5.0, 5.0)));
    }

    #[test]
    fn padding_turns_a_near_miss_into_a_hit() {
        let player = Rect::new(0.0, 0.0, 60.0, 40.0);
        let item = Rect::new(65.0, 10.0, 30.0, 30.0);
        assert!(!player.intersects(&item));
        assert!(player.intersects_padded(&item, 10.0));
        assert!(!player.intersects_padded(&Rect::new(75.0, 10.0, 30.0, 30.0), 10.0));
    }

    #[test]
    fn frame_steps_are_sixty_per_second() {
        let frame = Frame::new(0.5, 1.0);
        approx::assert_relative_eq!(frame.steps(), 30.0);
    }
}
