use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use std::future::Future;
use wasm_bindgen::closure::{Closure, WasmClosure};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

#[rustfmt::skip]
use web_sys::{
    CanvasRenderingContext2d,
    Document,
    Element,
    EventTarget,
    Headers,
    HtmlCanvasElement,
    HtmlElement,
    HtmlImageElement,
    Request,
    RequestInit,
    RequestMode,
    Response,
    Window,
};

// Constants related to HTML elements
pub mod html {
    pub const CONTEXT_2D: &str = "2d";
    pub const INSTANCE_ATTRIBUTE: &str = "data-game-instance";
    pub const CONFIG_ID: &str = "site-config";

    /// Escape text for interpolation into `innerHTML`.
    pub fn escape(text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&#39;"),
                c => escaped.push(c),
            }
        }
        escaped
    }

    #[cfg(test)]
    mod tests {
        #[test]
        fn markup_is_escaped() {
            assert_eq!(
                super::escape(r#"<b>"Tom" & 'Jerry'</b>"#),
                "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
            );
            assert_eq!(super::escape("🐠 plain"), "🐠 plain");
        }
    }
}

pub type LoopClosure = Closure<dyn FnMut(f64)>;

pub fn window() -> Result<Window> {
    web_sys::window().ok_or_else(|| anyhow!("Window not found"))
}

pub fn document() -> Result<Document> {
    window()?
        .document()
        .ok_or_else(|| anyhow!("No Document Found"))
}

pub fn new_image() -> Result<HtmlImageElement> {
    HtmlImageElement::new().map_err(|err| anyhow!("Could not create image element : {:#?}", err))
}

pub fn element_by_id(id: &str) -> Result<Element> {
    document()?
        .get_element_by_id(id)
        .ok_or_else(|| anyhow!("No element found with ID : '{}'", id))
}

pub fn query_all(selector: &str) -> Result<Vec<Element>> {
    let nodes = document()?
        .query_selector_all(selector)
        .map_err(|err| anyhow!("Bad selector '{}' : {:#?}", selector, err))?;
    Ok((0..nodes.length())
        .filter_map(|index| nodes.item(index))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect())
}

pub fn create_element<T: JsCast>(tag: &str) -> Result<T> {
    document()?
        .create_element(tag)
        .map_err(|err| anyhow!("Could not create <{}> : {:#?}", tag, err))?
        .dyn_into::<T>()
        .map_err(|element| anyhow!("Error converting {:#?} to requested type", element))
}

/// Create a canvas inside `container` with the given CSS class.
pub fn create_canvas(container: &Element, class: &str) -> Result<HtmlCanvasElement> {
    let canvas: HtmlCanvasElement = create_element("canvas")?;
    canvas.set_class_name(class);
    container
        .append_child(&canvas)
        .map_err(|err| anyhow!("Could not attach canvas : {:#?}", err))?;
    Ok(canvas)
}

pub fn context(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d> {
    canvas
        .get_context(html::CONTEXT_2D)
        // Result<Option<Object>, JsValue>
        // - map the JsValue error to anyhow
        // - map the None case to an error
        .map_err(|js_value| anyhow!("Error getting context : {:#?}", js_value))?
        .ok_or_else(|| anyhow!("No 2d context found"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|element| {
            anyhow!(
                "Error converting {:#?} to CanvasRenderingContext2d",
                element
            )
        })
}

pub fn device_pixel_ratio() -> f64 {
    window()
        .map(|w| w.device_pixel_ratio().floor().max(1.0))
        .unwrap_or(1.0)
}

pub fn viewport_size() -> Result<(f64, f64)> {
    let window = window()?;
    let width = window
        .inner_width()
        .map_err(|err| anyhow!("inner_width : {:#?}", err))?
        .as_f64()
        .unwrap_or(0.0);
    let height = window
        .inner_height()
        .map_err(|err| anyhow!("inner_height : {:#?}", err))?
        .as_f64()
        .unwrap_or(0.0);
    Ok((width, height))
}

/// Current scroll-derived swimmer speed.
pub fn scroll_speed() -> Result<f64> {
    let window = window()?;
    let scroll_y = window
        .scroll_y()
        .map_err(|err| anyhow!("scroll_y : {:#?}", err))?;
    let scroll_height = document()?
        .document_element()
        .ok_or_else(|| anyhow!("No document element"))?
        .scroll_height() as f64;
    let (_, viewport_height) = viewport_size()?;
    Ok(crate::scheduler::scroll_speed(
        scroll_y,
        scroll_height,
        viewport_height,
    ))
}

/// Size a canvas to its container in device pixels. Returns (width, height).
pub fn fit_canvas(
    canvas: &HtmlCanvasElement,
    container: &Element,
    dpr: f64,
    min_height: f64,
) -> Result<(f64, f64)> {
    let css_width = container.client_width() as f64;
    let css_height = (container.client_height() as f64).max(min_height);
    let width = (css_width * dpr).floor().max(1.0);
    let height = (css_height * dpr).floor().max(1.0);
    canvas.set_width(width as u32);
    canvas.set_height(height as u32);
    let style = canvas.style();
    style
        .set_property("width", &format!("{css_width}px"))
        .and_then(|_| style.set_property("height", &format!("{css_height}px")))
        .map_err(|err| anyhow!("Could not size canvas : {:#?}", err))?;
    Ok((width, height))
}

/// Pointer position relative to `element`, in device pixels.
pub fn relative_position(element: &Element, client_x: f64, client_y: f64, dpr: f64) -> (f64, f64) {
    let rect = element.get_bounding_client_rect();
    ((client_x - rect.left()) * dpr, (client_y - rect.top()) * dpr)
}

pub fn set_hidden(element: &HtmlElement, hidden: bool) {
    let value = if hidden { "none" } else { "" };
    if let Err(err) = element.style().set_property("display", value) {
        tracing::debug!("could not toggle display : {err:?}");
    }
}

pub fn closure_wrap<T: WasmClosure + ?Sized>(data: Box<T>) -> Closure<T> {
    Closure::wrap(data)
}

pub fn create_raf_closure(f: impl FnMut(f64) + 'static) -> LoopClosure {
    closure_wrap(Box::new(f) as Box<dyn FnMut(f64)>)
}

pub fn request_animation_frame(callback: &LoopClosure) -> Result<i32> {
    window()?
        .request_animation_frame(callback.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("Cannot request animation frame {:#?}", err))
}

/// Attach a listener for the lifetime of the page.
pub fn listen<E>(target: &EventTarget, event: &str, handler: impl FnMut(E) + 'static) -> Result<()>
where
    E: wasm_bindgen::convert::FromWasmAbi + 'static,
{
    let closure = closure_wrap(Box::new(handler) as Box<dyn FnMut(E)>);
    target
        .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("Could not listen for '{}' : {:#?}", event, err))?;
    // listeners live as long as the page
    closure.forget();
    Ok(())
}

pub fn set_interval(millis: i32, handler: impl FnMut() + 'static) -> Result<i32> {
    let closure = closure_wrap(Box::new(handler) as Box<dyn FnMut()>);
    let id = window()?
        .set_interval_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            millis,
        )
        .map_err(|err| anyhow!("Could not set interval : {:#?}", err))?;
    closure.forget();
    Ok(id)
}

/// Blocking `window.prompt`. `None` when cancelled.
pub fn prompt(message: &str, default: &str) -> Result<Option<String>> {
    window()?
        .prompt_with_message_and_default(message, default)
        .map_err(|err| anyhow!("prompt failed : {:#?}", err))
}

pub fn spawn_local<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}

/// What to send; the body is already serialized JSON.
pub struct FetchRequest<'a> {
    pub method: &'a str,
    pub url: &'a str,
    pub headers: &'a [(&'a str, &'a str)],
    pub body: Option<String>,
}

pub async fn fetch(options: FetchRequest<'_>) -> Result<Response> {
    let headers = Headers::new().map_err(|err| anyhow!("Could not create headers : {:#?}", err))?;
    for (name, value) in options.headers {
        headers
            .set(name, value)
            .map_err(|err| anyhow!("Bad header {} : {:#?}", name, err))?;
    }

    let init = RequestInit::new();
    init.set_method(options.method);
    init.set_mode(RequestMode::Cors);
    init.set_headers(&headers);
    if let Some(body) = &options.body {
        init.set_body(&JsValue::from_str(body));
    }

    let request = Request::new_with_str_and_init(options.url, &init)
        .map_err(|err| anyhow!("Could not build request for {} : {:#?}", options.url, err))?;
    let resp_value = JsFuture::from(window()?.fetch_with_request(&request))
        .await
        .map_err(|err| anyhow!("error fetching {} : {:#?}", options.url, err))?;
    resp_value
        .dyn_into::<Response>()
        .map_err(|element| anyhow!("error converting [{:#?}] to Response", element))
}

pub async fn response_json<T>(resp: &Response) -> Result<T>
where
    T: DeserializeOwned,
{
    let json = resp
        .json()
        .map_err(|err| anyhow!("Could not get JSON from response [{:#?}]", err))?;

    let json_value = JsFuture::from(json)
        .await
        .map_err(|err| anyhow!("error reading body [{:#?}]", err))?;

    serde_wasm_bindgen::from_value(json_value)
        .map_err(|err| anyhow!("error converting response : {:#?}", err))
}

pub async fn response_text(resp: &Response) -> Result<String> {
    let text = resp
        .text()
        .map_err(|err| anyhow!("Could not read response text [{:#?}]", err))?;
    Ok(JsFuture::from(text)
        .await
        .map_err(|err| anyhow!("error reading body [{:#?}]", err))?
        .as_string()
        .unwrap_or_default())
}
