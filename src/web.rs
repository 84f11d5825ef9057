//! Browser glue: canvas placement, on-screen detection and the JS entry point.

use std::{cell::Cell, rc::Rc, sync::Arc};

use wasm_bindgen::{JsCast, prelude::*};
use web_sys::{Document, Element, HtmlCanvasElement, IntersectionObserver, IntersectionObserverEntry};
use winit::{dpi::LogicalSize, window::Window};

use crate::{
    config::RenderOptions,
    context::Context,
    flow,
    renderer::Renderer,
    skin::loader::TextureDescriptor,
    visibility::{ChannelVisibility, Visibility, VisibilitySender, VisibilitySource, channel},
};

fn document() -> Result<Document, JsValue> {
    web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("No document"))
}

/// The element with id `host`.
pub fn host_element(host: &str) -> Result<Element, JsValue> {
    document()?
        .get_element_by_id(host)
        .ok_or_else(|| JsValue::from_str(&format!("No element with id {host}")))
}

/// Creates a canvas and appends it to the element with id `host`, or to the
/// body without one.
pub fn create_canvas(host: Option<&str>) -> Result<HtmlCanvasElement, JsValue> {
    let document = document()?;
    let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
    let parent = match host {
        Some(id) => host_element(id)?,
        None => document
            .body()
            .ok_or_else(|| JsValue::from_str("No document body"))?
            .into(),
    };
    parent.append_child(&canvas)?;
    Ok(canvas)
}

fn clear_children(host: &Element) {
    while let Some(child) = host.first_child() {
        if let Err(e) = host.remove_child(&child) {
            log::warn!("Unable to clear the host element: {e:?}");
            break;
        }
    }
}

/// Visibility of a canvas, hidden while it is scrolled out of view or the
/// document is in the background.
pub struct IntersectionVisibility {
    channel: ChannelVisibility,
    document: Document,
    observer: Option<IntersectionObserver>,
    _on_intersection: Closure<dyn FnMut(js_sys::Array)>,
    on_visibility_change: Closure<dyn FnMut()>,
}

impl IntersectionVisibility {
    pub fn observe(canvas: &HtmlCanvasElement) -> Result<Self, JsValue> {
        let document = document()?;
        let (sender, channel) = channel();
        let intersecting = Rc::new(Cell::new(false));

        let on_intersection = {
            let sender = sender.clone();
            let intersecting = intersecting.clone();
            let document = document.clone();
            Closure::<dyn FnMut(js_sys::Array)>::new(move |entries: js_sys::Array| {
                for entry in entries.iter() {
                    let entry: IntersectionObserverEntry = entry.unchecked_into();
                    intersecting.set(entry.is_intersecting());
                }
                report(&sender, &document, intersecting.get());
            })
        };
        let observer = IntersectionObserver::new(on_intersection.as_ref().unchecked_ref())?;
        observer.observe(canvas);

        let on_visibility_change = {
            let document = document.clone();
            Closure::<dyn FnMut()>::new(move || {
                report(&sender, &document, intersecting.get());
            })
        };
        document.add_event_listener_with_callback(
            "visibilitychange",
            on_visibility_change.as_ref().unchecked_ref(),
        )?;

        Ok(Self {
            channel,
            document,
            observer: Some(observer),
            _on_intersection: on_intersection,
            on_visibility_change,
        })
    }
}

fn report(sender: &VisibilitySender, document: &Document, intersecting: bool) {
    let visibility = if intersecting && !document.hidden() {
        Visibility::Visible
    } else {
        Visibility::Hidden
    };
    sender.send(visibility);
}

impl VisibilitySource for IntersectionVisibility {
    /// Nothing renders until the observer reported the canvas on screen.
    fn initial(&self) -> Visibility {
        Visibility::Hidden
    }

    fn poll(&mut self) -> Option<Visibility> {
        self.channel.poll()
    }

    fn detach(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
            let _ = self.document.remove_event_listener_with_callback(
                "visibilitychange",
                self.on_visibility_change.as_ref().unchecked_ref(),
            );
        }
        self.channel.detach();
    }
}

/// Follows the browser window size with `window` (if given). Once `renderer`
/// is disposed the canvas is removed and `host` is emptied.
pub fn install_teardown(
    renderer: &mut Renderer<Context>,
    canvas: HtmlCanvasElement,
    host: Option<Element>,
    window: Option<Arc<Window>>,
) {
    let resize_listener = window.and_then(|window| {
        let browser = web_sys::window()?;
        let listener = {
            let browser = browser.clone();
            Closure::<dyn FnMut()>::new(move || {
                let width = browser.inner_width().ok().and_then(|w| w.as_f64());
                let height = browser.inner_height().ok().and_then(|h| h.as_f64());
                if let (Some(width), Some(height)) = (width, height) {
                    let _ = window.request_inner_size(LogicalSize::new(width, height));
                }
            })
        };
        browser
            .add_event_listener_with_callback("resize", listener.as_ref().unchecked_ref())
            .inspect_err(|e| log::warn!("Unable to follow the window size: {e:?}"))
            .ok()?;
        Some((browser, listener))
    });

    renderer.on_dispose(move || {
        if let Some((browser, listener)) = resize_listener {
            let _ = browser
                .remove_event_listener_with_callback("resize", listener.as_ref().unchecked_ref());
        }
        canvas.remove();
        if let Some(host) = host {
            clear_children(&host);
        }
    });
}

/// Renders a skin into a new canvas.
///
/// `options` and `texture` are JSON, `texture` may also be a plain JSON
/// string such as `"\"Notch\""`. The canvas is appended to the element with
/// id `host`, or the body.
#[wasm_bindgen(js_name = renderSkin)]
pub fn render_skin(options: &str, texture: &str, host: Option<String>) -> Result<(), JsValue> {
    let to_js = |e: crate::error::SkinError| JsValue::from_str(&e.to_string());
    let options = if options.trim().is_empty() {
        RenderOptions::skin_defaults()
    } else {
        RenderOptions::layered(&RenderOptions::skin_defaults(), options).map_err(to_js)?
    };
    let texture = TextureDescriptor::from_json(texture).map_err(to_js)?;
    flow::run(options, texture, host).map_err(|e| JsValue::from_str(&e.to_string()))
}
