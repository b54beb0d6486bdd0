//! WebAssembly bindings for the Plumb realignment engine.
//!
//! Keeps `<text>` nodes in an SVG anchored at their left edge, center, or
//! right edge while their content changes.
//!
//! ## Example
//!
//! ```js
//! import init, { SvgTextMonitor } from 'plumb-wasm';
//!
//! await init();
//!
//! const monitor = new SvgTextMonitor({
//!   container: document.querySelector('#chart'),
//!   selector: '.value',
//!   align: 'center',
//! });
//!
//! // Every `.text-m` node on the page not watched yet
//! SvgTextMonitor.startAll();
//!
//! monitor.stop();
//! monitor.destroy();
//! ```

use std::cell::RefCell;

use plumb_core::{Host, NodeId};
use plumb_monitor::{Container, Monitor, RegistryState};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Element;

mod host;
mod types;

pub use host::WebHost;
pub use types::*;

struct Engine {
    state: RegistryState,
    host: WebHost,
}

thread_local! {
    static ENGINE: RefCell<Option<Engine>> = RefCell::new(None);
}

/// Run `f` against the page-wide engine, creating it on first use.
fn with_engine<R>(f: impl FnOnce(&mut Engine) -> Result<R, JsError>) -> Result<R, JsError> {
    ENGINE.with(|cell| {
        let mut slot = cell
            .try_borrow_mut()
            .map_err(|_| JsError::new("SvgTextMonitor called re-entrantly"))?;
        if slot.is_none() {
            *slot = Some(Engine {
                state: RegistryState::new(),
                host: WebHost::new(dispatch)?,
            });
        }
        match slot.as_mut() {
            Some(engine) => f(engine),
            None => Err(JsError::new("Engine unavailable")),
        }
    })
}

/// Observer callback: drain and dispatch whatever is queued.
fn dispatch() {
    ENGINE.with(|cell| {
        // A busy engine drains the queue itself before returning.
        if let Ok(mut slot) = cell.try_borrow_mut() {
            if let Some(engine) = slot.as_mut() {
                engine.state.process_pending(&mut engine.host);
            }
        }
    });
}

/// Forget a scope element interned for one call; marked scopes are kept.
fn release_scope(engine: &mut Engine, node: Option<NodeId>) {
    if let Some(node) = node {
        engine.host.release(node);
    }
}

fn js_error(err: impl std::fmt::Display) -> JsError {
    JsError::new(&err.to_string())
}

fn container_from(host: &WebHost, value: JsValue) -> Result<Container, JsError> {
    if let Some(selector) = value.as_string() {
        return Ok(Container::Selector(selector));
    }
    value
        .dyn_into::<Element>()
        .map(|element| Container::Node(host.intern(element)))
        .map_err(|_| JsError::new("container must be an element or a selector string"))
}

/// Initialize panic hook for better error messages in the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(debug_assertions)]
    console_error_panic_hook::set_once();
}

/// A group of watched SVG text nodes.
#[wasm_bindgen]
pub struct SvgTextMonitor {
    inner: Monitor,
}

#[wasm_bindgen]
impl SvgTextMonitor {
    /// Watch the nodes described by `{ container, selector?, align?, config? }`.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<SvgTextMonitor, JsError> {
        let container = js_sys::Reflect::get(&options, &JsValue::from_str("container"))
            .map_err(|_| JsError::new("options.container is required"))?;
        let parsed: MonitorOptionsJs = serde_wasm_bindgen::from_value(options)
            .map_err(|e| JsError::new(&format!("Invalid monitor options: {}", e)))?;

        with_engine(|engine| {
            let container = container_from(&engine.host, container)?;
            let interned = match container {
                Container::Node(node) => Some(node),
                Container::Selector(_) => None,
            };
            let result = parsed
                .into_core(container)
                .map_err(js_error)
                .and_then(|options| Monitor::new(&mut engine.state, &mut engine.host, options).map_err(js_error));
            if result.is_err() {
                release_scope(engine, interned);
            }
            Ok(Self { inner: result? })
        })
    }

    /// Owner id, as stored in the container's `_monitor_id` attribute.
    #[wasm_bindgen(getter)]
    pub fn id(&self) -> String {
        self.inner.id().to_string()
    }

    #[wasm_bindgen(js_name = subscriptionCount)]
    pub fn subscription_count(&self) -> Result<usize, JsError> {
        with_engine(|engine| Ok(self.inner.subscription_count(&engine.state)))
    }

    /// Resume stopped nodes, taking fresh baselines.
    pub fn start(&self) -> Result<usize, JsError> {
        with_engine(|engine| self.inner.start(&mut engine.state, &mut engine.host).map_err(js_error))
    }

    /// Pause every node of this monitor.
    pub fn stop(&self) -> Result<usize, JsError> {
        with_engine(|engine| self.inner.stop(&mut engine.state, &mut engine.host).map_err(js_error))
    }

    /// Stop watching and clear every marker this monitor placed.
    pub fn destroy(&self) -> Result<usize, JsError> {
        with_engine(|engine| self.inner.destroy(&mut engine.state, &mut engine.host).map_err(js_error))
    }

    /// Watch every unobserved node under `root` matching `selector`.
    #[wasm_bindgen(js_name = startAll)]
    pub fn start_all(selector: Option<String>, root: Option<Element>) -> Result<SvgTextMonitor, JsError> {
        with_engine(|engine| {
            let node = root.map(|element| engine.host.intern(element));
            let scope = node.map(Container::Node);
            let result = Monitor::start_all(&mut engine.state, &mut engine.host, scope, selector.as_deref());
            release_scope(engine, node);
            Ok(Self { inner: result.map_err(js_error)? })
        })
    }

    /// Watch the left, center, and right default classes under `root`.
    #[wasm_bindgen(js_name = startAllAligned)]
    pub fn start_all_aligned(root: Option<Element>) -> Result<SvgTextMonitor, JsError> {
        with_engine(|engine| {
            let node = root.map(|element| engine.host.intern(element));
            let result = Monitor::start_all_aligned(&mut engine.state, &mut engine.host, node.map(Container::Node));
            release_scope(engine, node);
            Ok(Self { inner: result.map_err(js_error)? })
        })
    }

    /// Release the nodes of the monitor marked on `root`, or of every monitor
    /// if omitted. A later `startAll` picks them up again.
    #[wasm_bindgen(js_name = stopAll)]
    pub fn stop_all(root: Option<Element>) -> Result<usize, JsError> {
        with_engine(|engine| {
            let node = root.map(|element| engine.host.intern(element));
            let result = Monitor::stop_all(&mut engine.state, &mut engine.host, node.map(Container::Node));
            release_scope(engine, node);
            result.map_err(js_error)
        })
    }

    #[wasm_bindgen(js_name = destroyAll)]
    pub fn destroy_all() -> Result<usize, JsError> {
        with_engine(|engine| Ok(Monitor::destroy_all(&mut engine.state, &mut engine.host)))
    }

    /// Override default class names, alignment, or observe config.
    pub fn config(patch: JsValue) -> Result<(), JsError> {
        let patch = serde_wasm_bindgen::from_value(patch)
            .map_err(|e| JsError::new(&format!("Invalid config: {}", e)))?;
        with_engine(|engine| {
            Monitor::configure_defaults(&mut engine.state, patch);
            Ok(())
        })
    }

    /// Same as `config`, from a JSON string.
    #[wasm_bindgen(js_name = configFromString)]
    pub fn config_from_string(json: &str) -> Result<(), JsError> {
        let patch = plumb_monitor::patch_from_json(json).map_err(js_error)?;
        with_engine(|engine| {
            Monitor::configure_defaults(&mut engine.state, patch);
            Ok(())
        })
    }

    /// Dispatch queued changes now instead of waiting for the observer callback.
    pub fn flush() -> Result<JsValue, JsError> {
        let report = with_engine(|engine| Ok(engine.state.process_pending(&mut engine.host)))?;
        serde_wasm_bindgen::to_value(&DispatchReportJs::from(report))
            .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
    }

    /// True if `element` is watched by any monitor.
    #[wasm_bindgen(js_name = isObserved)]
    pub fn is_observed(element: Element) -> Result<bool, JsError> {
        with_engine(|engine| {
            let node = engine.host.intern(element);
            let observed = engine.host.contains(node) && engine.state.is_observed(node);
            engine.host.release(node);
            Ok(observed)
        })
    }
}

/// Get the library version.
#[wasm_bindgen(js_name = getVersion)]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
