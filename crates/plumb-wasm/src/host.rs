//! [`Host`] over the browser DOM.
//!
//! Elements are interned the first time the engine sees them; a JS `Map`
//! keyed by element object finds the existing id. [`Host::release`] drops
//! the entry again unless the element still carries a monitor or observer
//! marker, so detached charts can be collected.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use plumb_core::{
    ChangeFeed, Host, NodeId, Notification, ObserveConfig, SelectorError, SubscriptionId, MONITOR_ID_ATTR,
    OBSERVER_ID_ATTR,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, MutationObserver, MutationObserverInit, SvgTextContentElement};

type Pending = Rc<RefCell<IndexMap<SubscriptionId, usize>>>;

struct Watch {
    observer: MutationObserver,
    _callback: Closure<dyn FnMut(js_sys::Array, MutationObserver)>,
}

/// The live page as seen by the engine.
pub struct WebHost {
    root: Element,
    nodes: RefCell<HashMap<NodeId, Element>>,
    next_node: Cell<u64>,
    index: js_sys::Map,
    watches: HashMap<SubscriptionId, Watch>,
    pending: Pending,
    on_change: fn(),
}

impl WebHost {
    /// Wrap the current document. `on_change` runs after each observer callback.
    pub fn new(on_change: fn()) -> Result<Self, JsError> {
        let root = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.document_element())
            .ok_or_else(|| JsError::new("No document element available"))?;

        let host = Self {
            root: root.clone(),
            nodes: RefCell::new(HashMap::new()),
            next_node: Cell::new(0),
            index: js_sys::Map::new(),
            watches: HashMap::new(),
            pending: Rc::new(RefCell::new(IndexMap::new())),
            on_change,
        };
        host.intern(root);
        Ok(host)
    }

    /// Id of `element`, assigning one on first sight.
    pub fn intern(&self, element: Element) -> NodeId {
        if let Some(index) = self.index.get(&element).as_f64() {
            return NodeId(index as u64);
        }

        // Ids are never reused, so a released id cannot alias a newer element.
        let id = NodeId(self.next_node.get());
        self.next_node.set(id.0 + 1);
        self.index.set(&element, &JsValue::from_f64(id.0 as f64));
        self.nodes.borrow_mut().insert(id, element);
        id
    }

    pub fn element(&self, node: NodeId) -> Option<Element> {
        self.nodes.borrow().get(&node).cloned()
    }

    /// Number of interned elements, the root included.
    pub fn interned(&self) -> usize {
        self.nodes.borrow().len()
    }

    fn live(&self, node: NodeId) -> Option<Element> {
        self.element(node).filter(|element| element.is_connected())
    }

    fn scope(&self, node: NodeId) -> Element {
        self.live(node).unwrap_or_else(|| self.root.clone())
    }
}

impl Host for WebHost {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn contains(&self, node: NodeId) -> bool {
        self.live(node).is_some()
    }

    fn has_content(&self, node: NodeId) -> bool {
        self.live(node).map_or(false, |element| !element.inner_html().is_empty())
    }

    fn query_selector(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        let found = self
            .scope(scope)
            .query_selector(selector)
            .map_err(|err| selector_error(selector, &err))?;
        Ok(found.map(|element| self.intern(element)))
    }

    fn query_selector_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let list = self
            .scope(scope)
            .query_selector_all(selector)
            .map_err(|err| selector_error(selector, &err))?;

        Ok((0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .map(|element| self.intern(element))
            .collect())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.element(node)?.get_attribute(name)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(element) = self.element(node) {
            if let Err(err) = element.set_attribute(name, value) {
                web_sys::console::warn_2(&JsValue::from_str("plumb: failed to set attribute"), &err);
            }
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(element) = self.element(node) {
            if let Err(err) = element.remove_attribute(name) {
                web_sys::console::warn_2(&JsValue::from_str("plumb: failed to remove attribute"), &err);
            }
        }
    }

    fn measure_width(&self, node: NodeId) -> Option<f64> {
        let element = self.live(node)?;
        let text = element.dyn_ref::<SvgTextContentElement>()?;

        // An explicit textLength wins; otherwise ask the layout engine.
        let declared = text.text_length().base_val().value().ok().map(f64::from);
        match declared {
            Some(width) if width > 0.0 => Some(width),
            _ => Some(f64::from(text.get_computed_text_length())),
        }
    }

    fn observe(&mut self, node: NodeId, config: ObserveConfig, subscription: SubscriptionId) {
        self.disconnect(subscription);
        // MutationObserver.observe throws when no change kind is selected.
        if config.is_empty() {
            return;
        }
        let Some(element) = self.live(node) else {
            return;
        };

        let pending = Rc::clone(&self.pending);
        let on_change = self.on_change;
        let callback = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
            move |records: js_sys::Array, _observer: MutationObserver| {
                *pending.borrow_mut().entry(subscription).or_insert(0) += records.length() as usize;
                on_change();
            },
        );

        let observer = match MutationObserver::new(callback.as_ref().unchecked_ref()) {
            Ok(observer) => observer,
            Err(err) => {
                web_sys::console::warn_2(&JsValue::from_str("plumb: MutationObserver unavailable"), &err);
                return;
            }
        };

        let init = MutationObserverInit::new();
        init.set_attributes(config.attributes);
        init.set_character_data(config.character_data);
        init.set_child_list(config.child_list);
        init.set_subtree(config.subtree);
        if let Err(err) = observer.observe_with_options(&element, &init) {
            web_sys::console::warn_2(&JsValue::from_str("plumb: observe failed"), &err);
            return;
        }

        self.watches.insert(
            subscription,
            Watch {
                observer,
                _callback: callback,
            },
        );
    }

    fn disconnect(&mut self, subscription: SubscriptionId) {
        if let Some(watch) = self.watches.remove(&subscription) {
            watch.observer.disconnect();
        }
        self.pending.borrow_mut().shift_remove(&subscription);
    }

    fn release(&mut self, node: NodeId) {
        if node == self.root() {
            return;
        }
        let Some(element) = self.element(node) else {
            return;
        };
        if element.has_attribute(MONITOR_ID_ATTR) || element.has_attribute(OBSERVER_ID_ATTR) {
            return;
        }
        self.index.delete(&element);
        self.nodes.borrow_mut().remove(&node);
    }
}

impl ChangeFeed for WebHost {
    fn drain_notifications(&mut self) -> Vec<Notification> {
        let mut pending = self.pending.borrow_mut();

        // Records not yet handed to a callback are collected here so a
        // write-back settles within the same flush.
        for (id, watch) in &self.watches {
            let taken = watch.observer.take_records().length() as usize;
            if taken > 0 {
                *pending.entry(*id).or_insert(0) += taken;
            }
        }

        let batch = pending
            .drain(..)
            .map(|(subscription, records)| Notification { subscription, records })
            .collect();
        batch
    }
}

fn selector_error(selector: &str, err: &JsValue) -> SelectorError {
    if selector.trim().is_empty() {
        return SelectorError::Empty;
    }

    let reason = err
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .unwrap_or_else(|| format!("{:?}", err));
    SelectorError::Host {
        selector: selector.to_string(),
        reason,
    }
}
