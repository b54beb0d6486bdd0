//! Browser tests; run with `wasm-pack test --headless --firefox`.

#![cfg(target_arch = "wasm32")]

use plumb_core::Host;
use plumb_monitor::{Monitor, MonitorOptions, RegistryState};
use plumb_wasm::{SvgTextMonitor, WebHost};
use wasm_bindgen::prelude::*;
use wasm_bindgen_test::*;
use web_sys::Element;

wasm_bindgen_test_configure!(run_in_browser);

const SVG_NS: &str = "http://www.w3.org/2000/svg";

fn chart(id: &str, class: &str) -> (Element, Element) {
    let document = web_sys::window().unwrap().document().unwrap();
    let svg = document.create_element_ns(Some(SVG_NS), "svg").unwrap();
    svg.set_id(id);
    let text = document.create_element_ns(Some(SVG_NS), "text").unwrap();
    text.set_attribute("class", class).unwrap();
    text.set_attribute("transform", "translate(100 20)").unwrap();
    text.set_text_content(Some("12"));
    svg.append_child(&text).unwrap();
    document.body().unwrap().append_child(&svg).unwrap();
    (svg, text)
}

fn ok<T>(result: Result<T, JsError>) -> T {
    result.map_err(JsValue::from).unwrap()
}

fn translate_x(text: &Element) -> f64 {
    let value = text.get_attribute("transform").unwrap();
    let inner = value.trim_start_matches("translate(").trim_end_matches(')');
    inner.split_whitespace().next().unwrap().parse().unwrap()
}

#[wasm_bindgen_test]
fn center_text_grows_around_its_anchor() {
    let (svg, text) = chart("center-chart", "value");
    let options = js_sys::Object::new();
    js_sys::Reflect::set(&options, &"container".into(), &svg).unwrap();
    js_sys::Reflect::set(&options, &"selector".into(), &".value".into()).unwrap();
    js_sys::Reflect::set(&options, &"align".into(), &"center".into()).unwrap();

    let monitor = ok(SvgTextMonitor::new(options.into()));
    assert_eq!(ok(monitor.subscription_count()), 1);
    assert_eq!(svg.get_attribute("_monitor_id"), Some(monitor.id()));

    text.set_text_content(Some("123456789"));
    ok(SvgTextMonitor::flush());
    assert!(translate_x(&text) < 100.0);

    assert_eq!(ok(monitor.destroy()), 1);
    assert_eq!(text.get_attribute("_observer_id"), None);
}

#[wasm_bindgen_test]
fn stop_all_by_root_leaves_text_alone() {
    let (svg, text) = chart("stopped-chart", "text-m");
    ok(SvgTextMonitor::start_all(None, Some(svg.clone())));
    assert_eq!(ok(SvgTextMonitor::stop_all(Some(svg))), 1);

    text.set_text_content(Some("123456789"));
    ok(SvgTextMonitor::flush());
    assert_eq!(translate_x(&text), 100.0);

    ok(SvgTextMonitor::destroy_all());
}

#[wasm_bindgen_test]
fn bad_options_are_rejected() {
    let options = js_sys::Object::new();
    js_sys::Reflect::set(&options, &"container".into(), &JsValue::from_f64(3.0)).unwrap();
    assert!(SvgTextMonitor::new(options.into()).is_err());
}

#[wasm_bindgen_test]
fn destroyed_elements_are_forgotten() {
    let (svg, _text) = chart("released-chart", "value");
    let mut host = ok(WebHost::new(|| {}));
    let mut state = RegistryState::new();
    let before = host.interned();

    let container = host.intern(svg.clone());
    let monitor = Monitor::new(&mut state, &mut host, MonitorOptions::new(container).selector(".value")).unwrap();
    assert_eq!(host.interned(), before + 2);

    // Marked elements stay interned.
    host.release(container);
    assert_eq!(host.interned(), before + 2);

    monitor.destroy(&mut state, &mut host).unwrap();
    assert_eq!(host.interned(), before);

    let again = host.intern(svg);
    assert_ne!(again, container);
    host.release(again);
    assert_eq!(host.interned(), before);
}
