//! Browser backends over `web-sys`.
//!
//! These are the production collaborators on `wasm32`: the content tree is a
//! subtree of the live document, timers come from `gloo-timers`, tasks run on
//! the `wasm-bindgen-futures` microtask queue.

use crate::browser::{Browser, PopupFeatures, SubscriptionId};
use crate::error::HydrationError;
use crate::host::{Host, IntervalCallback, LocalTask, TimeoutCallback, TimerId};
use crate::sanitize::SafeMarkup;
use crate::session::SessionStore;
use crate::tree::{
	ContentTree, DomEvent, EventKind, Listener, ListenerId, NodeId, ObserverCallback, ObserverId,
	Selector,
};
use crate::view::View;
use crate::{debug_log, warn_log};
use chrono::{DateTime, Utc};
use gloo_timers::callback::{Interval, Timeout};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

fn report(result: Result<(), JsValue>, operation: &str) {
	if let Err(err) = result {
		debug_log!("{} failed: {:?}", operation, err);
	}
}

struct ListenerEntry {
	element: web_sys::Element,
	kind: EventKind,
	closure: Closure<dyn FnMut(web_sys::Event)>,
}

struct ObserverEntry {
	observer: web_sys::MutationObserver,
	_closure: Closure<dyn FnMut(js_sys::Array, web_sys::MutationObserver)>,
}

/// [`ContentTree`] over a subtree of the live document.
///
/// Node handles index an append-only table of elements seen so far.
pub struct WebTree {
	nodes: RefCell<Vec<web_sys::Element>>,
	listeners: RefCell<HashMap<ListenerId, ListenerEntry>>,
	observers: RefCell<HashMap<ObserverId, ObserverEntry>>,
	next_id: Cell<u64>,
	this: Weak<WebTree>,
}

impl std::fmt::Debug for WebTree {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WebTree")
			.field("nodes", &self.nodes.borrow().len())
			.field("listeners", &self.listeners.borrow().len())
			.field("observers", &self.observers.borrow().len())
			.finish()
	}
}

impl WebTree {
	/// Hosts the content rooted at `root`.
	pub fn new(root: web_sys::Element) -> Rc<Self> {
		Rc::new_cyclic(|this| Self {
			nodes: RefCell::new(vec![root]),
			listeners: RefCell::new(HashMap::new()),
			observers: RefCell::new(HashMap::new()),
			next_id: Cell::new(0),
			this: this.clone(),
		})
	}

	/// Hosts the content of the element with id `id`.
	pub fn from_element_id(id: &str) -> Result<Rc<Self>, HydrationError> {
		web_sys::window()
			.and_then(|w| w.document())
			.and_then(|d| d.get_element_by_id(id))
			.map(Self::new)
			.ok_or_else(|| HydrationError::Markup(format!("no element with id '{}'", id)))
	}

	fn root_element(&self) -> web_sys::Element {
		self.nodes.borrow()[0].clone()
	}

	fn element(&self, node: NodeId) -> Option<web_sys::Element> {
		self.nodes.borrow().get(node.raw()).cloned()
	}

	fn html_element(&self, node: NodeId) -> Option<web_sys::HtmlElement> {
		self.element(node)?.dyn_into::<web_sys::HtmlElement>().ok()
	}

	fn intern(&self, element: web_sys::Element) -> NodeId {
		let mut nodes = self.nodes.borrow_mut();
		if let Some(index) = nodes.iter().position(|known| *known == element) {
			return NodeId::from_raw(index);
		}
		nodes.push(element);
		NodeId::from_raw(nodes.len() - 1)
	}

	fn contains(&self, element: &web_sys::Element) -> bool {
		self.root_element().contains(Some(element.as_ref()))
	}

	fn next_id(&self) -> u64 {
		let id = self.next_id.get() + 1;
		self.next_id.set(id);
		id
	}
}

impl ContentTree for WebTree {
	fn root(&self) -> NodeId {
		NodeId::from_raw(0)
	}

	fn query(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
		let Some(scope) = self.element(scope) else {
			return Vec::new();
		};
		let list = match scope.query_selector_all(&selector.to_css()) {
			Ok(list) => list,
			Err(err) => {
				warn_log!("invalid selector {}: {:?}", selector.to_css(), err);
				return Vec::new();
			}
		};
		(0..list.length())
			.filter_map(|i| list.get(i))
			.filter_map(|node| node.dyn_into::<web_sys::Element>().ok())
			.map(|element| self.intern(element))
			.collect()
	}

	fn find_by_id(&self, id: &str) -> Option<NodeId> {
		let element = web_sys::window()?.document()?.get_element_by_id(id)?;
		self.contains(&element).then(|| self.intern(element))
	}

	fn parent(&self, node: NodeId) -> Option<NodeId> {
		if node == self.root() {
			return None;
		}
		let parent = self.element(node)?.parent_element()?;
		self.contains(&parent).then(|| self.intern(parent))
	}

	fn is_attached(&self, node: NodeId) -> bool {
		self.element(node)
			.is_some_and(|element| element.is_connected() && self.contains(&element))
	}

	fn tag(&self, node: NodeId) -> Option<String> {
		Some(self.element(node)?.tag_name().to_ascii_lowercase())
	}

	fn attr(&self, node: NodeId, name: &str) -> Option<String> {
		self.element(node)?.get_attribute(name)
	}

	fn set_attr(&self, node: NodeId, name: &str, value: &str) {
		if let Some(element) = self.element(node) {
			report(element.set_attribute(name, value), "set_attribute");
		}
	}

	fn remove_attr(&self, node: NodeId, name: &str) {
		if let Some(element) = self.element(node) {
			report(element.remove_attribute(name), "remove_attribute");
		}
	}

	fn text(&self, node: NodeId) -> String {
		self.element(node)
			.and_then(|element| element.text_content())
			.unwrap_or_default()
	}

	fn set_text(&self, node: NodeId, text: &str) {
		if let Some(element) = self.element(node) {
			element.set_text_content(Some(text));
		}
	}

	fn style(&self, node: NodeId, property: &str) -> Option<String> {
		self.html_element(node)?
			.style()
			.get_property_value(property)
			.ok()
			.filter(|value| !value.is_empty())
	}

	fn set_style(&self, node: NodeId, property: &str, value: &str) {
		let Some(element) = self.html_element(node) else {
			return;
		};
		let style = element.style();
		if value.is_empty() {
			report(style.remove_property(property).map(drop), "remove_property");
		} else {
			report(style.set_property(property, value), "set_property");
		}
	}

	fn value(&self, node: NodeId) -> Option<String> {
		let input = self.element(node)?.dyn_into::<web_sys::HtmlInputElement>().ok()?;
		Some(input.value())
	}

	fn set_value(&self, node: NodeId, value: &str) {
		if let Some(input) = self
			.element(node)
			.and_then(|e| e.dyn_into::<web_sys::HtmlInputElement>().ok())
		{
			input.set_value(value);
		}
	}

	fn replace_children(&self, node: NodeId, view: View) {
		if let Some(element) = self.element(node) {
			element.set_inner_html(&view.render_to_string());
		}
	}

	fn append_view(&self, node: NodeId, view: View) {
		if let Some(element) = self.element(node) {
			report(
				element.insert_adjacent_html("beforeend", &view.render_to_string()),
				"insert_adjacent_html",
			);
		}
	}

	fn insert_markup(&self, node: NodeId, markup: &SafeMarkup) -> Result<(), HydrationError> {
		let element = self
			.element(node)
			.ok_or_else(|| HydrationError::Markup(format!("node {} does not exist", node.raw())))?;
		element.set_inner_html(markup.as_str());
		Ok(())
	}

	fn add_listener(&self, node: NodeId, kind: EventKind, listener: Listener) -> ListenerId {
		let id = ListenerId(self.next_id());
		let Some(element) = self.element(node) else {
			return id;
		};
		let tree = self.this.clone();
		let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
			let Some(tree) = tree.upgrade() else {
				return;
			};
			let target = event
				.target()
				.and_then(|t| t.dyn_into::<web_sys::Element>().ok())
				.map(|element| tree.intern(element))
				.unwrap_or(node);
			let dom_event = DomEvent::new(kind, target);
			dom_event.set_current_target(node);
			listener(&dom_event);
			if dom_event.default_prevented() {
				event.prevent_default();
			}
			if dom_event.propagation_stopped() {
				event.stop_propagation();
			}
		});
		report(
			element.add_event_listener_with_callback(kind.as_str(), closure.as_ref().unchecked_ref()),
			"add_event_listener",
		);
		self.listeners.borrow_mut().insert(
			id,
			ListenerEntry {
				element,
				kind,
				closure,
			},
		);
		id
	}

	fn remove_listener(&self, id: ListenerId) -> bool {
		let Some(entry) = self.listeners.borrow_mut().remove(&id) else {
			return false;
		};
		report(
			entry.element.remove_event_listener_with_callback(
				entry.kind.as_str(),
				entry.closure.as_ref().unchecked_ref(),
			),
			"remove_event_listener",
		);
		true
	}

	fn listener_count(&self) -> usize {
		self.listeners.borrow().len()
	}

	fn observe(&self, callback: ObserverCallback) -> ObserverId {
		let id = ObserverId(self.next_id());
		let closure = Closure::<dyn FnMut(js_sys::Array, web_sys::MutationObserver)>::new(
			move |_records: js_sys::Array, _observer: web_sys::MutationObserver| callback(),
		);
		let observer = match web_sys::MutationObserver::new(closure.as_ref().unchecked_ref()) {
			Ok(observer) => observer,
			Err(err) => {
				warn_log!("MutationObserver unavailable: {:?}", err);
				return id;
			}
		};
		let init = web_sys::MutationObserverInit::new();
		init.set_child_list(true);
		init.set_subtree(true);
		report(
			observer.observe_with_options(self.root_element().as_ref(), &init),
			"observe",
		);
		self.observers.borrow_mut().insert(
			id,
			ObserverEntry {
				observer,
				_closure: closure,
			},
		);
		id
	}

	fn disconnect(&self, id: ObserverId) -> bool {
		match self.observers.borrow_mut().remove(&id) {
			Some(entry) => {
				entry.observer.disconnect();
				true
			}
			None => false,
		}
	}

	fn observer_count(&self) -> usize {
		self.observers.borrow().len()
	}
}

// Dropping a handle cancels its timer.
enum TimerHandle {
	Once(#[allow(dead_code)] Timeout),
	Every(#[allow(dead_code)] Interval),
}

fn millis(duration: Duration) -> u32 {
	u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

/// [`Host`] over `gloo-timers` and the browser microtask queue.
#[derive(Default)]
pub struct WebHost {
	timers: Rc<RefCell<HashMap<TimerId, TimerHandle>>>,
	next_id: Cell<u64>,
}

impl std::fmt::Debug for WebHost {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WebHost")
			.field("timers", &self.timers.borrow().len())
			.finish()
	}
}

impl WebHost {
	/// Creates a host with no timers.
	pub fn new() -> Self {
		Self::default()
	}

	fn next_id(&self) -> TimerId {
		let id = self.next_id.get() + 1;
		self.next_id.set(id);
		TimerId(id)
	}
}

impl Host for WebHost {
	fn now(&self) -> DateTime<Utc> {
		DateTime::from_timestamp_millis(js_sys::Date::now() as i64).unwrap_or_default()
	}

	fn set_timeout(&self, delay: Duration, callback: TimeoutCallback) -> TimerId {
		let id = self.next_id();
		let timers = Rc::clone(&self.timers);
		let timeout = Timeout::new(millis(delay), move || {
			let handle = timers.borrow_mut().remove(&id);
			// The handle owns the closure that is running right now.
			wasm_bindgen_futures::spawn_local(async move { drop(handle) });
			callback();
		});
		self.timers.borrow_mut().insert(id, TimerHandle::Once(timeout));
		id
	}

	fn set_interval(&self, period: Duration, callback: IntervalCallback) -> TimerId {
		let id = self.next_id();
		let interval = Interval::new(millis(period).max(1), move || callback());
		self.timers.borrow_mut().insert(id, TimerHandle::Every(interval));
		id
	}

	fn clear_timer(&self, id: TimerId) -> bool {
		let handle = self.timers.borrow_mut().remove(&id);
		handle.is_some()
	}

	fn spawn_local(&self, task: LocalTask) {
		wasm_bindgen_futures::spawn_local(task);
	}

	fn active_timers(&self) -> usize {
		self.timers.borrow().len()
	}
}

/// [`Browser`] over `window`.
#[derive(Default)]
pub struct WebBrowser {
	popstate: RefCell<HashMap<SubscriptionId, Closure<dyn FnMut(web_sys::Event)>>>,
	next_id: Cell<u64>,
}

impl std::fmt::Debug for WebBrowser {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WebBrowser")
			.field("popstate", &self.popstate.borrow().len())
			.finish()
	}
}

impl WebBrowser {
	/// Creates a browser with no subscriptions.
	pub fn new() -> Self {
		Self::default()
	}
}

impl Browser for WebBrowser {
	fn current_path(&self) -> String {
		web_sys::window()
			.and_then(|w| w.location().pathname().ok())
			.unwrap_or_else(|| "/".to_string())
	}

	fn push_path(&self, path: &str) {
		if let Some(history) = web_sys::window().and_then(|w| w.history().ok()) {
			report(
				history.push_state_with_url(&JsValue::NULL, "", Some(path)),
				"push_state",
			);
		}
	}

	fn on_popstate(&self, callback: Rc<dyn Fn()>) -> SubscriptionId {
		let id = SubscriptionId(self.next_id.get() + 1);
		self.next_id.set(id.0);
		let Some(window) = web_sys::window() else {
			return id;
		};
		let closure =
			Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| callback());
		report(
			window.add_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref()),
			"add popstate listener",
		);
		self.popstate.borrow_mut().insert(id, closure);
		id
	}

	fn off_popstate(&self, id: SubscriptionId) -> bool {
		let Some(closure) = self.popstate.borrow_mut().remove(&id) else {
			return false;
		};
		if let Some(window) = web_sys::window() {
			report(
				window.remove_event_listener_with_callback(
					"popstate",
					closure.as_ref().unchecked_ref(),
				),
				"remove popstate listener",
			);
		}
		true
	}

	fn open_popup(&self, url: &str, name: &str, features: &PopupFeatures) -> bool {
		web_sys::window()
			.and_then(|w| {
				w.open_with_url_and_target_and_features(url, name, &features.to_feature_string())
					.ok()
			})
			.flatten()
			.is_some()
	}

	fn navigate(&self, url: &str) {
		if let Some(window) = web_sys::window() {
			report(window.location().set_href(url), "navigate");
		}
	}

	fn write_clipboard(&self, text: &str) {
		let Some(window) = web_sys::window() else {
			return;
		};
		let promise = window.navigator().clipboard().write_text(text);
		wasm_bindgen_futures::spawn_local(async move {
			if let Err(err) = wasm_bindgen_futures::JsFuture::from(promise).await {
				debug_log!("clipboard write failed: {:?}", err);
			}
		});
	}

	fn notify(&self, message: &str) {
		if let Some(window) = web_sys::window() {
			report(window.alert_with_message(message), "alert");
		}
	}

	fn screen_size(&self) -> (u32, u32) {
		let Some(screen) = web_sys::window().and_then(|w| w.screen().ok()) else {
			return (1920, 1080);
		};
		let width = screen.width().ok().and_then(|w| u32::try_from(w).ok());
		let height = screen.height().ok().and_then(|h| u32::try_from(h).ok());
		(width.unwrap_or(1920), height.unwrap_or(1080))
	}

	fn load_script(&self, id: &str, src: &str, on_load: Rc<dyn Fn()>) {
		let Some(document) = web_sys::window().and_then(|w| w.document()) else {
			return;
		};
		// JS owns the closure from here on and drops it after the first call
		let listener = Closure::once_into_js(move || on_load());
		if let Some(existing) = document.get_element_by_id(id) {
			report(
				existing.add_event_listener_with_callback("load", listener.unchecked_ref()),
				"add script load listener",
			);
			return;
		}
		let script = match document.create_element("script") {
			Ok(script) => script,
			Err(err) => {
				warn_log!("could not create script {}: {:?}", id, err);
				return;
			}
		};
		script.set_id(id);
		report(script.set_attribute("src", src), "set script src");
		report(script.set_attribute("async", ""), "set script async");
		report(
			script.add_event_listener_with_callback("load", listener.unchecked_ref()),
			"add script load listener",
		);
		if let Some(body) = document.body() {
			if let Err(err) = body.append_child(&script) {
				warn_log!("could not append script {}: {:?}", id, err);
			}
		}
	}

	fn process_instagram_embeds(&self) -> bool {
		let Some(window) = web_sys::window() else {
			return false;
		};
		let embeds = js_sys::Reflect::get(&window, &JsValue::from_str("instgrm"))
			.and_then(|instgrm| js_sys::Reflect::get(&instgrm, &JsValue::from_str("Embeds")));
		let Ok(embeds) = embeds else {
			return false;
		};
		let Some(process) = js_sys::Reflect::get(&embeds, &JsValue::from_str("process"))
			.ok()
			.and_then(|process| process.dyn_into::<js_sys::Function>().ok())
		else {
			return false;
		};
		if let Err(err) = process.call0(&embeds) {
			warn_log!("Instagram embed process failed: {:?}", err);
		}
		true
	}
}

/// [`SessionStore`] over `window.sessionStorage`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSessionStore;

impl WebSessionStore {
	fn storage() -> Option<web_sys::Storage> {
		web_sys::window()?.session_storage().ok().flatten()
	}
}

impl SessionStore for WebSessionStore {
	fn get(&self, key: &str) -> Option<String> {
		Self::storage()?.get_item(key).ok().flatten()
	}

	fn set(&self, key: &str, value: &str) {
		if let Some(storage) = Self::storage() {
			report(storage.set_item(key, value), "sessionStorage.setItem");
		}
	}
}
