//! Read/observe/patch interface over the hosted content tree.
//!
//! The engine never owns the content tree. Everything it does goes through
//! [`ContentTree`], which a host implements over the real document (see
//! `dom::WebTree` on `wasm32`) or over [`MemoryTree`] for tests and
//! server-side tooling.

mod markup;
mod memory;
mod selector;

pub use markup::parse_fragment;
pub use memory::MemoryTree;
pub use selector::{ElementLike, Selector};

use crate::error::HydrationError;
use crate::sanitize::SafeMarkup;
use crate::view::View;
use std::cell::Cell;
use std::rc::Rc;

/// Handle to a node of a content tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
	/// Creates a handle from a raw index.
	pub fn from_raw(index: usize) -> Self {
		Self(index)
	}

	/// Returns the raw index.
	pub fn raw(self) -> usize {
		self.0
	}
}

/// Handle to an attached event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Handle to a mutation-notification subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u64);

/// Events the engine listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
	/// Pointer activation.
	Click,
	/// Form submission.
	Submit,
}

impl EventKind {
	/// DOM event name.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Click => "click",
			Self::Submit => "submit",
		}
	}
}

/// An event delivered to a [`Listener`].
#[derive(Debug)]
pub struct DomEvent {
	kind: EventKind,
	target: NodeId,
	current_target: Cell<NodeId>,
	default_prevented: Cell<bool>,
	propagation_stopped: Cell<bool>,
}

impl DomEvent {
	/// Creates an event originating at `target`.
	pub fn new(kind: EventKind, target: NodeId) -> Self {
		Self {
			kind,
			target,
			current_target: Cell::new(target),
			default_prevented: Cell::new(false),
			propagation_stopped: Cell::new(false),
		}
	}

	/// Event kind.
	pub fn kind(&self) -> EventKind {
		self.kind
	}

	/// Node the event originated at.
	pub fn target(&self) -> NodeId {
		self.target
	}

	/// Node whose listener is currently running.
	pub fn current_target(&self) -> NodeId {
		self.current_target.get()
	}

	pub(crate) fn set_current_target(&self, node: NodeId) {
		self.current_target.set(node);
	}

	/// Cancels the default action.
	pub fn prevent_default(&self) {
		self.default_prevented.set(true);
	}

	/// Whether `prevent_default` was called.
	pub fn default_prevented(&self) -> bool {
		self.default_prevented.get()
	}

	/// Stops bubbling to ancestors.
	pub fn stop_propagation(&self) {
		self.propagation_stopped.set(true);
	}

	/// Whether `stop_propagation` was called.
	pub fn propagation_stopped(&self) -> bool {
		self.propagation_stopped.get()
	}
}

/// Event listener callback.
pub type Listener = Rc<dyn Fn(&DomEvent)>;

/// Mutation-notification callback. Invoked after child-list changes.
pub type ObserverCallback = Rc<dyn Fn()>;

/// Narrow read/observe/patch access to a content tree.
///
/// All methods take `&self`; implementations use interior mutability and
/// must not hold internal borrows while invoking listeners or observers.
/// Operations on a node that no longer exists are silently ignored.
pub trait ContentTree {
	/// The root of the hosted content.
	fn root(&self) -> NodeId;

	/// Descendant elements of `scope` matching `selector`, in document order.
	fn query(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId>;

	/// First descendant of `scope` matching `selector`.
	fn query_first(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
		self.query(scope, selector).into_iter().next()
	}

	/// Element with the given `id` attribute anywhere in the tree.
	fn find_by_id(&self, id: &str) -> Option<NodeId>;

	/// Parent element of `node`.
	fn parent(&self, node: NodeId) -> Option<NodeId>;

	/// Whether `node` is still connected to the root.
	fn is_attached(&self, node: NodeId) -> bool;

	/// Lowercase tag name, or `None` for text nodes.
	fn tag(&self, node: NodeId) -> Option<String>;

	/// Attribute value.
	fn attr(&self, node: NodeId, name: &str) -> Option<String>;

	/// Whether the attribute is present.
	fn has_attr(&self, node: NodeId, name: &str) -> bool {
		self.attr(node, name).is_some()
	}

	/// Sets an attribute.
	fn set_attr(&self, node: NodeId, name: &str, value: &str);

	/// Removes an attribute.
	fn remove_attr(&self, node: NodeId, name: &str);

	/// Concatenated descendant text.
	fn text(&self, node: NodeId) -> String;

	/// Replaces the children of `node` with one text node.
	fn set_text(&self, node: NodeId, text: &str);

	/// Inline style property.
	fn style(&self, node: NodeId, property: &str) -> Option<String>;

	/// Sets an inline style property. An empty value removes it.
	fn set_style(&self, node: NodeId, property: &str, value: &str);

	/// Current value of a form control.
	fn value(&self, node: NodeId) -> Option<String>;

	/// Sets the value of a form control.
	fn set_value(&self, node: NodeId, value: &str);

	/// Replaces the children of `node` with `view`.
	fn replace_children(&self, node: NodeId, view: View);

	/// Appends `view` after the existing children of `node`.
	fn append_view(&self, node: NodeId, view: View);

	/// Replaces the children of `node` with sanitized markup.
	fn insert_markup(&self, node: NodeId, markup: &SafeMarkup) -> Result<(), HydrationError>;

	/// Attaches a listener and returns its handle.
	fn add_listener(&self, node: NodeId, kind: EventKind, listener: Listener) -> ListenerId;

	/// Detaches a listener. Returns false if it was already gone.
	fn remove_listener(&self, id: ListenerId) -> bool;

	/// Number of attached listeners.
	fn listener_count(&self) -> usize;

	/// Subscribes to child-list mutations anywhere under the root.
	fn observe(&self, callback: ObserverCallback) -> ObserverId;

	/// Ends a subscription. Returns false if it was already gone.
	fn disconnect(&self, id: ObserverId) -> bool;

	/// Number of live subscriptions.
	fn observer_count(&self) -> usize;
}

/// Parses `style="a: b; c: d"` into declarations.
pub(crate) fn parse_style(style: &str) -> Vec<(String, String)> {
	style
		.split(';')
		.filter_map(|decl| {
			let (name, value) = decl.split_once(':')?;
			let name = name.trim();
			let value = value.trim();
			(!name.is_empty()).then(|| (name.to_ascii_lowercase(), value.to_string()))
		})
		.collect()
}

/// Serializes declarations back into a `style` attribute value.
pub(crate) fn render_style(decls: &[(String, String)]) -> String {
	decls
		.iter()
		.map(|(name, value)| format!("{}: {}", name, value))
		.collect::<Vec<_>>()
		.join("; ")
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_parse_style() {
		let decls = parse_style("display: none;Opacity:0.7; ;bad");
		assert_eq!(
			decls,
			vec![
				("display".to_string(), "none".to_string()),
				("opacity".to_string(), "0.7".to_string()),
			]
		);
		assert_eq!(render_style(&decls), "display: none; opacity: 0.7");
	}

	#[rstest]
	fn test_dom_event_flags() {
		let event = DomEvent::new(EventKind::Click, NodeId(3));
		assert!(!event.default_prevented());
		event.prevent_default();
		event.stop_propagation();
		assert!(event.default_prevented());
		assert!(event.propagation_stopped());
		assert_eq!(event.target(), NodeId(3));
		assert_eq!(event.kind().as_str(), "click");
	}
}
