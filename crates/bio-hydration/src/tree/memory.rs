//! In-memory [`ContentTree`] backed by a node arena.

use super::selector::{ElementLike, Selector};
use super::{
	ContentTree, DomEvent, EventKind, Listener, ListenerId, NodeId, ObserverCallback, ObserverId,
	markup::parse_fragment, parse_style, render_style,
};
use crate::error::HydrationError;
use crate::sanitize::SafeMarkup;
use crate::view::View;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug)]
enum NodeData {
	Element {
		tag: String,
		attrs: Vec<(String, String)>,
	},
	Text(String),
}

#[derive(Debug)]
struct Node {
	data: NodeData,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
}

impl ElementLike for Node {
	fn tag_name(&self) -> &str {
		match &self.data {
			NodeData::Element { tag, .. } => tag,
			NodeData::Text(_) => "#text",
		}
	}

	fn attribute(&self, name: &str) -> Option<&str> {
		match &self.data {
			NodeData::Element { attrs, .. } => attrs
				.iter()
				.find(|(n, _)| n == name)
				.map(|(_, v)| v.as_str()),
			NodeData::Text(_) => None,
		}
	}
}

struct ListenerEntry {
	node: NodeId,
	kind: EventKind,
	listener: Listener,
}

#[derive(Default)]
struct Arena {
	nodes: Vec<Node>,
	listeners: BTreeMap<ListenerId, ListenerEntry>,
	observers: BTreeMap<ObserverId, ObserverCallback>,
	next_listener: u64,
	next_observer: u64,
}

impl Arena {
	fn node(&self, id: NodeId) -> Option<&Node> {
		self.nodes.get(id.0)
	}

	fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
		self.nodes.get_mut(id.0)
	}

	fn alloc(&mut self, data: NodeData, parent: Option<NodeId>) -> NodeId {
		let id = NodeId(self.nodes.len());
		self.nodes.push(Node {
			data,
			parent,
			children: Vec::new(),
		});
		id
	}

	fn build(&mut self, parent: NodeId, view: View) {
		match view {
			View::Element(el) => {
				let (tag, attrs, children) = el.into_parts();
				let attrs = attrs
					.into_iter()
					.map(|(n, v)| (n.into_owned(), v.into_owned()))
					.collect();
				let id = self.alloc(
					NodeData::Element {
						tag: tag.to_ascii_lowercase(),
						attrs,
					},
					Some(parent),
				);
				if let Some(p) = self.node_mut(parent) {
					p.children.push(id);
				}
				for child in children {
					self.build(id, child);
				}
			}
			View::Text(text) => {
				let id = self.alloc(NodeData::Text(text.into_owned()), Some(parent));
				if let Some(p) = self.node_mut(parent) {
					p.children.push(id);
				}
			}
			View::Fragment(children) => {
				for child in children {
					self.build(parent, child);
				}
			}
			View::Empty => {}
		}
	}

	fn detach_children(&mut self, node: NodeId) {
		let children = match self.node_mut(node) {
			Some(n) => std::mem::take(&mut n.children),
			None => return,
		};
		for child in children {
			if let Some(c) = self.node_mut(child) {
				c.parent = None;
			}
		}
	}

	fn collect_text(&self, node: NodeId, output: &mut String) {
		let Some(n) = self.node(node) else {
			return;
		};
		match &n.data {
			NodeData::Text(text) => output.push_str(text),
			NodeData::Element { .. } => {
				for child in &n.children {
					self.collect_text(*child, output);
				}
			}
		}
	}

	fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
		let mut out = Vec::new();
		let mut stack: Vec<NodeId> = match self.node(scope) {
			Some(n) => n.children.iter().rev().copied().collect(),
			None => return out,
		};
		while let Some(id) = stack.pop() {
			out.push(id);
			if let Some(n) = self.node(id) {
				stack.extend(n.children.iter().rev().copied());
			}
		}
		out
	}

	fn with_attrs<R>(
		&mut self,
		node: NodeId,
		f: impl FnOnce(&mut Vec<(String, String)>) -> R,
	) -> Option<R> {
		match self.node_mut(node).map(|n| &mut n.data) {
			Some(NodeData::Element { attrs, .. }) => Some(f(attrs)),
			_ => None,
		}
	}
}

/// Arena-backed content tree.
///
/// The root is a `<div data-bio-root>` wrapper; content is parsed from
/// markup or built from views. Listener and observer callbacks run after
/// every internal borrow is released, so they are free to call back into
/// the tree.
///
/// ```
/// use bio_hydration::tree::{ContentTree, MemoryTree, Selector};
///
/// let tree = MemoryTree::from_markup(r#"<a class="cta" href="/shop">Shop</a>"#);
/// let links = tree.query(tree.root(), &Selector::class("cta"));
/// assert_eq!(tree.text(links[0]), "Shop");
/// ```
pub struct MemoryTree {
	arena: RefCell<Arena>,
	root: NodeId,
}

impl Default for MemoryTree {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for MemoryTree {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let arena = self.arena.borrow();
		f.debug_struct("MemoryTree")
			.field("nodes", &arena.nodes.len())
			.field("listeners", &arena.listeners.len())
			.field("observers", &arena.observers.len())
			.finish()
	}
}

impl MemoryTree {
	/// Creates an empty tree.
	pub fn new() -> Self {
		let mut arena = Arena::default();
		let root = arena.alloc(
			NodeData::Element {
				tag: "div".to_string(),
				attrs: vec![("data-bio-root".to_string(), String::new())],
			},
			None,
		);
		Self {
			arena: RefCell::new(arena),
			root,
		}
	}

	/// Creates a tree whose root contains `view`.
	pub fn from_view(view: View) -> Self {
		let tree = Self::new();
		tree.arena.borrow_mut().build(tree.root, view);
		tree
	}

	/// Creates a tree whose root contains the parsed `markup`.
	pub fn from_markup(markup: &str) -> Self {
		Self::from_view(View::Fragment(parse_fragment(markup)))
	}

	/// Serializes the children of `node`.
	pub fn inner_html(&self, node: NodeId) -> String {
		let arena = self.arena.borrow();
		let mut out = String::new();
		if let Some(n) = arena.node(node) {
			for child in &n.children {
				render_node(&arena, *child, &mut out);
			}
		}
		out
	}

	/// Serializes `node` itself.
	pub fn outer_html(&self, node: NodeId) -> String {
		let arena = self.arena.borrow();
		let mut out = String::new();
		render_node(&arena, node, &mut out);
		out
	}

	/// Serializes the whole content.
	pub fn html(&self) -> String {
		self.inner_html(self.root)
	}

	/// Dispatches an event at `target`, bubbling through its ancestors.
	pub fn dispatch(&self, target: NodeId, kind: EventKind) -> DomEvent {
		let event = DomEvent::new(kind, target);
		let path = {
			let arena = self.arena.borrow();
			let mut path = vec![target];
			let mut current = arena.node(target).and_then(|n| n.parent);
			while let Some(id) = current {
				path.push(id);
				current = arena.node(id).and_then(|n| n.parent);
			}
			path
		};
		for node in path {
			let listeners: Vec<Listener> = self
				.arena
				.borrow()
				.listeners
				.values()
				.filter(|entry| entry.node == node && entry.kind == kind)
				.map(|entry| Rc::clone(&entry.listener))
				.collect();
			event.set_current_target(node);
			for listener in listeners {
				listener(&event);
			}
			if event.propagation_stopped() {
				break;
			}
		}
		event
	}

	/// Shorthand for dispatching a click.
	pub fn click(&self, target: NodeId) -> DomEvent {
		self.dispatch(target, EventKind::Click)
	}

	/// Listeners attached to `node`.
	pub fn listeners_on(&self, node: NodeId) -> usize {
		self.arena
			.borrow()
			.listeners
			.values()
			.filter(|entry| entry.node == node)
			.count()
	}

	fn notify(&self) {
		let observers: Vec<ObserverCallback> =
			self.arena.borrow().observers.values().cloned().collect();
		for observer in observers {
			observer();
		}
	}
}

fn render_node(arena: &Arena, node: NodeId, out: &mut String) {
	let Some(n) = arena.node(node) else {
		return;
	};
	match &n.data {
		NodeData::Text(text) => out.push_str(&crate::view::html_escape(text)),
		NodeData::Element { tag, attrs } => {
			out.push('<');
			out.push_str(tag);
			for (name, value) in attrs {
				out.push(' ');
				out.push_str(name);
				out.push_str("=\"");
				out.push_str(&crate::view::html_escape(value));
				out.push('"');
			}
			if crate::view::is_void_element(tag) {
				out.push_str(" />");
				return;
			}
			out.push('>');
			for child in &n.children {
				render_node(arena, *child, out);
			}
			out.push_str("</");
			out.push_str(tag);
			out.push('>');
		}
	}
}

impl ContentTree for MemoryTree {
	fn root(&self) -> NodeId {
		self.root
	}

	fn query(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
		let arena = self.arena.borrow();
		arena
			.descendants(scope)
			.into_iter()
			.filter(|id| {
				arena.node(*id).is_some_and(|n| {
					matches!(n.data, NodeData::Element { .. }) && selector.matches(n)
				})
			})
			.collect()
	}

	fn find_by_id(&self, id: &str) -> Option<NodeId> {
		let arena = self.arena.borrow();
		std::iter::once(self.root)
			.chain(arena.descendants(self.root))
			.find(|node| arena.node(*node).and_then(|n| n.attribute("id")) == Some(id))
	}

	fn parent(&self, node: NodeId) -> Option<NodeId> {
		self.arena.borrow().node(node).and_then(|n| n.parent)
	}

	fn is_attached(&self, node: NodeId) -> bool {
		let arena = self.arena.borrow();
		let mut current = Some(node);
		while let Some(id) = current {
			if id == self.root {
				return true;
			}
			current = arena.node(id).and_then(|n| n.parent);
		}
		false
	}

	fn tag(&self, node: NodeId) -> Option<String> {
		match self.arena.borrow().node(node).map(|n| &n.data) {
			Some(NodeData::Element { tag, .. }) => Some(tag.clone()),
			_ => None,
		}
	}

	fn attr(&self, node: NodeId, name: &str) -> Option<String> {
		self.arena
			.borrow()
			.node(node)
			.and_then(|n| n.attribute(name))
			.map(str::to_string)
	}

	fn set_attr(&self, node: NodeId, name: &str, value: &str) {
		self.arena.borrow_mut().with_attrs(node, |attrs| {
			match attrs.iter_mut().find(|(n, _)| n == name) {
				Some((_, v)) => *v = value.to_string(),
				None => attrs.push((name.to_string(), value.to_string())),
			}
		});
	}

	fn remove_attr(&self, node: NodeId, name: &str) {
		self.arena
			.borrow_mut()
			.with_attrs(node, |attrs| attrs.retain(|(n, _)| n != name));
	}

	fn text(&self, node: NodeId) -> String {
		let mut out = String::new();
		self.arena.borrow().collect_text(node, &mut out);
		out
	}

	fn set_text(&self, node: NodeId, text: &str) {
		self.replace_children(node, View::text(text.to_string()));
	}

	fn style(&self, node: NodeId, property: &str) -> Option<String> {
		let style = self.attr(node, "style")?;
		parse_style(&style)
			.into_iter()
			.find(|(name, _)| name.eq_ignore_ascii_case(property))
			.map(|(_, value)| value)
	}

	fn set_style(&self, node: NodeId, property: &str, value: &str) {
		let mut decls = self
			.attr(node, "style")
			.map(|s| parse_style(&s))
			.unwrap_or_default();
		let property = property.to_ascii_lowercase();
		if value.is_empty() {
			decls.retain(|(name, _)| *name != property);
		} else {
			match decls.iter_mut().find(|(name, _)| *name == property) {
				Some((_, v)) => *v = value.to_string(),
				None => decls.push((property, value.to_string())),
			}
		}
		self.set_attr(node, "style", &render_style(&decls));
	}

	fn value(&self, node: NodeId) -> Option<String> {
		self.attr(node, "value")
	}

	fn set_value(&self, node: NodeId, value: &str) {
		self.set_attr(node, "value", value);
	}

	fn replace_children(&self, node: NodeId, view: View) {
		{
			let mut arena = self.arena.borrow_mut();
			if arena.node(node).is_none() {
				return;
			}
			arena.detach_children(node);
			arena.build(node, view);
		}
		self.notify();
	}

	fn append_view(&self, node: NodeId, view: View) {
		{
			let mut arena = self.arena.borrow_mut();
			if arena.node(node).is_none() {
				return;
			}
			arena.build(node, view);
		}
		self.notify();
	}

	fn insert_markup(&self, node: NodeId, markup: &SafeMarkup) -> Result<(), HydrationError> {
		if self.arena.borrow().node(node).is_none() {
			return Err(HydrationError::Markup(format!(
				"node {} does not exist",
				node.raw()
			)));
		}
		self.replace_children(node, View::Fragment(parse_fragment(markup.as_str())));
		Ok(())
	}

	fn add_listener(&self, node: NodeId, kind: EventKind, listener: Listener) -> ListenerId {
		let mut arena = self.arena.borrow_mut();
		arena.next_listener += 1;
		let id = ListenerId(arena.next_listener);
		arena.listeners.insert(id, ListenerEntry {
			node,
			kind,
			listener,
		});
		id
	}

	fn remove_listener(&self, id: ListenerId) -> bool {
		self.arena.borrow_mut().listeners.remove(&id).is_some()
	}

	fn listener_count(&self) -> usize {
		self.arena.borrow().listeners.len()
	}

	fn observe(&self, callback: ObserverCallback) -> ObserverId {
		let mut arena = self.arena.borrow_mut();
		arena.next_observer += 1;
		let id = ObserverId(arena.next_observer);
		arena.observers.insert(id, callback);
		id
	}

	fn disconnect(&self, id: ObserverId) -> bool {
		self.arena.borrow_mut().observers.remove(&id).is_some()
	}

	fn observer_count(&self) -> usize {
		self.arena.borrow().observers.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::cell::Cell;

	fn sample() -> MemoryTree {
		MemoryTree::from_markup(
			r#"<section id="links-feed">
				<a class="link" href="https://x.com">X <b>profile</b></a>
				<a class="link" href="/blog">Blog</a>
				<div class="countdown-timer" data-date="2030-01-01"><span class="days">00</span></div>
			</section>"#,
		)
	}

	#[rstest]
	fn test_query_in_document_order() {
		let tree = sample();
		let links = tree.query(tree.root(), &Selector::class("link"));
		assert_eq!(links.len(), 2);
		assert_eq!(tree.text(links[0]).trim(), "X profile");
		assert_eq!(tree.attr(links[1], "href").as_deref(), Some("/blog"));
	}

	#[rstest]
	fn test_query_is_scoped_to_descendants() {
		let tree = sample();
		let timer = tree.query_first(tree.root(), &Selector::class("countdown-timer")).unwrap();
		assert_eq!(tree.query(timer, &Selector::class("days")).len(), 1);
		assert!(tree.query(timer, &Selector::class("link")).is_empty());
		assert!(tree.query(timer, &Selector::class("countdown-timer")).is_empty());
	}

	#[rstest]
	fn test_attributes_and_styles() {
		let tree = sample();
		let section = tree.find_by_id("links-feed").unwrap();
		tree.set_style(section, "display", "none");
		tree.set_style(section, "opacity", "0.5");
		tree.set_style(section, "display", "block");
		assert_eq!(tree.style(section, "display").as_deref(), Some("block"));
		assert_eq!(
			tree.attr(section, "style").as_deref(),
			Some("display: block; opacity: 0.5")
		);
		tree.set_attr(section, "data-x", "1");
		assert!(tree.has_attr(section, "data-x"));
		tree.remove_attr(section, "data-x");
		assert!(!tree.has_attr(section, "data-x"));
	}

	#[rstest]
	fn test_replace_children_detaches_old_nodes_and_notifies() {
		let tree = sample();
		let notified = Rc::new(Cell::new(0));
		let counter = Rc::clone(&notified);
		tree.observe(Rc::new(move || counter.set(counter.get() + 1)));

		let section = tree.find_by_id("links-feed").unwrap();
		let old_link = tree.query(section, &Selector::class("link"))[0];
		assert!(tree.is_attached(old_link));

		tree.replace_children(section, View::element("p").child("gone").into());
		assert!(!tree.is_attached(old_link));
		assert_eq!(tree.inner_html(section), "<p>gone</p>");
		assert_eq!(notified.get(), 1);

		tree.set_attr(section, "data-y", "2");
		assert_eq!(notified.get(), 1);
	}

	#[rstest]
	fn test_dispatch_bubbles_and_stops() {
		let tree = sample();
		let section = tree.find_by_id("links-feed").unwrap();
		let link = tree.query(section, &Selector::class("link"))[0];
		let bold = tree.query(link, &Selector::tag("b"))[0];

		let order = Rc::new(RefCell::new(Vec::new()));
		let log = Rc::clone(&order);
		tree.add_listener(link, EventKind::Click, Rc::new(move |event: &DomEvent| {
			log.borrow_mut().push("link");
			event.prevent_default();
			event.stop_propagation();
		}));
		let log = Rc::clone(&order);
		tree.add_listener(section, EventKind::Click, Rc::new(move |_: &DomEvent| {
			log.borrow_mut().push("section");
		}));

		let event = tree.click(bold);
		assert!(event.default_prevented());
		assert_eq!(*order.borrow(), vec!["link"]);

		tree.click(section);
		assert_eq!(*order.borrow(), vec!["link", "section"]);
	}

	#[rstest]
	fn test_listener_may_mutate_tree() {
		let tree = Rc::new(sample());
		let section = tree.find_by_id("links-feed").unwrap();
		let handle = Rc::clone(&tree);
		tree.add_listener(section, EventKind::Click, Rc::new(move |event: &DomEvent| {
			handle.set_text(event.current_target(), "clicked");
		}));
		tree.click(section);
		assert_eq!(tree.text(section), "clicked");
	}

	#[rstest]
	fn test_listener_and_observer_handles() {
		let tree = sample();
		let id = tree.add_listener(tree.root(), EventKind::Submit, Rc::new(|_: &DomEvent| {}));
		assert_eq!(tree.listener_count(), 1);
		assert!(tree.remove_listener(id));
		assert!(!tree.remove_listener(id));

		let obs = tree.observe(Rc::new(|| {}));
		assert_eq!(tree.observer_count(), 1);
		assert!(tree.disconnect(obs));
		assert_eq!(tree.observer_count(), 0);
	}

	#[rstest]
	fn test_insert_markup() {
		let tree = MemoryTree::new();
		let markup = SafeMarkup::trusted("<p class=\"a\">hi</p>");
		tree.insert_markup(tree.root(), &markup).unwrap();
		assert_eq!(tree.html(), r#"<p class="a">hi</p>"#);
		assert!(tree.insert_markup(NodeId(999), &markup).is_err());
	}
}
