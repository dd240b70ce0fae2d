//! Rotating stack of already-loaded cards.
//!
//! Prev/next controls re-order the rendered cards in place. Nothing is
//! fetched again.

use super::ActivationContext;
use crate::tree::{EventKind, NodeId, Selector};
use crate::view::{ElementView, View};
use std::cell::RefCell;
use std::rc::Rc;

const STACK_CLASS: &str = "card-stack";
const ITEM_CLASS: &str = "card-stack-item";
const PREV_CLASS: &str = "card-stack-prev";
const NEXT_CLASS: &str = "card-stack-next";
const INDEX_ATTR: &str = "data-stack-index";

/// Visual placement of one card in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackPlacement {
	/// `z-index`.
	pub z_index: i32,
	/// `opacity`.
	pub opacity: &'static str,
	/// `transform`.
	pub transform: &'static str,
	/// Whether the card receives pointer events.
	pub interactive: bool,
}

impl StackPlacement {
	const HIDDEN: Self = Self {
		z_index: 1,
		opacity: "0",
		transform: "translateY(48px) scale(0.9)",
		interactive: false,
	};

	/// Placement of the card `offset` positions behind the active one.
	///
	/// Cards at or beyond `visible` are hidden.
	pub fn for_offset(offset: usize, visible: usize) -> Self {
		if offset >= visible {
			return Self::HIDDEN;
		}
		match offset {
			0 => Self {
				z_index: 10,
				opacity: "1",
				transform: "translateY(0px) scale(1)",
				interactive: true,
			},
			1 => Self {
				z_index: 9,
				opacity: "1",
				transform: "translateY(16px) scale(0.97)",
				interactive: false,
			},
			2 => Self {
				z_index: 8,
				opacity: "0.8",
				transform: "translateY(32px) scale(0.94)",
				interactive: false,
			},
			_ => Self::HIDDEN,
		}
	}

	fn css(&self) -> String {
		format!(
			"position: absolute; top: 0; left: 0; right: 0; transition: all 0.5s cubic-bezier(0.2, 0.8, 0.2, 1); transform-origin: top center; z-index: {}; opacity: {}; transform: {}; pointer-events: {}",
			self.z_index,
			self.opacity,
			self.transform,
			self.pointer_events()
		)
	}

	fn pointer_events(&self) -> &'static str {
		if self.interactive { "auto" } else { "none" }
	}
}

/// Index bookkeeping of a card stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardStack {
	total: usize,
	active: usize,
}

impl CardStack {
	/// A stack of `total` cards with the first one on top.
	pub fn new(total: usize) -> Self {
		Self { total, active: 0 }
	}

	/// Index of the card on top.
	pub fn active(&self) -> usize {
		self.active
	}

	/// Number of cards.
	pub fn total(&self) -> usize {
		self.total
	}

	/// Moves the top by `direction` (wrapping) and returns the new top.
	pub fn rotate(&mut self, direction: isize) -> usize {
		if self.total > 0 {
			let total = self.total as isize;
			self.active = ((self.active as isize + direction % total + total) % total) as usize;
		}
		self.active
	}

	/// Distance of card `index` behind the top.
	pub fn offset(&self, index: usize) -> usize {
		if self.total == 0 {
			return 0;
		}
		(index + self.total - self.active % self.total) % self.total
	}
}

/// Renders `cards` as a stack with prev/next controls.
pub(crate) fn render(cards: Vec<ElementView>, visible: usize) -> View {
	let items = cards.into_iter().enumerate().map(|(index, card)| {
		View::element("div")
			.class(ITEM_CLASS)
			.attr(INDEX_ATTR, index.to_string())
			.style(StackPlacement::for_offset(index, visible).css())
			.child(card)
	});
	View::fragment([
		View::element("div")
			.class(STACK_CLASS)
			.style("position: relative; min-height: 260px")
			.children(items),
		View::element("div")
			.class("card-stack-controls")
			.style("display: flex; justify-content: center; gap: 16px; margin-top: 24px; padding-top: 220px")
			.child(control(PREV_CLASS, "Previous", "‹"))
			.child(control(NEXT_CLASS, "Next", "›")),
	])
}

fn control(class: &'static str, label: &'static str, glyph: &'static str) -> ElementView {
	View::element("button")
		.class(class)
		.attr("type", "button")
		.attr("aria-label", label)
		.style("width: 44px; height: 44px; border-radius: 50%; border: 1px solid #e5e7eb; background: #ffffff; cursor: pointer")
		.child(glyph)
}

/// Wires the controls of the stack rendered under `container`.
pub(crate) fn wire(ctx: &Rc<ActivationContext>, container: NodeId) {
	let tree = ctx.tree();
	let Some(stack_node) = tree.query_first(container, &Selector::class(STACK_CLASS)) else {
		return;
	};
	let items = tree.query(stack_node, &Selector::class(ITEM_CLASS));
	let state = Rc::new(RefCell::new(CardStack::new(items.len())));
	let items = Rc::new(items);
	let visible = ctx.config.stack_visible;

	for (class, direction) in [(PREV_CLASS, -1isize), (NEXT_CLASS, 1)] {
		let Some(button) = tree.query_first(container, &Selector::class(class)) else {
			continue;
		};
		let weak = Rc::downgrade(ctx);
		let state = Rc::clone(&state);
		let items = Rc::clone(&items);
		ctx.listen(
			button,
			EventKind::Click,
			Rc::new(move |event| {
				event.prevent_default();
				let Some(ctx) = weak.upgrade() else {
					return;
				};
				let stack = {
					let mut stack = state.borrow_mut();
					stack.rotate(direction);
					*stack
				};
				apply(&ctx, &items, &stack, visible);
			}),
		);
	}
}

fn apply(ctx: &ActivationContext, items: &[NodeId], stack: &CardStack, visible: usize) {
	let tree = ctx.tree();
	for (index, node) in items.iter().enumerate() {
		let placement = StackPlacement::for_offset(stack.offset(index), visible);
		tree.set_style(*node, "z-index", &placement.z_index.to_string());
		tree.set_style(*node, "opacity", placement.opacity);
		tree.set_style(*node, "transform", placement.transform);
		tree.set_style(*node, "pointer-events", placement.pointer_events());
	}
}
