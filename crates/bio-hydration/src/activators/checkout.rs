//! Product checkout links.
//!
//! A click asks the backend for a one-time checkout URL and opens it in a
//! popup. The node is disabled before the request starts and re-enabled
//! once it settles, whatever the outcome.

use super::{ActivationContext, ActivationReport, Activator};
use crate::browser::PopupFeatures;
use crate::error::ActivationError;
use crate::markers::{self, ATTR_PRODUCT_ID, MarkerKind};
use crate::tree::{EventKind, NodeId};
use crate::{debug_log, warn_log};
use std::rc::Rc;

/// Window name of the checkout popup.
pub const POPUP_NAME: &str = "checkout";
/// Shown when the request fails without a server message.
pub const FAILURE_TEXT: &str = "Failed to load product. Please try again.";

const DISABLED_ATTR: &str = "aria-disabled";

/// Styles overwritten while a node is disabled, with their prior values.
struct Disabled {
	node: NodeId,
	opacity: Option<String>,
	pointer_events: Option<String>,
}

impl Disabled {
	fn apply(ctx: &ActivationContext, node: NodeId) -> Self {
		let tree = ctx.tree();
		let saved = Self {
			node,
			opacity: tree.style(node, "opacity"),
			pointer_events: tree.style(node, "pointer-events"),
		};
		tree.set_attr(node, DISABLED_ATTR, "true");
		tree.set_style(node, "opacity", "0.7");
		tree.set_style(node, "pointer-events", "none");
		saved
	}

	fn restore(self, ctx: &ActivationContext) {
		let tree = ctx.tree();
		if !tree.is_attached(self.node) {
			return;
		}
		tree.remove_attr(self.node, DISABLED_ATTR);
		tree.set_style(self.node, "opacity", self.opacity.as_deref().unwrap_or(""));
		tree.set_style(
			self.node,
			"pointer-events",
			self.pointer_events.as_deref().unwrap_or(""),
		);
	}
}

/// Requests a checkout URL for `product_id` and opens it.
///
/// While a request for the product is in flight, further calls are ignored.
/// When `node` is given it is disabled for the duration of the request. A
/// blocked popup falls back to navigating the page.
pub fn launch_checkout(ctx: &Rc<ActivationContext>, product_id: &str, node: Option<NodeId>) {
	let product_id = product_id.trim();
	if product_id.is_empty() {
		return;
	}
	if let Some(node) = node
		&& ctx.tree().attr(node, DISABLED_ATTR).as_deref() == Some("true")
	{
		debug_log!("checkout for {} ignored: link disabled", product_id);
		return;
	}
	if !ctx.pending_checkouts.borrow_mut().insert(product_id.to_string()) {
		debug_log!("checkout for {} already in flight", product_id);
		return;
	}
	let disabled = node.map(|node| Disabled::apply(ctx, node));

	let task = Rc::clone(ctx);
	let product_id = product_id.to_string();
	ctx.spawn(async move {
		let ctx = task;
		let result = ctx.api().checkout_link(&product_id, &ctx.page.bio_id).await;
		ctx.pending_checkouts.borrow_mut().remove(&product_id);
		if let Some(disabled) = disabled {
			disabled.restore(&ctx);
		}
		if ctx.is_cancelled() {
			return;
		}
		match result {
			Ok(link) => {
				let browser = ctx.browser();
				let features = PopupFeatures::centered(ctx.config.checkout_popup, browser.screen_size());
				if !browser.open_popup(&link.url, POPUP_NAME, &features) {
					debug_log!("checkout popup blocked, navigating instead");
					browser.navigate(&link.url);
				}
			}
			Err(err) => {
				warn_log!("checkout for {} failed: {}", product_id, err);
				ctx.browser().notify(err.user_message().unwrap_or(FAILURE_TEXT));
			}
		}
	});
}

/// Wires product links and shop cards to [`launch_checkout`].
#[derive(Debug, Default, Clone, Copy)]
pub struct CheckoutActivator;

impl Activator for CheckoutActivator {
	fn name(&self) -> &'static str {
		MarkerKind::CheckoutLink.name()
	}

	fn activate(&self, ctx: &Rc<ActivationContext>) -> Result<ActivationReport, ActivationError> {
		let tree = ctx.tree();
		let mut report = ActivationReport::default();
		for node in markers::unclaimed(tree, tree.root(), MarkerKind::CheckoutLink) {
			let Some(product_id) = markers::config_attr(tree, node, ATTR_PRODUCT_ID) else {
				report.skipped += 1;
				continue;
			};
			if !markers::claim(tree, node, MarkerKind::CheckoutLink) {
				continue;
			}
			report.claimed += 1;
			let weak = Rc::downgrade(ctx);
			ctx.listen(
				node,
				EventKind::Click,
				Rc::new(move |event| {
					event.prevent_default();
					event.stop_propagation();
					if let Some(ctx) = weak.upgrade() {
						launch_checkout(&ctx, &product_id, Some(event.current_target()));
					}
				}),
			);
		}
		Ok(report)
	}
}
