//! Share dialog.
//!
//! One `#share-modal` exists per page. Triggers carry the URL to share;
//! the dialog keeps the current URL in `data-current-url` so copying works
//! without any state outside the tree.

use super::{ActivationContext, ActivationReport, Activator};
use crate::debug_log;
use crate::error::ActivationError;
use crate::markers::{self, ATTR_ACTION, ATTR_SHARE_TITLE, ATTR_SHARE_URL, MarkerKind};
use crate::tree::{EventKind, NodeId};
use std::rc::Rc;

const MODAL_ID: &str = "share-modal";
const CURRENT_URL_ATTR: &str = "data-current-url";
const QR_ENDPOINT: &str = "https://api.qrserver.com/v1/create-qr-code/?size=150x150&data=";

/// Notice shown after copying the link.
pub const COPIED_TEXT: &str = "Link copied to clipboard!";

/// Pre-built share targets for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinks {
	/// QR code image.
	pub qr: String,
	/// X / Twitter intent.
	pub twitter: String,
	/// Facebook sharer.
	pub facebook: String,
	/// WhatsApp message.
	pub whatsapp: String,
	/// LinkedIn share.
	pub linkedin: String,
}

impl ShareLinks {
	/// Builds every target for `url`.
	pub fn for_url(url: &str) -> Self {
		let encoded = urlencoding::encode(url);
		Self {
			qr: format!("{}{}", QR_ENDPOINT, encoded),
			twitter: format!("https://twitter.com/intent/tweet?url={}", encoded),
			facebook: format!("https://www.facebook.com/sharer/sharer.php?u={}", encoded),
			whatsapp: format!("https://api.whatsapp.com/send?text={}", encoded),
			linkedin: format!("https://www.linkedin.com/sharing/share-offsite/?url={}", encoded),
		}
	}
}

/// Fills and shows the share dialog.
pub fn open_share(ctx: &ActivationContext, url: &str, title: &str) {
	let tree = ctx.tree();
	let Some(modal) = tree.find_by_id(MODAL_ID) else {
		debug_log!("share requested without #{}", MODAL_ID);
		return;
	};
	let links = ShareLinks::for_url(url);
	tree.set_attr(modal, CURRENT_URL_ATTR, url);
	if let Some(node) = tree.find_by_id("share-title") {
		tree.set_text(node, title);
	}
	if let Some(node) = tree.find_by_id("share-qr") {
		tree.set_attr(node, "src", &links.qr);
	}
	for (id, href) in [
		("share-twitter", &links.twitter),
		("share-facebook", &links.facebook),
		("share-whatsapp", &links.whatsapp),
		("share-linkedin", &links.linkedin),
	] {
		if let Some(node) = tree.find_by_id(id) {
			tree.set_attr(node, "href", href);
		}
	}
	tree.set_style(modal, "display", "flex");
}

/// Hides the share dialog.
pub fn close_share(ctx: &ActivationContext) {
	if let Some(modal) = ctx.tree().find_by_id(MODAL_ID) {
		ctx.tree().set_style(modal, "display", "none");
	}
}

/// Copies the URL currently shown in the dialog.
pub fn copy_share_link(ctx: &ActivationContext) {
	let Some(url) = ctx
		.tree()
		.find_by_id(MODAL_ID)
		.and_then(|modal| ctx.tree().attr(modal, CURRENT_URL_ATTR))
	else {
		return;
	};
	ctx.browser().write_clipboard(&url);
	ctx.browser().notify(COPIED_TEXT);
}

/// Wires share triggers and the dialog's own controls.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShareActivator;

impl Activator for ShareActivator {
	fn name(&self) -> &'static str {
		MarkerKind::ShareTrigger.name()
	}

	fn activate(&self, ctx: &Rc<ActivationContext>) -> Result<ActivationReport, ActivationError> {
		let tree = ctx.tree();
		let mut report = ActivationReport::default();
		for node in markers::unclaimed(tree, tree.root(), MarkerKind::ShareTrigger) {
			if !markers::claim(tree, node, MarkerKind::ShareTrigger) {
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
						handle(&ctx, event.current_target());
					}
				}),
			);
		}
		Ok(report)
	}
}

fn handle(ctx: &ActivationContext, node: NodeId) {
	let tree = ctx.tree();
	match tree.attr(node, ATTR_ACTION).as_deref() {
		Some("close-share") => close_share(ctx),
		Some("copy-share") => copy_share_link(ctx),
		_ => {
			let Some(url) = markers::config_attr(tree, node, ATTR_SHARE_URL) else {
				return;
			};
			let title = markers::config_attr(tree, node, ATTR_SHARE_TITLE).unwrap_or_default();
			open_share(ctx, &url, &title);
		}
	}
}
