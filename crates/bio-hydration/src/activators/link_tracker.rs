//! Outbound link click tracking.

use super::{ActivationContext, ActivationReport, Activator};
use crate::api::{PageEvent, TrackEvent, TrackKind};
use crate::debug_log;
use crate::error::ActivationError;
use crate::markers::{self, MarkerKind};
use crate::tree::{ContentTree, EventKind, NodeId};
use std::rc::Rc;

/// Label reported for a link: its `aria-label`, else its trimmed text,
/// cut to `max_chars` characters.
pub fn link_label(tree: &dyn ContentTree, node: NodeId, max_chars: usize) -> String {
	let label = markers::config_attr(tree, node, "aria-label").unwrap_or_else(|| tree.text(node).trim().to_string());
	label.chars().take(max_chars).collect()
}

/// Attaches one fire-and-forget click listener per link.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkTrackerActivator;

impl Activator for LinkTrackerActivator {
	fn name(&self) -> &'static str {
		"link-tracker"
	}

	fn activate(&self, ctx: &Rc<ActivationContext>) -> Result<ActivationReport, ActivationError> {
		let tree = ctx.tree();
		let mut report = ActivationReport::default();
		for node in markers::unclaimed(tree, tree.root(), MarkerKind::TrackedLink) {
			if !markers::claim(tree, node, MarkerKind::TrackedLink) {
				continue;
			}
			report.claimed += 1;
			let weak = Rc::downgrade(ctx);
			ctx.listen(
				node,
				EventKind::Click,
				Rc::new(move |event| {
					if let Some(ctx) = weak.upgrade() {
						track_click(&ctx, event.current_target());
					}
				}),
			);
		}
		Ok(report)
	}
}

fn track_click(ctx: &Rc<ActivationContext>, node: NodeId) {
	let tree = ctx.tree();
	let Some(url) = tree.attr(node, "href") else {
		return;
	};
	let event = PageEvent::LinkClick {
		url,
		label: link_label(tree, node, ctx.config.label_max_chars),
		timestamp: ctx.host().now(),
	};
	let track = TrackEvent {
		bio_id: ctx.page.bio_id.clone(),
		referrer: ctx.page.referrer.clone(),
		session_id: ctx.session_id(),
		kind: TrackKind::Click,
	};
	let api = ctx.api();
	let bio_id = ctx.page.bio_id.clone();
	ctx.spawn(async move {
		if let Err(err) = api.post_event(&bio_id, &event).await {
			debug_log!("link click event dropped: {}", err);
		}
		if let Err(err) = api.track(&track).await {
			debug_log!("click track dropped: {}", err);
		}
	});
}
