//! Instagram post embeds (`blockquote.instagram-media`).
//!
//! The embeds are rendered by Instagram's own `embed.js`. New embeds are
//! claimed on every scan; when a scan claims any, the script is asked to
//! process the page, after loading it once if it is not there yet.

use super::{ActivationContext, ActivationReport, Activator};
use crate::error::ActivationError;
use crate::markers::{self, MarkerKind};
use crate::{debug_log, warn_log};
use std::cell::Cell;
use std::rc::Rc;

/// `id` of the script element, shared with any copy the page already has.
pub const EMBED_SCRIPT_ID: &str = "instagram-embed-script";
/// Instagram's embed script.
pub const EMBED_SCRIPT_SRC: &str = "https://www.instagram.com/embed.js";

/// Hands Instagram embeds to the embed script.
#[derive(Debug, Default)]
pub struct InstagramEmbedActivator {
	waiting: Rc<Cell<bool>>,
}

impl Activator for InstagramEmbedActivator {
	fn name(&self) -> &'static str {
		"instagram-embed"
	}

	fn activate(&self, ctx: &Rc<ActivationContext>) -> Result<ActivationReport, ActivationError> {
		let tree = ctx.tree();
		let mut report = ActivationReport::default();
		for node in markers::unclaimed(tree, tree.root(), MarkerKind::InstagramEmbed) {
			if markers::claim(tree, node, MarkerKind::InstagramEmbed) {
				report.claimed += 1;
			}
		}
		if report.claimed == 0 || ctx.browser().process_instagram_embeds() {
			return Ok(report);
		}
		// one pass after load covers every embed claimed meanwhile
		if self.waiting.replace(true) {
			return Ok(report);
		}
		debug_log!("loading {} for {} embeds", EMBED_SCRIPT_SRC, report.claimed);
		let weak = Rc::downgrade(ctx);
		let waiting = Rc::clone(&self.waiting);
		ctx.browser().load_script(
			EMBED_SCRIPT_ID,
			EMBED_SCRIPT_SRC,
			Rc::new(move || {
				waiting.set(false);
				let Some(ctx) = weak.upgrade() else {
					return;
				};
				if !ctx.is_cancelled() && !ctx.browser().process_instagram_embeds() {
					warn_log!("{} loaded without instgrm.Embeds.process", EMBED_SCRIPT_SRC);
				}
			}),
		);
		Ok(report)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::Harness;
	use crate::tree::ContentTree;
	use crate::view::View;
	use rstest::rstest;

	const EMBEDS: &str = r#"
		<blockquote class="instagram-media" data-instgrm-permalink="https://www.instagram.com/p/1/"></blockquote>
		<blockquote class="instagram-media" data-instgrm-permalink="https://www.instagram.com/p/2/"></blockquote>"#;

	#[rstest]
	fn test_script_is_loaded_once_then_processes() {
		let harness = Harness::new(EMBEDS);
		let ctx = harness.context();
		let activator = InstagramEmbedActivator::default();
		assert_eq!(activator.activate(&ctx).unwrap().claimed, 2);
		assert_eq!(
			harness.browser.scripts(),
			vec![(EMBED_SCRIPT_ID.to_string(), EMBED_SCRIPT_SRC.to_string())]
		);
		assert_eq!(harness.browser.embed_passes(), 0);

		harness.browser.set_embeds_ready(true);
		harness.browser.finish_script(EMBED_SCRIPT_ID);
		assert_eq!(harness.browser.embed_passes(), 1);
		assert_eq!(harness.browser.scripts().len(), 1);
	}

	#[rstest]
	fn test_ready_script_processes_new_embeds_only() {
		let harness = Harness::new(EMBEDS);
		harness.browser.set_embeds_ready(true);
		let ctx = harness.context();
		let activator = InstagramEmbedActivator::default();
		activator.activate(&ctx).unwrap();
		assert_eq!(harness.browser.embed_passes(), 1);
		assert!(harness.browser.scripts().is_empty());

		// nothing new, nothing to process
		assert_eq!(activator.activate(&ctx).unwrap().claimed, 0);
		assert_eq!(harness.browser.embed_passes(), 1);
	}

	#[rstest]
	fn test_scans_while_loading_wait_on_one_load() {
		let harness = Harness::new(EMBEDS);
		let ctx = harness.context();
		let activator = InstagramEmbedActivator::default();
		activator.activate(&ctx).unwrap();
		harness.tree.append_view(
			harness.tree.root(),
			View::element("blockquote").class(markers::INSTAGRAM_EMBED_CLASS).into(),
		);
		assert_eq!(activator.activate(&ctx).unwrap().claimed, 1);

		harness.browser.set_embeds_ready(true);
		harness.browser.finish_script(EMBED_SCRIPT_ID);
		assert_eq!(harness.browser.embed_passes(), 1);
	}

	#[rstest]
	fn test_page_without_embeds_loads_nothing() {
		let harness = Harness::new(r#"<div class="custom-instagram-feed" data-username="ana"></div>"#);
		let ctx = harness.context();
		InstagramEmbedActivator::default().activate(&ctx).unwrap();
		assert!(harness.browser.scripts().is_empty());
	}

	#[rstest]
	fn test_load_after_teardown_does_not_process() {
		let harness = Harness::new(EMBEDS);
		let ctx = harness.context();
		InstagramEmbedActivator::default().activate(&ctx).unwrap();
		ctx.cancel.cancel();

		harness.browser.set_embeds_ready(true);
		harness.browser.finish_script(EMBED_SCRIPT_ID);
		assert_eq!(harness.browser.embed_passes(), 0);
	}
}
