//! Newsletter subscribe dialog.

use super::{ActivationContext, ActivationReport, Activator};
use crate::error::ActivationError;
use crate::markers::{self, ATTR_ACTION, MarkerKind};
use crate::tree::{EventKind, NodeId, Selector};
use crate::{debug_log, warn_log};
use std::rc::Rc;

const MODAL_ID: &str = "subscribe-modal";
const FORM_ID: &str = "subscribe-form";
const MESSAGE_IDS: [&str; 2] = ["subscribe-message", "subscribe-success"];

/// Shown after a successful (or repeated) subscription.
pub const SUCCESS_TEXT: &str = "Thanks for subscribing!";
/// Shown when the email field is blank.
pub const EMPTY_EMAIL_TEXT: &str = "Please enter your email.";
/// Shown when the request fails without a server message.
pub const FAILURE_TEXT: &str = "Failed to subscribe. Please try again.";

const SUCCESS_COLOR: &str = "#10b981";
const ERROR_COLOR: &str = "#ef4444";

/// Shows the subscribe dialog with a cleared message.
pub fn open_subscribe(ctx: &ActivationContext) {
	let tree = ctx.tree();
	let Some(modal) = tree.find_by_id(MODAL_ID) else {
		debug_log!("subscribe requested without #{}", MODAL_ID);
		return;
	};
	hide_message(ctx);
	tree.set_style(modal, "display", "flex");
}

/// Hides the subscribe dialog and its message.
pub fn close_subscribe(ctx: &ActivationContext) {
	let tree = ctx.tree();
	if let Some(modal) = tree.find_by_id(MODAL_ID) {
		tree.set_style(modal, "display", "none");
	}
	hide_message(ctx);
}

/// Subscribes `email` to the bio's newsletter.
///
/// The outcome is written into the dialog. On success the input is cleared
/// and the dialog closes after `subscribe_auto_close`.
pub fn submit_subscribe(ctx: &Rc<ActivationContext>, email: &str) {
	let email = email.trim().to_string();
	if email.is_empty() {
		show_message(ctx, EMPTY_EMAIL_TEXT, false);
		return;
	}
	let task = Rc::clone(ctx);
	ctx.spawn(async move {
		let ctx = task;
		let result = ctx.api().subscribe(&ctx.page.bio_id, &email).await;
		if ctx.is_cancelled() {
			return;
		}
		match result {
			Ok(()) => succeed(&ctx),
			Err(err) if err.is_conflict() => succeed(&ctx),
			Err(err) => {
				warn_log!("subscribe failed: {}", err);
				let message = err.user_message().unwrap_or(FAILURE_TEXT).to_string();
				show_message(&ctx, &message, false);
			}
		}
	});
}

fn succeed(ctx: &Rc<ActivationContext>) {
	show_message(ctx, SUCCESS_TEXT, true);
	if let Some(input) = email_input(ctx) {
		ctx.tree().set_value(input, "");
	}
	ctx.set_timeout(ctx.config.subscribe_auto_close, |ctx| close_subscribe(ctx));
}

fn email_input(ctx: &ActivationContext) -> Option<NodeId> {
	let tree = ctx.tree();
	let form = tree.find_by_id(FORM_ID)?;
	tree.query_first(form, &Selector::tag("input").and(Selector::attr_eq("type", "email")))
}

fn message_node(ctx: &ActivationContext) -> Option<NodeId> {
	MESSAGE_IDS.iter().find_map(|id| ctx.tree().find_by_id(id))
}

fn show_message(ctx: &ActivationContext, text: &str, ok: bool) {
	let Some(node) = message_node(ctx) else {
		return;
	};
	let tree = ctx.tree();
	tree.set_text(node, text);
	tree.set_style(node, "display", "block");
	tree.set_style(node, "color", if ok { SUCCESS_COLOR } else { ERROR_COLOR });
}

fn hide_message(ctx: &ActivationContext) {
	if let Some(node) = message_node(ctx) {
		ctx.tree().set_style(node, "display", "none");
	}
}

/// Wires subscribe triggers and the subscribe form.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubscribeActivator;

impl Activator for SubscribeActivator {
	fn name(&self) -> &'static str {
		MarkerKind::SubscribeTrigger.name()
	}

	fn activate(&self, ctx: &Rc<ActivationContext>) -> Result<ActivationReport, ActivationError> {
		let tree = ctx.tree();
		let mut report = ActivationReport::default();
		for node in markers::unclaimed(tree, tree.root(), MarkerKind::SubscribeTrigger) {
			if !markers::claim(tree, node, MarkerKind::SubscribeTrigger) {
				continue;
			}
			report.claimed += 1;
			let closes = tree.attr(node, ATTR_ACTION).as_deref() == Some("close-subscribe");
			let weak = Rc::downgrade(ctx);
			ctx.listen(
				node,
				EventKind::Click,
				Rc::new(move |event| {
					event.prevent_default();
					event.stop_propagation();
					let Some(ctx) = weak.upgrade() else {
						return;
					};
					if closes {
						close_subscribe(&ctx);
					} else {
						open_subscribe(&ctx);
					}
				}),
			);
		}

		for form in markers::unclaimed(tree, tree.root(), MarkerKind::SubscribeForm) {
			if !markers::claim(tree, form, MarkerKind::SubscribeForm) {
				continue;
			}
			report.claimed += 1;
			let weak = Rc::downgrade(ctx);
			ctx.listen(
				form,
				EventKind::Submit,
				Rc::new(move |event| {
					event.prevent_default();
					let Some(ctx) = weak.upgrade() else {
						return;
					};
					let email = email_input(&ctx)
						.and_then(|input| ctx.tree().value(input))
						.unwrap_or_default();
					submit_subscribe(&ctx, &email);
				}),
			);
		}
		Ok(report)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ApiError;
	use crate::testing::Harness;
	use crate::host::Host;
	use crate::tree::ContentTree;
	use rstest::rstest;
	use std::time::Duration;

	const DIALOG: &str = r#"
		<button aria-label="Subscribe">Subscribe</button>
		<div id="subscribe-modal" style="display: none">
			<form id="subscribe-form"><input type="email" value=""><button type="submit">Go</button></form>
			<p id="subscribe-success" style="display: none"></p>
			<button data-action="close-subscribe">Close</button>
		</div>"#;

	fn submit(harness: &Harness, email: &str) {
		let tree = &harness.tree;
		let form = tree.find_by_id(FORM_ID).unwrap();
		let input = tree.query_first(form, &Selector::tag("input")).unwrap();
		tree.set_value(input, email);
		tree.dispatch(form, EventKind::Submit);
		harness.host.run_until_stalled();
	}

	fn message(harness: &Harness) -> String {
		harness.tree.text(harness.tree.find_by_id("subscribe-success").unwrap())
	}

	#[rstest]
	fn test_open_and_close_triggers() {
		let harness = Harness::new(DIALOG);
		let ctx = harness.context();
		let report = SubscribeActivator.activate(&ctx).unwrap();
		assert_eq!(report.claimed, 3);

		let tree = &harness.tree;
		let modal = tree.find_by_id(MODAL_ID).unwrap();
		let open = tree.query_first(tree.root(), &Selector::attr_eq("aria-label", "Subscribe")).unwrap();
		tree.click(open);
		assert_eq!(tree.style(modal, "display").as_deref(), Some("flex"));
		let close = tree.query_first(tree.root(), &Selector::attr_eq(ATTR_ACTION, "close-subscribe")).unwrap();
		tree.click(close);
		assert_eq!(tree.style(modal, "display").as_deref(), Some("none"));
	}

	#[rstest]
	fn test_success_clears_input_and_auto_closes() {
		let harness = Harness::new(DIALOG);
		let ctx = harness.context();
		SubscribeActivator.activate(&ctx).unwrap();
		open_subscribe(&ctx);

		submit(&harness, " fan@example.com ");
		assert_eq!(message(&harness), SUCCESS_TEXT);
		assert_eq!(harness.api.calls(), vec!["subscribe bio-1 fan@example.com".to_string()]);
		let input = harness.tree.query_first(harness.tree.root(), &Selector::tag("input")).unwrap();
		assert_eq!(harness.tree.value(input).as_deref(), Some(""));

		let modal = harness.tree.find_by_id(MODAL_ID).unwrap();
		harness.host.advance(Duration::from_millis(1999));
		assert_eq!(harness.tree.style(modal, "display").as_deref(), Some("flex"));
		harness.host.advance(Duration::from_millis(1));
		assert_eq!(harness.tree.style(modal, "display").as_deref(), Some("none"));
		assert_eq!(harness.host.active_timers(), 0);
	}

	#[rstest]
	#[case(Err(ApiError::Http { status: 409, message: None }), SUCCESS_TEXT)]
	#[case(Err(ApiError::Http { status: 422, message: Some("Invalid email".into()) }), "Invalid email")]
	#[case(Err(ApiError::Transport("offline".into())), FAILURE_TEXT)]
	fn test_failure_messages(#[case] reply: Result<(), ApiError>, #[case] expected: &str) {
		let harness = Harness::new(DIALOG);
		harness.api.set_subscribe(reply);
		let ctx = harness.context();
		SubscribeActivator.activate(&ctx).unwrap();
		submit(&harness, "fan@example.com");
		assert_eq!(message(&harness), expected);
	}

	#[rstest]
	fn test_blank_email_never_hits_the_network() {
		let harness = Harness::new(DIALOG);
		let ctx = harness.context();
		SubscribeActivator.activate(&ctx).unwrap();
		submit(&harness, "   ");
		assert_eq!(message(&harness), EMPTY_EMAIL_TEXT);
		assert!(harness.api.calls().is_empty());
	}
}
