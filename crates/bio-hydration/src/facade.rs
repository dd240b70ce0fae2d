//! Page-level actions callable from anywhere in the hosting page.
//!
//! Authored markup cannot receive framework props, so dialogs, tab switching
//! and checkout are reachable through one registration point per thread.
//! Registration is last-writer-wins: mounting a second engine replaces the
//! first engine's façade, and releasing the first one afterwards leaves the
//! second in place.

use crate::activators::{self, ActivationContext};
use crate::debug_log;
use crate::tabs::{Tab, TabRouter};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

type ReadyCallback = Box<dyn FnOnce(&Rc<PageActions>)>;

thread_local! {
	static CURRENT: RefCell<Option<Rc<PageActions>>> = const { RefCell::new(None) };
	static READY: RefCell<Vec<ReadyCallback>> = const { RefCell::new(Vec::new()) };
}

/// Actions of one engine lifetime.
///
/// Every action is a no-op once the engine that built it has unmounted.
pub struct PageActions {
	ctx: Weak<ActivationContext>,
	router: Weak<TabRouter>,
}

impl std::fmt::Debug for PageActions {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PageActions")
			.field("live", &self.context().is_some())
			.finish()
	}
}

impl PageActions {
	/// Binds the actions to an engine lifetime.
	pub fn new(ctx: &Rc<ActivationContext>, router: &Rc<TabRouter>) -> Self {
		Self {
			ctx: Rc::downgrade(ctx),
			router: Rc::downgrade(router),
		}
	}

	fn context(&self) -> Option<Rc<ActivationContext>> {
		self.ctx.upgrade().filter(|ctx| !ctx.is_cancelled())
	}

	/// Opens the share dialog for `url`.
	pub fn open_share(&self, url: &str, title: &str) {
		if let Some(ctx) = self.context() {
			activators::open_share(&ctx, url, title);
		}
	}

	/// Closes the share dialog.
	pub fn close_share(&self) {
		if let Some(ctx) = self.context() {
			activators::close_share(&ctx);
		}
	}

	/// Copies the URL currently shown in the share dialog.
	pub fn copy_share_link(&self) {
		if let Some(ctx) = self.context() {
			activators::copy_share_link(&ctx);
		}
	}

	/// Opens the subscribe dialog.
	pub fn open_subscribe(&self) {
		if let Some(ctx) = self.context() {
			activators::open_subscribe(&ctx);
		}
	}

	/// Closes the subscribe dialog.
	pub fn close_subscribe(&self) {
		if let Some(ctx) = self.context() {
			activators::close_subscribe(&ctx);
		}
	}

	/// Submits `email` to the newsletter.
	pub fn submit_subscribe(&self, email: &str) {
		if let Some(ctx) = self.context() {
			activators::submit_subscribe(&ctx, email);
		}
	}

	/// Switches to the tab called `tab` (`links`, `blog` or `shop`).
	pub fn switch_tab(&self, tab: &str) {
		if self.context().is_none() {
			return;
		}
		if let Some(router) = self.router.upgrade() {
			router.switch_tab(Tab::from_name(tab));
		}
	}

	/// Starts checkout for `product_id`.
	pub fn open_checkout(&self, product_id: &str) {
		if let Some(ctx) = self.context() {
			activators::launch_checkout(&ctx, product_id, None);
		}
	}
}

/// Makes `actions` the page façade and returns the one it replaced.
///
/// Pending [`on_ready`] callbacks run once the new façade is in place.
pub fn register(actions: Rc<PageActions>) -> Option<Rc<PageActions>> {
	let replaced = CURRENT.with(|current| current.borrow_mut().replace(Rc::clone(&actions)));
	if replaced.is_some() {
		debug_log!("page façade replaced");
	}
	let pending = READY.with(|ready| std::mem::take(&mut *ready.borrow_mut()));
	for callback in pending {
		callback(&actions);
	}
	replaced
}

/// The registered façade, if any.
pub fn current() -> Option<Rc<PageActions>> {
	CURRENT.with(|current| current.borrow().clone())
}

/// Clears the registration if it still holds `actions`.
///
/// Returns false when another façade has replaced it in the meantime.
pub fn release(actions: &Rc<PageActions>) -> bool {
	CURRENT.with(|current| {
		let mut current = current.borrow_mut();
		match current.as_ref() {
			Some(registered) if Rc::ptr_eq(registered, actions) => {
				*current = None;
				true
			}
			_ => false,
		}
	})
}

/// Runs `callback` with the façade, now if one is registered, else on the
/// next [`register`].
pub fn on_ready(callback: impl FnOnce(&Rc<PageActions>) + 'static) {
	match current() {
		Some(actions) => callback(&actions),
		None => READY.with(|ready| ready.borrow_mut().push(Box::new(callback))),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::Harness;
	use crate::tree::ContentTree;
	use rstest::rstest;
	use serial_test::serial;
	use std::cell::Cell;

	const PAGE: &str = r#"
		<button id="tab-links"><span></span></button>
		<button id="tab-shop"><span></span></button>
		<div id="links-feed"></div>
		<div id="shop-feed"></div>
		<div id="subscribe-modal" style="display: none"></div>"#;

	fn actions(harness: &Harness) -> (Rc<ActivationContext>, Rc<TabRouter>, Rc<PageActions>) {
		let ctx = harness.context();
		let router = TabRouter::new(&ctx);
		let actions = Rc::new(PageActions::new(&ctx, &router));
		(ctx, router, actions)
	}

	fn reset() {
		CURRENT.with(|current| current.borrow_mut().take());
		READY.with(|ready| ready.borrow_mut().clear());
	}

	#[rstest]
	#[serial]
	fn test_last_writer_wins_and_release_is_scoped() {
		reset();
		let harness = Harness::new(PAGE);
		let (_c1, _r1, first) = actions(&harness);
		let (_c2, _r2, second) = actions(&harness);

		assert!(register(Rc::clone(&first)).is_none());
		let replaced = register(Rc::clone(&second)).unwrap();
		assert!(Rc::ptr_eq(&replaced, &first));

		assert!(!release(&first));
		assert!(Rc::ptr_eq(&current().unwrap(), &second));
		assert!(release(&second));
		assert!(current().is_none());
	}

	#[rstest]
	#[serial]
	fn test_on_ready_waits_for_registration() {
		reset();
		let harness = Harness::new(PAGE);
		let (_ctx, _router, actions) = actions(&harness);
		let calls = Rc::new(Cell::new(0));

		let counter = Rc::clone(&calls);
		on_ready(move |_| counter.set(counter.get() + 1));
		assert_eq!(calls.get(), 0);

		register(Rc::clone(&actions));
		assert_eq!(calls.get(), 1);

		let counter = Rc::clone(&calls);
		on_ready(move |_| counter.set(counter.get() + 1));
		assert_eq!(calls.get(), 2);
		release(&actions);
	}

	#[rstest]
	#[serial]
	fn test_actions_reach_the_page() {
		reset();
		let harness = Harness::new(PAGE);
		let (_ctx, router, actions) = actions(&harness);

		actions.switch_tab("shop");
		assert_eq!(router.current(), Some(Tab::Shop));
		assert_eq!(harness.browser.history().last().map(String::as_str), Some("/ana/shop"));

		actions.open_subscribe();
		let modal = harness.tree.find_by_id("subscribe-modal").unwrap();
		assert_eq!(harness.tree.style(modal, "display").as_deref(), Some("flex"));
		actions.close_subscribe();
		assert_eq!(harness.tree.style(modal, "display").as_deref(), Some("none"));
	}

	#[rstest]
	#[serial]
	fn test_actions_are_inert_after_cancel() {
		reset();
		let harness = Harness::new(PAGE);
		let (ctx, router, actions) = actions(&harness);
		ctx.cancel.cancel();
		actions.switch_tab("shop");
		actions.open_checkout("p1");
		harness.host.run_until_stalled();
		assert_eq!(router.current(), None);
		assert!(harness.api.calls().is_empty());
	}
}
