//! Browser services outside the content tree: history, popups, clipboard
//! and third-party scripts.

use crate::config::PopupSize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Handle to a history subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Position and size of a popup window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupFeatures {
	/// Window width.
	pub width: u32,
	/// Window height.
	pub height: u32,
	/// Distance from the left screen edge.
	pub left: u32,
	/// Distance from the top screen edge.
	pub top: u32,
}

impl PopupFeatures {
	/// A window of `size` centered on a screen of `screen` (width, height).
	pub fn centered(size: PopupSize, screen: (u32, u32)) -> Self {
		Self {
			width: size.width,
			height: size.height,
			left: screen.0.saturating_sub(size.width) / 2,
			top: screen.1.saturating_sub(size.height) / 2,
		}
	}

	/// `window.open` feature string.
	pub fn to_feature_string(&self) -> String {
		format!(
			"width={},height={},left={},top={},scrollbars=yes,resizable=yes",
			self.width, self.height, self.left, self.top
		)
	}
}

/// Navigation and window services of the hosting page.
pub trait Browser {
	/// Current location path.
	fn current_path(&self) -> String;

	/// Pushes a new history entry.
	fn push_path(&self, path: &str);

	/// Subscribes to back/forward navigation.
	fn on_popstate(&self, callback: Rc<dyn Fn()>) -> SubscriptionId;

	/// Ends a popstate subscription. Returns false if it was already gone.
	fn off_popstate(&self, id: SubscriptionId) -> bool;

	/// Opens a named popup window. Returns false if it was blocked.
	fn open_popup(&self, url: &str, name: &str, features: &PopupFeatures) -> bool;

	/// Navigates the whole page.
	fn navigate(&self, url: &str);

	/// Copies text to the clipboard.
	fn write_clipboard(&self, text: &str);

	/// Shows a blocking notice to the visitor.
	fn notify(&self, message: &str);

	/// Screen width and height.
	fn screen_size(&self) -> (u32, u32);

	/// Appends an async script with `id` and `src` to the document, unless a
	/// script with that id is already there. `on_load` runs once it loads.
	fn load_script(&self, id: &str, src: &str, on_load: Rc<dyn Fn()>);

	/// Runs `instgrm.Embeds.process()`. Returns false if the Instagram embed
	/// script has not defined it yet.
	fn process_instagram_embeds(&self) -> bool;
}

/// A popup opened through [`MemoryBrowser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedPopup {
	/// Target URL.
	pub url: String,
	/// Window name.
	pub name: String,
	/// Window features.
	pub features: PopupFeatures,
}

#[derive(Default)]
struct BrowserState {
	history: Vec<String>,
	popups: Vec<OpenedPopup>,
	navigations: Vec<String>,
	clipboard: Option<String>,
	notices: Vec<String>,
	popstate: BTreeMap<SubscriptionId, Rc<dyn Fn()>>,
	next_subscription: u64,
	block_popups: bool,
	scripts: Vec<(String, String)>,
	script_waiters: Vec<(String, Rc<dyn Fn()>)>,
	embeds_ready: bool,
	embed_passes: usize,
}

/// Recording [`Browser`] with an in-memory history stack.
pub struct MemoryBrowser {
	state: RefCell<BrowserState>,
	screen: (u32, u32),
}

impl std::fmt::Debug for MemoryBrowser {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.state.borrow();
		f.debug_struct("MemoryBrowser")
			.field("history", &state.history)
			.field("popups", &state.popups)
			.finish()
	}
}

impl MemoryBrowser {
	/// Starts at `path` on a 1920×1080 screen.
	pub fn new(path: impl Into<String>) -> Self {
		Self {
			state: RefCell::new(BrowserState {
				history: vec![path.into()],
				..BrowserState::default()
			}),
			screen: (1920, 1080),
		}
	}

	/// Simulates the back button.
	pub fn back(&self) {
		let popped = {
			let mut state = self.state.borrow_mut();
			if state.history.len() > 1 {
				state.history.pop();
				true
			} else {
				false
			}
		};
		if popped {
			self.fire_popstate();
		}
	}

	/// Simulates a navigation that only the browser performs (e.g. forward).
	pub fn visit_from_history(&self, path: impl Into<String>) {
		self.state.borrow_mut().history.push(path.into());
		self.fire_popstate();
	}

	fn fire_popstate(&self) {
		let callbacks: Vec<Rc<dyn Fn()>> = self.state.borrow().popstate.values().cloned().collect();
		for callback in callbacks {
			callback();
		}
	}

	/// History entries, oldest first.
	pub fn history(&self) -> Vec<String> {
		self.state.borrow().history.clone()
	}

	/// Popups opened so far.
	pub fn popups(&self) -> Vec<OpenedPopup> {
		self.state.borrow().popups.clone()
	}

	/// Full-page navigations so far.
	pub fn navigations(&self) -> Vec<String> {
		self.state.borrow().navigations.clone()
	}

	/// Clipboard content.
	pub fn clipboard(&self) -> Option<String> {
		self.state.borrow().clipboard.clone()
	}

	/// Notices shown so far.
	pub fn notices(&self) -> Vec<String> {
		self.state.borrow().notices.clone()
	}

	/// Makes every following popup fail as if a blocker refused it.
	pub fn block_popups(&self, blocked: bool) {
		self.state.borrow_mut().block_popups = blocked;
	}

	/// Live popstate subscriptions.
	pub fn popstate_subscribers(&self) -> usize {
		self.state.borrow().popstate.len()
	}

	/// Scripts appended so far as `(id, src)`.
	pub fn scripts(&self) -> Vec<(String, String)> {
		self.state.borrow().scripts.clone()
	}

	/// Simulates the script with `id` finishing its download.
	pub fn finish_script(&self, id: &str) {
		let waiters: Vec<Rc<dyn Fn()>> = {
			let mut state = self.state.borrow_mut();
			let (ready, pending) = std::mem::take(&mut state.script_waiters)
				.into_iter()
				.partition(|(waiting_on, _)| waiting_on == id);
			state.script_waiters = pending;
			ready.into_iter().map(|(_, callback)| callback).collect::<Vec<_>>()
		};
		for callback in waiters {
			callback();
		}
	}

	/// Makes `instgrm.Embeds.process()` available, as the embed script does.
	pub fn set_embeds_ready(&self, ready: bool) {
		self.state.borrow_mut().embeds_ready = ready;
	}

	/// Completed `instgrm.Embeds.process()` calls.
	pub fn embed_passes(&self) -> usize {
		self.state.borrow().embed_passes
	}
}

impl Browser for MemoryBrowser {
	fn current_path(&self) -> String {
		self.state
			.borrow()
			.history
			.last()
			.cloned()
			.unwrap_or_else(|| "/".to_string())
	}

	fn push_path(&self, path: &str) {
		self.state.borrow_mut().history.push(path.to_string());
	}

	fn on_popstate(&self, callback: Rc<dyn Fn()>) -> SubscriptionId {
		let mut state = self.state.borrow_mut();
		state.next_subscription += 1;
		let id = SubscriptionId(state.next_subscription);
		state.popstate.insert(id, callback);
		id
	}

	fn off_popstate(&self, id: SubscriptionId) -> bool {
		self.state.borrow_mut().popstate.remove(&id).is_some()
	}

	fn open_popup(&self, url: &str, name: &str, features: &PopupFeatures) -> bool {
		let mut state = self.state.borrow_mut();
		if state.block_popups {
			return false;
		}
		state.popups.push(OpenedPopup {
			url: url.to_string(),
			name: name.to_string(),
			features: *features,
		});
		true
	}

	fn navigate(&self, url: &str) {
		self.state.borrow_mut().navigations.push(url.to_string());
	}

	fn write_clipboard(&self, text: &str) {
		self.state.borrow_mut().clipboard = Some(text.to_string());
	}

	fn notify(&self, message: &str) {
		self.state.borrow_mut().notices.push(message.to_string());
	}

	fn screen_size(&self) -> (u32, u32) {
		self.screen
	}

	fn load_script(&self, id: &str, src: &str, on_load: Rc<dyn Fn()>) {
		let mut state = self.state.borrow_mut();
		if !state.scripts.iter().any(|(existing, _)| existing == id) {
			state.scripts.push((id.to_string(), src.to_string()));
		}
		state.script_waiters.push((id.to_string(), on_load));
	}

	fn process_instagram_embeds(&self) -> bool {
		let mut state = self.state.borrow_mut();
		if !state.embeds_ready {
			return false;
		}
		state.embed_passes += 1;
		true
	}
}
