//! Teardown bookkeeping for every resource the engine creates.
//!
//! Timers, the mutation subscription, event listeners, history subscriptions
//! and mounted widgets all go through [`Lifecycle::register`]. Unmounting
//! calls [`Lifecycle::teardown_all`], which releases each remaining handle
//! exactly once.

use crate::activators::MountedWidget;
use crate::browser::{Browser, SubscriptionId};
use crate::debug_log;
use crate::host::{Host, TimerId};
use crate::tree::{ContentTree, ListenerId, ObserverId};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A resource that must be released on teardown.
pub enum Resource {
	/// Timeout or interval.
	Timer(TimerId),
	/// Mutation-notification subscription.
	Observer(ObserverId),
	/// Event listener.
	Listener(ListenerId),
	/// History subscription.
	Popstate(SubscriptionId),
	/// Out-of-band widget.
	Widget(Box<dyn MountedWidget>),
}

impl fmt::Debug for Resource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Timer(id) => f.debug_tuple("Timer").field(id).finish(),
			Self::Observer(id) => f.debug_tuple("Observer").field(id).finish(),
			Self::Listener(id) => f.debug_tuple("Listener").field(id).finish(),
			Self::Popstate(id) => f.debug_tuple("Popstate").field(id).finish(),
			Self::Widget(_) => f.write_str("Widget"),
		}
	}
}

/// Handle returned by [`Lifecycle::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

/// Registration and release counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleStats {
	/// Resources registered so far.
	pub registered: usize,
	/// Resources released so far.
	pub released: usize,
}

impl LifecycleStats {
	/// Resources still held.
	pub fn live(&self) -> usize {
		self.registered - self.released
	}
}

/// Shared "this engine is gone" flag checked by asynchronous completions.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Rc<Cell<bool>>);

impl CancelFlag {
	/// Creates an unset flag.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the flag.
	pub fn cancel(&self) {
		self.0.set(true);
	}

	/// Whether the flag is set.
	pub fn is_cancelled(&self) -> bool {
		self.0.get()
	}
}

/// Owner of every resource handle created during one engine lifetime.
pub struct Lifecycle {
	tree: Rc<dyn ContentTree>,
	host: Rc<dyn Host>,
	browser: Rc<dyn Browser>,
	entries: RefCell<BTreeMap<ResourceId, Resource>>,
	next_id: Cell<u64>,
	stats: Cell<LifecycleStats>,
	closed: Cell<bool>,
}

impl fmt::Debug for Lifecycle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Lifecycle")
			.field("live", &self.entries.borrow().len())
			.field("stats", &self.stats.get())
			.field("closed", &self.closed.get())
			.finish()
	}
}

impl Lifecycle {
	/// Creates a manager releasing handles against the given collaborators.
	pub fn new(tree: Rc<dyn ContentTree>, host: Rc<dyn Host>, browser: Rc<dyn Browser>) -> Self {
		Self {
			tree,
			host,
			browser,
			entries: RefCell::new(BTreeMap::new()),
			next_id: Cell::new(0),
			stats: Cell::new(LifecycleStats::default()),
			closed: Cell::new(false),
		}
	}

	/// Takes ownership of `resource`.
	///
	/// After teardown the resource is released immediately, so late
	/// registrations from in-flight work never leak.
	pub fn register(&self, resource: Resource) -> ResourceId {
		let id = ResourceId(self.next_id.get() + 1);
		self.next_id.set(id.0);
		self.bump(|s| s.registered += 1);
		if self.closed.get() {
			self.free(resource);
			return id;
		}
		self.entries.borrow_mut().insert(id, resource);
		id
	}

	/// Releases one resource early. Returns false if it was already released.
	pub fn release(&self, id: ResourceId) -> bool {
		let resource = self.entries.borrow_mut().remove(&id);
		match resource {
			Some(resource) => {
				self.free(resource);
				true
			}
			None => false,
		}
	}

	/// Releases everything still held. Later calls are no-ops.
	pub fn teardown_all(&self) -> usize {
		if self.closed.replace(true) {
			return 0;
		}
		let drained = std::mem::take(&mut *self.entries.borrow_mut());
		let count = drained.len();
		for resource in drained.into_values() {
			self.free(resource);
		}
		debug_log!(
			"teardown released {} resources ({} registered in total)",
			count,
			self.stats.get().registered
		);
		count
	}

	/// Whether [`teardown_all`](Self::teardown_all) has run.
	pub fn is_closed(&self) -> bool {
		self.closed.get()
	}

	/// Number of resources still held.
	pub fn live(&self) -> usize {
		self.entries.borrow().len()
	}

	/// Registration and release counters.
	pub fn stats(&self) -> LifecycleStats {
		self.stats.get()
	}

	fn free(&self, resource: Resource) {
		match resource {
			Resource::Timer(id) => {
				self.host.clear_timer(id);
			}
			Resource::Observer(id) => {
				self.tree.disconnect(id);
			}
			Resource::Listener(id) => {
				self.tree.remove_listener(id);
			}
			Resource::Popstate(id) => {
				self.browser.off_popstate(id);
			}
			Resource::Widget(widget) => widget.unmount(),
		}
		self.bump(|s| s.released += 1);
	}

	fn bump(&self, update: impl FnOnce(&mut LifecycleStats)) {
		let mut stats = self.stats.get();
		update(&mut stats);
		self.stats.set(stats);
	}
}
