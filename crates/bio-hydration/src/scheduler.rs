//! Scan scheduling.
//!
//! Three signals lead to a scan: the initial mount, a debounced tree
//! mutation notification, and a low-frequency safety tick. All of them end in
//! [`ScanScheduler::scan_now`], which is idempotent, so correctness never
//! depends on which signal fired.
//!
//! The debounce window opens on the first notification and is not extended
//! by the ones that follow, so a tree that never stops changing is still
//! scanned. Two scans are never closer than `min_scan_interval`. A debounced request
//! arriving too early is deferred to a single trailing scan instead of being
//! dropped; the safety tick simply skips.

use crate::activators::{ActivationContext, ActivationReport, Activator};
use crate::lifecycle::{Resource, ResourceId};
use crate::{debug_log, warn_log};
use chrono::{DateTime, Utc};
use std::cell::Cell;
use std::rc::{Rc, Weak};
use std::time::Duration;

/// Totals of one scan pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
	/// Nodes claimed by all activators.
	pub claimed: usize,
	/// Candidates skipped for unusable configuration.
	pub skipped: usize,
	/// Activators that returned an error.
	pub failures: usize,
}

/// Counters of a scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
	/// Completed scan passes.
	pub scans: usize,
	/// Activator failures across all passes.
	pub failures: usize,
	/// Mutation notifications received.
	pub notifications: usize,
	/// Instant of the last scan.
	pub last_scan: Option<DateTime<Utc>>,
}

/// Runs the activators of one engine lifetime.
pub struct ScanScheduler {
	ctx: Rc<ActivationContext>,
	activators: Vec<Box<dyn Activator>>,
	stats: Cell<ScanStats>,
	debounce: Cell<Option<ResourceId>>,
	trailing: Cell<Option<ResourceId>>,
	scanning: Cell<bool>,
	this: Weak<ScanScheduler>,
}

impl std::fmt::Debug for ScanScheduler {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ScanScheduler")
			.field("activators", &self.activators.iter().map(|a| a.name()).collect::<Vec<_>>())
			.field("stats", &self.stats.get())
			.finish()
	}
}

impl ScanScheduler {
	/// Creates a scheduler over `activators`, run in the given order.
	pub fn new(ctx: &Rc<ActivationContext>, activators: Vec<Box<dyn Activator>>) -> Rc<Self> {
		Rc::new_cyclic(|this| Self {
			ctx: Rc::clone(ctx),
			activators,
			stats: Cell::new(ScanStats::default()),
			debounce: Cell::new(None),
			trailing: Cell::new(None),
			scanning: Cell::new(false),
			this: this.clone(),
		})
	}

	/// Runs the initial scan, then subscribes to mutations and starts the
	/// safety tick. Both handles are owned by the context lifecycle.
	pub fn start(&self) -> ScanReport {
		let report = self.scan_now();

		let weak = self.weak();
		let observer = self.ctx.tree.observe(Rc::new(move || {
			if let Some(scheduler) = weak.upgrade() {
				scheduler.notify();
			}
		}));
		self.ctx.lifecycle.register(Resource::Observer(observer));

		let weak = self.weak();
		let timer = self.ctx.host.set_interval(
			self.ctx.config.safety_interval,
			Rc::new(move || {
				if let Some(scheduler) = weak.upgrade() {
					scheduler.safety_tick();
				}
			}),
		);
		self.ctx.lifecycle.register(Resource::Timer(timer));
		report
	}

	/// Runs every activator once, in order.
	///
	/// A failing activator is logged and the pass continues.
	pub fn scan_now(&self) -> ScanReport {
		let mut report = ScanReport::default();
		if self.ctx.is_cancelled() || self.scanning.replace(true) {
			return report;
		}
		if let Some(id) = self.trailing.take() {
			self.ctx.lifecycle.release(id);
		}
		let mut totals = ActivationReport::default();
		for activator in &self.activators {
			match activator.activate(&self.ctx) {
				Ok(partial) => totals.merge(partial),
				Err(err) => {
					warn_log!("activator {} failed: {}", activator.name(), err);
					report.failures += 1;
				}
			}
		}
		self.scanning.set(false);
		report.claimed = totals.claimed;
		report.skipped = totals.skipped;

		let mut stats = self.stats.get();
		stats.scans += 1;
		stats.failures += report.failures;
		stats.last_scan = Some(self.ctx.host.now());
		self.stats.set(stats);
		debug_log!(
			"scan #{} over {} activators: {} claimed, {} skipped, {} failed",
			stats.scans,
			self.activators.len(),
			report.claimed,
			report.skipped,
			report.failures
		);
		report
	}

	/// Counters so far.
	pub fn stats(&self) -> ScanStats {
		self.stats.get()
	}

	/// Number of activators in a pass.
	pub fn activator_count(&self) -> usize {
		self.activators.len()
	}

	fn weak(&self) -> Weak<ScanScheduler> {
		self.this.clone()
	}

	fn notify(&self) {
		// Our own patches would otherwise schedule a rescan of themselves.
		if self.scanning.get() || self.ctx.is_cancelled() {
			return;
		}
		let mut stats = self.stats.get();
		stats.notifications += 1;
		self.stats.set(stats);

		// The window runs from the first notification; later ones ride on it.
		if self.debounce.get().is_some() {
			return;
		}
		let weak = self.weak();
		let id = self.ctx.set_timeout(self.ctx.config.debounce, move |_| {
			if let Some(scheduler) = weak.upgrade() {
				scheduler.debounce.set(None);
				scheduler.request_scan();
			}
		});
		self.debounce.set(Some(id));
	}

	fn since_last_scan(&self) -> Option<Duration> {
		let last = self.stats.get().last_scan?;
		(self.ctx.host.now() - last).to_std().ok()
	}

	fn request_scan(&self) {
		let min = self.ctx.config.min_scan_interval;
		match self.since_last_scan() {
			Some(elapsed) if elapsed < min => self.defer(min - elapsed),
			_ => {
				self.scan_now();
			}
		}
	}

	fn defer(&self, wait: Duration) {
		if self.trailing.get().is_some() {
			return;
		}
		debug_log!("scan deferred by {:?}", wait);
		let weak = self.weak();
		let id = self.ctx.set_timeout(wait, move |_| {
			if let Some(scheduler) = weak.upgrade() {
				scheduler.trailing.set(None);
				scheduler.scan_now();
			}
		});
		self.trailing.set(Some(id));
	}

	fn safety_tick(&self) {
		let min = self.ctx.config.min_scan_interval;
		if self.since_last_scan().is_some_and(|elapsed| elapsed < min) {
			return;
		}
		self.scan_now();
	}
}
