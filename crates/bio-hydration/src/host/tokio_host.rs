//! [`Host`] backed by a tokio `LocalSet`.

use super::{Host, IntervalCallback, LocalTask, TimeoutCallback, TimerId};
use chrono::{DateTime, TimeDelta, Utc};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Native host for running the engine inside a tokio runtime.
///
/// Every method must be called from within a [`tokio::task::LocalSet`],
/// since callbacks and spawned futures are not `Send`. The wall clock is
/// derived from tokio's clock, so paused test time moves it as well.
pub struct TokioHost {
	timers: Rc<RefCell<HashMap<TimerId, AbortHandle>>>,
	next_id: Cell<u64>,
	epoch: (DateTime<Utc>, Instant),
}

impl Default for TokioHost {
	fn default() -> Self {
		Self::new()
	}
}

impl TokioHost {
	/// Creates a host anchored at the current instant.
	pub fn new() -> Self {
		Self {
			timers: Rc::new(RefCell::new(HashMap::new())),
			next_id: Cell::new(0),
			epoch: (Utc::now(), Instant::now()),
		}
	}

	fn next_id(&self) -> TimerId {
		let id = self.next_id.get() + 1;
		self.next_id.set(id);
		TimerId(id)
	}
}

impl Host for TokioHost {
	fn now(&self) -> DateTime<Utc> {
		let elapsed = Instant::now().duration_since(self.epoch.1);
		TimeDelta::from_std(elapsed)
			.ok()
			.and_then(|delta| self.epoch.0.checked_add_signed(delta))
			.unwrap_or(self.epoch.0)
	}

	fn set_timeout(&self, delay: Duration, callback: TimeoutCallback) -> TimerId {
		let id = self.next_id();
		let timers = Rc::clone(&self.timers);
		let handle = tokio::task::spawn_local(async move {
			tokio::time::sleep(delay).await;
			timers.borrow_mut().remove(&id);
			callback();
		});
		self.timers.borrow_mut().insert(id, handle.abort_handle());
		id
	}

	fn set_interval(&self, period: Duration, callback: IntervalCallback) -> TimerId {
		let id = self.next_id();
		let period = period.max(Duration::from_millis(1));
		let handle = tokio::task::spawn_local(async move {
			let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
			loop {
				ticker.tick().await;
				callback();
			}
		});
		self.timers.borrow_mut().insert(id, handle.abort_handle());
		id
	}

	fn clear_timer(&self, id: TimerId) -> bool {
		match self.timers.borrow_mut().remove(&id) {
			Some(handle) => {
				handle.abort();
				true
			}
			None => false,
		}
	}

	fn spawn_local(&self, task: LocalTask) {
		tokio::task::spawn_local(task);
	}

	fn active_timers(&self) -> usize {
		self.timers.borrow().len()
	}
}
