//! Deterministic [`Host`] with a manually advanced clock.

use super::{Host, IntervalCallback, LocalTask, TimeoutCallback, TimerId};
use crate::warn_log;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::time::Duration;

enum TimerAction {
	Once(TimeoutCallback),
	Every(TimeDelta, IntervalCallback),
}

struct Timer {
	due: DateTime<Utc>,
	action: TimerAction,
}

struct ClockState {
	now: DateTime<Utc>,
	next_id: u64,
	timers: BTreeMap<TimerId, Timer>,
}

enum Due {
	Once(TimeoutCallback),
	Every(IntervalCallback),
}

/// Virtual-time host for tests and headless rendering.
///
/// Time only moves in [`advance`](Self::advance). Spawned futures are
/// polled by [`run_until_stalled`](Self::run_until_stalled), which `advance`
/// also calls before and after every timer it fires, so completions that
/// are ready "now" are observed before later timers run.
///
/// ```
/// use bio_hydration::host::{Host, VirtualHost};
/// use std::{cell::Cell, rc::Rc, time::Duration};
///
/// let host = VirtualHost::new();
/// let ticks = Rc::new(Cell::new(0));
/// let counter = Rc::clone(&ticks);
/// host.set_interval(Duration::from_secs(1), Rc::new(move || counter.set(counter.get() + 1)));
/// host.advance(Duration::from_millis(3500));
/// assert_eq!(ticks.get(), 3);
/// ```
pub struct VirtualHost {
	state: RefCell<ClockState>,
	pool: RefCell<LocalPool>,
	spawner: LocalSpawner,
}

impl Default for VirtualHost {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for VirtualHost {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.state.borrow();
		f.debug_struct("VirtualHost")
			.field("now", &state.now)
			.field("timers", &state.timers.len())
			.finish()
	}
}

impl VirtualHost {
	/// Starts the clock at 2025-01-01T00:00:00Z.
	pub fn new() -> Self {
		Self::starting_at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap_or_default())
	}

	/// Starts the clock at `now`.
	pub fn starting_at(now: DateTime<Utc>) -> Self {
		let pool = LocalPool::new();
		let spawner = pool.spawner();
		Self {
			state: RefCell::new(ClockState {
				now,
				next_id: 0,
				timers: BTreeMap::new(),
			}),
			pool: RefCell::new(pool),
			spawner,
		}
	}

	/// Polls spawned futures until none can make progress.
	pub fn run_until_stalled(&self) {
		if let Ok(mut pool) = self.pool.try_borrow_mut() {
			pool.run_until_stalled();
		}
	}

	/// Moves the clock forward, firing due timers in order.
	pub fn advance(&self, by: Duration) {
		let target = {
			let state = self.state.borrow();
			offset(state.now, by)
		};
		self.run_until_stalled();
		while let Some(due) = self.pop_due(target) {
			match due {
				Due::Once(callback) => callback(),
				Due::Every(callback) => callback(),
			}
			self.run_until_stalled();
		}
		self.state.borrow_mut().now = target;
		self.run_until_stalled();
	}

	/// Milliseconds until the next timer fires.
	pub fn next_due_in(&self) -> Option<Duration> {
		let state = self.state.borrow();
		state
			.timers
			.values()
			.map(|t| t.due)
			.min()
			.and_then(|due| (due - state.now).to_std().ok())
	}

	fn pop_due(&self, target: DateTime<Utc>) -> Option<Due> {
		let mut state = self.state.borrow_mut();
		let id = state
			.timers
			.iter()
			.filter(|(_, timer)| timer.due <= target)
			.min_by_key(|(id, timer)| (timer.due, **id))
			.map(|(id, _)| *id)?;
		let timer = state.timers.remove(&id)?;
		state.now = timer.due;
		match timer.action {
			TimerAction::Once(callback) => Some(Due::Once(callback)),
			TimerAction::Every(period, callback) => {
				state.timers.insert(id, Timer {
					due: timer.due.checked_add_signed(period).unwrap_or(DateTime::<Utc>::MAX_UTC),
					action: TimerAction::Every(period, callback.clone()),
				});
				Some(Due::Every(callback))
			}
		}
	}

	fn insert(&self, delay: Duration, action: TimerAction) -> TimerId {
		let mut state = self.state.borrow_mut();
		state.next_id += 1;
		let id = TimerId(state.next_id);
		let due = offset(state.now, delay);
		state.timers.insert(id, Timer { due, action });
		id
	}
}

fn offset(from: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
	TimeDelta::from_std(by)
		.ok()
		.and_then(|delta| from.checked_add_signed(delta))
		.unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl Host for VirtualHost {
	fn now(&self) -> DateTime<Utc> {
		self.state.borrow().now
	}

	fn set_timeout(&self, delay: Duration, callback: TimeoutCallback) -> TimerId {
		self.insert(delay, TimerAction::Once(callback))
	}

	fn set_interval(&self, period: Duration, callback: IntervalCallback) -> TimerId {
		let period = period.max(Duration::from_millis(1));
		let step = TimeDelta::from_std(period).unwrap_or(TimeDelta::MAX);
		self.insert(period, TimerAction::Every(step, callback))
	}

	fn clear_timer(&self, id: TimerId) -> bool {
		self.state.borrow_mut().timers.remove(&id).is_some()
	}

	fn spawn_local(&self, task: LocalTask) {
		if let Err(e) = self.spawner.spawn_local(task) {
			warn_log!("failed to spawn local task: {}", e);
		}
	}

	fn active_timers(&self) -> usize {
		self.state.borrow().timers.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::channel::oneshot;
	use rstest::rstest;
	use std::cell::{Cell, RefCell};
	use std::rc::Rc;

	#[rstest]
	fn test_timeout_fires_once_at_due_time() {
		let host = VirtualHost::new();
		let start = host.now();
		let fired = Rc::new(Cell::new(false));
		let flag = Rc::clone(&fired);
		let id = host.set_timeout(Duration::from_millis(180), Box::new(move || flag.set(true)));
		host.advance(Duration::from_millis(179));
		assert!(!fired.get());
		host.advance(Duration::from_millis(1));
		assert!(fired.get());
		assert_eq!(host.now() - start, TimeDelta::milliseconds(180));
		assert!(!host.clear_timer(id));
		assert_eq!(host.active_timers(), 0);
	}

	#[rstest]
	fn test_timers_fire_in_due_order() {
		let host = Rc::new(VirtualHost::new());
		let order = Rc::new(RefCell::new(Vec::new()));
		for (label, ms) in [("b", 200u64), ("a", 100), ("c", 200)] {
			let log = Rc::clone(&order);
			host.set_timeout(
				Duration::from_millis(ms),
				Box::new(move || log.borrow_mut().push(label)),
			);
		}
		host.advance(Duration::from_secs(1));
		assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
	}

	#[rstest]
	fn test_cleared_interval_stops() {
		let host = VirtualHost::new();
		let ticks = Rc::new(Cell::new(0));
		let counter = Rc::clone(&ticks);
		let id = host.set_interval(
			Duration::from_secs(1),
			Rc::new(move || counter.set(counter.get() + 1)),
		);
		host.advance(Duration::from_secs(2));
		assert!(host.clear_timer(id));
		host.advance(Duration::from_secs(5));
		assert_eq!(ticks.get(), 2);
	}

	#[rstest]
	fn test_callback_can_schedule_more_timers() {
		let host = Rc::new(VirtualHost::new());
		let fired = Rc::new(Cell::new(0));
		let inner_host = Rc::clone(&host);
		let counter = Rc::clone(&fired);
		host.set_timeout(
			Duration::from_millis(10),
			Box::new(move || {
				let counter = Rc::clone(&counter);
				inner_host.set_timeout(
					Duration::from_millis(10),
					Box::new(move || counter.set(counter.get() + 1)),
				);
			}),
		);
		host.advance(Duration::from_millis(20));
		assert_eq!(fired.get(), 1);
	}

	#[rstest]
	fn test_spawned_task_runs_when_ready() {
		let host = VirtualHost::new();
		let (tx, rx) = oneshot::channel::<u32>();
		let got = Rc::new(Cell::new(0));
		let sink = Rc::clone(&got);
		crate::host::spawn(&host, async move {
			if let Ok(v) = rx.await {
				sink.set(v);
			}
		});
		host.run_until_stalled();
		assert_eq!(got.get(), 0);
		tx.send(7).unwrap();
		host.run_until_stalled();
		assert_eq!(got.get(), 7);
	}

	#[rstest]
	fn test_next_due_in() {
		let host = VirtualHost::new();
		assert_eq!(host.next_due_in(), None);
		host.set_timeout(Duration::from_millis(250), Box::new(|| {}));
		assert_eq!(host.next_due_in(), Some(Duration::from_millis(250)));
	}
}
