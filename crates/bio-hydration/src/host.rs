//! Host runtime facilities: clock, timers and local task spawning.
//!
//! Everything in the engine runs on one cooperative queue. Timer callbacks,
//! mutation notifications and network completions interleave but never run
//! in parallel, which is why callbacks are `Rc`-based and not `Send`.

mod virtual_clock;

#[cfg(not(target_arch = "wasm32"))]
mod tokio_host;

pub use virtual_clock::VirtualHost;

#[cfg(not(target_arch = "wasm32"))]
pub use tokio_host::TokioHost;

use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::time::Duration;

/// Handle to a pending timeout or interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Callback of a one-shot timer.
pub type TimeoutCallback = Box<dyn FnOnce()>;

/// Callback of a repeating timer.
pub type IntervalCallback = Rc<dyn Fn()>;

/// A future spawned on the local queue.
pub type LocalTask = Pin<Box<dyn Future<Output = ()>>>;

/// Clock, timers and task spawning of the hosting runtime.
pub trait Host {
	/// Current wall-clock instant.
	fn now(&self) -> DateTime<Utc>;

	/// Runs `callback` once after `delay`.
	fn set_timeout(&self, delay: Duration, callback: TimeoutCallback) -> TimerId;

	/// Runs `callback` every `period`, first after one period.
	fn set_interval(&self, period: Duration, callback: IntervalCallback) -> TimerId;

	/// Cancels a timer. Returns false if it already fired or was cleared.
	fn clear_timer(&self, id: TimerId) -> bool;

	/// Spawns a future on the local queue.
	fn spawn_local(&self, task: LocalTask);

	/// Number of timers that can still fire.
	fn active_timers(&self) -> usize;
}

/// Spawns `future` on `host`.
pub fn spawn<F>(host: &dyn Host, future: F)
where
	F: Future<Output = ()> + 'static,
{
	host.spawn_local(Box::pin(future));
}
