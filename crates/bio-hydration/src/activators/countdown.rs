//! Countdown timers.

use super::{ActivationContext, ActivationReport, Activator};
use crate::debug_log;
use crate::error::ActivationError;
use crate::lifecycle::{Resource, ResourceId};
use crate::markers::{self, ATTR_DATE, COUNTDOWN_SLOTS, MarkerKind};
use crate::tree::{NodeId, Selector};
use crate::view::View;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Text rendered once the target instant has passed.
pub const FINISHED_TEXT: &str = "Event Started";

/// Parses a countdown target.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM[:SS]` (read as UTC) or a
/// bare date (midnight UTC).
pub fn parse_target(raw: &str) -> Option<DateTime<Utc>> {
	let raw = raw.trim();
	if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
		return Some(instant.with_timezone(&Utc));
	}
	for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
		if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
			return Some(naive.and_utc());
		}
	}
	NaiveDate::parse_from_str(raw, "%Y-%m-%d")
		.ok()
		.and_then(|date| date.and_hms_opt(0, 0, 0))
		.map(|naive| naive.and_utc())
}

/// Time left until a countdown target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Remaining {
	/// Whole days.
	pub days: i64,
	/// Hours past the days.
	pub hours: i64,
	/// Minutes past the hours.
	pub minutes: i64,
	/// Seconds past the minutes.
	pub seconds: i64,
}

impl Remaining {
	/// Remaining time from `now` to `target`, or `None` once it has passed.
	pub fn between(now: DateTime<Utc>, target: DateTime<Utc>) -> Option<Self> {
		Self::from_delta(target - now)
	}

	/// Splits a positive delta into fields. Sub-second remainders are dropped.
	pub fn from_delta(delta: TimeDelta) -> Option<Self> {
		let total = delta.num_seconds();
		if total <= 0 {
			return None;
		}
		Some(Self {
			days: total / 86_400,
			hours: (total % 86_400) / 3_600,
			minutes: (total % 3_600) / 60,
			seconds: total % 60,
		})
	}

	/// Total seconds left.
	pub fn total_seconds(&self) -> i64 {
		self.days * 86_400 + self.hours * 3_600 + self.minutes * 60 + self.seconds
	}

	fn fields(&self) -> [i64; 4] {
		[self.days, self.hours, self.minutes, self.seconds]
	}
}

impl fmt::Display for Remaining {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}d {}h {}m {}s",
			self.days, self.hours, self.minutes, self.seconds
		)
	}
}

/// Renders `.countdown-timer[data-date]` nodes and refreshes them every tick.
#[derive(Debug, Default, Clone, Copy)]
pub struct CountdownActivator;

impl Activator for CountdownActivator {
	fn name(&self) -> &'static str {
		"countdown"
	}

	fn activate(&self, ctx: &Rc<ActivationContext>) -> Result<ActivationReport, ActivationError> {
		let tree = ctx.tree();
		let mut report = ActivationReport::default();
		for node in markers::unclaimed(tree, tree.root(), MarkerKind::Countdown) {
			let Some(target) = markers::config_attr(tree, node, ATTR_DATE).and_then(|raw| parse_target(&raw))
			else {
				debug_log!("countdown without a usable {} skipped", ATTR_DATE);
				report.skipped += 1;
				continue;
			};
			if !markers::claim(tree, node, MarkerKind::Countdown) {
				continue;
			}
			report.claimed += 1;
			start(ctx, node, target);
		}
		Ok(report)
	}
}

fn start(ctx: &Rc<ActivationContext>, node: NodeId, target: DateTime<Utc>) {
	if !render(ctx, node, target) {
		return;
	}
	let own: Rc<Cell<Option<ResourceId>>> = Rc::new(Cell::new(None));
	let weak = Rc::downgrade(ctx);
	let handle = Rc::clone(&own);
	let timer = ctx.host.set_interval(
		ctx.config.countdown_tick,
		Rc::new(move || {
			let Some(ctx) = weak.upgrade() else {
				return;
			};
			let keep_running = ctx.is_live(node) && render(&ctx, node, target);
			if !keep_running {
				if let Some(id) = handle.take() {
					ctx.lifecycle.release(id);
				}
			}
		}),
	);
	own.set(Some(ctx.lifecycle.register(Resource::Timer(timer))));
}

/// Renders the current state. Returns false once the terminal state is shown.
fn render(ctx: &ActivationContext, node: NodeId, target: DateTime<Utc>) -> bool {
	let tree = ctx.tree();
	match Remaining::between(ctx.host.now(), target) {
		Some(remaining) => {
			let mut filled = 0;
			for (slot, value) in COUNTDOWN_SLOTS.iter().zip(remaining.fields()) {
				if let Some(slot_node) = tree.query_first(node, &Selector::class(*slot)) {
					tree.set_text(slot_node, &format!("{:02}", value));
					filled += 1;
				}
			}
			if filled == 0 {
				tree.set_text(node, &remaining.to_string());
			}
			true
		}
		None => {
			tree.replace_children(
				node,
				View::element("div")
					.class("countdown-finished")
					.style("font-weight: 700; text-align: center")
					.child(FINISHED_TEXT)
					.into(),
			);
			false
		}
	}
}
