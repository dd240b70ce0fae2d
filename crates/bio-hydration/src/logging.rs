//! Logging abstraction layer for bio-hydration
//!
//! The macros behave the same on every target the engine runs on:
//!
//! | Macro | WASM (`debug_assertions`) | WASM (release) | Native |
//! |-------|---------------------------|----------------|--------|
//! | `debug_log!` | `console.debug` | no-op | `tracing::debug!` |
//! | `info_log!` | `console.info` | no-op | `tracing::info!` |
//! | `warn_log!` | `console.warn` | no-op | `tracing::warn!` |
//! | `error_log!` | `console.error` | no-op | `tracing::error!` |
//!
//! Native events are emitted under the `bio_hydration` target, so the
//! embedding process decides which subscriber (if any) receives them.
//!
//! ## Example
//!
//! ```ignore
//! use bio_hydration::{debug_log, info_log, warn_log};
//!
//! debug_log!("scan finished: {} activators", count);
//! info_log!("engine mounted for bio {}", bio_id);
//! warn_log!("activator {} failed: {}", name, err);
//! ```

/// Logs a debug message.
///
/// Takes format arguments similar to `format!`.
#[macro_export]
#[cfg(all(debug_assertions, target_arch = "wasm32"))]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		$crate::web_sys::console::debug_1(&format!($($arg)*).into());
	}};
}

/// Logs a debug message.
#[macro_export]
#[cfg(not(target_arch = "wasm32"))]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		$crate::tracing::debug!(target: "bio_hydration", "{}", format!($($arg)*));
	}};
}

/// No-op debug_log in release WASM builds
#[macro_export]
#[cfg(all(not(debug_assertions), target_arch = "wasm32"))]
macro_rules! debug_log {
	($($arg:tt)*) => {{}};
}

/// Logs an info message.
///
/// Used for lifecycle milestones such as mount and unmount.
#[macro_export]
#[cfg(all(debug_assertions, target_arch = "wasm32"))]
macro_rules! info_log {
	($($arg:tt)*) => {{
		$crate::web_sys::console::info_1(&format!($($arg)*).into());
	}};
}

/// Logs an info message.
#[macro_export]
#[cfg(not(target_arch = "wasm32"))]
macro_rules! info_log {
	($($arg:tt)*) => {{
		$crate::tracing::info!(target: "bio_hydration", "{}", format!($($arg)*));
	}};
}

/// No-op info_log in release WASM builds
#[macro_export]
#[cfg(all(not(debug_assertions), target_arch = "wasm32"))]
macro_rules! info_log {
	($($arg:tt)*) => {{}};
}

/// Logs a warning message.
///
/// Activator and request failures are reported here; they never abort a scan.
#[macro_export]
#[cfg(all(debug_assertions, target_arch = "wasm32"))]
macro_rules! warn_log {
	($($arg:tt)*) => {{
		$crate::web_sys::console::warn_1(&format!($($arg)*).into());
	}};
}

/// Logs a warning message.
#[macro_export]
#[cfg(not(target_arch = "wasm32"))]
macro_rules! warn_log {
	($($arg:tt)*) => {{
		$crate::tracing::warn!(target: "bio_hydration", "{}", format!($($arg)*));
	}};
}

/// No-op warn_log in release WASM builds
#[macro_export]
#[cfg(all(not(debug_assertions), target_arch = "wasm32"))]
macro_rules! warn_log {
	($($arg:tt)*) => {{}};
}

/// Logs an error message.
#[macro_export]
#[cfg(all(debug_assertions, target_arch = "wasm32"))]
macro_rules! error_log {
	($($arg:tt)*) => {{
		$crate::web_sys::console::error_1(&format!($($arg)*).into());
	}};
}

/// Logs an error message.
#[macro_export]
#[cfg(not(target_arch = "wasm32"))]
macro_rules! error_log {
	($($arg:tt)*) => {{
		$crate::tracing::error!(target: "bio_hydration", "{}", format!($($arg)*));
	}};
}

/// No-op error_log in release WASM builds
#[macro_export]
#[cfg(all(not(debug_assertions), target_arch = "wasm32"))]
macro_rules! error_log {
	($($arg:tt)*) => {{}};
}

#[cfg(test)]
mod tests {
	use rstest::rstest;
	// Import macros from crate root
	use crate::{debug_log, error_log, info_log, warn_log};

	#[rstest]
	fn test_logging_macros_compile() {
		debug_log!("scan finished: {}", 12);
		info_log!("mounted bio {}", "abc");
		warn_log!("activator failed: {:?}", vec!["countdown"]);
		error_log!("request failed: {}", "timeout");
	}

	#[rstest]
	fn test_logging_macros_no_args() {
		debug_log!("Simple debug");
		info_log!("Simple info");
		warn_log!("Simple warning");
		error_log!("Simple error");
	}

	#[rstest]
	fn test_logging_macros_multiple_args() {
		let activator = "social_feed";
		let nodes = 3;
		info_log!("{} claimed {} nodes", activator, nodes);
		warn_log!("{} skipped {} nodes", activator, nodes);
	}
}
