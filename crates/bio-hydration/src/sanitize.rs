//! Boundary to the external markup sanitizer.
//!
//! The engine never sanitizes anything itself. Author markup only reaches
//! a [`ContentTree`](crate::tree::ContentTree) as [`SafeMarkup`], and the
//! only way to obtain one is through a [`Sanitizer`].

use std::fmt;

/// Markup that has been through a sanitizer.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SafeMarkup(String);

impl SafeMarkup {
	/// Wraps markup that a sanitizer has already cleaned.
	///
	/// Intended for [`Sanitizer`] implementations; calling it on raw author
	/// input bypasses the only XSS boundary of the page.
	pub fn trusted(markup: impl Into<String>) -> Self {
		Self(markup.into())
	}

	/// Returns the markup.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Whether the markup is empty.
	pub fn is_empty(&self) -> bool {
		self.0.trim().is_empty()
	}
}

impl fmt::Debug for SafeMarkup {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("SafeMarkup").field(&self.0.len()).finish()
	}
}

/// Pure function from raw author markup to safe markup.
pub trait Sanitizer {
	/// Cleans `raw`.
	fn sanitize(&self, raw: &str) -> SafeMarkup;
}

impl<F> Sanitizer for F
where
	F: Fn(&str) -> SafeMarkup,
{
	fn sanitize(&self, raw: &str) -> SafeMarkup {
		self(raw)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_closure_sanitizer() {
		let strip_scripts = |raw: &str| SafeMarkup::trusted(raw.replace("<script>", ""));
		let safe = strip_scripts.sanitize("<p>hi</p><script>");
		assert_eq!(safe.as_str(), "<p>hi</p>");
		assert!(!safe.is_empty());
		assert_eq!(format!("{:?}", safe), "SafeMarkup(9)");
	}
}
