//! Hosting glue: markup in, hydrated page out.

use crate::engine::HydrationEngine;
use crate::error::HydrationError;
use crate::sanitize::Sanitizer;
use crate::scheduler::ScanReport;
use crate::tree::NodeId;
use std::cell::RefCell;
use std::rc::Rc;

/// A bio page whose body is rendered from author markup.
///
/// Rendering the same markup again keeps the current engine lifetime.
/// Different markup tears the current lifetime down before the new body is
/// inserted and activated.
pub struct BioPage {
	engine: HydrationEngine,
	container: NodeId,
	sanitizer: Rc<dyn Sanitizer>,
	rendered: RefCell<Option<String>>,
}

impl std::fmt::Debug for BioPage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BioPage")
			.field("engine", &self.engine)
			.field("container", &self.container)
			.field("rendered", &self.rendered.borrow().as_ref().map(String::len))
			.finish()
	}
}

impl BioPage {
	/// Renders into `container` through `engine`.
	pub fn new(engine: HydrationEngine, container: NodeId, sanitizer: Rc<dyn Sanitizer>) -> Self {
		Self {
			engine,
			container,
			sanitizer,
			rendered: RefCell::new(None),
		}
	}

	/// The engine activating the page.
	pub fn engine(&self) -> &HydrationEngine {
		&self.engine
	}

	/// Sanitizes and inserts `markup`, then mounts the engine.
	///
	/// Returns `None` when `markup` is already on the page.
	pub fn render(&self, markup: &str) -> Result<Option<ScanReport>, HydrationError> {
		if self.engine.is_mounted() && self.rendered.borrow().as_deref() == Some(markup) {
			return Ok(None);
		}
		if self.engine.is_mounted() {
			self.engine.unmount()?;
		}
		let safe = self.sanitizer.sanitize(markup);
		self.engine.tree().insert_markup(self.container, &safe)?;
		*self.rendered.borrow_mut() = Some(markup.to_string());
		self.engine.mount().map(Some)
	}

	/// Tears the engine lifetime down, leaving the markup in place.
	pub fn unmount(&self) -> Result<usize, HydrationError> {
		let released = self.engine.unmount()?;
		self.rendered.borrow_mut().take();
		Ok(released)
	}
}
