//! Engine lifetime management.
//!
//! A [`HydrationEngine`] owns the collaborators of one page. Each
//! [`mount`](HydrationEngine::mount) builds a fresh activation context,
//! scheduler, tab router and façade; [`unmount`](HydrationEngine::unmount)
//! cancels in-flight work and releases every handle they created. The engine
//! can be mounted again afterwards.

use crate::activators::{
	self, ActivationContext, OverlayPresenter, PresenterFactory, Services, WidgetMounter,
};
use crate::api::{BioApi, PageEvent, TrackEvent, TrackKind};
use crate::browser::Browser;
use crate::config::{HydrationConfig, PageContext};
use crate::error::HydrationError;
use crate::facade::{self, PageActions};
use crate::host::Host;
use crate::lifecycle::LifecycleStats;
use crate::markers;
use crate::sanitize::Sanitizer;
use crate::scheduler::{ScanReport, ScanScheduler, ScanStats};
use crate::session::{self, MemoryStore, SessionStore};
use crate::tabs::{Tab, TabRouter};
use crate::tree::ContentTree;
use crate::{debug_log, info_log};
use std::cell::RefCell;
use std::rc::Rc;

/// Builder for [`HydrationEngine`].
pub struct HydrationEngineBuilder {
	tree: Rc<dyn ContentTree>,
	host: Rc<dyn Host>,
	browser: Rc<dyn Browser>,
	api: Rc<dyn BioApi>,
	session: Option<Rc<dyn SessionStore>>,
	mounter: Option<Rc<dyn WidgetMounter>>,
	presenter_factory: Option<PresenterFactory>,
	sanitizer: Option<Rc<dyn Sanitizer>>,
	config: HydrationConfig,
	page: PageContext,
}

impl std::fmt::Debug for HydrationEngineBuilder {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HydrationEngineBuilder")
			.field("config", &self.config)
			.field("page", &self.page)
			.field("mounter", &self.mounter.is_some())
			.finish()
	}
}

impl HydrationEngineBuilder {
	/// Session storage. Defaults to an in-memory store.
	pub fn session(mut self, session: Rc<dyn SessionStore>) -> Self {
		self.session = Some(session);
		self
	}

	/// Mounter for widget regions. Without one, widget regions are left alone.
	pub fn mounter(mut self, mounter: Rc<dyn WidgetMounter>) -> Self {
		self.mounter = Some(mounter);
		self
	}

	/// Replaces the built-in detail overlay.
	pub fn presenter_factory(mut self, factory: PresenterFactory) -> Self {
		self.presenter_factory = Some(factory);
		self
	}

	/// Sanitizer applied to post bodies shown by the built-in overlay.
	pub fn sanitizer(mut self, sanitizer: Rc<dyn Sanitizer>) -> Self {
		self.sanitizer = Some(sanitizer);
		self
	}

	/// Engine configuration.
	pub fn config(mut self, config: HydrationConfig) -> Self {
		self.config = config;
		self
	}

	/// Identity of the page.
	pub fn page(mut self, page: PageContext) -> Self {
		self.page = page;
		self
	}

	/// Validates the configuration and builds an unmounted engine.
	pub fn build(self) -> Result<HydrationEngine, HydrationError> {
		self.config.validate()?;
		let session = self
			.session
			.unwrap_or_else(|| Rc::new(MemoryStore::new()));
		let presenter_factory = self
			.presenter_factory
			.unwrap_or_else(|| OverlayPresenter::factory(self.sanitizer));
		Ok(HydrationEngine {
			services: Services {
				tree: self.tree,
				host: self.host,
				browser: self.browser,
				api: self.api,
				session,
				mounter: self.mounter,
				presenter_factory,
			},
			config: self.config,
			page: self.page,
			mounted: RefCell::new(None),
		})
	}
}

struct Mounted {
	ctx: Rc<ActivationContext>,
	scheduler: Rc<ScanScheduler>,
	router: Rc<TabRouter>,
	actions: Rc<PageActions>,
}

/// Hydrates the content tree of one page.
pub struct HydrationEngine {
	services: Services,
	config: HydrationConfig,
	page: PageContext,
	mounted: RefCell<Option<Mounted>>,
}

impl std::fmt::Debug for HydrationEngine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HydrationEngine")
			.field("bio_id", &self.page.bio_id)
			.field("mounted", &self.is_mounted())
			.finish()
	}
}

impl HydrationEngine {
	/// Starts a builder over the required collaborators.
	pub fn builder(
		tree: Rc<dyn ContentTree>,
		host: Rc<dyn Host>,
		browser: Rc<dyn Browser>,
		api: Rc<dyn BioApi>,
	) -> HydrationEngineBuilder {
		HydrationEngineBuilder {
			tree,
			host,
			browser,
			api,
			session: None,
			mounter: None,
			presenter_factory: None,
			sanitizer: None,
			config: HydrationConfig::default(),
			page: PageContext::new(""),
		}
	}

	/// Engine configuration.
	pub fn config(&self) -> &HydrationConfig {
		&self.config
	}

	/// Page identity.
	pub fn page(&self) -> &PageContext {
		&self.page
	}

	pub(crate) fn tree(&self) -> &Rc<dyn ContentTree> {
		&self.services.tree
	}

	/// Activates the tree.
	///
	/// Runs the first scan synchronously, starts the mutation subscription
	/// and the safety tick, registers the page façade and resolves the tab
	/// from the current path once the façade is in place.
	pub fn mount(&self) -> Result<ScanReport, HydrationError> {
		if self.mounted.borrow().is_some() {
			return Err(HydrationError::AlreadyMounted);
		}
		let ctx = ActivationContext::new(&self.services, self.config.clone(), self.page.clone());
		let scheduler = ScanScheduler::new(&ctx, activators::default_activators(&ctx));
		let report = scheduler.start();

		let router = TabRouter::new(&ctx);
		router.listen_history();
		let actions = Rc::new(PageActions::new(&ctx, &router));
		facade::register(Rc::clone(&actions));
		let weak = Rc::downgrade(&router);
		facade::on_ready(move |_| {
			if let Some(router) = weak.upgrade() {
				router.resolve_from_path();
			}
		});

		track_visit(&ctx);
		info_log!(
			"engine mounted for bio {} ({} claimed, {} skipped)",
			self.page.bio_id,
			report.claimed,
			report.skipped
		);
		*self.mounted.borrow_mut() = Some(Mounted {
			ctx,
			scheduler,
			router,
			actions,
		});
		Ok(report)
	}

	/// Runs one scan pass immediately.
	pub fn scan_now(&self) -> Result<ScanReport, HydrationError> {
		let scheduler = self.with_mounted(|m| Rc::clone(&m.scheduler))?;
		Ok(scheduler.scan_now())
	}

	/// Switches tabs through the router of the current lifetime.
	pub fn switch_tab(&self, tab: Tab) -> Result<(), HydrationError> {
		let router = self.with_mounted(|m| Rc::clone(&m.router))?;
		router.switch_tab(tab);
		Ok(())
	}

	/// Façade of the current lifetime.
	pub fn actions(&self) -> Option<Rc<PageActions>> {
		self.mounted.borrow().as_ref().map(|m| Rc::clone(&m.actions))
	}

	/// Stops all work and releases every handle of the current lifetime.
	///
	/// Activation flags are cleared as well, so a later mount over the same
	/// tree activates it again. Returns the number of resources released.
	pub fn unmount(&self) -> Result<usize, HydrationError> {
		let mounted = self
			.mounted
			.borrow_mut()
			.take()
			.ok_or(HydrationError::NotMounted)?;
		mounted.ctx.cancel.cancel();
		let released = mounted.ctx.lifecycle.teardown_all();
		let cleared = markers::unclaim_all(self.services.tree.as_ref());
		debug_log!("cleared {} activation flags", cleared);
		if !facade::release(&mounted.actions) {
			debug_log!("page façade already replaced by another engine");
		}
		info_log!(
			"engine unmounted for bio {} ({} resources released)",
			self.page.bio_id,
			released
		);
		Ok(released)
	}

	/// Whether the engine is mounted.
	pub fn is_mounted(&self) -> bool {
		self.mounted.borrow().is_some()
	}

	/// Resource counters of the current lifetime.
	pub fn lifecycle_stats(&self) -> Option<LifecycleStats> {
		self.mounted.borrow().as_ref().map(|m| m.ctx.lifecycle.stats())
	}

	/// Scan counters of the current lifetime.
	pub fn scan_stats(&self) -> Option<ScanStats> {
		self.mounted.borrow().as_ref().map(|m| m.scheduler.stats())
	}

	fn with_mounted<T>(&self, read: impl FnOnce(&Mounted) -> T) -> Result<T, HydrationError> {
		self.mounted
			.borrow()
			.as_ref()
			.map(read)
			.ok_or(HydrationError::NotMounted)
	}
}

impl Drop for HydrationEngine {
	fn drop(&mut self) {
		if self.is_mounted() {
			let _ = self.unmount();
		}
	}
}

/// Posts the once-per-session visit event and the view track.
fn track_visit(ctx: &Rc<ActivationContext>) {
	if ctx.config.preview || ctx.page.bio_id.is_empty() {
		return;
	}
	let visit = session::first_visit(ctx.session.as_ref(), &ctx.page.bio_id).then(|| PageEvent::BioVisit {
		referrer: ctx
			.page
			.referrer
			.clone()
			.filter(|r| !r.is_empty())
			.unwrap_or_else(|| "direct".to_string()),
		user_agent: ctx.page.user_agent.clone(),
		timestamp: ctx.host().now(),
	});
	let track = TrackEvent {
		bio_id: ctx.page.bio_id.clone(),
		referrer: ctx.page.referrer.clone(),
		session_id: ctx.session_id(),
		kind: TrackKind::View,
	};
	let api = ctx.api();
	let bio_id = ctx.page.bio_id.clone();
	ctx.spawn(async move {
		if let Some(visit) = visit
			&& let Err(err) = api.post_event(&bio_id, &visit).await
		{
			debug_log!("bio visit dropped: {}", err);
		}
		if let Err(err) = api.track(&track).await {
			debug_log!("view track dropped: {}", err);
		}
	});
}
