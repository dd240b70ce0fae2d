//! Feature activators.
//!
//! Every activator follows the same shape: find candidate marker nodes of its
//! kind, drop the ones already flagged, flag each remaining node
//! synchronously and only then start the (possibly asynchronous) work that
//! populates it. A scan pass runs them in the fixed order returned by
//! [`default_activators`].

mod card_feed;
pub(crate) mod card_stack;
mod checkout;
mod countdown;
mod instagram_embed;
mod link_tracker;
mod share;
mod social_feed;
mod subscribe;
mod widget_mount;

pub use card_feed::{
	CardFeedActivator, CardLayout, CardStyle, CardTheme, DetailPresenter, OverlayPresenter,
	PopupTheme, cover_image, excerpt, format_date, read_time_minutes, strip_tags,
};
pub use card_stack::{CardStack, StackPlacement};
pub use checkout::{CheckoutActivator, launch_checkout};
pub use countdown::{CountdownActivator, Remaining, parse_target};
pub use instagram_embed::{EMBED_SCRIPT_ID, EMBED_SCRIPT_SRC, InstagramEmbedActivator};
pub use link_tracker::{LinkTrackerActivator, link_label};
pub use share::{ShareActivator, ShareLinks, close_share, copy_share_link, open_share};
pub use social_feed::{DisplayType, FeedProvider, SocialFeedActivator};
pub use subscribe::{SubscribeActivator, close_subscribe, open_subscribe, submit_subscribe};
pub use widget_mount::{MountedWidget, WidgetKind, WidgetMountActivator, WidgetMounter, WidgetProps};

use crate::api::BioApi;
use crate::browser::Browser;
use crate::config::{HydrationConfig, PageContext};
use crate::error::ActivationError;
use crate::host::{self, Host};
use crate::lifecycle::{CancelFlag, Lifecycle, Resource, ResourceId};
use crate::session::{self, SessionStore};
use crate::tree::{ContentTree, EventKind, Listener, NodeId};
use once_cell::unsync::OnceCell;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

/// Builds the detail presenter on first use.
pub type PresenterFactory = Rc<dyn Fn(&Rc<ActivationContext>) -> Rc<dyn DetailPresenter>>;

/// Outcome of one activator in one scan pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivationReport {
	/// Nodes flagged and activated in this pass.
	pub claimed: usize,
	/// Candidates left untouched because their configuration was unusable.
	pub skipped: usize,
}

impl ActivationReport {
	/// Adds the counts of `other`.
	pub fn merge(&mut self, other: ActivationReport) {
		self.claimed += other.claimed;
		self.skipped += other.skipped;
	}
}

/// One idempotent feature activation procedure.
pub trait Activator {
	/// Name used in logs.
	fn name(&self) -> &'static str;

	/// Activates every unflagged candidate node.
	///
	/// Asynchronous failures are rendered in place and never surface here.
	fn activate(&self, ctx: &Rc<ActivationContext>) -> Result<ActivationReport, ActivationError>;
}

/// Collaborators shared by every mount of an engine.
#[derive(Clone)]
pub(crate) struct Services {
	pub(crate) tree: Rc<dyn ContentTree>,
	pub(crate) host: Rc<dyn Host>,
	pub(crate) browser: Rc<dyn Browser>,
	pub(crate) api: Rc<dyn BioApi>,
	pub(crate) session: Rc<dyn SessionStore>,
	pub(crate) mounter: Option<Rc<dyn WidgetMounter>>,
	pub(crate) presenter_factory: PresenterFactory,
}

/// Everything an activator may touch during one engine lifetime.
pub struct ActivationContext {
	pub(crate) tree: Rc<dyn ContentTree>,
	pub(crate) host: Rc<dyn Host>,
	pub(crate) browser: Rc<dyn Browser>,
	pub(crate) api: Rc<dyn BioApi>,
	pub(crate) session: Rc<dyn SessionStore>,
	pub(crate) config: HydrationConfig,
	pub(crate) page: PageContext,
	pub(crate) lifecycle: Lifecycle,
	pub(crate) cancel: CancelFlag,
	pub(crate) mounter: Option<Rc<dyn WidgetMounter>>,
	pub(crate) presenter_factory: PresenterFactory,
	pub(crate) presenter: OnceCell<Rc<dyn DetailPresenter>>,
	pub(crate) pending_checkouts: RefCell<HashSet<String>>,
}

impl std::fmt::Debug for ActivationContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ActivationContext")
			.field("bio_id", &self.page.bio_id)
			.field("lifecycle", &self.lifecycle)
			.field("cancelled", &self.cancel.is_cancelled())
			.finish()
	}
}

impl ActivationContext {
	/// A fresh context with an open lifecycle.
	pub(crate) fn new(services: &Services, config: HydrationConfig, page: PageContext) -> Rc<Self> {
		Rc::new(Self {
			tree: Rc::clone(&services.tree),
			host: Rc::clone(&services.host),
			browser: Rc::clone(&services.browser),
			api: Rc::clone(&services.api),
			session: Rc::clone(&services.session),
			config,
			page,
			lifecycle: Lifecycle::new(
				Rc::clone(&services.tree),
				Rc::clone(&services.host),
				Rc::clone(&services.browser),
			),
			cancel: CancelFlag::new(),
			mounter: services.mounter.clone(),
			presenter_factory: Rc::clone(&services.presenter_factory),
			presenter: OnceCell::new(),
			pending_checkouts: RefCell::new(HashSet::new()),
		})
	}

	/// The hosted content tree.
	pub fn tree(&self) -> &dyn ContentTree {
		&*self.tree
	}

	/// The host runtime.
	pub fn host(&self) -> &dyn Host {
		&*self.host
	}

	/// Browser services.
	pub fn browser(&self) -> &dyn Browser {
		&*self.browser
	}

	/// Backend endpoints.
	pub fn api(&self) -> Rc<dyn BioApi> {
		Rc::clone(&self.api)
	}

	/// Engine configuration.
	pub fn config(&self) -> &HydrationConfig {
		&self.config
	}

	/// Identity of the page.
	pub fn page(&self) -> &PageContext {
		&self.page
	}

	/// Resource bookkeeping of this engine.
	pub fn lifecycle(&self) -> &Lifecycle {
		&self.lifecycle
	}

	/// Whether the engine has been unmounted.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Whether a completion may still write to `node`.
	pub fn is_live(&self, node: NodeId) -> bool {
		!self.is_cancelled() && self.tree.is_attached(node)
	}

	/// Session token, created on first use.
	pub fn session_id(&self) -> String {
		session::session_id(&*self.session)
	}

	/// Spawns `future` on the host queue.
	pub fn spawn<F>(&self, future: F)
	where
		F: Future<Output = ()> + 'static,
	{
		host::spawn(&*self.host, future);
	}

	/// Attaches a listener and hands its handle to the lifecycle.
	pub fn listen(&self, node: NodeId, kind: EventKind, listener: Listener) -> ResourceId {
		let id = self.tree.add_listener(node, kind, listener);
		self.lifecycle.register(Resource::Listener(id))
	}

	/// Runs `callback` once after `delay` unless the engine is gone by then.
	///
	/// The timer is owned by the lifecycle and released when it fires.
	pub fn set_timeout<F>(self: &Rc<Self>, delay: Duration, callback: F) -> ResourceId
	where
		F: FnOnce(&Rc<ActivationContext>) + 'static,
	{
		let slot: Rc<Cell<Option<ResourceId>>> = Rc::new(Cell::new(None));
		let own = Rc::clone(&slot);
		let weak = Rc::downgrade(self);
		let timer = self.host.set_timeout(
			delay,
			Box::new(move || {
				let Some(ctx) = weak.upgrade() else {
					return;
				};
				if let Some(id) = own.take() {
					ctx.lifecycle.release(id);
				}
				if !ctx.is_cancelled() {
					callback(&ctx);
				}
			}),
		);
		let id = self.lifecycle.register(Resource::Timer(timer));
		slot.set(Some(id));
		id
	}

	/// The shared detail presenter, built on first use.
	pub fn presenter(self: &Rc<Self>) -> Rc<dyn DetailPresenter> {
		Rc::clone(
			self.presenter
				.get_or_init(|| (self.presenter_factory)(self)),
		)
	}
}

/// The activators of a scan pass, in their fixed order.
///
/// The widget mount activator is only present when a mounter is configured,
/// and the link tracker is dropped in preview mode.
pub fn default_activators(ctx: &ActivationContext) -> Vec<Box<dyn Activator>> {
	let mut activators: Vec<Box<dyn Activator>> = vec![
		Box::new(CountdownActivator),
		Box::new(SocialFeedActivator::new(FeedProvider::Instagram)),
		Box::new(SocialFeedActivator::new(FeedProvider::Youtube)),
		Box::new(CardFeedActivator),
		Box::new(ShareActivator),
		Box::new(SubscribeActivator),
		Box::new(CheckoutActivator),
	];
	if ctx.mounter.is_some() {
		activators.push(Box::new(WidgetMountActivator));
	}
	// no tracking and no third-party scripts in the editor preview
	if !ctx.config.preview {
		activators.push(Box::new(LinkTrackerActivator));
		activators.push(Box::new(InstagramEmbedActivator::default()));
	}
	activators
}
