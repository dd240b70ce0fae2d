//! In-memory collaborators for driving the engine in tests.
//!
//! [`Harness`] wires a [`MemoryTree`], a [`VirtualHost`], a [`MemoryBrowser`]
//! and a scripted [`FakeApi`] together. Every network call is recorded as
//! `"method arg..."` and answered from a configurable reply, or held until
//! the test resolves it.

use crate::activators::{
	ActivationContext, DetailPresenter, MountedWidget, PopupTheme, PresenterFactory, Services,
	WidgetMounter, WidgetProps,
};
use crate::api::{
	BioApi, BlogPost, Booking, BookingRequest, BookingSettings, CheckoutLink, FeedItem, PageEvent,
	Product, TrackEvent,
};
use crate::browser::MemoryBrowser;
use crate::config::{HydrationConfig, PageContext};
use crate::engine::HydrationEngine;
use crate::error::{ActivationError, ApiError};
use crate::host::VirtualHost;
use crate::sanitize::{SafeMarkup, Sanitizer};
use crate::session::MemoryStore;
use crate::tree::{ContentTree, MemoryTree, NodeId};
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::channel::oneshot;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// Bio id of the harness page.
pub const BIO_ID: &str = "bio-1";
/// Path the harness browser starts at.
pub const START_PATH: &str = "/ana";

/// A reply the test resolves later.
#[derive(Debug)]
pub struct Pending<T> {
	tx: oneshot::Sender<Result<T, ApiError>>,
}

impl<T> Pending<T> {
	/// Completes the held request with `reply`.
	pub fn resolve(self, reply: Result<T, ApiError>) {
		// The request may have been dropped with its engine.
		let _ = self.tx.send(reply);
	}
}

struct Slot<T> {
	reply: Option<Result<T, ApiError>>,
	held: VecDeque<oneshot::Receiver<Result<T, ApiError>>>,
}

impl<T> Default for Slot<T> {
	fn default() -> Self {
		Self {
			reply: None,
			held: VecDeque::new(),
		}
	}
}

enum Answer<T> {
	Ready(Result<T, ApiError>),
	Held(oneshot::Receiver<Result<T, ApiError>>),
}

impl<T: Clone> Slot<T> {
	fn answer(&mut self, default: impl FnOnce() -> T) -> Answer<T> {
		match self.held.pop_front() {
			Some(rx) => Answer::Held(rx),
			None => Answer::Ready(self.reply.clone().unwrap_or_else(|| Ok(default()))),
		}
	}

	fn hold(&mut self) -> Pending<T> {
		let (tx, rx) = oneshot::channel();
		self.held.push_back(rx);
		Pending { tx }
	}
}

impl<T> Answer<T> {
	async fn get(self) -> Result<T, ApiError> {
		match self {
			Self::Ready(reply) => reply,
			Self::Held(rx) => rx
				.await
				.unwrap_or_else(|_| Err(ApiError::Transport("request dropped".into()))),
		}
	}
}

#[derive(Default)]
struct FakeState {
	calls: Vec<String>,
	instagram: Slot<Vec<FeedItem>>,
	youtube: Slot<Vec<FeedItem>>,
	card_posts: Slot<Vec<BlogPost>>,
	blog_posts: Slot<Vec<BlogPost>>,
	products: Slot<Vec<Product>>,
	checkout: Slot<CheckoutLink>,
	subscribe: Slot<()>,
	tracking_error: Option<ApiError>,
	events: Vec<(String, PageEvent)>,
	tracks: Vec<TrackEvent>,
}

/// Scripted [`BioApi`]. Lists default to empty and writes to success.
#[derive(Default)]
pub struct FakeApi {
	state: RefCell<FakeState>,
}

impl std::fmt::Debug for FakeApi {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FakeApi")
			.field("calls", &self.state.borrow().calls)
			.finish()
	}
}

macro_rules! scripted {
	($($set:ident, $hold:ident, $slot:ident: $ty:ty;)*) => {
		impl FakeApi {
			$(
				#[doc = concat!("Answers every `", stringify!($slot), "` call with `reply`.")]
				pub fn $set(&self, reply: Result<$ty, ApiError>) {
					self.state.borrow_mut().$slot.reply = Some(reply);
				}

				#[doc = concat!("Holds the next `", stringify!($slot), "` call until resolved.")]
				pub fn $hold(&self) -> Pending<$ty> {
					self.state.borrow_mut().$slot.hold()
				}
			)*
		}
	};
}

scripted! {
	set_instagram, hold_instagram, instagram: Vec<FeedItem>;
	set_youtube, hold_youtube, youtube: Vec<FeedItem>;
	set_card_posts, hold_card_posts, card_posts: Vec<BlogPost>;
	set_blog_posts, hold_blog_posts, blog_posts: Vec<BlogPost>;
	set_products, hold_products, products: Vec<Product>;
	set_checkout, hold_checkout, checkout: CheckoutLink;
	set_subscribe, hold_subscribe, subscribe: ();
}

impl FakeApi {
	/// Calls so far, formatted as `"method arg..."`.
	pub fn calls(&self) -> Vec<String> {
		self.state.borrow().calls.clone()
	}

	/// Calls of one method.
	pub fn calls_to(&self, method: &str) -> usize {
		self.state
			.borrow()
			.calls
			.iter()
			.filter(|call| call.split(' ').next() == Some(method))
			.count()
	}

	/// Page events accepted so far, with their bio id.
	pub fn events(&self) -> Vec<(String, PageEvent)> {
		self.state.borrow().events.clone()
	}

	/// Track events accepted so far.
	pub fn tracks(&self) -> Vec<TrackEvent> {
		self.state.borrow().tracks.clone()
	}

	/// Makes every event and track call fail with `err`.
	pub fn fail_tracking(&self, err: ApiError) {
		self.state.borrow_mut().tracking_error = Some(err);
	}

	fn record(&self, call: String) {
		self.state.borrow_mut().calls.push(call);
	}

	fn answer<T: Clone>(
		&self,
		call: String,
		slot: impl FnOnce(&mut FakeState) -> &mut Slot<T>,
		default: impl FnOnce() -> T,
	) -> Answer<T> {
		let mut state = self.state.borrow_mut();
		state.calls.push(call);
		slot(&mut *state).answer(default)
	}

	fn tracking(&self, call: String) -> Result<(), ApiError> {
		let mut state = self.state.borrow_mut();
		state.calls.push(call);
		match &state.tracking_error {
			Some(err) => Err(err.clone()),
			None => Ok(()),
		}
	}
}

#[async_trait(?Send)]
impl BioApi for FakeApi {
	async fn instagram_posts(&self, handle: &str) -> Result<Vec<FeedItem>, ApiError> {
		self.answer(format!("instagram_posts {}", handle), |s| &mut s.instagram, Vec::new)
			.get()
			.await
	}

	async fn youtube_videos(&self, url: &str) -> Result<Vec<FeedItem>, ApiError> {
		self.answer(format!("youtube_videos {}", url), |s| &mut s.youtube, Vec::new)
			.get()
			.await
	}

	async fn card_posts(&self, bio_id: &str) -> Result<Vec<BlogPost>, ApiError> {
		self.answer(format!("card_posts {}", bio_id), |s| &mut s.card_posts, Vec::new)
			.get()
			.await
	}

	async fn blog_posts(&self, bio_id: &str) -> Result<Vec<BlogPost>, ApiError> {
		self.answer(format!("blog_posts {}", bio_id), |s| &mut s.blog_posts, Vec::new)
			.get()
			.await
	}

	async fn products(&self, bio_id: &str) -> Result<Vec<Product>, ApiError> {
		self.answer(format!("products {}", bio_id), |s| &mut s.products, Vec::new)
			.get()
			.await
	}

	async fn checkout_link(&self, product_id: &str, bio_id: &str) -> Result<CheckoutLink, ApiError> {
		let url = format!("https://checkout.example/{}", product_id);
		self.answer(
			format!("checkout_link {} {}", product_id, bio_id),
			|s| &mut s.checkout,
			|| CheckoutLink { url },
		)
		.get()
		.await
	}

	async fn subscribe(&self, bio_id: &str, email: &str) -> Result<(), ApiError> {
		self.answer(format!("subscribe {} {}", bio_id, email), |s| &mut s.subscribe, || ())
			.get()
			.await
	}

	async fn post_event(&self, bio_id: &str, event: &PageEvent) -> Result<(), ApiError> {
		self.tracking(format!("post_event {}", bio_id))?;
		self.state
			.borrow_mut()
			.events
			.push((bio_id.to_string(), event.clone()));
		Ok(())
	}

	async fn track(&self, event: &TrackEvent) -> Result<(), ApiError> {
		self.tracking(format!("track {}", event.bio_id))?;
		self.state.borrow_mut().tracks.push(event.clone());
		Ok(())
	}

	async fn booking_settings(&self, bio_id: &str) -> Result<BookingSettings, ApiError> {
		self.record(format!("booking_settings {}", bio_id));
		Ok(BookingSettings::default())
	}

	async fn booking_slots(&self, bio_id: &str, date: NaiveDate) -> Result<Vec<String>, ApiError> {
		self.record(format!("booking_slots {} {}", bio_id, date));
		Ok(Vec::new())
	}

	async fn book(&self, bio_id: &str, request: &BookingRequest) -> Result<(), ApiError> {
		self.record(format!("book {} {} {}", bio_id, request.date, request.time));
		Ok(())
	}

	async fn booking(&self, token: &str) -> Result<Booking, ApiError> {
		self.record(format!("booking {}", token));
		Err(ApiError::Http {
			status: 404,
			message: Some("Booking not found".into()),
		})
	}

	async fn confirm_booking(&self, token: &str) -> Result<(), ApiError> {
		self.record(format!("confirm_booking {}", token));
		Ok(())
	}

	async fn cancel_booking(&self, token: &str, reason: &str) -> Result<(), ApiError> {
		self.record(format!("cancel_booking {} {}", token, reason));
		Ok(())
	}

	async fn reschedule_booking(&self, token: &str, date: NaiveDate, time: &str) -> Result<(), ApiError> {
		self.record(format!("reschedule_booking {} {} {}", token, date, time));
		Ok(())
	}
}

/// [`DetailPresenter`] that records what it was asked to show.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
	shown: RefCell<Vec<(String, PopupTheme)>>,
	closed: Cell<usize>,
}

impl RecordingPresenter {
	/// Titles and themes shown so far.
	pub fn shown(&self) -> Vec<(String, PopupTheme)> {
		self.shown.borrow().clone()
	}

	/// Number of `close` calls.
	pub fn closed(&self) -> usize {
		self.closed.get()
	}
}

impl DetailPresenter for RecordingPresenter {
	fn show(&self, post: &BlogPost, theme: &PopupTheme) {
		self.shown.borrow_mut().push((post.title.clone(), theme.clone()));
	}

	fn close(&self) {
		self.closed.set(self.closed.get() + 1);
	}
}

struct RecordedWidget {
	unmounted: Rc<Cell<usize>>,
}

impl MountedWidget for RecordedWidget {
	fn unmount(self: Box<Self>) {
		self.unmounted.set(self.unmounted.get() + 1);
	}
}

/// [`WidgetMounter`] that records props and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingMounter {
	mounted: RefCell<Vec<WidgetProps>>,
	unmounted: Rc<Cell<usize>>,
	failures: Cell<usize>,
}

impl RecordingMounter {
	/// Props of every successful mount.
	pub fn mounted(&self) -> Vec<WidgetProps> {
		self.mounted.borrow().clone()
	}

	/// Number of widgets unmounted so far.
	pub fn unmounted(&self) -> usize {
		self.unmounted.get()
	}

	/// Fails the next `count` mounts.
	pub fn fail_next(&self, count: usize) {
		self.failures.set(count);
	}
}

impl WidgetMounter for RecordingMounter {
	fn mount(
		&self,
		_tree: &dyn ContentTree,
		_node: NodeId,
		props: WidgetProps,
	) -> Result<Box<dyn MountedWidget>, ActivationError> {
		if self.failures.get() > 0 {
			self.failures.set(self.failures.get() - 1);
			return Err(ActivationError::MountFailed("mounter refused".into()));
		}
		self.mounted.borrow_mut().push(props);
		Ok(Box::new(RecordedWidget {
			unmounted: Rc::clone(&self.unmounted),
		}))
	}
}

/// Sanitizer that trusts its input. Only for markup written by tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughSanitizer;

impl Sanitizer for PassthroughSanitizer {
	fn sanitize(&self, raw: &str) -> SafeMarkup {
		SafeMarkup::trusted(raw)
	}
}

/// A post with an id and a title and nothing else.
pub fn blog_post(id: &str, title: &str) -> BlogPost {
	BlogPost {
		id: id.to_string(),
		title: title.to_string(),
		content: String::new(),
		slug: None,
		thumbnail: None,
		created_at: None,
		tags: Vec::new(),
	}
}

/// A product with a price in USD.
pub fn product(id: &str, title: &str, price: f64) -> Product {
	Product {
		id: id.to_string(),
		title: title.to_string(),
		price,
		currency: Some("USD".to_string()),
		image: None,
		images: Vec::new(),
	}
}

/// A feed item pointing at `url`.
pub fn feed_item(url: &str) -> FeedItem {
	FeedItem {
		url: url.to_string(),
		image_url: format!("{}/thumb.jpg", url),
		title: None,
	}
}

/// One page with in-memory collaborators.
pub struct Harness {
	/// Content tree.
	pub tree: Rc<MemoryTree>,
	/// Virtual clock and task queue.
	pub host: Rc<VirtualHost>,
	/// Recording browser.
	pub browser: Rc<MemoryBrowser>,
	/// Scripted backend.
	pub api: Rc<FakeApi>,
	/// Session storage.
	pub session: Rc<MemoryStore>,
	/// Detail presenter handed out by the context.
	pub presenter: Rc<RecordingPresenter>,
	/// Widget mounter.
	pub mounter: Rc<RecordingMounter>,
	config: HydrationConfig,
	page: PageContext,
	presenters_built: Rc<Cell<usize>>,
}

impl std::fmt::Debug for Harness {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Harness")
			.field("page", &self.page)
			.field("api", &self.api)
			.finish()
	}
}

impl Harness {
	/// A page holding `markup`, browsed at [`START_PATH`].
	pub fn new(markup: &str) -> Self {
		Self {
			tree: Rc::new(MemoryTree::from_markup(markup)),
			host: Rc::new(VirtualHost::new()),
			browser: Rc::new(MemoryBrowser::new(START_PATH)),
			api: Rc::new(FakeApi::default()),
			session: Rc::new(MemoryStore::new()),
			presenter: Rc::new(RecordingPresenter::default()),
			mounter: Rc::new(RecordingMounter::default()),
			config: HydrationConfig::default(),
			page: PageContext::new(BIO_ID),
			presenters_built: Rc::new(Cell::new(0)),
		}
	}

	/// Adjusts the engine configuration.
	pub fn with_config(mut self, update: impl FnOnce(HydrationConfig) -> HydrationConfig) -> Self {
		self.config = update(self.config);
		self
	}

	/// Adjusts the page identity.
	pub fn with_page(mut self, update: impl FnOnce(PageContext) -> PageContext) -> Self {
		self.page = update(self.page);
		self
	}

	/// Starts the browser at `path`.
	pub fn at_path(mut self, path: &str) -> Self {
		self.browser = Rc::new(MemoryBrowser::new(path));
		self
	}

	/// Engine configuration in use.
	pub fn config(&self) -> &HydrationConfig {
		&self.config
	}

	/// Number of times the presenter factory ran.
	pub fn presenters_built(&self) -> usize {
		self.presenters_built.get()
	}

	fn presenter_factory(&self) -> PresenterFactory {
		let presenter = Rc::clone(&self.presenter);
		let built = Rc::clone(&self.presenters_built);
		Rc::new(move |_: &Rc<ActivationContext>| -> Rc<dyn DetailPresenter> {
			built.set(built.get() + 1);
			presenter.clone()
		})
	}

	pub(crate) fn services(&self) -> Services {
		let mounter: Rc<dyn WidgetMounter> = self.mounter.clone();
		Services {
			tree: self.tree.clone(),
			host: self.host.clone(),
			browser: self.browser.clone(),
			api: self.api.clone(),
			session: self.session.clone(),
			mounter: Some(mounter),
			presenter_factory: self.presenter_factory(),
		}
	}

	/// A fresh activation context over the harness collaborators.
	pub fn context(&self) -> Rc<ActivationContext> {
		ActivationContext::new(&self.services(), self.config.clone(), self.page.clone())
	}

	/// An unmounted engine over the harness collaborators.
	pub fn engine(&self) -> HydrationEngine {
		HydrationEngine::builder(
			self.tree.clone(),
			self.host.clone(),
			self.browser.clone(),
			self.api.clone(),
		)
		.session(self.session.clone())
		.mounter(self.mounter.clone())
		.presenter_factory(self.presenter_factory())
		.config(self.config.clone())
		.page(self.page.clone())
		.build()
		.expect("harness configuration is valid")
	}
}
