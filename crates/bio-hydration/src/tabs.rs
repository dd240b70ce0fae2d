//! Tab routing layered over the content tree.
//!
//! A page has three views: links (default), blog and shop. The view follows
//! the path suffix (`/blog`, `/shop`). Switching programmatically pushes a
//! history entry; back/forward only re-resolves from the path. Each loader
//! fills its container once per page lifetime. Later visits only toggle
//! visibility.

use crate::activators::{
	ActivationContext, Activator, CheckoutActivator, card_stack, cover_image, format_date,
	read_time_minutes,
};
use crate::api::{BlogPost, PageEvent, Product};
use crate::lifecycle::Resource;
use crate::markers::{ATTR_PRODUCT_ID, PRODUCT_CARD_CLASS};
use crate::tree::{NodeId, Selector};
use crate::view::{ElementView, View};
use crate::{debug_log, warn_log};
use std::cell::Cell;
use std::rc::{Rc, Weak};

const SHOP_CONTAINER_ID: &str = "shop-products-container";
const BLOG_CONTAINER_ID: &str = "blog-posts-container";
const PRODUCT_PLACEHOLDER: &str = "https://placehold.co/300x300?text=Product";
const POST_PLACEHOLDER: &str = "https://placehold.co/600x400?text=Blog+Post";
const BLOG_CARD_CLASS: &str = "blog-card-item";

/// Shown when the shop has no products.
pub const NO_PRODUCTS_TEXT: &str = "No products found.";
/// Shown when products cannot be loaded.
pub const PRODUCTS_FAILED_TEXT: &str = "Failed to load products.";
/// Shown when the blog has no posts.
pub const NO_POSTS_TEXT: &str = "No posts yet.";
/// Shown when posts cannot be loaded.
pub const POSTS_FAILED_TEXT: &str = "Failed to load posts.";

/// A view of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
	/// Link list.
	Links,
	/// Blog posts.
	Blog,
	/// Products.
	Shop,
}

impl Tab {
	/// Every tab.
	pub const ALL: [Tab; 3] = [Self::Links, Self::Blog, Self::Shop];

	/// Tab selected by `path`.
	pub fn from_path(path: &str) -> Self {
		let path = path.trim_end_matches('/');
		if path.ends_with("/blog") {
			Self::Blog
		} else if path.ends_with("/shop") {
			Self::Shop
		} else {
			Self::Links
		}
	}

	/// Parses a tab name; unknown names select the links tab.
	pub fn from_name(name: &str) -> Self {
		match name.trim() {
			"blog" => Self::Blog,
			"shop" => Self::Shop,
			_ => Self::Links,
		}
	}

	/// Tab name.
	pub fn name(self) -> &'static str {
		match self {
			Self::Links => "links",
			Self::Blog => "blog",
			Self::Shop => "shop",
		}
	}

	/// Id of the tab button.
	pub fn button_id(self) -> &'static str {
		match self {
			Self::Links => "tab-links",
			Self::Blog => "tab-blog",
			Self::Shop => "tab-shop",
		}
	}

	/// Id of the tab body.
	pub fn feed_id(self) -> &'static str {
		match self {
			Self::Links => "links-feed",
			Self::Blog => "blog-feed",
			Self::Shop => "shop-feed",
		}
	}

	/// Path of this tab on the page at `base`.
	pub fn path(self, base: &str) -> String {
		let suffix = match self {
			Self::Links => return base.to_string(),
			Self::Blog => "blog",
			Self::Shop => "shop",
		};
		if base == "/" {
			format!("/{}", suffix)
		} else {
			format!("{}/{}", base, suffix)
		}
	}
}

/// Page path without a tab suffix or trailing slash; the root is `/`.
pub fn base_path(path: &str) -> String {
	let path = path
		.strip_suffix("/shop")
		.or_else(|| path.strip_suffix("/blog"))
		.unwrap_or(path);
	let path = path.strip_suffix('/').unwrap_or(path);
	if path.is_empty() {
		"/".to_string()
	} else {
		path.to_string()
	}
}

/// Formats `amount` in `currency` the way en-US currency formatting does.
pub fn format_price(amount: f64, currency: Option<&str>) -> String {
	let code = currency
		.map(str::trim)
		.filter(|c| !c.is_empty())
		.unwrap_or("USD")
		.to_ascii_uppercase();
	let prefix = match code.as_str() {
		"USD" => "$".to_string(),
		"EUR" => "€".to_string(),
		"GBP" => "£".to_string(),
		"BRL" => "R$".to_string(),
		"JPY" => "¥".to_string(),
		other => format!("{}\u{a0}", other),
	};
	let amount = if amount.is_finite() { amount } else { 0.0 };
	let cents = (amount.abs() * 100.0).round() as u64;
	let whole = (cents / 100).to_string();
	let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
	for (i, digit) in whole.chars().enumerate() {
		if i > 0 && (whole.len() - i) % 3 == 0 {
			grouped.push(',');
		}
		grouped.push(digit);
	}
	let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
	format!("{}{}{}.{:02}", sign, prefix, grouped, cents % 100)
}

/// Tab state machine of one engine lifetime.
pub struct TabRouter {
	ctx: Rc<ActivationContext>,
	current: Cell<Option<Tab>>,
	shop_loaded: Cell<bool>,
	blog_loaded: Cell<bool>,
	this: Weak<TabRouter>,
}

impl std::fmt::Debug for TabRouter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TabRouter")
			.field("current", &self.current.get())
			.field("shop_loaded", &self.shop_loaded.get())
			.field("blog_loaded", &self.blog_loaded.get())
			.finish()
	}
}

impl TabRouter {
	/// Creates a router with nothing loaded.
	pub fn new(ctx: &Rc<ActivationContext>) -> Rc<Self> {
		Rc::new_cyclic(|this| Self {
			ctx: Rc::clone(ctx),
			current: Cell::new(None),
			shop_loaded: Cell::new(false),
			blog_loaded: Cell::new(false),
			this: this.clone(),
		})
	}

	/// Follows back/forward navigation. The subscription is owned by the
	/// context lifecycle.
	pub fn listen_history(&self) {
		let weak = self.this.clone();
		let id = self.ctx.browser.on_popstate(Rc::new(move || {
			if let Some(router) = weak.upgrade() {
				router.resolve_from_path();
			}
		}));
		self.ctx.lifecycle.register(Resource::Popstate(id));
	}

	/// Tab currently shown, if any was resolved yet.
	pub fn current(&self) -> Option<Tab> {
		self.current.get()
	}

	/// Whether the loader of `tab` has run.
	pub fn is_loaded(&self, tab: Tab) -> bool {
		match tab {
			Tab::Links => true,
			Tab::Blog => self.blog_loaded.get(),
			Tab::Shop => self.shop_loaded.get(),
		}
	}

	/// Shows `tab` and pushes its path if the browser is elsewhere.
	pub fn switch_tab(&self, tab: Tab) {
		if self.ctx.is_cancelled() {
			return;
		}
		self.show(tab);
		let browser = self.ctx.browser();
		let current = browser.current_path();
		let target = tab.path(&base_path(&current));
		if current != target {
			browser.push_path(&target);
			self.page_view(tab, target);
		}
	}

	/// Shows the tab the current path selects, without touching history.
	pub fn resolve_from_path(&self) -> Tab {
		let tab = Tab::from_path(&self.ctx.browser().current_path());
		if !self.ctx.is_cancelled() {
			self.show(tab);
		}
		tab
	}

	fn show(&self, tab: Tab) {
		let tree = self.ctx.tree();
		let color = self.ctx.config.nav_color.as_str();
		for candidate in Tab::ALL {
			let active = candidate == tab;
			if let Some(button) = tree.find_by_id(candidate.button_id()) {
				tree.set_style(button, "color", color);
				tree.set_style(button, "opacity", if active { "1" } else { "0.9" });
				if let Some(indicator) = tree.query_first(button, &Selector::tag("span")) {
					tree.set_style(indicator, "background", if active { color } else { "transparent" });
				}
			}
			if let Some(feed) = tree.find_by_id(candidate.feed_id()) {
				tree.set_style(feed, "display", if active { "block" } else { "none" });
			}
		}
		self.current.set(Some(tab));
		match tab {
			Tab::Links => {}
			Tab::Blog => self.load_blog(),
			Tab::Shop => self.load_shop(),
		}
	}

	fn page_view(&self, tab: Tab, path: String) {
		if self.ctx.config.preview {
			return;
		}
		let event = PageEvent::PageView {
			path,
			tab: tab.name().to_string(),
			timestamp: self.ctx.host().now(),
		};
		let api = self.ctx.api();
		let bio_id = self.ctx.page.bio_id.clone();
		self.ctx.spawn(async move {
			if let Err(err) = api.post_event(&bio_id, &event).await {
				debug_log!("page view dropped: {}", err);
			}
		});
	}

	fn load_shop(&self) {
		if self.shop_loaded.get() {
			return;
		}
		let Some(container) = self.ctx.tree().find_by_id(SHOP_CONTAINER_ID) else {
			return;
		};
		self.shop_loaded.set(true);
		let ctx = Rc::clone(&self.ctx);
		self.ctx.spawn(async move {
			let result = ctx.api().products(&ctx.page.bio_id).await;
			if !ctx.is_live(container) {
				return;
			}
			let tree = ctx.tree();
			match result {
				Ok(products) if products.is_empty() => {
					tree.replace_children(container, notice(NO_PRODUCTS_TEXT, false));
				}
				Ok(products) => {
					tree.replace_children(
						container,
						View::fragment(products.iter().map(product_card)),
					);
					if let Err(err) = CheckoutActivator.activate(&ctx) {
						warn_log!("shop checkout wiring failed: {}", err);
					}
				}
				Err(err) => {
					warn_log!("products failed to load: {}", err);
					tree.replace_children(container, notice(PRODUCTS_FAILED_TEXT, true));
				}
			}
		});
	}

	fn load_blog(&self) {
		if self.blog_loaded.get() {
			return;
		}
		let Some(container) = self.ctx.tree().find_by_id(BLOG_CONTAINER_ID) else {
			return;
		};
		self.blog_loaded.set(true);
		let ctx = Rc::clone(&self.ctx);
		self.ctx.spawn(async move {
			let result = ctx.api().blog_posts(&ctx.page.bio_id).await;
			if !ctx.is_live(container) {
				return;
			}
			let tree = ctx.tree();
			match result {
				Ok(posts) if posts.is_empty() => {
					tree.replace_children(container, notice(NO_POSTS_TEXT, false));
				}
				Ok(posts) => render_posts(&ctx, container, &posts),
				Err(err) => {
					warn_log!("blog posts failed to load: {}", err);
					tree.replace_children(container, notice(POSTS_FAILED_TEXT, true));
				}
			}
		});
	}
}

fn notice(text: &'static str, error: bool) -> View {
	let color = if error { "#ef4444" } else { "#6b7280" };
	View::element("div")
		.class("tab-notice")
		.style(format!("grid-column: 1/-1; text-align: center; padding: 40px; color: {}", color))
		.child(text)
		.into()
}

fn product_card(product: &Product) -> View {
	let image = product
		.images
		.first()
		.or(product.image.as_ref())
		.cloned()
		.unwrap_or_else(|| PRODUCT_PLACEHOLDER.to_string());
	View::element("a")
		.class(PRODUCT_CARD_CLASS)
		.attr(ATTR_PRODUCT_ID, product.id.clone())
		.attr("href", "#")
		.style("display: flex; flex-direction: column; background: white; border-radius: 24px; overflow: hidden; text-decoration: none")
		.child(
			View::element("div")
				.class("product-card-media")
				.style("position: relative; aspect-ratio: 1; overflow: hidden; background: #f3f4f6")
				.child(
					View::element("img")
						.attr("src", image)
						.attr("alt", product.title.clone())
						.style("width: 100%; height: 100%; object-fit: cover"),
				)
				.child(
					View::element("div")
						.class("product-card-price")
						.child(format_price(product.price, product.currency.as_deref())),
				),
		)
		.child(
			View::element("div")
				.class("product-card-body")
				.style("padding: 16px; display: flex; flex-direction: column")
				.child(View::element("h3").child(product.title.clone()))
				.child(View::element("span").class("product-card-cta").child("View Product")),
		)
		.into()
}

fn post_card(base: &str, index: usize, post: &BlogPost) -> ElementView {
	let slug = post.slug.as_deref().filter(|s| !s.is_empty()).unwrap_or(&post.id);
	let href = format!("{}/blog/{}", base.trim_end_matches('/'), slug);
	let meta = format!(
		"{} • {} min read",
		format_date(post.created_at),
		read_time_minutes(&post.content)
	);
	View::element("a")
		.class(BLOG_CARD_CLASS)
		.attr("data-index", index.to_string())
		.attr("href", href)
		.style("display: flex; gap: 16px; background: #ffffff; border-radius: 24px; padding: 20px; text-decoration: none; min-height: 180px")
		.child(
			View::element("div")
				.class("blog-card-text")
				.style("flex: 1; display: flex; flex-direction: column")
				.child(View::element("h3").child(post.title.clone()))
				.child(View::element("div").class("blog-card-meta").child(meta)),
		)
		.child(
			View::element("img")
				.attr("src", cover_image(post, POST_PLACEHOLDER))
				.attr("alt", post.title.clone())
				.style("width: 120px; height: 120px; object-fit: cover; border-radius: 12px"),
		)
}

fn render_posts(ctx: &Rc<ActivationContext>, container: NodeId, posts: &[BlogPost]) {
	let tree = ctx.tree();
	let base = base_path(&ctx.browser().current_path());
	let cards: Vec<ElementView> = posts
		.iter()
		.enumerate()
		.map(|(index, post)| post_card(&base, index, post))
		.collect();
	if posts.len() > ctx.config.card_stack_threshold {
		tree.replace_children(container, card_stack::render(cards, ctx.config.stack_visible));
		card_stack::wire(ctx, container);
	} else {
		tree.set_style(container, "display", "grid");
		tree.set_style(container, "grid-template-columns", "repeat(auto-fill, minmax(300px, 1fr))");
		tree.set_style(container, "gap", "24px");
		tree.replace_children(container, View::fragment(cards));
	}
	debug_log!("blog tab rendered {} posts", posts.len());
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ApiError;
	use crate::testing::{Harness, blog_post, product};
	use crate::tree::ContentTree;
	use rstest::rstest;

	const LAYOUT: &str = r#"
		<nav>
			<button id="tab-links"><span></span>Links</button>
			<button id="tab-blog"><span></span>Blog</button>
			<button id="tab-shop"><span></span>Shop</button>
		</nav>
		<div id="links-feed"><a href="https://x.example">x</a></div>
		<div id="blog-feed" style="display: none"><div id="blog-posts-container"></div></div>
		<div id="shop-feed" style="display: none"><div id="shop-products-container"></div></div>"#;

	#[rstest]
	#[case("/ana", Tab::Links)]
	#[case("/ana/", Tab::Links)]
	#[case("/ana/blog", Tab::Blog)]
	#[case("/ana/shop/", Tab::Shop)]
	#[case("/", Tab::Links)]
	#[case("/shop", Tab::Shop)]
	fn test_tab_from_path(#[case] path: &str, #[case] expected: Tab) {
		assert_eq!(Tab::from_path(path), expected);
	}

	#[rstest]
	#[case("/ana/shop", "/ana")]
	#[case("/ana/blog", "/ana")]
	#[case("/ana/", "/ana")]
	#[case("/shop", "/")]
	#[case("", "/")]
	#[case("/", "/")]
	fn test_base_path(#[case] path: &str, #[case] expected: &str) {
		assert_eq!(base_path(path), expected);
	}

	#[rstest]
	#[case(19.9, Some("USD"), "$19.90")]
	#[case(1234.5, None, "$1,234.50")]
	#[case(1000000.0, Some("eur"), "€1,000,000.00")]
	#[case(5.0, Some("CAD"), "CAD\u{a0}5.00")]
	#[case(0.0, Some(""), "$0.00")]
	fn test_format_price(#[case] amount: f64, #[case] currency: Option<&str>, #[case] expected: &str) {
		assert_eq!(format_price(amount, currency), expected);
	}

	#[rstest]
	fn test_switch_pushes_path_styles_tabs_and_loads_once() {
		let harness = Harness::new(LAYOUT);
		harness
			.api
			.set_products(Ok(vec![product("p1", "Mug", 12.0), product("p2", "Shirt", 25.5)]));
		let ctx = harness.context();
		let router = TabRouter::new(&ctx);

		router.switch_tab(Tab::Shop);
		harness.host.run_until_stalled();
		assert_eq!(harness.browser.history(), vec!["/ana".to_string(), "/ana/shop".to_string()]);

		let tree = &harness.tree;
		let shop_feed = tree.find_by_id("shop-feed").unwrap();
		let links_feed = tree.find_by_id("links-feed").unwrap();
		assert_eq!(tree.style(shop_feed, "display").as_deref(), Some("block"));
		assert_eq!(tree.style(links_feed, "display").as_deref(), Some("none"));
		let shop_button = tree.find_by_id("tab-shop").unwrap();
		let indicator = tree.query_first(shop_button, &Selector::tag("span")).unwrap();
		assert_eq!(tree.style(indicator, "background").as_deref(), Some("#111827"));

		let cards = tree.query(tree.root(), &Selector::class(PRODUCT_CARD_CLASS));
		assert_eq!(cards.len(), 2);
		assert!(tree.text(cards[1]).contains("$25.50"));
		assert_eq!(tree.listener_count(), 2);

		router.switch_tab(Tab::Links);
		router.switch_tab(Tab::Shop);
		harness.host.run_until_stalled();
		assert_eq!(harness.api.calls_to("products"), 1);
		assert_eq!(harness.api.calls_to("post_event"), 3);
	}

	#[rstest]
	fn test_switch_to_current_path_does_not_push() {
		let harness = Harness::new(LAYOUT).at_path("/ana/blog");
		let ctx = harness.context();
		let router = TabRouter::new(&ctx);
		router.switch_tab(Tab::Blog);
		harness.host.run_until_stalled();
		assert_eq!(harness.browser.history(), vec!["/ana/blog".to_string()]);
		assert_eq!(harness.api.calls_to("post_event"), 0);
	}

	#[rstest]
	fn test_back_resolves_without_pushing() {
		let harness = Harness::new(LAYOUT);
		let ctx = harness.context();
		let router = TabRouter::new(&ctx);
		router.listen_history();
		router.switch_tab(Tab::Blog);
		assert_eq!(router.current(), Some(Tab::Blog));

		harness.browser.back();
		assert_eq!(router.current(), Some(Tab::Links));
		assert_eq!(harness.browser.history(), vec!["/ana".to_string()]);

		ctx.lifecycle.teardown_all();
		assert_eq!(harness.browser.popstate_subscribers(), 0);
	}

	#[rstest]
	fn test_blog_posts_render_as_stack_with_links() {
		let harness = Harness::new(LAYOUT);
		let mut first = blog_post("1", "First");
		first.slug = Some("first-post".into());
		harness.api.set_blog_posts(Ok(vec![first, blog_post("2", "Second")]));
		let ctx = harness.context();
		let router = TabRouter::new(&ctx);
		router.switch_tab(Tab::Blog);
		harness.host.run_until_stalled();

		let tree = &harness.tree;
		let cards = tree.query(tree.root(), &Selector::class(BLOG_CARD_CLASS));
		assert_eq!(cards.len(), 2);
		assert_eq!(tree.attr(cards[0], "href").as_deref(), Some("/ana/blog/first-post"));
		assert_eq!(tree.attr(cards[1], "href").as_deref(), Some("/ana/blog/2"));
		assert_eq!(tree.query(tree.root(), &Selector::class("card-stack-item")).len(), 2);
	}

	#[rstest]
	fn test_single_post_renders_as_grid() {
		let harness = Harness::new(LAYOUT);
		harness.api.set_blog_posts(Ok(vec![blog_post("1", "Only")]));
		let ctx = harness.context();
		TabRouter::new(&ctx).switch_tab(Tab::Blog);
		harness.host.run_until_stalled();
		let container = harness.tree.find_by_id(BLOG_CONTAINER_ID).unwrap();
		assert_eq!(harness.tree.style(container, "display").as_deref(), Some("grid"));
		assert!(harness.tree.query(container, &Selector::class("card-stack")).is_empty());
	}

	#[rstest]
	#[case(Tab::Shop, NO_PRODUCTS_TEXT)]
	#[case(Tab::Blog, NO_POSTS_TEXT)]
	fn test_empty_messages(#[case] tab: Tab, #[case] text: &str) {
		let harness = Harness::new(LAYOUT);
		let ctx = harness.context();
		TabRouter::new(&ctx).switch_tab(tab);
		harness.host.run_until_stalled();
		assert!(harness.tree.html().contains(text));
	}

	#[rstest]
	fn test_failed_load_is_not_retried() {
		let harness = Harness::new(LAYOUT);
		harness.api.set_products(Err(ApiError::Transport("offline".into())));
		let ctx = harness.context();
		let router = TabRouter::new(&ctx);
		router.switch_tab(Tab::Shop);
		harness.host.run_until_stalled();
		assert!(harness.tree.html().contains(PRODUCTS_FAILED_TEXT));

		router.switch_tab(Tab::Links);
		router.switch_tab(Tab::Shop);
		harness.host.run_until_stalled();
		assert_eq!(harness.api.calls_to("products"), 1);
		assert!(router.is_loaded(Tab::Shop));
	}

	#[rstest]
	fn test_missing_container_leaves_loader_pending() {
		let harness = Harness::new(r#"<div id="shop-feed"></div>"#);
		let ctx = harness.context();
		let router = TabRouter::new(&ctx);
		router.switch_tab(Tab::Shop);
		harness.host.run_until_stalled();
		assert!(!router.is_loaded(Tab::Shop));
		assert_eq!(harness.api.calls_to("products"), 0);
	}

	#[rstest]
	fn test_preview_posts_no_page_view() {
		let harness = Harness::new(LAYOUT).with_config(|c| c.with_preview(true));
		let ctx = harness.context();
		TabRouter::new(&ctx).switch_tab(Tab::Blog);
		harness.host.run_until_stalled();
		assert_eq!(harness.api.calls_to("post_event"), 0);
	}
}
