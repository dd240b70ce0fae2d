//! Content-card feed with a shared detail overlay.

use super::{ActivationContext, ActivationReport, Activator, PresenterFactory, card_stack};
use crate::api::BlogPost;
use crate::error::ActivationError;
use crate::markers::{self, ATTR_BIO_ID, ATTR_CARD_STYLE, ATTR_LAYOUT, ATTR_POPUP_STYLE, MarkerKind};
use crate::sanitize::Sanitizer;
use crate::tree::{EventKind, NodeId, Selector};
use crate::view::{ElementView, View};
use crate::{debug_log, warn_log};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use regex::Regex;
use std::rc::{Rc, Weak};

static TAG_RE: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"<[^>]*>?").expect("TAG_RE: invalid regex pattern"));
static IMG_SRC_RE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r#"<img[^>]+src="([^">]+)""#).expect("IMG_SRC_RE: invalid regex pattern")
});

/// Image used when a post has none.
pub const DEFAULT_CARD_IMAGE: &str = "/base-img/card_base_image.png";

const CARD_CLASS: &str = "blog-card";
const EXCERPT_CHARS: usize = 100;

/// Removes every markup tag from `html`.
pub fn strip_tags(html: &str) -> String {
	TAG_RE.replace_all(html, "").into_owned()
}

/// First `max_chars` characters of the tag-stripped content, followed by `...`.
pub fn excerpt(content: &str, max_chars: usize) -> String {
	let text = strip_tags(content);
	let text = text.trim();
	if text.is_empty() {
		return String::new();
	}
	let mut out: String = text.chars().take(max_chars).collect();
	out.push_str("...");
	out
}

/// Reading time at 200 words per minute, at least one minute.
pub fn read_time_minutes(content: &str) -> usize {
	let words = strip_tags(content).split_whitespace().count();
	words.div_ceil(200).max(1)
}

/// Thumbnail, else the first inline image, else `fallback`.
pub fn cover_image(post: &BlogPost, fallback: &str) -> String {
	if let Some(thumbnail) = post.thumbnail.as_deref().filter(|t| !t.trim().is_empty()) {
		return thumbnail.to_string();
	}
	IMG_SRC_RE
		.captures(&post.content)
		.and_then(|c| c.get(1))
		.map(|m| m.as_str().to_string())
		.unwrap_or_else(|| fallback.to_string())
}

/// `Mar 5, 2025`
pub fn format_date(instant: Option<DateTime<Utc>>) -> String {
	instant
		.map(|d| d.format("%b %-d, %Y").to_string())
		.unwrap_or_default()
}

/// Arrangement of the cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CardLayout {
	/// Horizontally scrolling row.
	#[default]
	Carousel,
	/// Responsive grid.
	Grid,
	/// One card per row.
	List,
}

impl CardLayout {
	/// Reads `data-layout`.
	pub fn parse(raw: Option<&str>) -> Self {
		match raw.map(str::trim) {
			Some("grid") => Self::Grid,
			Some("list") => Self::List,
			_ => Self::Carousel,
		}
	}

	fn container_style(self) -> &'static str {
		match self {
			Self::Carousel => "display: flex; gap: 16px; overflow-x: auto; scroll-snap-type: x mandatory; padding-bottom: 8px",
			Self::Grid => "display: grid; grid-template-columns: repeat(auto-fill, minmax(240px, 1fr)); gap: 16px",
			Self::List => "display: flex; flex-direction: column",
		}
	}
}

/// Card template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CardStyle {
	/// Image, tags, title.
	#[default]
	Featured,
	/// Date, title, excerpt.
	Modern,
	/// Compact title tile.
	Minimal,
}

impl CardStyle {
	/// Reads `data-card-style`.
	pub fn parse(raw: Option<&str>) -> Self {
		match raw.map(str::trim) {
			Some("modern") => Self::Modern,
			Some("minimal") => Self::Minimal,
			_ => Self::Featured,
		}
	}
}

/// Card colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardTheme {
	/// `data-bg-color`
	pub background: String,
	/// `data-title-color`
	pub title: String,
	/// `data-text-color`
	pub text: String,
	/// `data-date-color`
	pub date: String,
	/// `data-tag-bg`
	pub tag_background: String,
	/// `data-tag-text`
	pub tag_text: String,
}

impl Default for CardTheme {
	fn default() -> Self {
		Self {
			background: "#ffffff".into(),
			title: "#1f2937".into(),
			text: "#4b5563".into(),
			date: "#f59e0b".into(),
			tag_background: "#f3f4f6".into(),
			tag_text: "#4b5563".into(),
		}
	}
}

impl CardTheme {
	fn read(ctx: &ActivationContext, node: NodeId) -> Self {
		let tree = ctx.tree();
		let pick = |name: &str, fallback: String| markers::config_attr(tree, node, name).unwrap_or(fallback);
		let d = Self::default();
		Self {
			background: pick("data-bg-color", d.background),
			title: pick("data-title-color", d.title),
			text: pick("data-text-color", d.text),
			date: pick("data-date-color", d.date),
			tag_background: pick("data-tag-bg", d.tag_background),
			tag_text: pick("data-tag-text", d.tag_text),
		}
	}
}

/// Style configuration handed to the detail overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupTheme {
	/// `data-popup-style`
	pub style: String,
	/// `data-popup-bg-color`
	pub background: String,
	/// `data-popup-text-color`
	pub text: String,
	/// `data-popup-overlay-color`
	pub overlay: String,
}

impl Default for PopupTheme {
	fn default() -> Self {
		Self {
			style: "modern".into(),
			background: "#ffffff".into(),
			text: "#1f2937".into(),
			overlay: "rgba(0, 0, 0, 0.5)".into(),
		}
	}
}

impl PopupTheme {
	fn read(ctx: &ActivationContext, node: NodeId) -> Self {
		let tree = ctx.tree();
		let pick = |name: &str, fallback: String| markers::config_attr(tree, node, name).unwrap_or(fallback);
		let d = Self::default();
		Self {
			style: pick(ATTR_POPUP_STYLE, d.style),
			background: pick("data-popup-bg-color", d.background),
			text: pick("data-popup-text-color", d.text),
			overlay: pick("data-popup-overlay-color", d.overlay),
		}
	}
}

/// Shows the full post behind a card.
pub trait DetailPresenter {
	/// Displays `post` using `theme`.
	fn show(&self, post: &BlogPost, theme: &PopupTheme);

	/// Hides the overlay.
	fn close(&self) {}
}

/// Loads every `.custom-blog-feed` region.
#[derive(Debug, Default, Clone, Copy)]
pub struct CardFeedActivator;

impl Activator for CardFeedActivator {
	fn name(&self) -> &'static str {
		MarkerKind::CardFeed.name()
	}

	fn activate(&self, ctx: &Rc<ActivationContext>) -> Result<ActivationReport, ActivationError> {
		let tree = ctx.tree();
		let mut report = ActivationReport::default();
		for node in markers::unclaimed(tree, tree.root(), MarkerKind::CardFeed) {
			let Some(bio_id) = markers::config_attr(tree, node, ATTR_BIO_ID)
				.or_else(|| Some(ctx.page.bio_id.clone()).filter(|id| !id.is_empty()))
			else {
				report.skipped += 1;
				continue;
			};
			if !markers::claim(tree, node, MarkerKind::CardFeed) {
				continue;
			}
			report.claimed += 1;

			let layout = CardLayout::parse(tree.attr(node, ATTR_LAYOUT).as_deref());
			let style = CardStyle::parse(tree.attr(node, ATTR_CARD_STYLE).as_deref());
			let theme = CardTheme::read(ctx, node);
			let popup = Rc::new(PopupTheme::read(ctx, node));

			let task = Rc::clone(ctx);
			ctx.spawn(async move {
				let ctx = task;
				let result = ctx.api().card_posts(&bio_id).await;
				if !ctx.is_live(node) {
					return;
				}
				match result {
					Ok(posts) if posts.is_empty() => ctx.tree().replace_children(node, notice("No posts yet", "#6b7280")),
					Ok(posts) => render_feed(&ctx, node, posts, layout, style, &theme, popup),
					Err(err) => {
						warn_log!("card feed for bio {} failed: {}", bio_id, err);
						ctx.tree().replace_children(node, notice("Failed to load posts", "#ef4444"));
					}
				}
			});
		}
		Ok(report)
	}
}

fn notice(text: &'static str, color: &'static str) -> View {
	View::element("div")
		.class("blog-feed-message")
		.style(format!("text-align: center; padding: 20px; font-size: 12px; color: {}", color))
		.child(text)
		.into()
}

fn render_feed(
	ctx: &Rc<ActivationContext>,
	node: NodeId,
	posts: Vec<BlogPost>,
	layout: CardLayout,
	style: CardStyle,
	theme: &CardTheme,
	popup: Rc<PopupTheme>,
) {
	let tree = ctx.tree();
	let stacked = posts.len() > ctx.config.stack_visible;
	let cards: Vec<ElementView> = posts
		.iter()
		.enumerate()
		.map(|(index, post)| card(post, style, layout, theme).attr("data-index", index.to_string()))
		.collect();
	if stacked {
		tree.replace_children(node, card_stack::render(cards, ctx.config.stack_visible));
		card_stack::wire(ctx, node);
	} else {
		tree.replace_children(
			node,
			View::element("div")
				.class("blog-feed-cards")
				.style(layout.container_style())
				.children(cards)
				.into(),
		);
	}

	let posts: Vec<Rc<BlogPost>> = posts.into_iter().map(Rc::new).collect();
	for card_node in tree.query(node, &Selector::class(CARD_CLASS)) {
		let Some(post) = tree
			.attr(card_node, "data-index")
			.and_then(|i| i.parse::<usize>().ok())
			.and_then(|i| posts.get(i))
			.map(Rc::clone)
		else {
			continue;
		};
		let weak = Rc::downgrade(ctx);
		let popup = Rc::clone(&popup);
		ctx.listen(
			card_node,
			EventKind::Click,
			Rc::new(move |_| {
				if let Some(ctx) = weak.upgrade() {
					ctx.presenter().show(&post, &popup);
				}
			}),
		);
	}
}

/// Renders one card of `post`.
pub(crate) fn card(post: &BlogPost, style: CardStyle, layout: CardLayout, theme: &CardTheme) -> ElementView {
	let date = format_date(post.created_at);
	let read_time = format!("{} min read", read_time_minutes(&post.content));
	let category = post.tags.first().cloned().unwrap_or_else(|| "Blog".to_string());
	let article = View::element("article").class(CARD_CLASS);
	match style {
		CardStyle::Featured => article
			.style(format!(
				"flex: 0 0 260px; min-width: 260px; scroll-snap-align: start; display: flex; flex-direction: column; gap: 10px; background: {}; border: 1px solid #e5e7eb; border-radius: 18px; padding: 16px; cursor: pointer",
				theme.background
			))
			.child(
				View::element("div")
					.style("width: 100%; height: 140px; border-radius: 12px; overflow: hidden; background: #e5e7eb")
					.child(
						View::element("img")
							.attr("src", cover_image(post, DEFAULT_CARD_IMAGE))
							.attr("alt", post.title.clone())
							.style("width: 100%; height: 100%; object-fit: cover"),
					),
			)
			.child(
				View::element("div")
					.style("display: flex; gap: 6px")
					.child(chip(category, theme))
					.child(chip(read_time, theme)),
			)
			.child(
				View::element("h3")
					.style(format!("font-size: 16px; font-weight: 800; line-height: 1.3; margin: 0; color: {}", theme.title))
					.child(post.title.clone()),
			)
			.child(
				View::element("span")
					.style(format!("font-size: 12px; color: {}", theme.date))
					.child(date),
			),
		CardStyle::Modern => {
			let width = match layout {
				CardLayout::Carousel => "flex: 0 0 280px; min-width: 280px; border-right: 1px solid #f3f4f6; padding-right: 24px; margin-right: 8px",
				_ => "width: 100%; border-bottom: 1px solid #f3f4f6; padding-bottom: 16px; margin-bottom: 16px",
			};
			article
				.style(format!("{}; scroll-snap-align: start; display: flex; flex-direction: column; gap: 8px; cursor: pointer", width))
				.child(
					View::element("div")
						.style(format!("font-size: 12px; font-weight: 700; color: {}", theme.date))
						.child(date),
				)
				.child(
					View::element("h3")
						.style(format!("font-size: 18px; font-weight: 700; line-height: 1.2; margin: 0; color: {}", theme.title))
						.child(post.title.clone()),
				)
				.child(
					View::element("div")
						.style(format!("font-size: 12px; opacity: 0.8; color: {}", theme.text))
						.child(format!("{} • {}", category, read_time)),
				)
				.child(
					View::element("p")
						.class("blog-card-excerpt")
						.style(format!("font-size: 12px; line-height: 1.6; margin: 0; color: {}", theme.text))
						.child(excerpt(&post.content, EXCERPT_CHARS)),
				)
		}
		CardStyle::Minimal => article
			.style(format!(
				"flex: 0 0 160px; min-width: 160px; scroll-snap-align: start; background: {}; border: 1px solid #e5e7eb; border-radius: 16px; padding: 14px; cursor: pointer",
				theme.background
			))
			.child(
				View::element("h3")
					.style(format!("font-size: 14px; font-weight: 700; margin: 0 0 6px 0; color: {}", theme.title))
					.child(post.title.clone()),
			)
			.child(
				View::element("div")
					.style("display: flex; justify-content: space-between; align-items: center")
					.child(
						View::element("span")
							.style(format!("font-size: 11px; color: {}", theme.text))
							.child(read_time),
					)
					.child(
						View::element("span")
							.style(format!("font-size: 11px; font-weight: 500; color: {}", theme.date))
							.child("Read more →"),
					),
			),
	}
}

fn chip(text: String, theme: &CardTheme) -> ElementView {
	View::element("span")
		.style(format!(
			"background: {}; color: {}; padding: 2px 8px; border-radius: 99px; font-size: 10px; font-weight: 600",
			theme.tag_background, theme.tag_text
		))
		.child(text)
}

const OVERLAY_ID: &str = "blog-detail-overlay";

/// Detail overlay rendered into the content tree itself.
///
/// The overlay element is appended to the root on first use and reused by
/// every later card click.
pub struct OverlayPresenter {
	ctx: Weak<ActivationContext>,
	sanitizer: Option<Rc<dyn Sanitizer>>,
	overlay: OnceCell<NodeId>,
}

impl std::fmt::Debug for OverlayPresenter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("OverlayPresenter")
			.field("overlay", &self.overlay.get())
			.finish()
	}
}

impl OverlayPresenter {
	/// Creates a presenter writing into the tree of `ctx`.
	///
	/// Without a sanitizer the post body is shown as plain text.
	pub fn new(ctx: &Rc<ActivationContext>, sanitizer: Option<Rc<dyn Sanitizer>>) -> Self {
		Self {
			ctx: Rc::downgrade(ctx),
			sanitizer,
			overlay: OnceCell::new(),
		}
	}

	/// Factory building an [`OverlayPresenter`] on first use.
	pub fn factory(sanitizer: Option<Rc<dyn Sanitizer>>) -> PresenterFactory {
		Rc::new(move |ctx: &Rc<ActivationContext>| -> Rc<dyn DetailPresenter> {
			Rc::new(OverlayPresenter::new(ctx, sanitizer.clone()))
		})
	}

	fn overlay(&self, ctx: &Rc<ActivationContext>) -> NodeId {
		*self.overlay.get_or_init(|| {
			let tree = ctx.tree();
			tree.append_view(
				tree.root(),
				View::element("div")
					.attr("id", OVERLAY_ID)
					.style("position: fixed; inset: 0; display: none; align-items: center; justify-content: center; z-index: 1000")
					.child(
						View::element("div")
							.class("blog-detail-panel")
							.style("position: relative; max-width: 640px; width: 90%; max-height: 85vh; overflow-y: auto; border-radius: 24px; padding: 32px")
							.child(
								View::element("button")
									.class("blog-detail-close")
									.attr("type", "button")
									.attr("aria-label", "Close")
									.style("position: absolute; top: 16px; right: 16px; border: none; background: transparent; font-size: 20px; cursor: pointer")
									.child("×"),
							)
							.child(View::element("div").class("blog-detail-body")),
					)
					.into(),
			);
			let Some(overlay) = tree.find_by_id(OVERLAY_ID) else {
				return tree.root();
			};
			if let Some(close) = tree.query_first(overlay, &Selector::class("blog-detail-close")) {
				let weak = Rc::downgrade(ctx);
				ctx.listen(
					close,
					EventKind::Click,
					Rc::new(move |_| {
						if let Some(ctx) = weak.upgrade() {
							ctx.tree().set_style(overlay, "display", "none");
						}
					}),
				);
			}
			debug_log!("detail overlay created");
			overlay
		})
	}
}

impl DetailPresenter for OverlayPresenter {
	fn show(&self, post: &BlogPost, theme: &PopupTheme) {
		let Some(ctx) = self.ctx.upgrade() else {
			return;
		};
		let overlay = self.overlay(&ctx);
		let tree = ctx.tree();
		let Some(panel) = tree.query_first(overlay, &Selector::class("blog-detail-panel")) else {
			return;
		};
		let Some(body) = tree.query_first(overlay, &Selector::class("blog-detail-body")) else {
			return;
		};
		tree.set_attr(overlay, "data-popup-style", &theme.style);
		tree.set_style(overlay, "background", &theme.overlay);
		tree.set_style(panel, "background", &theme.background);
		tree.set_style(panel, "color", &theme.text);

		let meta = format!("{} • {} min read", format_date(post.created_at), read_time_minutes(&post.content));
		tree.replace_children(
			body,
			View::fragment([
				View::element("img")
					.attr("src", cover_image(post, DEFAULT_CARD_IMAGE))
					.attr("alt", post.title.clone())
					.style("width: 100%; border-radius: 16px; margin-bottom: 16px"),
				View::element("h2").style("margin: 0 0 8px 0").child(post.title.clone()),
				View::element("p").class("blog-detail-meta").style("opacity: 0.7; font-size: 13px").child(meta),
				View::element("div").class("blog-detail-content"),
			]),
		);
		if let Some(content) = tree.query_first(body, &Selector::class("blog-detail-content")) {
			match &self.sanitizer {
				Some(sanitizer) => {
					if let Err(err) = tree.insert_markup(content, &sanitizer.sanitize(&post.content)) {
						warn_log!("detail body not rendered: {}", err);
					}
				}
				None => tree.set_text(content, strip_tags(&post.content).trim()),
			}
		}
		tree.set_style(overlay, "display", "flex");
	}

	fn close(&self) {
		if let (Some(ctx), Some(overlay)) = (self.ctx.upgrade(), self.overlay.get()) {
			ctx.tree().set_style(*overlay, "display", "none");
		}
	}
}
