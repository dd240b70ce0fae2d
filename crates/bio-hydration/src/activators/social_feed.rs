//! Instagram and YouTube thumbnail feeds.

use super::{ActivationContext, ActivationReport, Activator};
use crate::api::FeedItem;
use crate::error::{ActivationError, ApiError};
use crate::markers::{self, ATTR_DISPLAY_TYPE, ATTR_URL, ATTR_USERNAME, ATTR_VARIANT, MarkerKind};
use crate::view::{ElementView, View};
use crate::{debug_log, warn_log};
use std::rc::Rc;

/// Backend serving a feed region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedProvider {
	/// `.custom-instagram-feed[data-username]`
	Instagram,
	/// `.custom-youtube-feed[data-url]`
	Youtube,
}

impl FeedProvider {
	fn kind(self) -> MarkerKind {
		match self {
			Self::Instagram => MarkerKind::InstagramFeed,
			Self::Youtube => MarkerKind::YoutubeFeed,
		}
	}

	fn source_attr(self) -> &'static str {
		match self {
			Self::Instagram => ATTR_USERNAME,
			Self::Youtube => ATTR_URL,
		}
	}

	/// Whether `source` is a usable handle or URL.
	fn accepts(self, source: &str) -> bool {
		match self {
			Self::Instagram => !source.eq_ignore_ascii_case("instagram"),
			Self::Youtube => source.starts_with("http://") || source.starts_with("https://"),
		}
	}

	/// Message rendered when the feed has no items.
	pub fn empty_text(self) -> &'static str {
		match self {
			Self::Instagram => "No posts found",
			Self::Youtube => "No videos found",
		}
	}

	/// Message rendered when the request fails.
	pub fn error_text(self) -> &'static str {
		match self {
			Self::Instagram => "Error loading posts",
			Self::Youtube => "Error loading videos",
		}
	}

	async fn fetch(self, ctx: &ActivationContext, source: &str) -> Result<Vec<FeedItem>, ApiError> {
		let api = ctx.api();
		match self {
			Self::Instagram => api.instagram_posts(source).await,
			Self::Youtube => api.youtube_videos(source).await,
		}
	}
}

/// Layout of a feed region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayType {
	/// Square thumbnails in three columns.
	#[default]
	Grid,
	/// One item per row.
	List,
}

impl DisplayType {
	/// Reads `data-display-type`; unknown values fall back to the grid.
	pub fn parse(raw: Option<&str>) -> Self {
		match raw {
			Some(value) if value.eq_ignore_ascii_case("list") => Self::List,
			_ => Self::Grid,
		}
	}

	fn container_style(self) -> &'static str {
		match self {
			Self::Grid => "display: grid; grid-template-columns: repeat(3, 1fr); gap: 8px",
			Self::List => "display: flex; flex-direction: column; gap: 12px",
		}
	}
}

/// Loads a page of thumbnails into each feed region.
#[derive(Debug, Clone, Copy)]
pub struct SocialFeedActivator {
	provider: FeedProvider,
}

impl SocialFeedActivator {
	/// Activator for `provider`.
	pub fn new(provider: FeedProvider) -> Self {
		Self { provider }
	}
}

impl Activator for SocialFeedActivator {
	fn name(&self) -> &'static str {
		self.provider.kind().name()
	}

	fn activate(&self, ctx: &Rc<ActivationContext>) -> Result<ActivationReport, ActivationError> {
		let tree = ctx.tree();
		let kind = self.provider.kind();
		let mut report = ActivationReport::default();
		for node in markers::unclaimed(tree, tree.root(), kind) {
			let Some(source) = markers::config_attr(tree, node, self.provider.source_attr())
				.filter(|s| self.provider.accepts(s))
			else {
				debug_log!("{} feed without a usable source skipped", kind.name());
				report.skipped += 1;
				continue;
			};
			if !markers::claim(tree, node, kind) {
				continue;
			}
			report.claimed += 1;

			let display = DisplayType::parse(tree.attr(node, ATTR_DISPLAY_TYPE).as_deref());
			let variant = markers::config_attr(tree, node, ATTR_VARIANT);
			tree.replace_children(node, skeleton(ctx.config.feed_page_size, display));

			let provider = self.provider;
			let page_size = ctx.config.feed_page_size;
			let task = Rc::clone(ctx);
			ctx.spawn(async move {
				let ctx = task;
				let result = provider.fetch(&ctx, &source).await;
				if !ctx.is_live(node) {
					return;
				}
				let view = match result {
					Ok(items) if items.is_empty() => message(provider.empty_text(), "feed-empty"),
					Ok(items) => grid(provider, &items[..items.len().min(page_size)], display, variant.as_deref()),
					Err(err) => {
						warn_log!("{} feed for '{}' failed: {}", kind.name(), source, err);
						message(provider.error_text(), "feed-error")
					}
				};
				ctx.tree().replace_children(node, view);
			});
		}
		Ok(report)
	}
}

fn skeleton(count: usize, display: DisplayType) -> View {
	View::element("div")
		.class("feed-skeleton")
		.style(display.container_style())
		.children((0..count).map(|_| {
			View::element("div")
				.class("feed-skeleton-item")
				.style("aspect-ratio: 1; border-radius: 12px; background: #e5e7eb")
		}))
		.into()
}

fn message(text: &'static str, class: &'static str) -> View {
	View::element("p")
		.class(class)
		.style("text-align: center; color: #6b7280; padding: 16px")
		.child(text)
		.into()
}

fn grid(provider: FeedProvider, items: &[FeedItem], display: DisplayType, variant: Option<&str>) -> View {
	let mut container = View::element("div")
		.class("feed-items")
		.style(display.container_style());
	if let Some(variant) = variant {
		container = container.attr(ATTR_VARIANT, variant.to_string());
	}
	container
		.children(items.iter().map(|item| item_view(provider, item, display)))
		.into()
}

fn item_view(provider: FeedProvider, item: &FeedItem, display: DisplayType) -> ElementView {
	let title = item.title.clone().unwrap_or_default();
	let mut link = View::element("a")
		.class("feed-item")
		.attr("href", item.url.clone())
		.attr("target", "_blank")
		.attr("rel", "noopener noreferrer")
		.style("position: relative; display: block; overflow: hidden; border-radius: 12px")
		.child(
			View::element("img")
				.attr("src", item.image_url.clone())
				.attr("alt", title.clone())
				.attr("loading", "lazy")
				.style("width: 100%; aspect-ratio: 1; object-fit: cover; transition: transform 0.3s"),
		);
	if provider == FeedProvider::Youtube {
		link = link.child(
			View::element("span")
				.class("feed-play")
				.style("position: absolute; inset: 0; display: flex; align-items: center; justify-content: center; color: #ffffff; font-size: 24px")
				.child("▶"),
		);
	}
	if display == DisplayType::List && !title.is_empty() {
		link = link.child(
			View::element("span")
				.class("feed-title")
				.style("display: block; padding: 8px 4px; font-size: 14px")
				.child(title),
		);
	}
	link
}
