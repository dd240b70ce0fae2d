//! Marker vocabulary shared with the server-side markup generator.
//!
//! Marker classes and configuration attributes are the only channel between
//! page authoring and the engine, so the names below must stay in sync with
//! the generator. Attributes double as configuration (read once) and state:
//! every kind owns a separate "initialized" attribute so several activators
//! can claim the same node independently.

use crate::tree::{ContentTree, NodeId, Selector};

/// Countdown region.
pub const COUNTDOWN_CLASS: &str = "countdown-timer";
/// Target instant of a countdown.
pub const ATTR_DATE: &str = "data-date";
/// Countdown field slots.
pub const COUNTDOWN_SLOTS: [&str; 4] = ["days", "hours", "minutes", "seconds"];

/// Instagram feed region.
pub const INSTAGRAM_FEED_CLASS: &str = "custom-instagram-feed";
/// Instagram handle.
pub const ATTR_USERNAME: &str = "data-username";
/// YouTube feed region.
pub const YOUTUBE_FEED_CLASS: &str = "custom-youtube-feed";
/// YouTube channel or playlist URL.
pub const ATTR_URL: &str = "data-url";
/// `grid` or `list`.
pub const ATTR_DISPLAY_TYPE: &str = "data-display-type";
/// Visual variant of a feed.
pub const ATTR_VARIANT: &str = "data-variant";

/// Content-card feed region.
pub const CARD_FEED_CLASS: &str = "custom-blog-feed";
/// Card layout.
pub const ATTR_LAYOUT: &str = "data-layout";
/// Card template.
pub const ATTR_CARD_STYLE: &str = "data-card-style";
/// Detail overlay template.
pub const ATTR_POPUP_STYLE: &str = "data-popup-style";

/// Booking widget region.
pub const BOOKING_CLASS: &str = "custom-booking-block";
/// Form widget region.
pub const FORM_CLASS: &str = "custom-form-block";
/// Portfolio widget region.
pub const PORTFOLIO_CLASS: &str = "custom-portfolio-block";
/// Marketing slot region.
pub const MARKETING_CLASS: &str = "custom-marketing-block";
/// Owning page identifier.
pub const ATTR_BIO_ID: &str = "data-bio-id";
/// Widget title.
pub const ATTR_TITLE: &str = "data-title";
/// Widget description.
pub const ATTR_DESCRIPTION: &str = "data-description";
/// Form identifier.
pub const ATTR_FORM_ID: &str = "data-form-id";
/// Marketing slot identifier.
pub const ATTR_MARKETING_ID: &str = "data-marketing-id";

/// Product checkout link.
pub const CHECKOUT_LINK_CLASS: &str = "product-item-link";
/// Product card rendered by the shop tab.
pub const PRODUCT_CARD_CLASS: &str = "product-card-item";
/// Product identifier.
pub const ATTR_PRODUCT_ID: &str = "data-product-id";

/// Instagram post embedded through Instagram's own script.
pub const INSTAGRAM_EMBED_CLASS: &str = "instagram-media";

/// Share trigger target URL.
pub const ATTR_SHARE_URL: &str = "data-share-url";
/// Share trigger title.
pub const ATTR_SHARE_TITLE: &str = "data-share-title";
/// Action attribute used by dialog controls.
pub const ATTR_ACTION: &str = "data-action";
/// Subscribe trigger marker.
pub const ATTR_OPEN_SUBSCRIBE: &str = "data-open-subscribe";

/// Kinds of marker nodes the engine activates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkerKind {
	/// Countdown timer.
	Countdown,
	/// Instagram feed.
	InstagramFeed,
	/// YouTube feed.
	YoutubeFeed,
	/// Content-card feed.
	CardFeed,
	/// Share dialog trigger or control.
	ShareTrigger,
	/// Subscribe dialog trigger or control.
	SubscribeTrigger,
	/// Subscribe form.
	SubscribeForm,
	/// Product checkout link.
	CheckoutLink,
	/// Booking widget.
	BookingWidget,
	/// Form widget.
	FormWidget,
	/// Portfolio widget.
	PortfolioWidget,
	/// Marketing slot.
	MarketingWidget,
	/// Outbound link.
	TrackedLink,
	/// Instagram post embed.
	InstagramEmbed,
}

impl MarkerKind {
	/// Every kind.
	pub const ALL: [MarkerKind; 14] = [
		Self::Countdown,
		Self::InstagramFeed,
		Self::YoutubeFeed,
		Self::CardFeed,
		Self::ShareTrigger,
		Self::SubscribeTrigger,
		Self::SubscribeForm,
		Self::CheckoutLink,
		Self::BookingWidget,
		Self::FormWidget,
		Self::PortfolioWidget,
		Self::MarketingWidget,
		Self::TrackedLink,
		Self::InstagramEmbed,
	];

	/// Short name used in logs and errors.
	pub fn name(self) -> &'static str {
		match self {
			Self::Countdown => "countdown",
			Self::InstagramFeed => "instagram",
			Self::YoutubeFeed => "youtube",
			Self::CardFeed => "card-feed",
			Self::ShareTrigger => "share",
			Self::SubscribeTrigger => "subscribe",
			Self::SubscribeForm => "subscribe-form",
			Self::CheckoutLink => "checkout",
			Self::BookingWidget => "booking",
			Self::FormWidget => "form",
			Self::PortfolioWidget => "portfolio",
			Self::MarketingWidget => "marketing",
			Self::TrackedLink => "link",
			Self::InstagramEmbed => "instagram-embed",
		}
	}

	/// Selector that finds candidate nodes of this kind.
	pub fn selector(self) -> Selector {
		match self {
			Self::Countdown => Selector::class(COUNTDOWN_CLASS),
			Self::InstagramFeed => Selector::class(INSTAGRAM_FEED_CLASS),
			Self::YoutubeFeed => Selector::class(YOUTUBE_FEED_CLASS),
			Self::CardFeed => Selector::class(CARD_FEED_CLASS),
			Self::ShareTrigger => Selector::has_attr(ATTR_SHARE_URL)
				.or(Selector::attr_eq(ATTR_ACTION, "close-share"))
				.or(Selector::attr_eq(ATTR_ACTION, "copy-share")),
			Self::SubscribeTrigger => Selector::has_attr(ATTR_OPEN_SUBSCRIBE)
				.or(Selector::attr_eq(ATTR_ACTION, "open-subscribe"))
				.or(Selector::tag("button").and(Selector::attr_eq("aria-label", "Subscribe")))
				.or(Selector::attr_eq(ATTR_ACTION, "close-subscribe")),
			Self::SubscribeForm => Selector::id("subscribe-form"),
			Self::CheckoutLink => Selector::class(CHECKOUT_LINK_CLASS)
				.or(Selector::class(PRODUCT_CARD_CLASS))
				.and(Selector::has_attr(ATTR_PRODUCT_ID)),
			Self::BookingWidget => Selector::class(BOOKING_CLASS),
			Self::FormWidget => Selector::class(FORM_CLASS),
			Self::PortfolioWidget => Selector::class(PORTFOLIO_CLASS),
			Self::MarketingWidget => Selector::class(MARKETING_CLASS),
			Self::TrackedLink => Selector::tag("a").and(
				Selector::attr_prefix("href", "http").or(Selector::attr_prefix("href", "/")),
			),
			Self::InstagramEmbed => Selector::class(INSTAGRAM_EMBED_CLASS),
		}
	}

	/// Attribute marking a node as handled by this kind.
	pub fn flag_attr(self) -> &'static str {
		match self {
			Self::Countdown => "data-countdown-initialized",
			Self::InstagramFeed => "data-instagram-initialized",
			Self::YoutubeFeed => "data-youtube-initialized",
			Self::CardFeed => "data-card-feed-initialized",
			Self::ShareTrigger => "data-share-wired",
			Self::SubscribeTrigger => "data-subscribe-wired",
			Self::SubscribeForm => "data-form-wired",
			Self::CheckoutLink => "data-checkout-initialized",
			Self::BookingWidget => "data-booking-initialized",
			Self::FormWidget => "data-form-initialized",
			Self::PortfolioWidget => "data-portfolio-initialized",
			Self::MarketingWidget => "data-marketing-initialized",
			Self::TrackedLink => "data-click-tracked",
			Self::InstagramEmbed => "data-instagram-embed-processed",
		}
	}
}

/// Whether `node` has already been claimed for `kind`.
pub fn is_claimed(tree: &dyn ContentTree, node: NodeId, kind: MarkerKind) -> bool {
	tree.attr(node, kind.flag_attr()).as_deref() == Some("true")
}

/// Flags `node` for `kind`. Returns false if another pass already did.
///
/// Activators call this synchronously before any asynchronous work, which is
/// what keeps a later scan from issuing a second request for the same node.
pub fn claim(tree: &dyn ContentTree, node: NodeId, kind: MarkerKind) -> bool {
	if is_claimed(tree, node, kind) {
		return false;
	}
	tree.set_attr(node, kind.flag_attr(), "true");
	true
}

/// Clears the flag so the next scan retries the node.
pub fn unclaim(tree: &dyn ContentTree, node: NodeId, kind: MarkerKind) {
	tree.remove_attr(node, kind.flag_attr());
}

/// Clears every flag under the root so a later mount activates the tree
/// again. Returns the number of flags removed.
pub fn unclaim_all(tree: &dyn ContentTree) -> usize {
	let mut cleared = 0;
	for kind in MarkerKind::ALL {
		for node in tree.query(tree.root(), &Selector::has_attr(kind.flag_attr())) {
			tree.remove_attr(node, kind.flag_attr());
			cleared += 1;
		}
	}
	cleared
}

/// Unclaimed candidates of `kind` under `scope`.
pub fn unclaimed(tree: &dyn ContentTree, scope: NodeId, kind: MarkerKind) -> Vec<NodeId> {
	tree.query(scope, &kind.selector())
		.into_iter()
		.filter(|node| !is_claimed(tree, *node, kind))
		.collect()
}

/// Attribute value with surrounding whitespace removed; blank counts as absent.
pub fn config_attr(tree: &dyn ContentTree, node: NodeId, name: &str) -> Option<String> {
	tree.attr(node, name)
		.map(|v| v.trim().to_string())
		.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tree::MemoryTree;
	use rstest::rstest;

	#[rstest]
	fn test_claim_is_one_shot() {
		let tree = MemoryTree::from_markup(r#"<div class="countdown-timer" data-date="2030-01-01"></div>"#);
		let node = unclaimed(&tree, tree.root(), MarkerKind::Countdown)[0];
		assert!(claim(&tree, node, MarkerKind::Countdown));
		assert!(!claim(&tree, node, MarkerKind::Countdown));
		assert!(unclaimed(&tree, tree.root(), MarkerKind::Countdown).is_empty());

		unclaim(&tree, node, MarkerKind::Countdown);
		assert_eq!(unclaimed(&tree, tree.root(), MarkerKind::Countdown), vec![node]);
	}

	#[rstest]
	fn test_unclaim_all_clears_every_kind() {
		let tree = MemoryTree::from_markup(
			r#"<a class="product-item-link" data-product-id="p1" href="/p">Buy</a><div class="custom-form-block"></div>"#,
		);
		let link = unclaimed(&tree, tree.root(), MarkerKind::CheckoutLink)[0];
		let form = unclaimed(&tree, tree.root(), MarkerKind::FormWidget)[0];
		claim(&tree, link, MarkerKind::CheckoutLink);
		claim(&tree, link, MarkerKind::TrackedLink);
		claim(&tree, form, MarkerKind::FormWidget);
		assert_eq!(unclaim_all(&tree), 3);
		assert_eq!(unclaimed(&tree, tree.root(), MarkerKind::TrackedLink), vec![link]);
		assert_eq!(unclaim_all(&tree), 0);
	}

	#[rstest]
	fn test_flags_are_scoped_per_kind() {
		let tree = MemoryTree::from_markup(
			r#"<a class="product-item-link" data-product-id="p1" href="https://buy.example">Buy</a>"#,
		);
		let node = unclaimed(&tree, tree.root(), MarkerKind::CheckoutLink)[0];
		assert!(claim(&tree, node, MarkerKind::CheckoutLink));
		assert_eq!(unclaimed(&tree, tree.root(), MarkerKind::TrackedLink), vec![node]);
	}

	#[rstest]
	#[case(r#"<a href="https://x.com">x</a>"#, 1)]
	#[case(r#"<a href="/shop">x</a>"#, 1)]
	#[case(r#"<a href="mailto:me@x.com">x</a>"#, 0)]
	#[case(r#"<a href="javascript:void(0)">x</a>"#, 0)]
	#[case(r#"<a>x</a>"#, 0)]
	fn test_tracked_link_selector(#[case] markup: &str, #[case] expected: usize) {
		let tree = MemoryTree::from_markup(markup);
		assert_eq!(
			tree.query(tree.root(), &MarkerKind::TrackedLink.selector()).len(),
			expected
		);
	}

	#[rstest]
	fn test_config_attr_trims_and_rejects_blank() {
		let tree = MemoryTree::from_markup(r#"<div data-username="  ana " data-url=" "></div>"#);
		let node = tree.query(tree.root(), &Selector::tag("div"))[0];
		assert_eq!(config_attr(&tree, node, ATTR_USERNAME).as_deref(), Some("ana"));
		assert_eq!(config_attr(&tree, node, ATTR_URL), None);
		assert_eq!(config_attr(&tree, node, ATTR_TITLE), None);
	}
}
