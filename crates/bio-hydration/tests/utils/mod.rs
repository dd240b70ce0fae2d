//! Shared fixtures for the integration tests
//!
//! Provides a page that carries every marker the engine understands, plus
//! helpers to mount an engine over it and let the virtual clock settle.

#![allow(dead_code)]

use bio_hydration::testing::{Harness, blog_post, feed_item};
use bio_hydration::{ContentTree, HydrationEngine, NodeId, Selector};
use std::time::Duration;

/// A bio page with every kind of marker, laid out under the tab navigation.
pub const FULL_PAGE: &str = r#"
	<nav>
		<button id="tab-links"><span></span>Links</button>
		<button id="tab-blog"><span></span>Blog</button>
		<button id="tab-shop"><span></span>Shop</button>
	</nav>
	<div id="links-feed">
		<a href="https://ana.example/portfolio">Portfolio</a>
		<a href="/ana/blog">Read my blog</a>
		<div class="countdown-timer" data-date="2025-02-01T00:00:00Z">
			<span class="days"></span><span class="hours"></span>
			<span class="minutes"></span><span class="seconds"></span>
		</div>
		<div class="custom-instagram-feed" data-username="ana" data-display-type="grid"></div>
		<div class="custom-blog-feed" data-layout="grid"></div>
		<a class="product-item-link" data-product-id="p1" href="https://portyo.me/p1">Buy</a>
		<div class="custom-booking-block" data-title="Talk to me"></div>
		<div class="custom-form-block" data-form-id="f1"></div>
		<div class="custom-portfolio-block"></div>
		<div class="custom-marketing-block" data-marketing-id="m1"></div>
		<button data-share-url="https://portyo.me/ana" data-share-title="Ana">Share</button>
		<button aria-label="Subscribe">Subscribe</button>
	</div>
	<div id="blog-feed" style="display: none"><div id="blog-posts-container"></div></div>
	<div id="shop-feed" style="display: none"><div id="shop-products-container"></div></div>
	<div id="share-modal" style="display: none">
		<h3 id="share-title"></h3>
		<img id="share-qr">
		<a id="share-twitter"></a><a id="share-facebook"></a>
		<a id="share-whatsapp"></a><a id="share-linkedin"></a>
		<button data-action="copy-share">Copy</button>
		<button data-action="close-share">Close</button>
	</div>
	<div id="subscribe-modal" style="display: none">
		<form id="subscribe-form"><input type="email" value=""><button type="submit">Go</button></form>
		<p id="subscribe-success" style="display: none"></p>
		<button data-action="close-subscribe">Close</button>
	</div>"#;

/// Widget regions in [`FULL_PAGE`].
pub const WIDGET_REGIONS: usize = 4;

/// A harness over [`FULL_PAGE`] with feeds that answer successfully.
pub fn full_page() -> Harness {
	let harness = Harness::new(FULL_PAGE);
	harness.api.set_instagram(Ok(vec![
		feed_item("https://instagram.com/p/1"),
		feed_item("https://instagram.com/p/2"),
	]));
	harness
		.api
		.set_card_posts(Ok(vec![blog_post("1", "First"), blog_post("2", "Second")]));
	harness
}

/// Builds and mounts an engine over the harness.
pub fn mounted(harness: &Harness) -> HydrationEngine {
	let engine = harness.engine();
	engine.mount().unwrap();
	engine
}

/// Runs pending tasks and lets every debounced or deferred scan fire.
pub fn settle(harness: &Harness) {
	harness.host.run_until_stalled();
	harness.host.advance(Duration::from_secs(2));
	harness.host.run_until_stalled();
}

/// First node matching `selector`.
///
/// # Panics
///
/// Panics if nothing matches
pub fn first(harness: &Harness, selector: &Selector) -> NodeId {
	harness
		.tree
		.query_first(harness.tree.root(), selector)
		.unwrap_or_else(|| panic!("no node matches {}", selector.to_css()))
}

/// Every node matching `selector`.
pub fn all(harness: &Harness, selector: &Selector) -> Vec<NodeId> {
	harness.tree.query(harness.tree.root(), selector)
}

/// Advances the virtual clock by `millis`.
pub fn advance_ms(harness: &Harness, millis: u64) {
	harness.host.advance(Duration::from_millis(millis));
}
