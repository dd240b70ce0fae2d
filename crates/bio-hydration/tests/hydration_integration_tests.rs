//! Hydration Integration Tests
//!
//! Mounts the engine over authored pages and drives it through the virtual
//! clock the way a browser would: scans, mutation bursts, timers, clicks and
//! teardown.
//!
//! Test Categories:
//! - Category 1: Activation of a complete page
//! - Category 2: Idempotence and scan scheduling
//! - Category 3: Per-feature scenarios
//! - Category 4: Teardown and remount

mod utils;

use bio_hydration::testing::Harness;
use bio_hydration::{ApiError, BioPage, ContentTree, Host, HydrationError, Selector, View};
use rstest::rstest;
use serial_test::serial;
use std::rc::Rc;
use utils::{WIDGET_REGIONS, advance_ms, all, first, full_page, mounted, settle};

fn append_link(harness: &Harness, href: &str) {
	let feed = harness.tree.find_by_id("links-feed").unwrap();
	harness.tree.append_view(
		feed,
		View::element("a").attr("href", href.to_string()).child("more").into(),
	);
}

// ============================================================================
// Category 1: Activation of a complete page
// ============================================================================

/// Every marker kind on the page is picked up by the first scan and its
/// asynchronous content lands once the tasks run
#[rstest]
#[serial]
fn test_full_page_activates_every_marker() {
	let harness = full_page();
	let engine = harness.engine();
	let report = engine.mount().unwrap();
	assert!(report.claimed > 0);
	assert_eq!(report.failures, 0);
	settle(&harness);

	// countdown slots are filled in place; settling moved the clock past the
	// 31 day mark, so 30 full days remain
	let days = first(&harness, &Selector::class("days"));
	assert_eq!(harness.tree.text(days), "30");

	// feeds replaced their skeletons
	assert!(all(&harness, &Selector::class("feed-skeleton")).is_empty());
	assert_eq!(all(&harness, &Selector::class("feed-item")).len(), 2);
	assert_eq!(all(&harness, &Selector::class("blog-card")).len(), 2);

	// widget regions went to the mounter
	assert_eq!(harness.mounter.mounted().len(), WIDGET_REGIONS);

	// a visit and a view were recorded
	assert_eq!(harness.api.calls_to("post_event"), 1);
	assert_eq!(harness.api.calls_to("track"), 1);
	engine.unmount().unwrap();
}

/// Rendering a page through the sanitizer gives the same activation as
/// mounting over pre-inserted markup
#[rstest]
#[serial]
fn test_bio_page_renders_and_hydrates() {
	let harness = Harness::new("");
	let page = BioPage::new(
		harness.engine(),
		harness.tree.root(),
		Rc::new(bio_hydration::testing::PassthroughSanitizer),
	);
	let report = page.render(utils::FULL_PAGE).unwrap().unwrap();
	assert!(report.claimed > 0);
	harness.host.run_until_stalled();
	assert_eq!(harness.api.calls_to("instagram_posts"), 1);

	assert_eq!(page.render(utils::FULL_PAGE).unwrap(), None);
	harness.host.run_until_stalled();
	assert_eq!(harness.api.calls_to("instagram_posts"), 1);
	page.unmount().unwrap();
}

// ============================================================================
// Category 2: Idempotence and scan scheduling
// ============================================================================

/// Repeated scans and safety ticks never duplicate listeners or requests
#[rstest]
#[serial]
fn test_rescans_add_no_listeners_or_requests() {
	let harness = full_page();
	let engine = mounted(&harness);
	settle(&harness);
	let listeners = harness.tree.listener_count();
	let calls = harness.api.calls().len();

	for _ in 0..5 {
		let report = engine.scan_now().unwrap();
		assert_eq!(report.claimed, 0);
	}
	// several safety ticks
	advance_ms(&harness, 60_000);
	harness.host.run_until_stalled();

	assert_eq!(harness.tree.listener_count(), listeners);
	assert_eq!(harness.api.calls().len(), calls);
	assert_eq!(harness.mounter.mounted().len(), WIDGET_REGIONS);
	engine.unmount().unwrap();
}

/// A burst of mutations inside the debounce window leads to one scan
#[rstest]
#[serial]
fn test_mutation_burst_coalesces_into_one_scan() {
	let harness = Harness::new(r#"<div id="links-feed"></div>"#);
	let engine = mounted(&harness);
	advance_ms(&harness, 2_000);
	let before = engine.scan_stats().unwrap();

	for i in 0..10 {
		append_link(&harness, &format!("https://ana.example/{}", i));
		advance_ms(&harness, 15);
	}
	assert_eq!(harness.tree.listener_count(), 0);

	advance_ms(&harness, 180);
	let after = engine.scan_stats().unwrap();
	assert_eq!(after.scans, before.scans + 1);
	assert_eq!(after.notifications, before.notifications + 10);
	assert_eq!(harness.tree.listener_count(), 10);
	engine.unmount().unwrap();
}

/// A feed that keeps growing faster than the debounce window is still
/// scanned regularly, and new links are wired while it grows
#[rstest]
#[serial]
fn test_continuous_mutations_do_not_starve_scans() {
	let harness = Harness::new(r#"<div id="links-feed"></div>"#);
	let engine = mounted(&harness);
	advance_ms(&harness, 2_000);
	let before = engine.scan_stats().unwrap();

	for i in 0..100 {
		append_link(&harness, &format!("https://ana.example/{}", i));
		advance_ms(&harness, 100);
	}
	let during = engine.scan_stats().unwrap().scans - before.scans;
	assert!(during >= 6, "only {} scans while the feed kept growing", during);
	// links older than one debounce plus one minimum interval are wired
	assert!(harness.tree.listener_count() >= 86);

	settle(&harness);
	assert_eq!(harness.tree.listener_count(), 100);
	engine.unmount().unwrap();
}

/// A mutation right after a scan is deferred to one trailing scan
#[rstest]
#[serial]
fn test_early_mutation_gets_a_trailing_scan() {
	let harness = Harness::new(r#"<div id="links-feed"></div>"#);
	let engine = mounted(&harness);

	append_link(&harness, "https://ana.example/late");
	advance_ms(&harness, 1_100);
	assert_eq!(harness.tree.listener_count(), 0);
	assert_eq!(engine.scan_stats().unwrap().scans, 1);

	advance_ms(&harness, 150);
	assert_eq!(harness.tree.listener_count(), 1);
	assert_eq!(engine.scan_stats().unwrap().scans, 2);
	engine.unmount().unwrap();
}

// ============================================================================
// Category 3: Per-feature scenarios
// ============================================================================

/// A countdown 90 seconds out shows the remaining time, reaches its terminal
/// state and stops ticking
#[rstest]
#[serial]
fn test_countdown_runs_to_completion() {
	let harness = Harness::new(r#"<div class="countdown-timer" data-date="2025-01-01T00:01:30Z"></div>"#);
	let engine = mounted(&harness);
	let node = first(&harness, &Selector::class("countdown-timer"));
	assert_eq!(harness.tree.text(node), "0d 0h 1m 30s");

	advance_ms(&harness, 31_000);
	assert_eq!(harness.tree.text(node), "0d 0h 0m 59s");

	advance_ms(&harness, 60_000);
	assert_eq!(harness.tree.text(node), "Event Started");
	assert_eq!(all(&harness, &Selector::class("countdown-finished")).len(), 1);

	// only the safety tick is left once the last rescan has run
	advance_ms(&harness, 4_000);
	assert_eq!(harness.host.active_timers(), 1);

	advance_ms(&harness, 30_000);
	assert_eq!(harness.tree.text(node), "Event Started");
	engine.unmount().unwrap();
	assert_eq!(harness.host.active_timers(), 0);
}

/// Slot children are filled with padded values
#[rstest]
#[serial]
fn test_countdown_fills_slots() {
	let harness = Harness::new(
		r#"<div class="countdown-timer" data-date="2025-01-01T00:01:30Z">
			<b class="days"></b><b class="hours"></b><b class="minutes"></b><b class="seconds"></b>
		</div>"#,
	);
	let engine = mounted(&harness);
	let slots: Vec<String> = ["days", "hours", "minutes", "seconds"]
		.into_iter()
		.map(|class| harness.tree.text(first(&harness, &Selector::class(class))))
		.collect();
	assert_eq!(slots, vec!["00", "00", "01", "30"]);
	engine.unmount().unwrap();
}

/// A failing feed shows its error once and is never requested again
#[rstest]
#[serial]
fn test_feed_failure_renders_error_without_retry() {
	let harness = Harness::new(r#"<div class="custom-instagram-feed" data-username="ana"></div>"#);
	harness.api.set_instagram(Err(ApiError::Transport("offline".into())));
	let engine = mounted(&harness);
	assert_eq!(all(&harness, &Selector::class("feed-skeleton-item")).len(), 3);

	settle(&harness);
	let node = first(&harness, &Selector::class("custom-instagram-feed"));
	assert_eq!(harness.tree.text(node), "Error loading posts");
	assert!(all(&harness, &Selector::class("feed-skeleton")).is_empty());

	engine.scan_now().unwrap();
	advance_ms(&harness, 20_000);
	harness.host.run_until_stalled();
	assert_eq!(harness.api.calls_to("instagram_posts"), 1);
	engine.unmount().unwrap();
}

/// Two quick clicks on a checkout link issue one request, and the link is
/// usable again once it completes
#[rstest]
#[serial]
fn test_checkout_double_click_issues_one_request() {
	let harness = full_page();
	let pending = harness.api.hold_checkout();
	let engine = mounted(&harness);
	let link = first(&harness, &Selector::class("product-item-link"));

	harness.tree.click(link);
	harness.tree.click(link);
	harness.host.run_until_stalled();
	assert_eq!(harness.api.calls_to("checkout_link"), 1);
	assert_eq!(harness.tree.attr(link, "aria-disabled").as_deref(), Some("true"));

	pending.resolve(Ok(bio_hydration::api::CheckoutLink {
		url: "https://checkout.example/s/1".into(),
	}));
	harness.host.run_until_stalled();
	assert_eq!(harness.tree.attr(link, "aria-disabled"), None);
	assert_eq!(harness.browser.popups().len(), 1);

	harness.tree.click(link);
	harness.host.run_until_stalled();
	assert_eq!(harness.api.calls_to("checkout_link"), 2);
	engine.unmount().unwrap();
}

/// A refused widget mount is retried by the next scan
#[rstest]
#[serial]
fn test_refused_widget_is_retried() {
	let harness = full_page();
	harness.mounter.fail_next(1);
	let engine = harness.engine();
	let report = engine.mount().unwrap();
	assert_eq!(report.failures, 1);
	assert_eq!(harness.mounter.mounted().len(), WIDGET_REGIONS - 1);

	engine.scan_now().unwrap();
	assert_eq!(harness.mounter.mounted().len(), WIDGET_REGIONS);
	engine.unmount().unwrap();
	assert_eq!(harness.mounter.unmounted(), WIDGET_REGIONS);
}

/// Instagram embeds get Instagram's script on a live page, never in preview
#[rstest]
#[case(false, 1)]
#[case(true, 0)]
#[serial]
fn test_instagram_embeds_load_script_outside_preview(#[case] preview: bool, #[case] scripts: usize) {
	let harness = Harness::new(
		r#"<div id="links-feed"><blockquote class="instagram-media" data-instgrm-permalink="https://www.instagram.com/p/1/"></blockquote></div>"#,
	)
	.with_config(|c| c.with_preview(preview));
	let engine = mounted(&harness);
	assert_eq!(harness.browser.scripts().len(), scripts);

	harness.browser.set_embeds_ready(true);
	harness.browser.finish_script(bio_hydration::activators::EMBED_SCRIPT_ID);
	assert_eq!(harness.browser.embed_passes(), scripts);

	// rescans do not add a second script
	engine.scan_now().unwrap();
	assert_eq!(harness.browser.scripts().len(), scripts);
	engine.unmount().unwrap();
}

// ============================================================================
// Category 4: Teardown and remount
// ============================================================================

/// Unmount releases every handle, and work still in flight leaves the page
/// untouched when it completes
#[rstest]
#[serial]
fn test_unmount_releases_everything() {
	let harness = full_page();
	let feed = harness.api.hold_instagram();
	let checkout = harness.api.hold_checkout();
	let engine = mounted(&harness);
	harness.tree.click(first(&harness, &Selector::class("product-item-link")));
	harness.host.run_until_stalled();

	engine.unmount().unwrap();
	assert_eq!(harness.tree.listener_count(), 0);
	assert_eq!(harness.tree.observer_count(), 0);
	assert_eq!(harness.host.active_timers(), 0);
	assert_eq!(harness.browser.popstate_subscribers(), 0);
	assert_eq!(harness.mounter.unmounted(), WIDGET_REGIONS);
	assert!(bio_hydration::facade::current().is_none());
	assert!(all(&harness, &Selector::has_attr("data-countdown-initialized")).is_empty());

	feed.resolve(Ok(vec![bio_hydration::testing::feed_item("https://instagram.com/p/9")]));
	checkout.resolve(Ok(bio_hydration::api::CheckoutLink {
		url: "https://checkout.example/s/9".into(),
	}));
	harness.host.run_until_stalled();
	assert_eq!(all(&harness, &Selector::class("feed-skeleton")).len(), 1);
	assert!(all(&harness, &Selector::class("feed-item")).is_empty());
	assert!(harness.browser.popups().is_empty());

	assert!(matches!(engine.unmount(), Err(HydrationError::NotMounted)));
}

/// A remount over the same tree activates it again from scratch
#[rstest]
#[serial]
fn test_remount_activates_again() {
	let harness = full_page();
	let engine = harness.engine();
	let first_report = engine.mount().unwrap();
	let listeners = harness.tree.listener_count();
	engine.unmount().unwrap();

	let second_report = engine.mount().unwrap();
	assert_eq!(second_report.claimed, first_report.claimed);
	assert_eq!(harness.tree.listener_count(), listeners);
	assert_eq!(harness.mounter.mounted().len(), 2 * WIDGET_REGIONS);
	engine.unmount().unwrap();
}
