//! Engine configuration and page identity.

use crate::error::HydrationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Base URL used when none is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";

/// Tunables for scanning, rendering and tracking.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use bio_hydration::HydrationConfig;
///
/// let config: HydrationConfig =
/// 	serde_json::from_str(r#"{ "api_base_url": "https://api.example.com", "debounce": 150 }"#).unwrap();
/// assert_eq!(config.api_base_url, "https://api.example.com/api");
/// assert_eq!(config.debounce.as_millis(), 150);
/// assert_eq!(config.feed_page_size, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydrationConfig {
	/// Root of every backend request, always ending in `/api`.
	#[serde(deserialize_with = "deserialize_base_url")]
	pub api_base_url: String,
	/// Window, opened by the first mutation notification, that coalesces the
	/// ones arriving before it closes.
	#[serde(with = "duration_ms")]
	pub debounce: Duration,
	/// Minimum distance between two scans.
	#[serde(with = "duration_ms")]
	pub min_scan_interval: Duration,
	/// Period of the fallback scan.
	#[serde(with = "duration_ms")]
	pub safety_interval: Duration,
	/// Countdown refresh period.
	#[serde(with = "duration_ms")]
	pub countdown_tick: Duration,
	/// Number of items rendered by the social feeds.
	pub feed_page_size: usize,
	/// Card lists longer than this render as a rotating stack.
	pub card_stack_threshold: usize,
	/// Number of visible cards in a stack.
	pub stack_visible: usize,
	/// Delay before the subscribe dialog closes after success.
	#[serde(with = "duration_ms")]
	pub subscribe_auto_close: Duration,
	/// Size of the checkout popup window.
	pub checkout_popup: PopupSize,
	/// Maximum length of a tracked link label, in characters.
	pub label_max_chars: usize,
	/// Text and indicator color of the active tab button.
	pub nav_color: String,
	/// Editor preview: tracking and visit events are disabled.
	pub preview: bool,
}

impl Default for HydrationConfig {
	fn default() -> Self {
		Self {
			api_base_url: DEFAULT_API_BASE_URL.to_string(),
			debounce: Duration::from_millis(180),
			min_scan_interval: Duration::from_millis(1200),
			safety_interval: Duration::from_secs(15),
			countdown_tick: Duration::from_secs(1),
			feed_page_size: 3,
			card_stack_threshold: 1,
			stack_visible: 3,
			subscribe_auto_close: Duration::from_secs(2),
			checkout_popup: PopupSize::default(),
			label_max_chars: 100,
			nav_color: "#111827".to_string(),
			preview: false,
		}
	}
}

impl HydrationConfig {
	/// Creates a configuration with default values.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the API base URL. The value is normalized to end in `/api`.
	pub fn with_api_base_url(mut self, url: impl AsRef<str>) -> Self {
		self.api_base_url = normalize_base_url(url.as_ref());
		self
	}

	/// Sets the mutation debounce window.
	pub fn with_debounce(mut self, debounce: Duration) -> Self {
		self.debounce = debounce;
		self
	}

	/// Sets the minimum interval between scans.
	pub fn with_min_scan_interval(mut self, interval: Duration) -> Self {
		self.min_scan_interval = interval;
		self
	}

	/// Sets the safety scan period.
	pub fn with_safety_interval(mut self, interval: Duration) -> Self {
		self.safety_interval = interval;
		self
	}

	/// Sets the number of items rendered by social feeds.
	pub fn with_feed_page_size(mut self, size: usize) -> Self {
		self.feed_page_size = size;
		self
	}

	/// Sets the card count above which lists render as a stack.
	pub fn with_card_stack_threshold(mut self, threshold: usize) -> Self {
		self.card_stack_threshold = threshold;
		self
	}

	/// Enables or disables preview mode.
	pub fn with_preview(mut self, preview: bool) -> Self {
		self.preview = preview;
		self
	}

	/// Checks the values the engine cannot work with.
	pub fn validate(&self) -> Result<(), HydrationError> {
		if self.debounce.is_zero() {
			return Err(HydrationError::Config("debounce must be positive".into()));
		}
		if self.safety_interval.is_zero() {
			return Err(HydrationError::Config(
				"safety_interval must be positive".into(),
			));
		}
		if self.countdown_tick.is_zero() {
			return Err(HydrationError::Config(
				"countdown_tick must be positive".into(),
			));
		}
		if self.feed_page_size == 0 {
			return Err(HydrationError::Config(
				"feed_page_size must be at least 1".into(),
			));
		}
		url::Url::parse(&self.api_base_url)
			.map_err(|e| HydrationError::Config(format!("api_base_url: {}", e)))?;
		Ok(())
	}
}

/// Width and height of a popup window, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupSize {
	/// Window width.
	pub width: u32,
	/// Window height.
	pub height: u32,
}

impl Default for PopupSize {
	fn default() -> Self {
		Self {
			width: 600,
			height: 800,
		}
	}
}

/// Identity of the page being hydrated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
	/// Identifier of the bio that owns the content.
	pub bio_id: String,
	/// Document referrer, when the visitor arrived from elsewhere.
	pub referrer: Option<String>,
	/// Visitor user agent.
	pub user_agent: Option<String>,
}

impl PageContext {
	/// Creates a context for `bio_id`.
	pub fn new(bio_id: impl Into<String>) -> Self {
		Self {
			bio_id: bio_id.into(),
			..Self::default()
		}
	}

	/// Sets the referrer. Blank values are ignored.
	pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
		let referrer = referrer.into();
		self.referrer = (!referrer.trim().is_empty()).then_some(referrer);
		self
	}

	/// Sets the user agent.
	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = Some(user_agent.into());
		self
	}
}

/// Strips trailing slashes and appends `/api` when it is missing.
pub fn normalize_base_url(raw: &str) -> String {
	let trimmed = raw.trim().trim_end_matches('/');
	if trimmed.ends_with("/api") {
		trimmed.to_string()
	} else {
		format!("{}/api", trimmed)
	}
}

fn deserialize_base_url<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: serde::Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;
	Ok(normalize_base_url(&raw))
}

mod duration_ms {
	use serde::{Deserialize, Deserializer, Serializer};
	use std::time::Duration;

	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_u64(value.as_millis() as u64)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		u64::deserialize(deserializer).map(Duration::from_millis)
	}
}
