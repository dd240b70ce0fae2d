//! Request and response payloads of the public bio endpoints.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Accepts string or numeric identifiers.
fn flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Id {
		Text(String),
		Number(i64),
	}
	Ok(match Id::deserialize(deserializer)? {
		Id::Text(s) => s,
		Id::Number(n) => n.to_string(),
	})
}

/// List payloads come either bare or wrapped in an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
	/// `[...]`
	Bare(Vec<T>),
	/// `{"items": [...]}` and its aliases.
	Wrapped(WrappedList<T>),
}

/// Object form of a list payload.
#[derive(Debug, Deserialize)]
pub struct WrappedList<T> {
	/// The items.
	#[serde(alias = "posts", alias = "videos", alias = "products", alias = "data")]
	pub items: Vec<T>,
}

impl<T> ListResponse<T> {
	/// Extracts the items.
	pub fn into_items(self) -> Vec<T> {
		match self {
			Self::Bare(items) => items,
			Self::Wrapped(wrapped) => wrapped.items,
		}
	}
}

/// A social post or video thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
	/// Permalink.
	pub url: String,
	/// Thumbnail image.
	#[serde(default)]
	pub image_url: String,
	/// Title or caption.
	#[serde(default)]
	pub title: Option<String>,
}

/// A blog post rendered as a content card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
	/// Post identifier.
	#[serde(deserialize_with = "flexible_id")]
	pub id: String,
	/// Title.
	pub title: String,
	/// HTML body.
	#[serde(default)]
	pub content: String,
	/// URL slug.
	#[serde(default)]
	pub slug: Option<String>,
	/// Cover image.
	#[serde(default)]
	pub thumbnail: Option<String>,
	/// Publication instant.
	#[serde(default)]
	pub created_at: Option<DateTime<Utc>>,
	/// Tags.
	#[serde(default)]
	pub tags: Vec<String>,
}

/// A shop product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
	/// Product identifier.
	#[serde(deserialize_with = "flexible_id")]
	pub id: String,
	/// Display name.
	pub title: String,
	/// Unit price in major currency units.
	#[serde(default)]
	pub price: f64,
	/// ISO currency code.
	#[serde(default)]
	pub currency: Option<String>,
	/// Primary image.
	#[serde(default)]
	pub image: Option<String>,
	/// Additional images.
	#[serde(default)]
	pub images: Vec<String>,
}

/// One-time checkout URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLink {
	/// Where to send the visitor.
	pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CheckoutRequest<'a> {
	pub product_id: &'a str,
	pub bio_id: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubscribeRequest<'a> {
	pub email: &'a str,
}

/// Booking availability of a bio.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSettings {
	/// Time ranges per weekday key (`sun`..`sat`).
	#[serde(default)]
	pub availability: HashMap<String, Vec<String>>,
	/// Dates that cannot be booked, `YYYY-MM-DD`.
	#[serde(default)]
	pub blocked_dates: Vec<String>,
}

impl BookingSettings {
	/// Whether nothing can be booked on `date`.
	pub fn is_day_unavailable(&self, date: NaiveDate) -> bool {
		use chrono::Datelike;

		if self
			.blocked_dates
			.iter()
			.any(|d| *d == date.format("%Y-%m-%d").to_string())
		{
			return true;
		}
		let key = match date.weekday() {
			chrono::Weekday::Sun => "sun",
			chrono::Weekday::Mon => "mon",
			chrono::Weekday::Tue => "tue",
			chrono::Weekday::Wed => "wed",
			chrono::Weekday::Thu => "thu",
			chrono::Weekday::Fri => "fri",
			chrono::Weekday::Sat => "sat",
		};
		self.availability.get(key).is_none_or(|ranges| ranges.is_empty())
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct SlotsResponse {
	#[serde(default)]
	pub slots: Vec<String>,
}

/// A booking request from the scheduling widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
	/// Day of the appointment.
	pub date: NaiveDate,
	/// Start time, `HH:MM`.
	pub time: String,
	/// Visitor name.
	pub name: String,
	/// Visitor email.
	pub email: String,
	/// Visitor phone.
	#[serde(default)]
	pub phone: Option<String>,
	/// Free-form notes.
	#[serde(default)]
	pub notes: Option<String>,
}

/// A booking as seen through its management token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
	/// Owning bio.
	pub bio_id: String,
	/// Display name of the bio.
	#[serde(default)]
	pub bio_name: Option<String>,
	/// Visitor name.
	#[serde(default)]
	pub customer_name: Option<String>,
	/// Visitor email.
	#[serde(default)]
	pub customer_email: Option<String>,
	/// Scheduled instant.
	#[serde(default)]
	pub booking_date: Option<DateTime<Utc>>,
	/// `pending`, `confirmed`, `cancelled`...
	#[serde(default)]
	pub status: Option<String>,
	/// Notes.
	#[serde(default)]
	pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CancelRequest<'a> {
	pub reason: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RescheduleRequest<'a> {
	pub date: NaiveDate,
	pub time: &'a str,
	pub self_reschedule: bool,
}

/// Interaction events posted to the bio analytics endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "eventType", content = "data", rename_all = "snake_case")]
pub enum PageEvent {
	/// An outbound link was clicked.
	#[serde(rename_all = "camelCase")]
	LinkClick {
		/// Link target.
		url: String,
		/// Truncated link label.
		label: String,
		/// Click instant.
		timestamp: DateTime<Utc>,
	},
	/// First visit of the session.
	#[serde(rename_all = "camelCase")]
	BioVisit {
		/// Referrer, or `direct`.
		referrer: String,
		/// Visitor user agent.
		user_agent: Option<String>,
		/// Visit instant.
		timestamp: DateTime<Utc>,
	},
	/// A tab of the page was shown.
	#[serde(rename_all = "camelCase")]
	PageView {
		/// Path after navigation.
		path: String,
		/// Tab name.
		tab: String,
		/// Navigation instant.
		timestamp: DateTime<Utc>,
	},
}

/// Kind of a generic tracking event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
	/// Page view.
	View,
	/// Link click.
	Click,
}

/// Session-correlated tracking event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEvent {
	/// Owning bio.
	pub bio_id: String,
	/// Document referrer.
	pub referrer: Option<String>,
	/// Session token.
	pub session_id: String,
	/// Event kind.
	#[serde(rename = "type")]
	pub kind: TrackKind,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
	#[serde(default)]
	pub message: Option<String>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case(json!([{"url": "https://i.g/1", "imageUrl": "https://cdn/1.jpg"}]))]
	#[case(json!({"items": [{"url": "https://i.g/1", "imageUrl": "https://cdn/1.jpg"}]}))]
	#[case(json!({"posts": [{"url": "https://i.g/1", "imageUrl": "https://cdn/1.jpg"}]}))]
	fn test_list_response_shapes(#[case] body: serde_json::Value) {
		let items = serde_json::from_value::<ListResponse<FeedItem>>(body)
			.unwrap()
			.into_items();
		assert_eq!(items.len(), 1);
		assert_eq!(items[0].image_url, "https://cdn/1.jpg");
	}

	#[rstest]
	fn test_numeric_ids() {
		let product: Product =
			serde_json::from_value(json!({"id": 42, "title": "Mug", "price": 12.5})).unwrap();
		assert_eq!(product.id, "42");
		assert_eq!(product.currency, None);
	}

	#[rstest]
	fn test_page_event_wire_shape() {
		let ts = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
		let event = PageEvent::LinkClick {
			url: "https://x.com".into(),
			label: "X".into(),
			timestamp: ts,
		};
		assert_eq!(
			serde_json::to_value(&event).unwrap(),
			json!({
				"eventType": "link_click",
				"data": {"url": "https://x.com", "label": "X", "timestamp": "2025-03-01T12:00:00Z"}
			})
		);

		let visit = PageEvent::BioVisit {
			referrer: "direct".into(),
			user_agent: None,
			timestamp: ts,
		};
		let value = serde_json::to_value(&visit).unwrap();
		assert_eq!(value["eventType"], "bio_visit");
		assert!(value["data"].get("userAgent").is_some());
	}

	#[rstest]
	fn test_track_event_wire_shape() {
		let event = TrackEvent {
			bio_id: "b1".into(),
			referrer: None,
			session_id: "s1".into(),
			kind: TrackKind::Click,
		};
		assert_eq!(
			serde_json::to_value(&event).unwrap(),
			json!({"bioId": "b1", "referrer": null, "sessionId": "s1", "type": "click"})
		);
	}

	#[rstest]
	fn test_booking_day_availability() {
		let settings: BookingSettings = serde_json::from_value(json!({
			"availability": {"mon": ["09:00-12:00"], "tue": []},
			"blockedDates": ["2025-03-10"]
		}))
		.unwrap();
		let monday = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
		let tuesday = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
		let blocked_monday = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
		assert!(!settings.is_day_unavailable(monday));
		assert!(settings.is_day_unavailable(tuesday));
		assert!(settings.is_day_unavailable(blocked_monday));
	}

	#[rstest]
	fn test_reschedule_body() {
		let body = RescheduleRequest {
			date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
			time: "10:30",
			self_reschedule: true,
		};
		assert_eq!(
			serde_json::to_value(&body).unwrap(),
			json!({"date": "2025-04-01", "time": "10:30", "selfReschedule": true})
		);
	}
}
