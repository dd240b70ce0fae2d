//! Network contracts consumed by the activators.
//!
//! Only request/response shapes live here. [`BioApi`] is the seam the
//! engine talks to; [`HttpApi`] implements it over `reqwest`.

mod http;
mod types;

pub use http::HttpApi;
pub use types::{
	BlogPost, Booking, BookingRequest, BookingSettings, CheckoutLink, FeedItem, ListResponse,
	PageEvent, Product, TrackEvent, TrackKind, WrappedList,
};

use crate::error::ApiError;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Public bio endpoints.
///
/// Futures are `?Send`: every call is awaited on the page's single
/// cooperative queue.
#[async_trait(?Send)]
pub trait BioApi {
	/// `GET /public/instagram/{handle}`
	async fn instagram_posts(&self, handle: &str) -> Result<Vec<FeedItem>, ApiError>;

	/// `GET /public/youtube/fetch?url={url}`
	async fn youtube_videos(&self, url: &str) -> Result<Vec<FeedItem>, ApiError>;

	/// `GET /blog/{bio_id}?publicView=true`
	async fn card_posts(&self, bio_id: &str) -> Result<Vec<BlogPost>, ApiError>;

	/// `GET /public/blog/{bio_id}`
	async fn blog_posts(&self, bio_id: &str) -> Result<Vec<BlogPost>, ApiError>;

	/// `GET /public/products/{bio_id}`
	async fn products(&self, bio_id: &str) -> Result<Vec<Product>, ApiError>;

	/// `POST /public/stripe/generate-product-link`
	async fn checkout_link(&self, product_id: &str, bio_id: &str)
	-> Result<CheckoutLink, ApiError>;

	/// `POST /public/email/subscribe/{bio_id}`
	async fn subscribe(&self, bio_id: &str, email: &str) -> Result<(), ApiError>;

	/// `POST /public/events/{bio_id}`
	async fn post_event(&self, bio_id: &str, event: &PageEvent) -> Result<(), ApiError>;

	/// `POST /public/track`
	async fn track(&self, event: &TrackEvent) -> Result<(), ApiError>;

	/// `GET /public/bookings/{bio_id}/settings`
	async fn booking_settings(&self, bio_id: &str) -> Result<BookingSettings, ApiError>;

	/// `GET /public/bookings/{bio_id}/slots?date=YYYY-MM-DD`
	async fn booking_slots(&self, bio_id: &str, date: NaiveDate) -> Result<Vec<String>, ApiError>;

	/// `POST /public/bookings/{bio_id}/book`
	async fn book(&self, bio_id: &str, request: &BookingRequest) -> Result<(), ApiError>;

	/// `GET /public/bookings/manage/{token}`
	async fn booking(&self, token: &str) -> Result<Booking, ApiError>;

	/// `POST /public/bookings/confirm/{token}`
	async fn confirm_booking(&self, token: &str) -> Result<(), ApiError>;

	/// `POST /public/bookings/cancel/{token}`
	async fn cancel_booking(&self, token: &str, reason: &str) -> Result<(), ApiError>;

	/// `POST /public/bookings/reschedule/{token}`
	async fn reschedule_booking(
		&self,
		token: &str,
		date: NaiveDate,
		time: &str,
	) -> Result<(), ApiError>;
}
