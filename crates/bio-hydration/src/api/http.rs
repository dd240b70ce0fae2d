//! `reqwest` implementation of [`BioApi`].

use super::BioApi;
use super::types::{
	BlogPost, Booking, BookingRequest, BookingSettings, CancelRequest, CheckoutLink,
	CheckoutRequest, ErrorBody, FeedItem, ListResponse, PageEvent, Product, RescheduleRequest,
	SlotsResponse, SubscribeRequest, TrackEvent,
};
use crate::config::normalize_base_url;
use crate::error::ApiError;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

/// HTTP client for the public bio endpoints.
#[derive(Debug, Clone)]
pub struct HttpApi {
	client: reqwest::Client,
	base_url: String,
}

impl HttpApi {
	/// Creates a client for `base_url` (normalized to end in `/api`).
	pub fn new(base_url: &str) -> Self {
		Self::with_client(reqwest::Client::new(), base_url)
	}

	/// Creates a client reusing an existing `reqwest::Client`.
	pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
		Self {
			client,
			base_url: normalize_base_url(base_url),
		}
	}

	/// Base URL every path is appended to.
	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	/// Builds the URL of `segments` plus `query`, percent-encoding each segment.
	pub fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, ApiError> {
		let mut url =
			Url::parse(&self.base_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
		url.path_segments_mut()
			.map_err(|_| ApiError::InvalidUrl(self.base_url.clone()))?
			.pop_if_empty()
			.extend(segments);
		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(query);
		}
		Ok(url)
	}

	async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
		let request = self.client.get(url);
		#[cfg(target_arch = "wasm32")]
		let request = request.fetch_credentials_include();
		let response = request
			.send()
			.await
			.map_err(|e| ApiError::Transport(e.to_string()))?;
		read_json(response).await
	}

	async fn post<B: Serialize + ?Sized>(
		&self,
		url: Url,
		body: Option<&B>,
	) -> Result<reqwest::Response, ApiError> {
		let mut request = self.client.post(url);
		if let Some(body) = body {
			request = request.json(body);
		}
		#[cfg(target_arch = "wasm32")]
		let request = request.fetch_credentials_include();
		request
			.send()
			.await
			.map_err(|e| ApiError::Transport(e.to_string()))
	}

	async fn post_unit<B: Serialize + ?Sized>(
		&self,
		url: Url,
		body: Option<&B>,
	) -> Result<(), ApiError> {
		let response = self.post(url, body).await?;
		let status = response.status().as_u16();
		let body = response
			.bytes()
			.await
			.map_err(|e| ApiError::Transport(e.to_string()))?;
		check_status(status, &body)
	}
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
	let status = response.status().as_u16();
	let body = response
		.bytes()
		.await
		.map_err(|e| ApiError::Transport(e.to_string()))?;
	decode_body(status, &body)
}

/// Maps a non-2xx status to [`ApiError::Http`], keeping the body's `message`.
pub(crate) fn check_status(status: u16, body: &[u8]) -> Result<(), ApiError> {
	if (200..300).contains(&status) {
		return Ok(());
	}
	let message = serde_json::from_slice::<ErrorBody>(body)
		.ok()
		.and_then(|b| b.message);
	Err(ApiError::Http { status, message })
}

pub(crate) fn decode_body<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T, ApiError> {
	check_status(status, body)?;
	serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))
}

const NO_BODY: Option<&()> = None;

#[async_trait(?Send)]
impl BioApi for HttpApi {
	async fn instagram_posts(&self, handle: &str) -> Result<Vec<FeedItem>, ApiError> {
		let url = self.endpoint(&["public", "instagram", handle], &[])?;
		Ok(self.get_json::<ListResponse<FeedItem>>(url).await?.into_items())
	}

	async fn youtube_videos(&self, source: &str) -> Result<Vec<FeedItem>, ApiError> {
		let url = self.endpoint(&["public", "youtube", "fetch"], &[("url", source)])?;
		Ok(self.get_json::<ListResponse<FeedItem>>(url).await?.into_items())
	}

	async fn card_posts(&self, bio_id: &str) -> Result<Vec<BlogPost>, ApiError> {
		let url = self.endpoint(&["blog", bio_id], &[("publicView", "true")])?;
		Ok(self.get_json::<ListResponse<BlogPost>>(url).await?.into_items())
	}

	async fn blog_posts(&self, bio_id: &str) -> Result<Vec<BlogPost>, ApiError> {
		let url = self.endpoint(&["public", "blog", bio_id], &[])?;
		Ok(self.get_json::<ListResponse<BlogPost>>(url).await?.into_items())
	}

	async fn products(&self, bio_id: &str) -> Result<Vec<Product>, ApiError> {
		let url = self.endpoint(&["public", "products", bio_id], &[])?;
		Ok(self.get_json::<ListResponse<Product>>(url).await?.into_items())
	}

	async fn checkout_link(
		&self,
		product_id: &str,
		bio_id: &str,
	) -> Result<CheckoutLink, ApiError> {
		let url = self.endpoint(&["public", "stripe", "generate-product-link"], &[])?;
		let body = CheckoutRequest { product_id, bio_id };
		let response = self.post(url, Some(&body)).await?;
		read_json(response).await
	}

	async fn subscribe(&self, bio_id: &str, email: &str) -> Result<(), ApiError> {
		let url = self.endpoint(&["public", "email", "subscribe", bio_id], &[])?;
		self.post_unit(url, Some(&SubscribeRequest { email })).await
	}

	async fn post_event(&self, bio_id: &str, event: &PageEvent) -> Result<(), ApiError> {
		let url = self.endpoint(&["public", "events", bio_id], &[])?;
		self.post_unit(url, Some(event)).await
	}

	async fn track(&self, event: &TrackEvent) -> Result<(), ApiError> {
		let url = self.endpoint(&["public", "track"], &[])?;
		self.post_unit(url, Some(event)).await
	}

	async fn booking_settings(&self, bio_id: &str) -> Result<BookingSettings, ApiError> {
		let url = self.endpoint(&["public", "bookings", bio_id, "settings"], &[])?;
		self.get_json(url).await
	}

	async fn booking_slots(&self, bio_id: &str, date: NaiveDate) -> Result<Vec<String>, ApiError> {
		let date = date.format("%Y-%m-%d").to_string();
		let url = self.endpoint(&["public", "bookings", bio_id, "slots"], &[("date", &date)])?;
		Ok(self.get_json::<SlotsResponse>(url).await?.slots)
	}

	async fn book(&self, bio_id: &str, request: &BookingRequest) -> Result<(), ApiError> {
		let url = self.endpoint(&["public", "bookings", bio_id, "book"], &[])?;
		self.post_unit(url, Some(request)).await
	}

	async fn booking(&self, token: &str) -> Result<Booking, ApiError> {
		let url = self.endpoint(&["public", "bookings", "manage", token], &[])?;
		self.get_json(url).await
	}

	async fn confirm_booking(&self, token: &str) -> Result<(), ApiError> {
		let url = self.endpoint(&["public", "bookings", "confirm", token], &[])?;
		self.post_unit(url, NO_BODY).await
	}

	async fn cancel_booking(&self, token: &str, reason: &str) -> Result<(), ApiError> {
		let url = self.endpoint(&["public", "bookings", "cancel", token], &[])?;
		self.post_unit(url, Some(&CancelRequest { reason })).await
	}

	async fn reschedule_booking(
		&self,
		token: &str,
		date: NaiveDate,
		time: &str,
	) -> Result<(), ApiError> {
		let url = self.endpoint(&["public", "bookings", "reschedule", token], &[])?;
		let body = RescheduleRequest {
			date,
			time,
			self_reschedule: true,
		};
		self.post_unit(url, Some(&body)).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_endpoint_paths() {
		let api = HttpApi::new("https://api.portyo.me/");
		assert_eq!(api.base_url(), "https://api.portyo.me/api");
		assert_eq!(
			api.endpoint(&["public", "instagram", "ana.costa"], &[]).unwrap().as_str(),
			"https://api.portyo.me/api/public/instagram/ana.costa"
		);
		assert_eq!(
			api.endpoint(&["blog", "b1"], &[("publicView", "true")]).unwrap().as_str(),
			"https://api.portyo.me/api/blog/b1?publicView=true"
		);
	}

	#[rstest]
	fn test_endpoint_encodes_segments_and_query() {
		let api = HttpApi::new("http://localhost:3000");
		let url = api
			.endpoint(
				&["public", "youtube", "fetch"],
				&[("url", "https://youtube.com/@chan?x=1&y=2")],
			)
			.unwrap();
		assert_eq!(
			url.as_str(),
			"http://localhost:3000/api/public/youtube/fetch?url=https%3A%2F%2Fyoutube.com%2F%40chan%3Fx%3D1%26y%3D2"
		);
		let url = api.endpoint(&["public", "instagram", "a/b"], &[]).unwrap();
		assert_eq!(url.path(), "/api/public/instagram/a%2Fb");
	}

	#[rstest]
	#[case(200, br#"[]"#.as_slice(), None)]
	#[case(409, br#"{"message":"Already subscribed"}"#.as_slice(), Some((409, Some("Already subscribed"))))]
	#[case(500, b"<html>oops</html>".as_slice(), Some((500, None)))]
	fn test_check_status(
		#[case] status: u16,
		#[case] body: &[u8],
		#[case] expected: Option<(u16, Option<&str>)>,
	) {
		let result = check_status(status, body);
		match expected {
			None => assert!(result.is_ok()),
			Some((code, message)) => assert_eq!(
				result,
				Err(ApiError::Http {
					status: code,
					message: message.map(str::to_string),
				})
			),
		}
	}

	#[rstest]
	fn test_decode_body_reports_shape_errors() {
		let result = decode_body::<ListResponse<FeedItem>>(200, br#"{"unexpected": true}"#);
		assert!(matches!(result, Err(ApiError::Decode(_))));
	}
}
