//! Error types for the hydration engine.
//!
//! Nothing in this crate is fatal to the hosting page. Errors are either
//! rendered in place (feeds), surfaced to the visitor (checkout, subscribe),
//! or logged by the scan loop and skipped.

/// Errors produced by the network layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
	/// The server answered with a non-success status.
	#[error("HTTP {status}: {}", message.as_deref().unwrap_or("request failed"))]
	Http {
		/// Status code of the response.
		status: u16,
		/// `message` field of the response body, when present.
		message: Option<String>,
	},

	/// The request never produced a response.
	#[error("Transport error: {0}")]
	Transport(String),

	/// The response body did not match the expected shape.
	#[error("Failed to decode response: {0}")]
	Decode(String),

	/// The request URL could not be built.
	#[error("Invalid request URL: {0}")]
	InvalidUrl(String),
}

impl ApiError {
	/// Returns the HTTP status, if the server answered.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Http { status, .. } => Some(*status),
			_ => None,
		}
	}

	/// Returns true for `409 Conflict`.
	pub fn is_conflict(&self) -> bool {
		self.status() == Some(409)
	}

	/// Returns the server supplied message, if any.
	pub fn user_message(&self) -> Option<&str> {
		match self {
			Self::Http {
				message: Some(message),
				..
			} if !message.trim().is_empty() => Some(message.as_str()),
			_ => None,
		}
	}
}

/// Errors returned synchronously by a feature activator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActivationError {
	/// A required configuration attribute is absent.
	#[error("{marker}: missing attribute '{attribute}'")]
	MissingConfig {
		/// Marker kind name.
		marker: &'static str,
		/// Attribute that was expected.
		attribute: &'static str,
	},

	/// A configuration attribute could not be interpreted.
	#[error("{marker}: invalid value '{value}' for attribute '{attribute}'")]
	InvalidConfig {
		/// Marker kind name.
		marker: &'static str,
		/// Attribute that was read.
		attribute: &'static str,
		/// Raw attribute value.
		value: String,
	},

	/// The out-of-band widget could not be mounted.
	#[error("Widget mount failed: {0}")]
	MountFailed(String),

	/// A synchronous network call failed.
	#[error(transparent)]
	Api(#[from] ApiError),
}

/// Errors reported by the engine and its hosting glue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HydrationError {
	/// `mount` was called on an engine that is already mounted.
	#[error("Hydration engine is already mounted")]
	AlreadyMounted,

	/// The operation needs a mounted engine.
	#[error("Hydration engine is not mounted")]
	NotMounted,

	/// The configuration failed validation.
	#[error("Invalid configuration: {0}")]
	Config(String),

	/// Markup could not be inserted into the content tree.
	#[error("Failed to insert markup: {0}")]
	Markup(String),

	/// An activator failed during a scan pass.
	#[error("Activator '{activator}' failed: {source}")]
	Activation {
		/// Name of the failing activator.
		activator: &'static str,
		/// Underlying failure.
		#[source]
		source: ActivationError,
	},
}
