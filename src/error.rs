//! Client-level error types shared by the token cache, dispatcher, and decode contract.
//!
//! Callers classify failures through the helper methods on [`Error`] (or by matching on the
//! variants) rather than inspecting rendered messages.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The call context was cancelled by its owner.
	#[error("Call was cancelled.")]
	Cancelled,
	/// The call context deadline elapsed.
	#[error("Call deadline elapsed.")]
	DeadlineExceeded,
	/// The credential exchange failed while minting a bearer token.
	#[error("Token refresh failed.")]
	TokenRefresh {
		/// Failure reported by the credential exchange.
		#[source]
		source: Box<Error>,
	},
	/// The server kept answering 429 until the retry budget ran out.
	#[error(transparent)]
	RateLimited(#[from] RateLimitError),
	/// The server answered with a non-success status.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// A success response body did not match the expected shape.
	#[error(transparent)]
	Decode(#[from] DecodeError),
}
impl Error {
	/// Wraps a credential exchange failure, keeping cancellation unwrapped.
	pub fn token_refresh(source: Error) -> Self {
		match source {
			Self::Cancelled | Self::DeadlineExceeded => source,
			source => Self::TokenRefresh { source: Box::new(source) },
		}
	}

	/// Returns `true` when the retry budget was exhausted on 429 responses.
	pub fn is_rate_limited(&self) -> bool {
		matches!(self, Self::RateLimited(_))
	}

	/// Returns `true` when the server answered with a non-success status.
	pub fn is_api_error(&self) -> bool {
		matches!(self, Self::Api(_))
	}

	/// Returns `true` when the call context was cancelled or its deadline elapsed.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled | Self::DeadlineExceeded)
	}

	/// Returns `true` when minting a bearer token failed.
	pub fn is_token_refresh(&self) -> bool {
		matches!(self, Self::TokenRefresh { .. })
	}

	/// Returns `true` for transport-level failures.
	pub fn is_transport(&self) -> bool {
		matches!(self, Self::Transport(_))
	}

	/// Borrows the [`ApiError`] payload, if any.
	pub fn as_api_error(&self) -> Option<&ApiError> {
		match self {
			Self::Api(err) => Some(err),
			_ => None,
		}
	}

	/// Borrows the [`RateLimitError`] payload, if any.
	pub fn as_rate_limit(&self) -> Option<&RateLimitError> {
		match self {
			Self::RateLimited(err) => Some(err),
			_ => None,
		}
	}

	/// Last Retry-After hint observed before the retry budget ran out.
	pub fn retry_after(&self) -> Option<Duration> {
		self.as_rate_limit().map(|err| err.retry_after)
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] http::Error),
	/// Base URL cannot be parsed.
	#[error("Base URL `{url}` is invalid.")]
	InvalidBaseUrl {
		/// Rejected URL string.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request path does not form a valid URL against the base URL.
	#[error("Request path `{path}` does not form a valid URL.")]
	InvalidPath {
		/// Rejected request path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A header value contains bytes HTTP does not allow.
	#[error("Header value is invalid.")]
	InvalidHeader(#[from] http::header::InvalidHeaderValue),
	/// Authenticated request issued through a dispatcher without a token cache.
	#[error("Authenticated request requires a token cache.")]
	MissingTokenCache,
	/// Requested token validity is outside the supported range.
	#[error("Token validity {validity} must be positive and at most {max}.")]
	InvalidValidity {
		/// Rejected validity.
		validity: Duration,
		/// Largest validity the server accepts.
		max: Duration,
	},
	/// Token could not be built from the exchange response.
	#[error("Unable to build token.")]
	TokenBuild(#[from] crate::auth::TokenBuildError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client gave up waiting for the server.
	#[error("Request timed out while calling the API.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}

/// Retry budget exhausted while the server kept answering 429.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Rate limit exceeded after {attempts} attempts; retry after {retry_after}.")]
pub struct RateLimitError {
	/// Last Retry-After hint, so callers can apply their own backoff.
	pub retry_after: Duration,
	/// Transport calls made before giving up.
	pub attempts: u32,
}

/// Non-success response returned by the API.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("API error (status {status}): {body}")]
pub struct ApiError {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body, decoded lossily as UTF-8.
	pub body: String,
}

/// Success response whose body could not be parsed into the expected shape.
#[derive(Debug, ThisError)]
#[error("Failed to decode response body (status {status}).")]
pub struct DecodeError {
	/// Structured parsing failure including the JSON path.
	#[source]
	pub source: serde_path_to_error::Error<serde_json::Error>,
	/// HTTP status code of the response.
	pub status: u16,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn token_refresh_keeps_cancellation_unwrapped() {
		assert!(matches!(Error::token_refresh(Error::Cancelled), Error::Cancelled));
		assert!(matches!(Error::token_refresh(Error::DeadlineExceeded), Error::DeadlineExceeded));

		let wrapped = Error::token_refresh(ApiError { status: 401, body: "nope".into() }.into());

		assert!(wrapped.is_token_refresh());
		assert!(!wrapped.is_api_error());
	}

	#[test]
	fn classification_helpers_match_variants() {
		let rate_limited =
			Error::from(RateLimitError { retry_after: Duration::seconds(2), attempts: 3 });

		assert!(rate_limited.is_rate_limited());
		assert!(!rate_limited.is_api_error());
		assert_eq!(rate_limited.retry_after(), Some(Duration::seconds(2)));

		let api = Error::from(ApiError { status: 404, body: "missing".into() });

		assert!(api.is_api_error());
		assert!(!api.is_rate_limited());
		assert_eq!(api.as_api_error().map(|err| err.status), Some(404));
		assert_eq!(api.to_string(), "API error (status 404): missing");
	}
}
