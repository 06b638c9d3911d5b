//! Transport primitives for API calls.
//!
//! [`HttpTransport`] is the client's only dependency on an HTTP stack. The dispatcher hands it
//! fully-built [`HttpRequest`] values (URL, method, headers) and expects an [`HttpResponse`]
//! with the body already buffered, so retry decisions never hold a connection open. Custom
//! transports (test doubles, alternative HTTP stacks) implement the trait and are injected via
//! [`ClientBuilder::transport`](crate::client::ClientBuilder::transport).

// self
use crate::{_prelude::*, error::TransportError};

/// Outbound request handed to an [`HttpTransport`].
pub type HttpRequest = http::Request<Vec<u8>>;
/// Buffered response returned by an [`HttpTransport`].
pub type HttpResponse = http::Response<Vec<u8>>;
/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing API calls.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by the
/// dispatcher, the credential exchange, and any number of concurrent callers. The returned
/// future must be `Send` so client futures can hop executors. Only connection-level failures
/// belong in the error channel; every HTTP status, including 429 and 5xx, is a successful
/// [`HttpResponse`].
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Issues `request` and buffers the full response.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Every request carries a per-request timeout (30 seconds unless overridden). A timeout
/// surfaces as [`TransportError::Timeout`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	timeout: Option<std::time::Duration>,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Per-request timeout applied by [`ReqwestTransport::default`].
	pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self { client, timeout: Some(Self::DEFAULT_TIMEOUT) }
	}

	/// Overrides the per-request timeout; `None` defers to the wrapped client.
	pub fn with_timeout(mut self, timeout: Option<std::time::Duration>) -> Self {
		self.timeout = timeout;

		self
	}

	/// Returns the per-request timeout.
	pub fn timeout(&self) -> Option<std::time::Duration> {
		self.timeout
	}
}
#[cfg(feature = "reqwest")]
impl Default for ReqwestTransport {
	fn default() -> Self {
		Self::with_client(ReqwestClient::default())
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.client
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let mut request = reqwest::Request::try_from(request).map_err(TransportError::from)?;

			*request.timeout_mut() = self.timeout;

			let response = self.client.execute(request).await?;
			let status = response.status();
			let version = response.version();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.version_mut() = version;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;

	#[test]
	fn default_transport_applies_timeout() {
		let transport = ReqwestTransport::default();

		assert_eq!(transport.timeout(), Some(ReqwestTransport::DEFAULT_TIMEOUT));
		assert_eq!(transport.with_timeout(None).timeout(), None);
	}
}
