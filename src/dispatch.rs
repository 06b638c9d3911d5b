//! Authenticated request dispatcher with bounded rate-limit retries.
//!
//! [`Dispatcher::send`] performs one logical request end-to-end: it resolves a bearer token
//! through the [`TokenCache`] (for authenticated requests), calls the [`HttpTransport`], and
//! retries 429 responses up to the [`RetryPolicy`] budget, waiting for the server's Retry-After
//! hint between attempts. Every other status is handed back untouched so the
//! [decode contract](crate::decode) can classify it. Transport failures, token refresh
//! failures, and cancellation are never retried here.

pub mod request;
pub mod retry;

pub use request::*;
pub use retry::*;

// crates.io
use http::{
	HeaderValue, StatusCode,
	header::{ACCEPT, AUTHORIZATION},
};
// self
use crate::{
	_prelude::*,
	auth::Credentials,
	cache::TokenCache,
	context::CallContext,
	error::{ConfigError, RateLimitError},
	obs::{self, CallKind, CallOutcome, CallSpan},
	transport::{HttpRequest, HttpResponse, HttpTransport},
};

/// Sends requests through a transport, attaching credentials and retrying rate limits.
///
/// Cloning is cheap; clones share the transport and token cache.
pub struct Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	base_url: Arc<str>,
	retry: RetryPolicy,
	tokens: Option<Arc<TokenCache>>,
}
impl<T> Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a dispatcher without a token cache; authenticated requests fail until one is set.
	pub fn new(transport: impl Into<Arc<T>>, base_url: &str) -> Result<Self> {
		Url::parse(base_url).map_err(|source| ConfigError::InvalidBaseUrl {
			url: base_url.to_owned(),
			source,
		})?;

		Ok(Self {
			transport: transport.into(),
			base_url: Arc::from(base_url.trim_end_matches('/')),
			retry: RetryPolicy::default(),
			tokens: None,
		})
	}

	/// Attaches the token cache used for authenticated requests.
	pub fn with_token_cache(mut self, tokens: Arc<TokenCache>) -> Self {
		self.tokens = Some(tokens);

		self
	}

	/// Overrides the retry budget.
	pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Returns the base URL every request path is appended to.
	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	/// Returns the retry budget.
	pub fn retry_policy(&self) -> RetryPolicy {
		self.retry
	}

	/// Returns the token cache, if one is attached.
	pub fn token_cache(&self) -> Option<&Arc<TokenCache>> {
		self.tokens.as_ref()
	}

	/// Returns the shared transport.
	pub fn transport(&self) -> &Arc<T> {
		&self.transport
	}

	/// Performs `request`, attaching a bearer token when it requires authentication.
	///
	/// Returns the raw response for 2xx and every non-429 status. Exhausted 429 retries yield
	/// [`Error::RateLimited`].
	pub async fn send(&self, request: &Request, ctx: &CallContext) -> Result<HttpResponse> {
		const KIND: CallKind = CallKind::Request;

		let span = CallSpan::new(KIND, "send");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				let authorization = if request.requires_auth {
					let tokens = self.tokens.as_ref().ok_or(ConfigError::MissingTokenCache)?;
					let token = tokens.get_valid(ctx).await?;

					Some(sensitive_header(&format!("Bearer {}", token.expose()))?)
				} else {
					None
				};

				self.dispatch(KIND, request, authorization, ctx).await
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Performs `request` with HTTP Basic credentials instead of a bearer token.
	///
	/// Used for the credential exchange; the token cache is never consulted.
	pub async fn send_with_basic_auth(
		&self,
		request: &Request,
		credentials: &Credentials,
		ctx: &CallContext,
	) -> Result<HttpResponse> {
		const KIND: CallKind = CallKind::CredentialExchange;

		let span = CallSpan::new(KIND, "send_with_basic_auth");

		// Outcomes are recorded by the caller, which also owns decoding the token body.
		span.instrument(async move {
			let authorization = sensitive_header(&credentials.basic_authorization())?;

			self.dispatch(KIND, request, Some(authorization), ctx).await
		})
		.await
	}

	async fn dispatch(
		&self,
		kind: CallKind,
		request: &Request,
		authorization: Option<HeaderValue>,
		ctx: &CallContext,
	) -> Result<HttpResponse> {
		let url = request.url(&self.base_url)?;
		let mut attempt = 1;

		loop {
			let http_request = build_http_request(request, &url, authorization.as_ref())?;
			let response = ctx.run(self.transport.execute(http_request)).await??;

			if response.status() != StatusCode::TOO_MANY_REQUESTS {
				return Ok(response);
			}

			let retry_after = parse_retry_after(response.headers(), OffsetDateTime::now_utc());

			drop(response);

			if !self.retry.allows_retry_after(attempt) {
				obs::record_rate_limited(kind, attempt, retry_after);

				return Err(RateLimitError { retry_after, attempts: attempt }.into());
			}

			obs::record_retry(kind, attempt, retry_after);
			ctx.sleep(retry_after).await?;

			attempt += 1;
		}
	}
}
#[cfg(feature = "reqwest")]
impl Dispatcher<crate::transport::ReqwestTransport> {
	/// Creates a dispatcher backed by the default reqwest transport.
	pub fn with_default_transport(base_url: &str) -> Result<Self> {
		Self::new(crate::transport::ReqwestTransport::default(), base_url)
	}
}
impl<T> Clone for Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: Arc::clone(&self.transport),
			base_url: Arc::clone(&self.base_url),
			retry: self.retry,
			tokens: self.tokens.clone(),
		}
	}
}
impl<T> Debug for Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Dispatcher")
			.field("base_url", &self.base_url)
			.field("retry", &self.retry)
			.field("token_cache_set", &self.tokens.is_some())
			.finish()
	}
}

fn build_http_request(
	request: &Request,
	url: &Url,
	authorization: Option<&HeaderValue>,
) -> Result<HttpRequest> {
	let mut builder = http::Request::builder()
		.method(request.method.clone())
		.uri(url.as_str())
		.header(ACCEPT, "application/json");

	if let Some(value) = authorization {
		builder = builder.header(AUTHORIZATION, value.clone());
	}

	builder.body(Vec::new()).map_err(|err| ConfigError::from(err).into())
}

fn sensitive_header(value: &str) -> Result<HeaderValue> {
	let mut header = HeaderValue::from_str(value).map_err(ConfigError::from)?;

	header.set_sensitive(true);

	Ok(header)
}
