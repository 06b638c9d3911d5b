//! High-level client wiring the transport, dispatcher, token cache, and credential exchange.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{BasicAuthExchange, Credentials, TokenResponse},
	cache::TokenCache,
	context::CallContext,
	decode,
	dispatch::{Dispatcher, Request},
	transport::{HttpResponse, HttpTransport},
};
#[cfg(feature = "reqwest")] use crate::transport::ReqwestTransport;

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.find.xyz";

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestFindClient = Client<ReqwestTransport>;

/// Authenticated API client shared by every endpoint.
///
/// The client owns a single [`TokenCache`], so concurrent calls through clones of the same
/// client share one bearer token and never stampede the credential exchange.
pub struct Client<T>
where
	T: ?Sized + HttpTransport,
{
	dispatcher: Dispatcher<T>,
	tokens: Arc<TokenCache>,
	exchange: Arc<BasicAuthExchange<T>>,
}
impl<T> Client<T>
where
	T: ?Sized + HttpTransport,
{
	/// Starts a builder that sends every call through `transport`.
	pub fn with_transport(credentials: Credentials, transport: impl Into<Arc<T>>) -> ClientBuilder<T> {
		ClientBuilder { credentials, transport: transport.into(), base_url: None }
	}

	/// Performs an authenticated request and returns the raw response.
	pub async fn send(&self, request: &Request, ctx: &CallContext) -> Result<HttpResponse> {
		self.dispatcher.send(request, ctx).await
	}

	/// Performs a request and decodes its JSON body into `R`.
	pub async fn send_json<R>(&self, request: &Request, ctx: &CallContext) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let response = self.dispatcher.send(request, ctx).await?;

		decode::json(response)
	}

	/// Calls the credential exchange directly, bypassing the token cache.
	pub async fn generate_token(
		&self,
		validity: Duration,
		ctx: &CallContext,
	) -> Result<TokenResponse> {
		self.exchange.generate_token(validity, ctx).await
	}

	/// Returns the shared token cache.
	pub fn token_cache(&self) -> &Arc<TokenCache> {
		&self.tokens
	}

	/// Returns the dispatcher, for endpoint builders that decode responses themselves.
	pub fn dispatcher(&self) -> &Dispatcher<T> {
		&self.dispatcher
	}

	/// Returns the base URL every request path is appended to.
	pub fn base_url(&self) -> &str {
		self.dispatcher.base_url()
	}
}
#[cfg(feature = "reqwest")]
impl Client<ReqwestTransport> {
	/// Creates a client for the production endpoint using the default reqwest transport.
	pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
		Self::builder(Credentials::new(username, password)).build()
	}

	/// Starts a builder using the default reqwest transport.
	pub fn builder(credentials: Credentials) -> ClientBuilder<ReqwestTransport> {
		Self::with_transport(credentials, ReqwestTransport::default())
	}
}
impl<T> Clone for Client<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			dispatcher: self.dispatcher.clone(),
			tokens: Arc::clone(&self.tokens),
			exchange: Arc::clone(&self.exchange),
		}
	}
}
impl<T> Debug for Client<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("base_url", &self.dispatcher.base_url())
			.field("username", &self.exchange.credentials().username())
			.finish()
	}
}

/// Builder for [`Client`]; the base URL and transport are the only knobs.
pub struct ClientBuilder<T>
where
	T: ?Sized + HttpTransport,
{
	credentials: Credentials,
	transport: Arc<T>,
	base_url: Option<String>,
}
impl<T> ClientBuilder<T>
where
	T: ?Sized + HttpTransport,
{
	/// Overrides the API base URL (defaults to [`DEFAULT_BASE_URL`]).
	pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = Some(base_url.into());

		self
	}

	/// Swaps the transport, for example to inject a test double.
	pub fn transport<U>(self, transport: impl Into<Arc<U>>) -> ClientBuilder<U>
	where
		U: ?Sized + HttpTransport,
	{
		ClientBuilder {
			credentials: self.credentials,
			transport: transport.into(),
			base_url: self.base_url,
		}
	}

	/// Validates the configuration and assembles the client.
	pub fn build(self) -> Result<Client<T>> {
		let base_url = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
		let unauthenticated = Dispatcher::new(self.transport, base_url)?;
		let exchange = Arc::new(BasicAuthExchange::new(unauthenticated.clone(), self.credentials));
		let tokens = Arc::new(TokenCache::new(exchange.clone()));
		let dispatcher = unauthenticated.with_token_cache(tokens.clone());

		Ok(Client { dispatcher, tokens, exchange })
	}
}
impl<T> Debug for ClientBuilder<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientBuilder")
			.field("credentials", &self.credentials)
			.field("base_url", &self.base_url)
			.finish()
	}
}
