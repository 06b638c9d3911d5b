//! Bearer token cache with double-checked, stampede-free refresh.
//!
//! [`TokenCache::get_valid`] answers from a shared read lock while the cached token outlives
//! the safety margin. Once it goes stale, callers queue on the write lock; the first one in
//! re-checks, calls the [`CredentialExchange`], and swaps the new token in, while everyone
//! queued behind it re-checks and reuses that token instead of exchanging again. A failed
//! exchange leaves the previous value (stale or absent) in place so the next caller retries.

mod metrics;

pub use metrics::{RefreshMetrics, RefreshSnapshot};

// self
use crate::{
	_prelude::*,
	auth::{CredentialExchange, Token, TokenSecret},
	context::CallContext,
	obs::{self, CallKind, CallOutcome, CallSpan},
};

/// Owns the current bearer token and the policy for replacing it.
pub struct TokenCache {
	current: AsyncRwLock<Option<Token>>,
	exchange: Arc<dyn CredentialExchange>,
	safety_margin: Duration,
	validity: Duration,
	metrics: RefreshMetrics,
}
impl TokenCache {
	/// Minimum remaining lifetime a token needs to be handed out.
	pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::minutes(1);
	/// Validity requested from the credential exchange.
	pub const DEFAULT_VALIDITY: Duration = Duration::minutes(10);

	/// Creates an empty cache that mints tokens through `exchange`.
	pub fn new(exchange: Arc<dyn CredentialExchange>) -> Self {
		Self {
			current: AsyncRwLock::new(None),
			exchange,
			safety_margin: Self::DEFAULT_SAFETY_MARGIN,
			validity: Self::DEFAULT_VALIDITY,
			metrics: RefreshMetrics::default(),
		}
	}

	/// Pre-seeds the cache with `token`.
	pub fn with_token(mut self, token: Token) -> Self {
		*self.current.get_mut() = Some(token);

		self
	}

	/// Overrides the safety margin (defaults to one minute, clamped at zero).
	pub fn with_safety_margin(mut self, margin: Duration) -> Self {
		self.safety_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Overrides the validity requested for new tokens (defaults to ten minutes).
	pub fn with_validity(mut self, validity: Duration) -> Self {
		self.validity = validity;

		self
	}

	/// Returns the safety margin.
	pub fn safety_margin(&self) -> Duration {
		self.safety_margin
	}

	/// Returns the validity requested for new tokens.
	pub fn validity(&self) -> Duration {
		self.validity
	}

	/// Returns refresh counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Returns a token valid for at least the safety margin, minting one if needed.
	///
	/// Exchange failures surface as [`Error::TokenRefresh`]; cancellation surfaces unwrapped.
	pub async fn get_valid(&self, ctx: &CallContext) -> Result<TokenSecret> {
		{
			let current = ctx.run(self.current.read()).await?;

			if let Some(value) = self.usable(current.as_ref(), OffsetDateTime::now_utc()) {
				return Ok(value);
			}
		}

		self.refresh(ctx).await
	}

	/// Returns a snapshot of the cached token.
	pub async fn current(&self) -> Option<Token> {
		self.current.read().await.clone()
	}

	/// Replaces the cached token.
	pub async fn replace(&self, token: Token) {
		*self.current.write().await = Some(token);
	}

	/// Drops the cached token so the next call mints a new one.
	pub async fn invalidate(&self) {
		*self.current.write().await = None;
	}

	async fn refresh(&self, ctx: &CallContext) -> Result<TokenSecret> {
		const KIND: CallKind = CallKind::TokenRefresh;

		let span = CallSpan::new(KIND, "refresh");

		span.instrument(async move {
			let mut current = ctx.run(self.current.write()).await?;

			// Another caller may have refreshed while this one waited for the lock.
			if let Some(value) = self.usable(current.as_ref(), OffsetDateTime::now_utc()) {
				return Ok(value);
			}

			obs::record_call_outcome(KIND, CallOutcome::Attempt);
			self.metrics.exchange_started();

			let exchanged =
				ctx.run(self.exchange.exchange(self.validity, ctx)).await.and_then(|result| result);

			match exchanged {
				Ok(token) => {
					let value = token.value.clone();

					obs::record_token_minted(&token);
					*current = Some(token);

					self.metrics.exchange_finished(true);
					obs::record_call_outcome(KIND, CallOutcome::Success);

					Ok(value)
				},
				Err(err) => {
					self.metrics.exchange_finished(false);
					obs::record_call_outcome(KIND, CallOutcome::Failure);

					Err(Error::token_refresh(err))
				},
			}
		})
		.await
	}

	fn usable(&self, token: Option<&Token>, now: OffsetDateTime) -> Option<TokenSecret> {
		token
			.filter(|token| token.is_valid_at(now, self.safety_margin))
			.map(|token| token.value.clone())
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("safety_margin", &self.safety_margin)
			.field("validity", &self.validity)
			.field("metrics", &self.metrics)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::{
		auth::ExchangeFuture,
		error::{ApiError, ConfigError},
	};

	#[derive(Default)]
	struct CountingExchange {
		calls: AtomicUsize,
		fail: bool,
	}
	impl CredentialExchange for CountingExchange {
		fn exchange<'a>(&'a self, validity: Duration, _ctx: &'a CallContext) -> ExchangeFuture<'a> {
			Box::pin(async move {
				let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

				if self.fail {
					return Err(ApiError { status: 401, body: "bad credentials".into() }.into());
				}

				Token::builder()
					.value(format!("minted-{call}"))
					.expires_in(validity)
					.build()
					.map_err(|err| ConfigError::from(err).into())
			})
		}
	}

	fn token_expiring_in(value: &str, remaining: Duration) -> Token {
		let now = OffsetDateTime::now_utc();

		Token::builder()
			.value(value)
			.issued_at(now - Duration::minutes(10))
			.expires_at(now + remaining)
			.build()
			.expect("Token fixture should build.")
	}

	#[tokio::test]
	async fn fresh_token_skips_exchange() {
		let exchange = Arc::new(CountingExchange::default());
		let cache = TokenCache::new(exchange.clone())
			.with_token(token_expiring_in("seeded", Duration::minutes(5)));
		let value = cache.get_valid(&CallContext::new()).await.expect("Fresh token should be used.");

		assert_eq!(value.expose(), "seeded");
		assert_eq!(exchange.calls.load(Ordering::SeqCst), 0);
		assert_eq!(cache.metrics().attempts(), 0);
	}

	#[tokio::test]
	async fn token_inside_safety_margin_is_refreshed() {
		let exchange = Arc::new(CountingExchange::default());
		let cache = TokenCache::new(exchange.clone())
			.with_token(token_expiring_in("stale", Duration::seconds(30)));
		let value = cache.get_valid(&CallContext::new()).await.expect("Refresh should succeed.");

		assert_eq!(value.expose(), "minted-1");
		assert_eq!(exchange.calls.load(Ordering::SeqCst), 1);

		let current = cache.current().await.expect("Refreshed token should be cached.");

		assert_eq!(current.value.expose(), "minted-1");
		assert_eq!(current.lifetime(), TokenCache::DEFAULT_VALIDITY);
	}

	#[tokio::test]
	async fn failed_exchange_keeps_previous_token() {
		let exchange = Arc::new(CountingExchange { fail: true, ..Default::default() });
		let cache = TokenCache::new(exchange.clone())
			.with_token(token_expiring_in("stale", Duration::seconds(10)));
		let err = cache
			.get_valid(&CallContext::new())
			.await
			.expect_err("Failed exchange should surface.");

		assert!(err.is_token_refresh());
		assert_eq!(
			cache.current().await.map(|token| token.value.expose().to_owned()),
			Some("stale".to_owned())
		);

		let _ = cache.get_valid(&CallContext::new()).await;

		assert_eq!(exchange.calls.load(Ordering::SeqCst), 2);
		assert_eq!(cache.metrics().failures(), 2);
	}

	#[tokio::test]
	async fn cancelled_context_is_not_wrapped() {
		let exchange = Arc::new(CountingExchange::default());
		let cache = TokenCache::new(exchange.clone());
		let ctx = CallContext::new();

		ctx.cancel();

		let err = cache.get_valid(&ctx).await.expect_err("Cancelled context should fail.");

		assert!(matches!(err, Error::Cancelled));
		assert_eq!(exchange.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn invalidate_forces_new_exchange() {
		let exchange = Arc::new(CountingExchange::default());
		let cache = TokenCache::new(exchange.clone())
			.with_token(token_expiring_in("seeded", Duration::minutes(5)));

		cache.invalidate().await;

		let value = cache.get_valid(&CallContext::new()).await.expect("Exchange should succeed.");

		assert_eq!(value.expose(), "minted-1");
	}
}
