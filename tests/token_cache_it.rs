// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration as StdDuration,
};
// crates.io
use time::{Duration, OffsetDateTime};
// self
use find_api::{
	auth::{CredentialExchange, ExchangeFuture, Token},
	cache::TokenCache,
	context::CallContext,
	error::{ConfigError, Error},
};

/// Exchange double that takes a while to answer so concurrent callers pile up on the lock.
#[derive(Default)]
struct SlowExchange {
	calls: AtomicUsize,
}
impl CredentialExchange for SlowExchange {
	fn exchange<'a>(&'a self, validity: Duration, _ctx: &'a CallContext) -> ExchangeFuture<'a> {
		Box::pin(async move {
			let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

			tokio::time::sleep(StdDuration::from_millis(50)).await;

			Token::builder()
				.value(format!("minted-{call}"))
				.expires_in(validity)
				.build()
				.map_err(|err| Error::from(ConfigError::from(err)))
		})
	}
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_exchange() {
	let exchange = Arc::new(SlowExchange::default());
	let cache = Arc::new(TokenCache::new(exchange.clone()));
	let handles = (0..16)
		.map(|_| {
			let cache = cache.clone();

			tokio::spawn(async move { cache.get_valid(&CallContext::new()).await })
		})
		.collect::<Vec<_>>();

	for handle in handles {
		let value = handle
			.await
			.expect("Caller task should not panic.")
			.expect("Every caller should receive a token.");

		assert_eq!(value.expose(), "minted-1");
	}

	assert_eq!(exchange.calls.load(Ordering::SeqCst), 1);
	assert_eq!(cache.metrics().attempts(), 1);
	assert_eq!(cache.metrics().successes(), 1);
}

#[tokio::test]
async fn expired_token_is_replaced_once() {
	let now = OffsetDateTime::now_utc();
	let expired = Token::builder()
		.value("expired")
		.issued_at(now - Duration::minutes(20))
		.expires_at(now - Duration::minutes(10))
		.build()
		.expect("Expired token fixture should build.");
	let exchange = Arc::new(SlowExchange::default());
	let cache = TokenCache::new(exchange.clone()).with_token(expired);
	let ctx = CallContext::new();

	for _ in 0..3 {
		let value = cache.get_valid(&ctx).await.expect("Refresh should succeed.");

		assert_eq!(value.expose(), "minted-1");
	}

	assert_eq!(exchange.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn custom_margin_and_validity_are_honored() {
	let exchange = Arc::new(SlowExchange::default());
	let cache = TokenCache::new(exchange.clone())
		.with_validity(Duration::minutes(2))
		.with_safety_margin(Duration::minutes(5));
	let ctx = CallContext::new();

	// A two minute token never outlives a five minute margin, so every call refreshes.
	cache.get_valid(&ctx).await.expect("First refresh should succeed.");

	let second = cache.get_valid(&ctx).await.expect("Second refresh should succeed.");

	assert_eq!(second.expose(), "minted-2");
	assert_eq!(exchange.calls.load(Ordering::SeqCst), 2);
}
