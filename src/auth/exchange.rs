//! Credential exchange contract and the Basic-auth implementation backing the token cache.
//!
//! The token cache only knows the [`CredentialExchange`] trait, so tests can swap in
//! instrumented doubles. [`BasicAuthExchange`] is the production implementation: it trades the
//! long-lived [`Credentials`] for a short-lived bearer token via
//! `POST /auth/v1/generate?expiry=<validity>` and never touches the bearer path itself.

// self
use crate::{
	_prelude::*,
	auth::{Credentials, Token, TokenBuildError},
	context::CallContext,
	decode,
	dispatch::{Dispatcher, Request},
	error::ConfigError,
	obs::{self, CallKind, CallOutcome, CallSpan},
	transport::HttpTransport,
};

const MAX_TOKEN_VALIDITY: Duration = Duration::hours(168);

/// Boxed future returned by [`CredentialExchange::exchange`].
pub type ExchangeFuture<'a> = Pin<Box<dyn Future<Output = Result<Token>> + 'a + Send>>;

/// Mints bearer tokens from long-lived credentials.
pub trait CredentialExchange
where
	Self: Send + Sync,
{
	/// Requests a token valid for `validity`, honoring `ctx` cancellation.
	fn exchange<'a>(&'a self, validity: Duration, ctx: &'a CallContext) -> ExchangeFuture<'a>;
}

/// Wire response of the credential exchange endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
	/// Bearer token value.
	pub access_token: String,
	/// Token type label (normally `Bearer`); empty when omitted.
	#[serde(default)]
	pub token_type: String,
	/// Seconds until expiry, relative to issuance; informational only, `exp` is authoritative.
	#[serde(default)]
	pub expires_in: i64,
	/// Refresh token, when the server issues one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<String>,
	/// Granted scope string, when present.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scope: Option<String>,
	/// Absolute expiry as a unix timestamp.
	pub exp: i64,
	/// Issue time as a unix timestamp.
	pub iat: i64,
}
impl TokenResponse {
	/// Converts the wire response into a validated [`Token`].
	pub fn into_token(self) -> Result<Token, TokenBuildError> {
		Token::builder()
			.value(self.access_token)
			.issued_at_unix(self.iat)?
			.expires_at_unix(self.exp)?
			.build()
	}
}
impl Debug for TokenResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenResponse")
			.field("access_token", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("expires_in", &self.expires_in)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("scope", &self.scope)
			.field("exp", &self.exp)
			.field("iat", &self.iat)
			.finish()
	}
}

/// Credential exchange that authenticates with HTTP Basic against the generate endpoint.
pub struct BasicAuthExchange<T>
where
	T: ?Sized + HttpTransport,
{
	dispatcher: Dispatcher<T>,
	credentials: Credentials,
}
impl<T> BasicAuthExchange<T>
where
	T: ?Sized + HttpTransport,
{
	/// Path of the credential exchange endpoint.
	pub const PATH: &'static str = "/auth/v1/generate";
	/// Longest validity the server grants.
	pub const MAX_VALIDITY: Duration = MAX_TOKEN_VALIDITY;

	/// Creates an exchange that sends requests through `dispatcher`.
	///
	/// The dispatcher's token cache, if any, is never consulted.
	pub fn new(dispatcher: Dispatcher<T>, credentials: Credentials) -> Self {
		Self { dispatcher, credentials }
	}

	/// Returns the credentials presented to the endpoint.
	pub fn credentials(&self) -> &Credentials {
		&self.credentials
	}

	/// Calls the generate endpoint and returns the raw token response.
	pub async fn generate_token(
		&self,
		validity: Duration,
		ctx: &CallContext,
	) -> Result<TokenResponse> {
		const KIND: CallKind = CallKind::CredentialExchange;

		let span = CallSpan::new(KIND, "generate_token");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				ensure_validity(validity)?;

				let request =
					Request::post(Self::PATH).with_query("expiry", format_validity(validity));
				let response =
					self.dispatcher.send_with_basic_auth(&request, &self.credentials, ctx).await?;

				decode::json::<TokenResponse>(response)
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}
}
impl<T> CredentialExchange for BasicAuthExchange<T>
where
	T: ?Sized + HttpTransport,
{
	fn exchange<'a>(&'a self, validity: Duration, ctx: &'a CallContext) -> ExchangeFuture<'a> {
		Box::pin(async move {
			let response = self.generate_token(validity, ctx).await?;

			response.into_token().map_err(|err| ConfigError::from(err).into())
		})
	}
}
impl<T> Debug for BasicAuthExchange<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BasicAuthExchange")
			.field("base_url", &self.dispatcher.base_url())
			.field("credentials", &self.credentials)
			.finish()
	}
}

/// Renders a validity in the server's duration syntax (`1h0m0s`, `10m0s`, `45s`).
///
/// Sub-second precision is dropped.
pub fn format_validity(validity: Duration) -> String {
	let total = validity.whole_seconds();
	let (hours, minutes, seconds) = (total / 3_600, (total % 3_600) / 60, total % 60);

	if hours > 0 {
		format!("{hours}h{minutes}m{seconds}s")
	} else if minutes > 0 {
		format!("{minutes}m{seconds}s")
	} else {
		format!("{seconds}s")
	}
}

fn ensure_validity(validity: Duration) -> Result<()> {
	if validity.whole_seconds() <= 0 || validity > MAX_TOKEN_VALIDITY {
		return Err(ConfigError::InvalidValidity { validity, max: MAX_TOKEN_VALIDITY }.into());
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn validity_formatting_matches_server_syntax() {
		assert_eq!(format_validity(Duration::minutes(10)), "10m0s");
		assert_eq!(format_validity(Duration::hours(1)), "1h0m0s");
		assert_eq!(format_validity(Duration::minutes(90) + Duration::seconds(5)), "1h30m5s");
		assert_eq!(format_validity(Duration::seconds(45)), "45s");
		assert_eq!(format_validity(Duration::hours(168)), "168h0m0s");
	}

	#[test]
	fn validity_bounds_are_enforced() {
		assert!(ensure_validity(Duration::minutes(10)).is_ok());
		assert!(ensure_validity(Duration::hours(168)).is_ok());
		assert!(matches!(
			ensure_validity(Duration::ZERO),
			Err(Error::Config(ConfigError::InvalidValidity { .. }))
		));
		assert!(matches!(
			ensure_validity(Duration::hours(169)),
			Err(Error::Config(ConfigError::InvalidValidity { .. }))
		));
	}

	#[test]
	fn token_response_converts_absolute_instants() {
		let response: TokenResponse = serde_json::from_str(
			r#"{"access_token":"jwt","token_type":"Bearer","expires_in":600,"exp":1735690200,"iat":1735689600}"#,
		)
		.expect("Token response fixture should deserialize.");

		assert_eq!(response.refresh_token, None);

		let token = response.into_token().expect("Token response should convert.");

		assert_eq!(token.value.expose(), "jwt");
		assert_eq!(token.lifetime(), Duration::minutes(10));
	}

	#[test]
	fn informational_fields_are_optional() {
		let response: TokenResponse =
			serde_json::from_str(r#"{"access_token":"jwt","exp":1735690200,"iat":1735689600}"#)
				.expect("Token response without informational fields should deserialize.");

		assert_eq!(response.token_type, "");
		assert_eq!(response.expires_in, 0);
		assert_eq!(
			response.into_token().expect("Token response should convert.").lifetime(),
			Duration::minutes(10)
		);
	}

	#[cfg(feature = "metrics")]
	#[test]
	fn exchange_outcome_is_counted_once() {
		let recorder = CountingRecorder::default();
		let runtime = tokio::runtime::Builder::new_current_thread()
			.enable_time()
			.build()
			.expect("Test runtime should build.");
		let now = OffsetDateTime::now_utc().unix_timestamp();
		let minted = format!(
			r#"{{"access_token":"jwt","token_type":"Bearer","expires_in":600,"exp":{},"iat":{now}}}"#,
			now + 600
		);

		metrics::with_local_recorder(&recorder, || {
			runtime.block_on(async {
				let ctx = CallContext::new();

				fixed_body_exchange(minted)
					.generate_token(Duration::minutes(10), &ctx)
					.await
					.expect("Well-formed token body should succeed.");
				fixed_body_exchange("{}".into())
					.generate_token(Duration::minutes(10), &ctx)
					.await
					.expect_err("Token body without fields should fail to decode.");
			})
		});

		assert_eq!(recorder.count("credential_exchange", "attempt"), 2);
		assert_eq!(recorder.count("credential_exchange", "success"), 1);
		assert_eq!(recorder.count("credential_exchange", "failure"), 1);
	}

	#[cfg(feature = "metrics")]
	struct FixedBody(String);
	#[cfg(feature = "metrics")]
	impl HttpTransport for FixedBody {
		fn execute(
			&self,
			_request: crate::transport::HttpRequest,
		) -> crate::transport::TransportFuture<'_> {
			let response = crate::transport::HttpResponse::new(self.0.clone().into_bytes());

			Box::pin(async move { Ok::<_, crate::error::TransportError>(response) })
		}
	}

	#[cfg(feature = "metrics")]
	fn fixed_body_exchange(body: String) -> BasicAuthExchange<FixedBody> {
		let dispatcher = Dispatcher::<FixedBody>::new(FixedBody(body), "https://api.find.xyz")
			.expect("Dispatcher should build.");

		BasicAuthExchange::new(dispatcher, Credentials::new("user", "pass"))
	}

	/// Keeps every counter keyed as `name{label=value,...}`.
	#[cfg(feature = "metrics")]
	#[derive(Default)]
	struct CountingRecorder {
		counters: std::sync::Mutex<BTreeMap<String, Arc<std::sync::atomic::AtomicU64>>>,
	}
	#[cfg(feature = "metrics")]
	impl CountingRecorder {
		fn count(&self, call: &str, outcome: &str) -> u64 {
			let key = format!("find_api_call_total{{call={call},outcome={outcome}}}");

			self.counters
				.lock()
				.expect("Counter map lock should not be poisoned.")
				.get(&key)
				.map_or(0, |counter| counter.load(std::sync::atomic::Ordering::SeqCst))
		}
	}
	#[cfg(feature = "metrics")]
	impl metrics::Recorder for CountingRecorder {
		fn describe_counter(
			&self,
			_key: metrics::KeyName,
			_unit: Option<metrics::Unit>,
			_description: metrics::SharedString,
		) {
		}

		fn describe_gauge(
			&self,
			_key: metrics::KeyName,
			_unit: Option<metrics::Unit>,
			_description: metrics::SharedString,
		) {
		}

		fn describe_histogram(
			&self,
			_key: metrics::KeyName,
			_unit: Option<metrics::Unit>,
			_description: metrics::SharedString,
		) {
		}

		fn register_counter(
			&self,
			key: &metrics::Key,
			_metadata: &metrics::Metadata<'_>,
		) -> metrics::Counter {
			let labels = key
				.labels()
				.map(|label| format!("{}={}", label.key(), label.value()))
				.collect::<Vec<_>>()
				.join(",");
			let counter = self
				.counters
				.lock()
				.expect("Counter map lock should not be poisoned.")
				.entry(format!("{}{{{labels}}}", key.name()))
				.or_default()
				.clone();

			metrics::Counter::from_arc(counter)
		}

		fn register_gauge(
			&self,
			_key: &metrics::Key,
			_metadata: &metrics::Metadata<'_>,
		) -> metrics::Gauge {
			metrics::Gauge::noop()
		}

		fn register_histogram(
			&self,
			_key: &metrics::Key,
			_metadata: &metrics::Metadata<'_>,
		) -> metrics::Histogram {
			metrics::Histogram::noop()
		}
	}

	#[test]
	fn token_response_rejects_inverted_lifetime() {
		let response = TokenResponse {
			access_token: "jwt".into(),
			token_type: "Bearer".into(),
			expires_in: 0,
			refresh_token: None,
			scope: None,
			exp: 1_735_689_600,
			iat: 1_735_689_600,
		};

		assert!(matches!(
			response.into_token(),
			Err(TokenBuildError::NonIncreasingLifetime { .. })
		));
	}
}
