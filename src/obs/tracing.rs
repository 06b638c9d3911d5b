// self
use crate::{_prelude::*, auth::Token, obs::CallKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// A span builder used by client calls.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a new span tagged with the provided call kind + stage.
	pub fn new(kind: CallKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("find_api.call", call = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

pub(crate) fn trace_retry(kind: CallKind, attempt: u32, delay: Duration) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(
			call = kind.as_str(),
			attempt,
			delay_ms = delay.whole_milliseconds() as i64,
			"Rate limited; retrying after server hint."
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, attempt, delay);
	}
}

pub(crate) fn trace_rate_limited(kind: CallKind, attempts: u32, retry_after: Duration) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			call = kind.as_str(),
			attempts,
			retry_after_ms = retry_after.whole_milliseconds() as i64,
			"Rate limit retry budget exhausted."
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, attempts, retry_after);
	}
}

/// Emits a debug event describing a freshly minted token (never its value).
pub fn record_token_minted(token: &Token) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(
			expires_at = %token.expires_at,
			lifetime_s = token.lifetime().whole_seconds(),
			"Minted bearer token."
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = token;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = CallSpan::new(CallKind::TokenRefresh, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}

	#[test]
	fn trace_helpers_noop_without_subscriber() {
		trace_retry(CallKind::Request, 1, Duration::seconds(1));
		trace_rate_limited(CallKind::Request, 3, Duration::seconds(1));
	}
}
