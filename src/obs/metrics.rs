// self
use crate::{
	_prelude::*,
	obs::{CallKind, CallOutcome},
};

/// Records a call outcome via the global metrics recorder (when enabled).
pub fn record_call_outcome(kind: CallKind, outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"find_api_call_total",
			"call" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records the terminal outcome of one call; exhausted 429 budgets count as `rate_limited`.
pub fn record_result<T>(kind: CallKind, result: &Result<T>) {
	let outcome = match result {
		Ok(_) => CallOutcome::Success,
		Err(err) if err.is_rate_limited() => CallOutcome::RateLimited,
		Err(_) => CallOutcome::Failure,
	};

	record_call_outcome(kind, outcome);
}

/// Records a rate-limit retry scheduled after `attempt` with the server-provided delay.
pub fn record_retry(kind: CallKind, attempt: u32, delay: Duration) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("find_api_retry_total", "call" => kind.as_str()).increment(1);
	}

	super::tracing::trace_retry(kind, attempt, delay);
}

/// Records a retry budget exhausted after `attempts` calls.
pub fn record_rate_limited(kind: CallKind, attempts: u32, retry_after: Duration) {
	super::tracing::trace_rate_limited(kind, attempts, retry_after);
}
