//! Optional observability helpers for client calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `find_api.call` with the `call` (kind) and
//!   `stage` (call site) fields, plus `debug`/`warn` events for retries, rate-limit exhaustion,
//!   and token minting.
//! - Enable `metrics` to increment the `find_api_call_total` counter for every
//!   attempt/success/failure/rate-limited outcome (labeled by `call` + `outcome`) and the
//!   `find_api_retry_total` counter for every rate-limit retry (labeled by `call`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Call kinds observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// Dispatcher request on behalf of an endpoint.
	Request,
	/// Basic-auth call to the credential exchange endpoint.
	CredentialExchange,
	/// Token cache refresh.
	TokenRefresh,
}
impl CallKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::Request => "request",
			CallKind::CredentialExchange => "credential_exchange",
			CallKind::TokenRefresh => "token_refresh",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Entry to a client helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Retry budget exhausted on 429 responses.
	RateLimited,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
			CallOutcome::RateLimited => "rate_limited",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
