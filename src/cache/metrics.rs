// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for credential exchanges run by a [`TokenCache`](super::TokenCache).
///
/// Fast-path hits are not counted; only refreshes that reach the exchange are.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	exchanges: AtomicU64,
	minted: AtomicU64,
	failed: AtomicU64,
}
impl RefreshMetrics {
	/// Number of exchanges started.
	pub fn attempts(&self) -> u64 {
		self.exchanges.load(Ordering::Relaxed)
	}

	/// Number of exchanges that produced a cached token.
	pub fn successes(&self) -> u64 {
		self.minted.load(Ordering::Relaxed)
	}

	/// Number of exchanges that failed or were abandoned by cancellation.
	pub fn failures(&self) -> u64 {
		self.failed.load(Ordering::Relaxed)
	}

	/// Copies all counters at once.
	pub fn snapshot(&self) -> RefreshSnapshot {
		RefreshSnapshot {
			attempts: self.attempts(),
			successes: self.successes(),
			failures: self.failures(),
		}
	}

	pub(crate) fn exchange_started(&self) {
		self.exchanges.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn exchange_finished(&self, minted: bool) {
		let counter = if minted { &self.minted } else { &self.failed };

		counter.fetch_add(1, Ordering::Relaxed);
	}
}

/// Point-in-time copy of [`RefreshMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshSnapshot {
	/// Exchanges started.
	pub attempts: u64,
	/// Exchanges that minted a token.
	pub successes: u64,
	/// Exchanges that failed.
	pub failures: u64,
}
