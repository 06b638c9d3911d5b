//! Caller-owned cancellation and deadline handle threaded through every suspension point.
//!
//! The client never imposes a timeout of its own. A [`CallContext`] carries a
//! [`CancellationToken`] plus an optional deadline, and [`CallContext::run`] races any future
//! against both so network calls, retry waits, and token-cache lock acquisition all abort at
//! the next suspension point once the context is done.

// crates.io
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
// self
use crate::_prelude::*;

/// Cancellation/deadline handle supplied by the caller for one logical call.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
	token: CancellationToken,
	deadline: Option<Instant>,
}
impl CallContext {
	/// Creates a context that never expires on its own.
	pub fn new() -> Self {
		Self::default()
	}

	/// Uses an existing cancellation token (for example a child of a service-wide token).
	pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
		self.token = token;

		self
	}

	/// Sets a deadline relative to now; a timeout too large to represent leaves no deadline.
	pub fn with_timeout(self, timeout: std::time::Duration) -> Self {
		match Instant::now().checked_add(timeout) {
			Some(deadline) => self.with_deadline(deadline),
			None => self,
		}
	}

	/// Sets an absolute deadline, keeping the earlier one if a deadline already exists.
	pub fn with_deadline(mut self, deadline: Instant) -> Self {
		self.deadline = Some(match self.deadline {
			Some(current) if current < deadline => current,
			_ => deadline,
		});

		self
	}

	/// Borrows the underlying cancellation token.
	pub fn cancellation_token(&self) -> &CancellationToken {
		&self.token
	}

	/// Returns the configured deadline, if any.
	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	/// Cancels the context and every clone sharing its token.
	pub fn cancel(&self) {
		self.token.cancel();
	}

	/// Returns the error the context resolves to if it is already done.
	pub fn check(&self) -> Result<()> {
		if self.token.is_cancelled() {
			return Err(Error::Cancelled);
		}
		if self.deadline.is_some_and(|deadline| deadline <= Instant::now()) {
			return Err(Error::DeadlineExceeded);
		}

		Ok(())
	}

	/// Returns `true` once the context is cancelled or past its deadline.
	pub fn is_done(&self) -> bool {
		self.check().is_err()
	}

	/// Resolves once the context is cancelled or its deadline elapses.
	pub async fn done(&self) -> Error {
		match self.deadline {
			Some(deadline) => tokio::select! {
				biased;

				_ = self.token.cancelled() => Error::Cancelled,
				_ = time::sleep_until(deadline) => Error::DeadlineExceeded,
			},
			None => {
				self.token.cancelled().await;

				Error::Cancelled
			},
		}
	}

	/// Drives `fut` to completion unless the context finishes first.
	///
	/// Cancellation wins ties, so an already-cancelled context never polls `fut`.
	pub async fn run<F>(&self, fut: F) -> Result<F::Output>
	where
		F: Future,
	{
		self.check()?;

		tokio::select! {
			biased;

			err = self.done() => Err(err),
			output = fut => Ok(output),
		}
	}

	/// Sleeps for `delay` unless the context finishes first. Non-positive delays return at once.
	pub async fn sleep(&self, delay: Duration) -> Result<()> {
		let delay = std::time::Duration::try_from(delay).unwrap_or_default();

		self.run(time::sleep(delay)).await
	}
}
