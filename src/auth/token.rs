//! Immutable bearer token values, validity helpers, and builders.

// self
use crate::{_prelude::*, auth::secret::TokenSecret};

/// Errors produced by [`TokenBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TokenBuildError {
	/// Issued when no (or an empty) access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// Issued when the expiry does not come strictly after the issued-at instant.
	#[error("Token expiry {expires_at} must be after its issue time {issued_at}.")]
	NonIncreasingLifetime {
		/// Issued-at instant.
		issued_at: OffsetDateTime,
		/// Rejected expiry instant.
		expires_at: OffsetDateTime,
	},
	/// Issued when a unix timestamp cannot be represented.
	#[error("Timestamp {timestamp} is outside the supported range.")]
	TimestampOutOfRange {
		/// Rejected unix timestamp.
		timestamp: i64,
	},
}

/// Bearer token minted by the credential exchange.
///
/// Tokens are never mutated in place; the token cache swaps whole values.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
	/// Access token secret; callers must avoid logging it.
	pub value: TokenSecret,
	/// Issued-at instant reported by the server.
	pub issued_at: OffsetDateTime,
	/// Absolute expiry instant reported by the server.
	pub expires_at: OffsetDateTime,
}
impl Token {
	/// Returns a builder that validates the token lifetime.
	pub fn builder() -> TokenBuilder {
		TokenBuilder::default()
	}

	/// Returns `true` if the token stays valid for more than `margin` after `now`.
	pub fn is_valid_at(&self, now: OffsetDateTime, margin: Duration) -> bool {
		now + margin < self.expires_at
	}

	/// Returns `true` if the token has expired at `now`.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		now >= self.expires_at
	}

	/// Time left until expiry, negative once expired.
	pub fn remaining_at(&self, now: OffsetDateTime) -> Duration {
		self.expires_at - now
	}

	/// Total lifetime granted by the server.
	pub fn lifetime(&self) -> Duration {
		self.expires_at - self.issued_at
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("value", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`Token`].
#[derive(Clone, Debug, Default)]
pub struct TokenBuilder {
	value: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl TokenBuilder {
	/// Provides the access token value.
	pub fn value(mut self, token: impl Into<String>) -> Self {
		self.value = Some(TokenSecret::new(token));

		self
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets the issued-at instant from a unix timestamp.
	pub fn issued_at_unix(self, timestamp: i64) -> Result<Self, TokenBuildError> {
		Ok(self.issued_at(from_unix(timestamp)?))
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets the absolute expiry instant from a unix timestamp.
	pub fn expires_at_unix(self, timestamp: i64) -> Result<Self, TokenBuildError> {
		Ok(self.expires_at(from_unix(timestamp)?))
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces a [`Token`].
	pub fn build(self) -> Result<Token, TokenBuildError> {
		let value = self
			.value
			.filter(|value| !value.is_empty())
			.ok_or(TokenBuildError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => issued_at + delta,
			(None, None) => return Err(TokenBuildError::MissingExpiry),
		};

		if expires_at <= issued_at {
			return Err(TokenBuildError::NonIncreasingLifetime { issued_at, expires_at });
		}

		Ok(Token { value, issued_at, expires_at })
	}
}

fn from_unix(timestamp: i64) -> Result<OffsetDateTime, TokenBuildError> {
	OffsetDateTime::from_unix_timestamp(timestamp)
		.map_err(|_| TokenBuildError::TimestampOutOfRange { timestamp })
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn validity_respects_safety_margin() {
		let token = Token::builder()
			.value("access")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_at(macros::datetime!(2025-01-01 00:10 UTC))
			.build()
			.expect("Token builder should succeed for validity checks.");
		let margin = Duration::minutes(1);

		assert!(token.is_valid_at(macros::datetime!(2025-01-01 00:08 UTC), margin));
		assert!(!token.is_valid_at(macros::datetime!(2025-01-01 00:09 UTC), margin));
		assert!(!token.is_valid_at(macros::datetime!(2025-01-01 00:09:30 UTC), margin));
		assert!(!token.is_expired_at(macros::datetime!(2025-01-01 00:09:30 UTC)));
		assert!(token.is_expired_at(macros::datetime!(2025-01-01 00:10 UTC)));
		assert_eq!(token.lifetime(), Duration::minutes(10));
	}

	#[test]
	fn builder_rejects_non_increasing_lifetime() {
		let instant = macros::datetime!(2025-01-01 00:00 UTC);
		let err = Token::builder()
			.value("access")
			.issued_at(instant)
			.expires_at(instant)
			.build()
			.expect_err("Expiry equal to issue time should be rejected.");

		assert!(matches!(err, TokenBuildError::NonIncreasingLifetime { .. }));
	}

	#[test]
	fn builder_requires_value_and_expiry() {
		assert_eq!(
			Token::builder().value("").expires_in(Duration::minutes(1)).build(),
			Err(TokenBuildError::MissingAccessToken)
		);
		assert_eq!(Token::builder().value("access").build(), Err(TokenBuildError::MissingExpiry));
	}

	#[test]
	fn builder_handles_unix_timestamps() {
		let token = Token::builder()
			.value("access")
			.issued_at_unix(1_735_689_600)
			.and_then(|builder| builder.expires_at_unix(1_735_690_200))
			.and_then(TokenBuilder::build)
			.expect("Unix timestamps should build a token.");

		assert_eq!(token.issued_at, macros::datetime!(2025-01-01 00:00 UTC));
		assert_eq!(token.expires_at, macros::datetime!(2025-01-01 00:10 UTC));
		assert!(matches!(
			Token::builder().issued_at_unix(i64::MAX),
			Err(TokenBuildError::TimestampOutOfRange { .. })
		));
	}

	#[test]
	fn debug_redacts_value() {
		let token = Token::builder()
			.value("very-secret")
			.expires_in(Duration::minutes(5))
			.build()
			.expect("Token builder should succeed for debug output.");

		assert!(!format!("{token:?}").contains("very-secret"));
	}
}
