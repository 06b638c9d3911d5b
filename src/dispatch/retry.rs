//! Bounded retry policy and Retry-After extraction for rate-limited responses.

// crates.io
use http::header::{HeaderMap, RETRY_AFTER};
use time::{
	PrimitiveDateTime,
	format_description::{BorrowedFormatItem, well_known::Rfc2822},
	macros::format_description,
	parsing::Parsed,
};
// self
use crate::_prelude::*;

const IMF_FIXDATE: &[BorrowedFormatItem<'static>] = format_description!(
	"[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);
const RFC850_DATE: &[BorrowedFormatItem<'static>] = format_description!(
	"[weekday repr:long], [day]-[month repr:short]-[year repr:last_two] [hour]:[minute]:[second] GMT"
);
const ASCTIME_DATE: &[BorrowedFormatItem<'static>] = format_description!(
	"[weekday repr:short] [month repr:short] [day padding:space] [hour]:[minute]:[second] [year]"
);

/// Delay used when the server omits or garbles its Retry-After hint.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::seconds(1);

/// Bounded retry budget applied to 429 responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	max_attempts: u32,
}
impl RetryPolicy {
	/// Total transport calls allowed per logical request.
	pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

	/// Creates a policy allowing `max_attempts` transport calls (never fewer than one).
	pub const fn new(max_attempts: u32) -> Self {
		Self { max_attempts: if max_attempts == 0 { 1 } else { max_attempts } }
	}

	/// Returns the total number of transport calls allowed.
	pub const fn max_attempts(&self) -> u32 {
		self.max_attempts
	}

	/// Returns `true` if another attempt may follow attempt number `attempt` (1-based).
	pub const fn allows_retry_after(&self, attempt: u32) -> bool {
		attempt < self.max_attempts
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self::new(Self::DEFAULT_MAX_ATTEMPTS)
	}
}

/// Extracts the delay requested by a 429 response.
///
/// Tries integer seconds, then an HTTP-date relative to `now`, then falls back to
/// [`DEFAULT_RETRY_AFTER`]. HTTP-dates in the past yield a non-positive delay.
pub fn parse_retry_after(headers: &HeaderMap, now: OffsetDateTime) -> Duration {
	headers
		.get(RETRY_AFTER)
		.and_then(|value| value.to_str().ok())
		.and_then(|raw| parse_retry_after_value(raw, now))
		.unwrap_or(DEFAULT_RETRY_AFTER)
}

/// Parses one raw Retry-After value, returning `None` when no format matches.
pub fn parse_retry_after_value(raw: &str, now: OffsetDateTime) -> Option<Duration> {
	let raw = raw.trim();

	parse_delay_seconds(raw).or_else(|| parse_http_date(raw, now))
}

fn parse_delay_seconds(raw: &str) -> Option<Duration> {
	let secs = raw.parse::<u64>().ok()?;

	Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)))
}

fn parse_http_date(raw: &str, now: OffsetDateTime) -> Option<Duration> {
	let moment = OffsetDateTime::parse(raw, &Rfc2822)
		.ok()
		.or_else(|| {
			PrimitiveDateTime::parse(raw, IMF_FIXDATE)
				.ok()
				.or_else(|| parse_rfc850(raw))
				.or_else(|| PrimitiveDateTime::parse(raw, ASCTIME_DATE).ok())
				.map(PrimitiveDateTime::assume_utc)
		})?;

	Some(moment - now)
}

// Two-digit years pivot at 69: `69..=99` are 19xx, `00..=68` are 20xx.
fn parse_rfc850(raw: &str) -> Option<PrimitiveDateTime> {
	let mut parsed = Parsed::new();
	let rest = parsed.parse_items(raw.as_bytes(), RFC850_DATE).ok()?;

	if !rest.is_empty() {
		return None;
	}

	let last_two = i32::from(parsed.year_last_two()?);

	parsed.set_year(if last_two >= 69 { 1900 + last_two } else { 2000 + last_two })?;

	PrimitiveDateTime::try_from(parsed).ok()
}
