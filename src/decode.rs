//! Shared body-handling contract for dispatcher responses.
//!
//! Every endpoint decodes through these helpers, so status classification stays identical
//! across the API: non-2xx becomes [`ApiError`], unparseable 2xx bodies become
//! [`DecodeError`].

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{ApiError, DecodeError},
	transport::HttpResponse,
};

/// Parses a success response body into `T`.
pub fn json<T>(response: HttpResponse) -> Result<T>
where
	T: DeserializeOwned,
{
	let (status, body) = ensure_success(response)?;
	let mut deserializer = serde_json::Deserializer::from_slice(&body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| DecodeError { source, status }.into())
}

/// Checks the status of a response whose body is not needed.
pub fn empty(response: HttpResponse) -> Result<()> {
	ensure_success(response).map(|_| ())
}

fn ensure_success(response: HttpResponse) -> Result<(u16, Vec<u8>)> {
	let status = response.status();
	let body = response.into_body();

	if !status.is_success() {
		return Err(ApiError {
			status: status.as_u16(),
			body: String::from_utf8_lossy(&body).into_owned(),
		}
		.into());
	}

	Ok((status.as_u16(), body))
}
