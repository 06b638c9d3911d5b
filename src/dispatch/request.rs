//! Request descriptors handed to the dispatcher by endpoint builders.

// crates.io
use http::Method;
// self
use crate::_prelude::*;

/// Immutable description of one logical API call.
///
/// Query parameters are kept sorted so identical descriptors always render identical URLs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
	/// HTTP method.
	pub method: Method,
	/// Path appended to the dispatcher's base URL (for example `/simple/v1/blocks`).
	pub path: String,
	/// Query parameters.
	pub query: BTreeMap<String, String>,
	/// Whether the dispatcher must attach a bearer token.
	pub requires_auth: bool,
}
impl Request {
	/// Creates an authenticated request for `method` + `path`.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), query: BTreeMap::new(), requires_auth: true }
	}

	/// Shorthand for an authenticated `GET`.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shorthand for an authenticated `POST`.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Adds or replaces a query parameter.
	pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.query.insert(key.into(), value.to_string());

		self
	}

	/// Adds a query parameter only when `value` is present.
	pub fn with_optional_query<V>(self, key: impl Into<String>, value: Option<V>) -> Self
	where
		V: ToString,
	{
		match value {
			Some(value) => self.with_query(key, value),
			None => self,
		}
	}

	/// Marks the request as not requiring a bearer token.
	pub fn unauthenticated(mut self) -> Self {
		self.requires_auth = false;

		self
	}

	/// Resolves the absolute URL against `base_url` (path appended verbatim).
	pub fn url(&self, base_url: &str) -> Result<Url> {
		let raw = format!("{}{}", base_url.trim_end_matches('/'), self.path);
		let mut url = Url::parse(&raw).map_err(|source| crate::error::ConfigError::InvalidPath {
			path: self.path.clone(),
			source,
		})?;

		if !self.query.is_empty() {
			url.query_pairs_mut().extend_pairs(self.query.iter());
		}

		Ok(url)
	}
}
