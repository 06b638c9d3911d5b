//! Demonstrates plugging a custom [`HttpTransport`] into the client.
//!
//! The in-process transport below answers the credential exchange, rate limits the first
//! data request, and then serves it, so the retry loop and error taxonomy are visible without
//! any network access.

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use color_eyre::Result;
use http::{HeaderValue, StatusCode, header::RETRY_AFTER};
use time::OffsetDateTime;
// self
use find_api::{
	auth::Credentials,
	client::Client,
	context::CallContext,
	dispatch::Request,
	error::TransportError,
	transport::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let transport = Arc::new(InProcessTransport::default());
	let credentials = Credentials::new("demo-user", "demo-password");
	let client = Client::<InProcessTransport>::with_transport(credentials, transport.clone())
		.base_url("https://find.invalid")
		.build()?;
	let ctx = CallContext::new();
	let blocks: serde_json::Value =
		client.send_json(&Request::get("/simple/v1/blocks"), &ctx).await?;

	println!("Blocks served after one rate-limit retry: {blocks}.");
	println!("Transport calls so far: {}.", transport.calls.load(Ordering::SeqCst));

	match client.send(&Request::get("/unreachable"), &ctx).await {
		Ok(response) => println!("Unexpected response status: {}.", response.status()),
		Err(e) if e.is_transport() => println!("Transport failure surfaced unchanged: {e}."),
		Err(e) => println!("Unexpected error: {e}."),
	}

	Ok(())
}

#[derive(Default)]
struct InProcessTransport {
	calls: AtomicUsize,
	blocks_served: AtomicUsize,
}
impl InProcessTransport {
	fn respond(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
		match request.uri().path() {
			"/auth/v1/generate" => {
				let now = OffsetDateTime::now_utc().unix_timestamp();
				let body = serde_json::json!({
					"access_token": "in-process",
					"token_type": "Bearer",
					"expires_in": 600,
					"exp": now + 600,
					"iat": now,
				});

				Ok(build(StatusCode::OK, None, body.to_string()))
			},
			"/simple/v1/blocks" if self.blocks_served.fetch_add(1, Ordering::SeqCst) == 0 =>
				Ok(build(StatusCode::TOO_MANY_REQUESTS, Some("1"), String::new())),
			"/simple/v1/blocks" =>
				Ok(build(StatusCode::OK, None, r#"{"blocks":[{"height":1}]}"#.into())),
			_ => Err(TransportError::Io(std::io::Error::new(
				std::io::ErrorKind::ConnectionRefused,
				"no route to host",
			))),
		}
	}
}
impl HttpTransport for InProcessTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let response = self.respond(&request);

		Box::pin(async move { response })
	}
}

fn build(status: StatusCode, retry_after: Option<&'static str>, body: String) -> HttpResponse {
	let mut response = HttpResponse::new(body.into_bytes());

	*response.status_mut() = status;

	if let Some(value) = retry_after {
		response.headers_mut().insert(RETRY_AFTER, HeaderValue::from_static(value));
	}

	response
}
