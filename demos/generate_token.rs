//! Demonstrates minting a bearer token and issuing an authenticated request.
//!
//! Set `FIND_API_USERNAME` and `FIND_API_PASSWORD` to talk to the production endpoint;
//! otherwise a local mock server stands in for it.

// std
use std::env;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime};
// self
use find_api::{
	auth::Credentials,
	client::Client,
	context::CallContext,
	dispatch::Request,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let client = match (env::var("FIND_API_USERNAME"), env::var("FIND_API_PASSWORD")) {
		(Ok(username), Ok(password)) => Client::new(username, password)?,
		_ => {
			mock_api(&server).await;

			Client::builder(Credentials::new("demo-user", "demo-password"))
				.base_url(server.base_url())
				.build()?
		},
	};
	let ctx = CallContext::new().with_timeout(std::time::Duration::from_secs(30));
	let token = client.generate_token(Duration::minutes(10), &ctx).await?;

	println!(
		"Credential exchange issued a {} token valid for {} seconds.",
		token.token_type, token.expires_in
	);

	let blocks: serde_json::Value =
		client.send_json(&Request::get("/simple/v1/blocks").with_query("limit", 1), &ctx).await?;

	println!("Latest blocks: {blocks}.");
	println!("Token cache refresh metrics: {:?}.", client.token_cache().metrics());

	Ok(())
}

async fn mock_api(server: &MockServer) {
	let now = OffsetDateTime::now_utc().unix_timestamp();
	let body = serde_json::json!({
		"access_token": "demo-access",
		"token_type": "Bearer",
		"expires_in": 600,
		"exp": now + 600,
		"iat": now,
	});

	server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/v1/generate");
			then.status(200).json_body(body);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/simple/v1/blocks").header("authorization", "Bearer demo-access");
			then.status(200).json_body(serde_json::json!({ "blocks": [{ "height": 96708412 }] }));
		})
		.await;
}
