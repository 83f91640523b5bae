//! Reqwest-backed [`Refresher`] speaking a small JSON rotation protocol.
//!
//! The request body is `{"refresh_token": "<token>"}`. A 2xx response must carry
//! `{"access_token": .., "refresh_token": ..}`. A `401`, or a `400` whose `error` field is
//! `invalid_grant`, rejects the refresh token. Every other response is a transient failure.

// crates.io
use reqwest::StatusCode;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransientError},
	refresh::{RefreshFuture, RefreshOutcome, Refresher},
	token::TokenPair,
};

/// HTTP refresh caller posting to a fixed rotation endpoint.
#[derive(Clone, Debug)]
pub struct HttpRefresher {
	client: ReqwestClient,
	endpoint: Url,
}
impl HttpRefresher {
	/// Builds a refresher with a default reqwest client.
	pub fn new(endpoint: Url) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().build()?;

		Ok(Self::with_client(client, endpoint))
	}

	/// Reuses a caller-configured reqwest client.
	pub fn with_client(client: ReqwestClient, endpoint: Url) -> Self {
		Self { client, endpoint }
	}

	/// Endpoint the refresher posts to.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	async fn exchange(&self, refresh_token: &str) -> Result<RefreshOutcome, TransientError> {
		let response = self
			.client
			.post(self.endpoint.clone())
			.json(&RefreshRequest { refresh_token })
			.send()
			.await?;
		let status = response.status();
		let body = response.bytes().await?;

		if status.is_success() {
			let mut deserializer = serde_json::Deserializer::from_slice(&body);
			let parsed: RefreshResponse = serde_path_to_error::deserialize(&mut deserializer)
				.map_err(|source| TransientError::RefreshResponseParse {
					source: Arc::new(source),
					status: Some(status.as_u16()),
				})?;

			return Ok(RefreshOutcome::Renewed(TokenPair::new(
				parsed.access_token,
				parsed.refresh_token,
			)));
		}
		if rejects_refresh_token(status, &body) {
			return Ok(RefreshOutcome::Invalid);
		}

		Err(TransientError::endpoint(
			format!("refresh endpoint answered with status {status}"),
			Some(status.as_u16()),
		))
	}
}
impl Refresher for HttpRefresher {
	fn refresh<'a>(&'a self, refresh_token: &'a str) -> RefreshFuture<'a> {
		Box::pin(self.exchange(refresh_token))
	}
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
	refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
	access_token: String,
	refresh_token: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
	error: Option<String>,
}

fn rejects_refresh_token(status: StatusCode, body: &[u8]) -> bool {
	match status {
		StatusCode::UNAUTHORIZED => true,
		StatusCode::BAD_REQUEST => serde_json::from_slice::<ErrorResponse>(body)
			.ok()
			.and_then(|payload| payload.error)
			.is_some_and(|error| error == "invalid_grant"),
		_ => false,
	}
}
