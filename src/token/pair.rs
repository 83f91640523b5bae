//! Access/refresh token pair rotated on every renewal.

// self
use crate::{_prelude::*, token::TokenSecret};

/// The access (`auth`) and refresh tokens of one session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
	/// Short-lived access token presented on every request.
	pub auth: TokenSecret,
	/// Single-use refresh token exchanged for the next pair.
	pub refresh: TokenSecret,
}
impl TokenPair {
	/// Creates a pair from raw token strings.
	pub fn new(auth: impl Into<TokenSecret>, refresh: impl Into<TokenSecret>) -> Self {
		Self { auth: auth.into(), refresh: refresh.into() }
	}

	/// Returns `true` if either token is empty, which no valid refresh response produces.
	pub fn is_empty(&self) -> bool {
		self.auth.is_empty() || self.refresh.is_empty()
	}
}
impl Debug for TokenPair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenPair")
			.field("auth", &"<redacted>")
			.field("refresh", &"<redacted>")
			.finish()
	}
}
