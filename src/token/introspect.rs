//! Expiry introspection for self-describing tokens.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::_prelude::*;

/// Extracts the expiry instant embedded in an opaque token.
///
/// `Ok(None)` means the token never expires. Implementations must return an error for a
/// malformed token instead of defaulting; the engine treats that as a data-integrity fault.
pub trait TokenIntrospector
where
	Self: Send + Sync,
{
	/// Returns the expiry embedded in `token`, if any.
	fn expiry_of(&self, token: &str) -> Result<Option<OffsetDateTime>, TokenError>;
}

/// Errors raised while introspecting a token.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TokenError {
	/// The token does not have the `header.payload.signature` shape.
	#[error("Token does not consist of three dot-separated segments.")]
	Shape,
	/// The payload segment is not valid base64url.
	#[error("Token payload is not valid base64url: {message}.")]
	Encoding {
		/// Decoder diagnostic.
		message: String,
	},
	/// The payload is not a JSON object with a numeric `exp` claim.
	#[error("Token payload is not valid JSON: {message}.")]
	Payload {
		/// Parser diagnostic.
		message: String,
	},
	/// The `exp` claim cannot be represented as an instant.
	#[error("Token expiry claim is out of range.")]
	ExpiryOutOfRange,
}

/// Reads the `exp` claim (seconds since the Unix epoch) from a JWT payload.
///
/// The signature is not verified; the token's issuer is trusted for that.
#[derive(Clone, Copy, Debug, Default)]
pub struct JwtIntrospector;
impl TokenIntrospector for JwtIntrospector {
	fn expiry_of(&self, token: &str) -> Result<Option<OffsetDateTime>, TokenError> {
		#[derive(Deserialize)]
		struct Claims {
			exp: Option<f64>,
		}

		let mut segments = token.split('.');
		let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
			(Some(_), Some(payload), Some(_), None) => payload,
			_ => return Err(TokenError::Shape),
		};
		let bytes = URL_SAFE_NO_PAD
			.decode(payload.trim_end_matches('='))
			.map_err(|e| TokenError::Encoding { message: e.to_string() })?;
		let claims: Claims = serde_json::from_slice(&bytes)
			.map_err(|e| TokenError::Payload { message: e.to_string() })?;

		claims.exp.map(expiry_from_unix).transpose()
	}
}

fn expiry_from_unix(exp: f64) -> Result<OffsetDateTime, TokenError> {
	Duration::checked_seconds_f64(exp)
		.and_then(|offset| OffsetDateTime::UNIX_EPOCH.checked_add(offset))
		.ok_or(TokenError::ExpiryOutOfRange)
}
