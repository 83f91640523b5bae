//! Refresh caller contract: exchanges a refresh token for the next pair.

#[cfg(feature = "reqwest")] pub mod http;

#[cfg(feature = "reqwest")] pub use http::HttpRefresher;

// self
use crate::{_prelude::*, error::TransientError, token::TokenPair};

/// Boxed future returned by [`Refresher::refresh`].
pub type RefreshFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RefreshOutcome, TransientError>> + 'a + Send>>;

/// Performs the network round trip that rotates a refresh token.
///
/// Transient failures (network, server errors) are reported as `Err` and retried by the engine
/// once the lock expires. A rejected refresh token is not an error but
/// [`RefreshOutcome::Invalid`]. Returning a pair with an empty token is a contract violation
/// that the engine reports fatally.
pub trait Refresher
where
	Self: Send + Sync,
{
	/// Exchanges `refresh_token` for a new pair.
	fn refresh<'a>(&'a self, refresh_token: &'a str) -> RefreshFuture<'a>;
}

/// Successful result of a refresh round trip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
	/// The refresh token was accepted and rotated.
	Renewed(TokenPair),
	/// The refresh token was rejected; the session must end.
	Invalid,
}
