//! Engine configuration: renewal lead time, lock expiry, and per-instance jitter.

// crates.io
use rand::Rng;
// self
use crate::{_prelude::*, error::ConfigError};

/// Tunables supplied when constructing a [`RenewalEngine`](crate::engine::RenewalEngine).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
	/// Lead time before access-token expiry at which renewal starts.
	pub renew_on_ttl: Duration,
	/// Age after which a held lock counts as abandoned and may be reclaimed.
	pub lock_expiry: Duration,
	/// Pinned per-instance jitter in `[0, 1)` seconds; drawn at random when `None`.
	pub unique_delay: Option<Duration>,
}
impl EngineConfig {
	const DEFAULT_LOCK_EXPIRY: Duration = Duration::seconds(30);
	const DEFAULT_RENEW_ON_TTL: Duration = Duration::seconds(60);

	/// Overrides the renewal lead time (defaults to 60 seconds).
	pub fn with_renew_on_ttl(mut self, renew_on_ttl: Duration) -> Self {
		self.renew_on_ttl = renew_on_ttl;

		self
	}

	/// Overrides the lock expiry (defaults to 30 seconds).
	pub fn with_lock_expiry(mut self, lock_expiry: Duration) -> Self {
		self.lock_expiry = lock_expiry;

		self
	}

	/// Pins the per-instance jitter instead of drawing it at random.
	pub fn with_unique_delay(mut self, unique_delay: Duration) -> Self {
		self.unique_delay = Some(unique_delay);

		self
	}

	/// Checks every value against its allowed range.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.renew_on_ttl.is_negative() {
			return Err(ConfigError::NegativeRenewOnTtl);
		}
		if !self.lock_expiry.is_positive() {
			return Err(ConfigError::NonPositiveLockExpiry);
		}
		if let Some(delay) = self.unique_delay
			&& (delay.is_negative() || delay >= Duration::SECOND)
		{
			return Err(ConfigError::UniqueDelayOutOfRange);
		}

		Ok(())
	}

	/// Returns the pinned jitter, or draws a fresh one from `[0, 1)` seconds.
	pub(crate) fn resolve_unique_delay(&self) -> Duration {
		self.unique_delay
			.unwrap_or_else(|| Duration::seconds_f64(rand::rng().random_range(0.0..1.0)))
	}
}
impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			renew_on_ttl: Self::DEFAULT_RENEW_ON_TTL,
			lock_expiry: Self::DEFAULT_LOCK_EXPIRY,
			unique_delay: None,
		}
	}
}
