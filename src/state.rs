//! The single persisted session record shared by every engine instance.

// self
use crate::{_prelude::*, token::TokenPair};

/// Persisted session: the live pair plus the stamp of an in-flight (or abandoned) refresh.
///
/// The store holds `Option<State>`; `None` is the blank, logged-out state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
	/// Current token pair.
	pub pair: TokenPair,
	/// Clock reading at which some instance began a refresh call.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub locked_at: Option<OffsetDateTime>,
}
impl State {
	/// Creates an unlocked state for `pair`.
	pub fn new(pair: TokenPair) -> Self {
		Self { pair, locked_at: None }
	}

	/// Returns a copy of this state stamped with `locked_at`.
	pub fn locked(&self, locked_at: OffsetDateTime) -> Self {
		Self { pair: self.pair.clone(), locked_at: Some(locked_at) }
	}

	/// Returns a copy of this state with the lock removed.
	pub fn unlocked(&self) -> Self {
		Self { pair: self.pair.clone(), locked_at: None }
	}

	/// Returns `true` if a refresh stamp is present.
	pub fn is_locked(&self) -> bool {
		self.locked_at.is_some()
	}

	/// Time left before the lock counts as abandoned, clamped at zero; `None` when unlocked.
	pub fn lock_remaining(&self, now: OffsetDateTime, lock_expiry: Duration) -> Option<Duration> {
		self.locked_at.map(|locked_at| (locked_at + lock_expiry - now).max(Duration::ZERO))
	}
}
