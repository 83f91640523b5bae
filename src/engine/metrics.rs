// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for one engine instance.
#[derive(Debug, Default)]
pub struct RenewalMetrics {
	attempts: AtomicU64,
	renewals: AtomicU64,
	invalidations: AtomicU64,
	failures: AtomicU64,
	reclaimed_locks: AtomicU64,
}
impl RenewalMetrics {
	/// Returns the number of refresh calls this instance dispatched.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh calls that rotated the pair.
	pub fn renewals(&self) -> u64 {
		self.renewals.load(Ordering::Relaxed)
	}

	/// Returns the number of sessions cleared by a rejected or expired refresh token.
	pub fn invalidations(&self) -> u64 {
		self.invalidations.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh calls that failed, transiently or fatally.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	/// Returns the number of abandoned locks this instance cleared.
	pub fn reclaimed_locks(&self) -> u64 {
		self.reclaimed_locks.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_renewal(&self) {
		self.renewals.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_invalidation(&self) {
		self.invalidations.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_reclaimed_lock(&self) {
		self.reclaimed_locks.fetch_add(1, Ordering::Relaxed);
	}
}
