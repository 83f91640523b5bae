//! Time source and delay primitive used by the renewal loop.

// self
use crate::_prelude::*;

/// Boxed future returned by [`Clock::sleep`].
pub type SleepFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Time source shared by engine instances.
///
/// `now` must be comparable across instances that share a store, since lock stamps written by
/// one instance are checked against another's clock.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Current instant.
	fn now(&self) -> OffsetDateTime;

	/// Completes once at least `duration` has elapsed; negative durations complete immediately.
	fn sleep(&self, duration: Duration) -> SleepFuture;
}

/// Wall-clock-anchored clock that advances on Tokio's monotonic timer.
///
/// Under a paused Tokio runtime both `now` and `sleep` follow `tokio::time::advance`, which
/// lets tests step many engines through a shared timeline.
#[derive(Clone, Copy, Debug)]
pub struct TokioClock {
	anchor: OffsetDateTime,
	origin: tokio::time::Instant,
}
impl TokioClock {
	/// Anchors the clock at the current UTC time.
	pub fn new() -> Self {
		Self::anchored_at(OffsetDateTime::now_utc())
	}

	/// Anchors the clock at `anchor`; `now()` returns it until Tokio time moves on.
	pub fn anchored_at(anchor: OffsetDateTime) -> Self {
		Self { anchor, origin: tokio::time::Instant::now() }
	}
}
impl Default for TokioClock {
	fn default() -> Self {
		Self::new()
	}
}
impl Clock for TokioClock {
	fn now(&self) -> OffsetDateTime {
		self.anchor + self.origin.elapsed()
	}

	fn sleep(&self, duration: Duration) -> SleepFuture {
		let duration = std::time::Duration::try_from(duration).unwrap_or_default();

		Box::pin(tokio::time::sleep(duration))
	}
}
