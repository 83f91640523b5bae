// self
use crate::{_prelude::*, obs::RenewalTrigger};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedRenewal<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedRenewal<F> = F;

/// A span builder used by engine operations.
#[derive(Clone, Debug)]
pub struct RenewalSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RenewalSpan {
	/// Creates a new span tagged with the provided trigger + stage.
	pub fn new(trigger: RenewalTrigger, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("token_rotor.renewal", trigger = trigger.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (trigger, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedRenewal<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Notable transitions of the renewal loop and public operations.
#[derive(Debug)]
pub enum EngineEvent<'a> {
	/// No session is stored; waiting for a change notification.
	Blank,
	/// The refresh token expired locally; the session was cleared.
	RefreshTokenExpired,
	/// A lock stamp lies in the future; the session was cleared.
	ClockInconsistency {
		/// Offending stamp.
		locked_at: OffsetDateTime,
	},
	/// Watching a lock held by this or another instance.
	WaitingOnLock {
		/// Sleep issued before re-checking the lock.
		sleep: Duration,
	},
	/// A lock outlived `lock_expiry` unchanged and was cleared.
	LockReclaimed {
		/// Stamp of the abandoned attempt.
		locked_at: OffsetDateTime,
	},
	/// A refresh call was dispatched under a fresh stamp.
	RefreshDispatched {
		/// Stamp written before the call.
		locked_at: OffsetDateTime,
	},
	/// The pair was rotated and persisted.
	Renewed,
	/// The refresh token was rejected; the session was cleared.
	Invalidated,
	/// The refresh call failed transiently; the lock stays in place.
	TransientFailure {
		/// Failure reported by the refresher.
		error: &'a dyn StdError,
	},
	/// The access token is fresh; sleeping until the renewal deadline.
	Sleeping {
		/// Sleep issued before the next evaluation.
		sleep: Duration,
	},
	/// The session was replaced through `set_pair`.
	PairReplaced {
		/// Whether a session is present afterwards.
		present: bool,
	},
	/// A fatal error stopped the loop.
	Stopped {
		/// Error that ended the loop.
		error: &'a Error,
	},
}

/// Logs an engine event (when tracing is enabled).
pub fn record_event(event: &EngineEvent<'_>) {
	#[cfg(feature = "tracing")]
	{
		match event {
			EngineEvent::Blank => tracing::debug!("no session stored; awaiting change"),
			EngineEvent::RefreshTokenExpired => tracing::info!("refresh token expired; session cleared"),
			EngineEvent::ClockInconsistency { locked_at } =>
				tracing::error!(%locked_at, "lock stamp lies in the future; session cleared"),
			EngineEvent::WaitingOnLock { sleep } =>
				tracing::debug!(sleep_ms = sleep.whole_milliseconds() as i64, "waiting on lock"),
			EngineEvent::LockReclaimed { locked_at } =>
				tracing::warn!(%locked_at, "abandoned lock reclaimed"),
			EngineEvent::RefreshDispatched { locked_at } =>
				tracing::debug!(%locked_at, "refresh dispatched"),
			EngineEvent::Renewed => tracing::debug!("token pair renewed"),
			EngineEvent::Invalidated => tracing::info!("refresh token rejected; session cleared"),
			EngineEvent::TransientFailure { error } =>
				tracing::warn!(error = %error, "refresh failed; lock left in place"),
			EngineEvent::Sleeping { sleep } =>
				tracing::debug!(sleep_ms = sleep.whole_milliseconds() as i64, "sleeping until renewal"),
			EngineEvent::PairReplaced { present } => tracing::info!(present, "token pair replaced"),
			EngineEvent::Stopped { error } =>
				tracing::error!(kind = %error.kind(), error = %error, "renewal loop stopped"),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = event;
	}
}
