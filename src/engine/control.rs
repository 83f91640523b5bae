//! The per-instance control loop and the refresh attempt it shares with `force_refresh`.
//!
//! Every pass takes exclusive access to the store, reads the committed state, picks exactly one
//! transition, and performs at most one suspending operation (a change notification, a timer,
//! or the refresh call) before looping. The refresh call is the only step that runs outside the
//! critical section; everything that reads or moves `locked_at` runs inside one.

// self
use crate::{
	_prelude::*,
	engine::EngineCore,
	error::TransientError,
	obs::{self, EngineEvent, RefreshOutcomeLabel, RenewalSpan, RenewalTrigger},
	refresh::RefreshOutcome,
	state::State,
	store::{StateReceiver, StoreError, StoreLock},
	token::TokenPair,
};

/// Floor for the renewal sleep, so a zero jitter cannot spin on an exact deadline.
const MIN_SLEEP: Duration = Duration::milliseconds(1);

impl EngineCore {
	/// Drives the state machine until a fatal error stops it.
	pub(crate) async fn run(&self) -> Error {
		let mut changes = self.store.subscribe();

		loop {
			match self.step(&mut changes).await {
				Ok(()) => {},
				Err(e) if e.is_fatal() => return e,
				// Transient and invalid outcomes are settled inside the step.
				Err(_) => {},
			}
		}
	}

	async fn step(&self, changes: &mut StateReceiver) -> Result<()> {
		let lock = self.store.lock().await?;

		changes.mark_unchanged();

		let now = self.clock.now();
		let Some(state) = lock.snapshot().cloned() else {
			lock.release();
			obs::record_event(&EngineEvent::Blank);

			return Self::await_change(changes).await;
		};

		if is_past(self.introspector.expiry_of(state.pair.refresh.expose())?, now) {
			self.store.set(None).await?;
			lock.release();
			self.metrics.record_invalidation();
			obs::record_event(&EngineEvent::RefreshTokenExpired);

			return Ok(());
		}
		if let Some(locked_at) = state.locked_at {
			if now < locked_at {
				self.store.set(None).await?;
				lock.release();
				obs::record_event(&EngineEvent::ClockInconsistency { locked_at });

				return Err(Error::ClockInconsistency { locked_at, now });
			}

			return self.wait_on_lock(lock, &state, now).await;
		}

		match self.introspector.expiry_of(state.pair.auth.expose())? {
			Some(auth_expiry) => {
				let until_renewal = auth_expiry - self.config.renew_on_ttl - now;

				if until_renewal.is_negative() {
					let span = RenewalSpan::new(RenewalTrigger::Background, "refresh");

					return span
						.instrument(self.attempt(
							lock,
							state.pair,
							now,
							RenewalTrigger::Background,
						))
						.await;
				}

				lock.release();

				let sleep = (until_renewal + self.unique_delay).max(MIN_SLEEP);

				obs::record_event(&EngineEvent::Sleeping { sleep });

				// A replaced pair may be due sooner than the one this sleep was computed for.
				tokio::select! {
					_ = self.clock.sleep(sleep) => Ok(()),
					changed = changes.changed() => changed.map_err(|_| StoreError::Closed.into()),
				}
			},
			None => {
				lock.release();

				Self::await_change(changes).await
			},
		}
	}

	/// Sleeps past the lock's expiry, then clears it if nobody replaced it meanwhile.
	async fn wait_on_lock(&self, lock: StoreLock, state: &State, now: OffsetDateTime) -> Result<()> {
		let remaining = state.lock_remaining(now, self.config.lock_expiry).unwrap_or_default();
		let sleep = remaining + self.unique_delay;

		lock.release();
		obs::record_event(&EngineEvent::WaitingOnLock { sleep });
		self.clock.sleep(sleep).await;

		let lock = self.store.lock().await?;

		if let Some(current) = lock.snapshot()
			&& let Some(locked_at) = current.locked_at
			&& state.locked_at == Some(locked_at)
		{
			self.store.set(Some(current.unlocked())).await?;
			self.metrics.record_reclaimed_lock();
			obs::record_event(&EngineEvent::LockReclaimed { locked_at });
		}

		lock.release();

		Ok(())
	}

	/// Stamps a lock, calls the refresher outside the critical section, and settles the result.
	///
	/// `lock` must be held by the caller and is released before the refresh call.
	pub(crate) async fn attempt(
		&self,
		lock: StoreLock,
		pair: TokenPair,
		stamp: OffsetDateTime,
		trigger: RenewalTrigger,
	) -> Result<()> {
		self.store.set(Some(State { pair: pair.clone(), locked_at: Some(stamp) })).await?;
		lock.release();
		self.metrics.record_attempt();
		obs::record_refresh_outcome(trigger, RefreshOutcomeLabel::Attempt);
		obs::record_event(&EngineEvent::RefreshDispatched { locked_at: stamp });

		let result = match self.refresher.refresh(pair.refresh.expose()).await {
			Ok(RefreshOutcome::Renewed(next)) => self.settle_renewed(next, stamp).await,
			Ok(RefreshOutcome::Invalid) => self.settle_invalid().await,
			Err(e) => Err(self.settle_transient(e)),
		};

		obs::record_refresh_outcome(trigger, outcome_label(&result));

		result
	}

	async fn settle_renewed(&self, next: TokenPair, stamp: OffsetDateTime) -> Result<()> {
		if next.is_empty() {
			self.metrics.record_failure();

			return Err(Error::ContractViolation {
				reason: "refresher returned a token pair with an empty token".into(),
			});
		}

		let lock = self.store.lock().await?;
		let found = lock.snapshot().and_then(|current| current.locked_at);

		if found != Some(stamp) {
			self.store.set(None).await?;
			lock.release();
			self.metrics.record_failure();

			return Err(Error::LockIntegrity { expected: stamp, found });
		}

		self.store.set(Some(State::new(next))).await?;
		lock.release();
		self.metrics.record_renewal();
		obs::record_event(&EngineEvent::Renewed);

		Ok(())
	}

	async fn settle_invalid(&self) -> Result<()> {
		let lock = self.store.lock().await?;

		self.store.set(None).await?;
		lock.release();
		self.metrics.record_invalidation();
		obs::record_event(&EngineEvent::Invalidated);

		Err(Error::InvalidRefreshToken)
	}

	fn settle_transient(&self, error: TransientError) -> Error {
		self.metrics.record_failure();
		obs::record_event(&EngineEvent::TransientFailure { error: &error });

		Error::Transient(error)
	}

	async fn await_change(changes: &mut StateReceiver) -> Result<()> {
		changes.changed().await.map_err(|_| StoreError::Closed)?;

		Ok(())
	}
}

fn is_past(expiry: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
	expiry.is_some_and(|expiry| expiry < now)
}

fn outcome_label(result: &Result<()>) -> RefreshOutcomeLabel {
	match result {
		Ok(()) => RefreshOutcomeLabel::Renewed,
		Err(Error::InvalidRefreshToken) => RefreshOutcomeLabel::Invalid,
		Err(Error::Transient(_)) => RefreshOutcomeLabel::Transient,
		Err(e) => RefreshOutcomeLabel::Fatal(e.kind()),
	}
}
