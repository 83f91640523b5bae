//! Renewal engine: one per execution context, all sharing a single [`SessionStore`].
//!
//! Each [`RenewalEngine`] owns two background tasks. The control loop keeps the stored pair
//! fresh, stamping `locked_at` around every refresh call so no two instances ever refresh the
//! same session at once, and reclaiming locks abandoned by instances that died mid-call. The
//! session projection folds store changes into the [`Session`] view. Instances share nothing
//! but the store; none of them coordinates the others.

mod config;
mod control;
mod metrics;
mod session;

pub use config::EngineConfig;
pub use metrics::RenewalMetrics;
pub use session::{Session, TokenHandle};

// crates.io
use tokio::{sync::watch, task::JoinHandle};
// self
use crate::{
	_prelude::*,
	clock::Clock,
	engine::session::SessionProjection,
	obs::{self, EngineEvent, RenewalSpan, RenewalTrigger},
	refresh::Refresher,
	state::State,
	store::SessionStore,
	token::{TokenIntrospector, TokenPair},
};

/// Concurrent, lock-coordinated renewal engine for one client session.
///
/// Must be constructed inside a Tokio runtime. Dropping the engine aborts its tasks; a lock it
/// held at that moment is reclaimed by the remaining instances after
/// `lock_expiry + unique_delay`.
pub struct RenewalEngine {
	core: Arc<EngineCore>,
	runner: Arc<Mutex<LoopState>>,
	session: watch::Receiver<Session>,
	projection: JoinHandle<()>,
}
impl RenewalEngine {
	/// Validates `config`, draws the instance jitter, and starts the session view and control
	/// loop.
	pub fn new(
		store: Arc<dyn SessionStore>,
		clock: Arc<dyn Clock>,
		introspector: Arc<dyn TokenIntrospector>,
		refresher: Arc<dyn Refresher>,
		config: EngineConfig,
	) -> Result<Self> {
		config.validate()?;

		let changes = store.subscribe();
		let (projection, session) = SessionProjection::new(changes.borrow().as_ref());
		let projection = tokio::spawn(projection.run(changes));
		let core = Arc::new(EngineCore {
			unique_delay: config.resolve_unique_delay(),
			store,
			clock,
			introspector,
			refresher,
			config,
			metrics: Default::default(),
		});
		let engine = Self { core, runner: Default::default(), session, projection };

		engine.start()?;

		Ok(engine)
	}

	/// Starts the control loop.
	///
	/// Fails with [`Error::AlreadyRunning`] if the loop of this instance is running.
	pub fn start(&self) -> Result<()> {
		let mut runner = self.runner.lock();

		if runner.is_running() {
			return Err(Error::AlreadyRunning);
		}

		*runner = LoopState::Running { handle: self.spawn_loop() };

		Ok(())
	}

	/// Replaces the session unconditionally: `Some` logs in (or switches user), `None` logs out.
	///
	/// Any lock held by another instance is discarded. Logging in restarts the control loop if
	/// it has stopped.
	pub async fn set_pair(&self, pair: Option<TokenPair>) -> Result<()> {
		let span = RenewalSpan::new(RenewalTrigger::SetPair, "set_pair");
		let result: Result<()> = span
			.instrument(async move {
				let present = pair.is_some();
				let lock = self.core.store.lock().await?;

				self.core.store.set(pair.map(State::new)).await?;
				lock.release();
				obs::record_event(&EngineEvent::PairReplaced { present });

				if present {
					let mut runner = self.runner.lock();

					if !runner.is_running() {
						*runner = LoopState::Running { handle: self.spawn_loop() };
					}
				}

				Ok(())
			})
			.await;

		self.halt_on_fatal(result)
	}

	/// Refreshes the pair now, reporting every failure to the caller instead of retrying.
	///
	/// Fails with [`Error::NoSession`] when logged out and [`Error::InvalidRefreshToken`] when
	/// the refresh token is rejected (the session is cleared). A transient failure leaves the
	/// lock in place for the control loop to reclaim and retry. A fatal failure also stops the
	/// control loop, exactly as if the loop had hit it.
	pub async fn force_refresh(&self) -> Result<()> {
		let span = RenewalSpan::new(RenewalTrigger::Forced, "force_refresh");
		let result: Result<()> = span
			.instrument(async move {
				let lock = self.core.store.lock().await?;
				let Some(state) = lock.snapshot().cloned() else {
					return Err(Error::NoSession);
				};
				let stamp = self.core.clock.now();

				self.core.attempt(lock, state.pair, stamp, RenewalTrigger::Forced).await
			})
			.await;

		self.halt_on_fatal(result)
	}

	/// Two-level session view; see [`Session`].
	pub fn session(&self) -> watch::Receiver<Session> {
		self.session.clone()
	}

	/// Jitter added to every sleep this instance issues.
	pub fn unique_delay(&self) -> Duration {
		self.core.unique_delay
	}

	/// Returns `true` while the control loop runs.
	pub fn is_running(&self) -> bool {
		self.runner.lock().is_running()
	}

	/// The fatal error that stopped the control loop most recently, if any.
	pub fn last_error(&self) -> Option<Arc<Error>> {
		match &*self.runner.lock() {
			LoopState::Stopped { error } => Some(error.clone()),
			_ => None,
		}
	}

	/// Committed pair, read from the store.
	pub async fn current_pair(&self) -> Result<Option<TokenPair>> {
		Ok(self.core.store.get().await?.map(|state| state.pair))
	}

	/// Counters for this instance.
	pub fn metrics(&self) -> &RenewalMetrics {
		&self.core.metrics
	}

	/// Validated configuration of this instance.
	pub fn config(&self) -> &EngineConfig {
		&self.core.config
	}

	fn spawn_loop(&self) -> JoinHandle<()> {
		let core = self.core.clone();
		let runner = self.runner.clone();
		let span = RenewalSpan::new(RenewalTrigger::Background, "control_loop");

		tokio::spawn(span.instrument(async move {
			let error = core.run().await;

			LoopState::halt(&runner, error);
		}))
	}

	fn halt_on_fatal(&self, result: Result<()>) -> Result<()> {
		if let Err(e) = &result
			&& e.is_fatal()
		{
			LoopState::halt(&self.runner, e.clone());
		}

		result
	}
}
impl Debug for RenewalEngine {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RenewalEngine")
			.field("config", &self.core.config)
			.field("unique_delay", &self.core.unique_delay)
			.field("running", &self.is_running())
			.finish()
	}
}
impl Drop for RenewalEngine {
	fn drop(&mut self) {
		self.projection.abort();

		if let LoopState::Running { handle } = &*self.runner.lock() {
			handle.abort();
		}
	}
}

/// State shared between an engine handle and its control loop task.
pub(crate) struct EngineCore {
	pub(crate) store: Arc<dyn SessionStore>,
	pub(crate) clock: Arc<dyn Clock>,
	pub(crate) introspector: Arc<dyn TokenIntrospector>,
	pub(crate) refresher: Arc<dyn Refresher>,
	pub(crate) config: EngineConfig,
	pub(crate) unique_delay: Duration,
	pub(crate) metrics: RenewalMetrics,
}

#[derive(Debug, Default)]
enum LoopState {
	#[default]
	Idle,
	Running {
		handle: JoinHandle<()>,
	},
	Stopped {
		error: Arc<Error>,
	},
}
impl LoopState {
	fn is_running(&self) -> bool {
		matches!(self, Self::Running { handle } if !handle.is_finished())
	}

	/// Aborts a running loop and records the error that stopped it.
	fn halt(runner: &Mutex<LoopState>, error: Error) {
		let mut state = runner.lock();

		if let Self::Running { handle } = &*state {
			handle.abort();
		}

		obs::record_event(&EngineEvent::Stopped { error: &error });
		obs::record_loop_stop(error.kind());
		*state = Self::Stopped { error: Arc::new(error) };
	}
}
