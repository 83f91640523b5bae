//! Shared fixtures: paused-clock harness, token minting, and a scripted refresher.

#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use parking_lot::Mutex;
use time::{Duration, OffsetDateTime, macros};
use tokio::sync::oneshot;
// self
use token_rotor::{
	EngineConfig, RenewalEngine, Session, TokenPair,
	clock::{Clock, TokioClock},
	error::TransientError,
	refresh::{RefreshFuture, RefreshOutcome, Refresher},
	store::MemoryStore,
	token::JwtIntrospector,
};

pub const T0: OffsetDateTime = macros::datetime!(2025-01-01 00:00 UTC);

type Reply = Result<RefreshOutcome, TransientError>;

/// One scripted answer of [`ScriptedRefresher`].
pub enum Script {
	Reply(Reply),
	Gate(oneshot::Receiver<Reply>),
	Hang,
}

/// Refresher that replays scripted answers and records concurrency.
///
/// An exhausted script answers with a transient failure.
#[derive(Default)]
pub struct ScriptedRefresher {
	script: Mutex<VecDeque<Script>>,
	seen: Mutex<Vec<String>>,
	calls: AtomicUsize,
	in_flight: AtomicUsize,
	max_in_flight: AtomicUsize,
}
impl ScriptedRefresher {
	pub fn push(&self, reply: Reply) {
		self.script.lock().push_back(Script::Reply(reply));
	}

	pub fn push_renewed(&self, pair: TokenPair) {
		self.push(Ok(RefreshOutcome::Renewed(pair)));
	}

	pub fn push_hang(&self) {
		self.script.lock().push_back(Script::Hang);
	}

	pub fn push_gate(&self) -> oneshot::Sender<Reply> {
		let (tx, rx) = oneshot::channel();

		self.script.lock().push_back(Script::Gate(rx));

		tx
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn in_flight(&self) -> usize {
		self.in_flight.load(Ordering::SeqCst)
	}

	pub fn max_in_flight(&self) -> usize {
		self.max_in_flight.load(Ordering::SeqCst)
	}

	pub fn seen(&self) -> Vec<String> {
		self.seen.lock().clone()
	}
}
impl Refresher for ScriptedRefresher {
	fn refresh<'a>(&'a self, refresh_token: &'a str) -> RefreshFuture<'a> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.seen.lock().push(refresh_token.to_owned());

			let _flight = InFlight::enter(self);
			let next = self.script.lock().pop_front();

			match next {
				Some(Script::Reply(reply)) => reply,
				Some(Script::Gate(gate)) => gate.await.unwrap_or_else(|_| Err(transient())),
				Some(Script::Hang) => std::future::pending().await,
				None => Err(transient()),
			}
		})
	}
}

struct InFlight<'a>(&'a ScriptedRefresher);
impl<'a> InFlight<'a> {
	fn enter(refresher: &'a ScriptedRefresher) -> Self {
		let now = refresher.in_flight.fetch_add(1, Ordering::SeqCst) + 1;

		refresher.max_in_flight.fetch_max(now, Ordering::SeqCst);

		Self(refresher)
	}
}
impl Drop for InFlight<'_> {
	fn drop(&mut self) {
		self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
	}
}

pub fn transient() -> TransientError {
	TransientError::endpoint("service unavailable", Some(503))
}

/// Mints an unsigned JWT whose payload carries `exp` and a label keeping tokens distinct.
pub fn mint(label: &str, exp: OffsetDateTime) -> String {
	let payload = serde_json::json!({ "jti": label, "exp": exp.unix_timestamp() });

	format!("eyJhbGciOiJub25lIn0.{}.sig", URL_SAFE_NO_PAD.encode(payload.to_string()))
}

/// Store, clock, and refresher shared by every engine of one test.
pub struct Harness {
	pub store: MemoryStore,
	pub clock: TokioClock,
	pub refresher: Arc<ScriptedRefresher>,
}
impl Harness {
	/// Must run inside a paused Tokio runtime.
	pub fn new() -> Self {
		Self::with_store(MemoryStore::default())
	}

	pub fn with_store(store: MemoryStore) -> Self {
		Self { store, clock: TokioClock::anchored_at(T0), refresher: Default::default() }
	}

	pub fn engine(&self, config: EngineConfig) -> RenewalEngine {
		RenewalEngine::new(
			Arc::new(self.store.clone()),
			Arc::new(self.clock),
			Arc::new(JwtIntrospector),
			self.refresher.clone(),
			config,
		)
		.expect("Engine fixture should build.")
	}

	/// Pair whose tokens expire `auth_ttl` and `refresh_ttl` seconds from now.
	pub fn pair(&self, label: &str, auth_ttl: i64, refresh_ttl: i64) -> TokenPair {
		let now = self.clock.now();

		TokenPair::new(
			mint(&format!("{label}-auth"), now + Duration::seconds(auth_ttl)),
			mint(&format!("{label}-refresh"), now + Duration::seconds(refresh_ttl)),
		)
	}

	pub fn elapsed(&self) -> Duration {
		self.clock.now() - T0
	}
}

pub fn config(renew_on_ttl: i64, lock_expiry: i64, unique_delay_ms: i64) -> EngineConfig {
	EngineConfig::default()
		.with_renew_on_ttl(Duration::seconds(renew_on_ttl))
		.with_lock_expiry(Duration::seconds(lock_expiry))
		.with_unique_delay(Duration::milliseconds(unique_delay_ms))
}

/// Lets every spawned task run until it blocks again.
pub async fn settle() {
	for _ in 0..64 {
		tokio::task::yield_now().await;
	}
}

/// Sleeps on the paused clock for `millis`, letting Tokio auto-advance through every timer due
/// in between so each task wakes at its exact deadline, then settles.
pub async fn advance_ms(millis: u64) {
	tokio::time::sleep(std::time::Duration::from_millis(millis)).await;
	settle().await;
}

/// Same as [`advance_ms`] in whole seconds.
pub async fn advance_secs(secs: u64) {
	advance_ms(secs * 1_000).await;
}

pub fn token_of(engine: &RenewalEngine) -> Option<String> {
	let session: Session = engine.session().borrow().clone();

	session.token().map(|token| token.expose().to_owned())
}
