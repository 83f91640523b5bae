//! Thread-safe in-memory [`SessionStore`] shared by engine instances within one process.

// crates.io
use tokio::sync::watch;
// self
use crate::{
	_prelude::*,
	state::State,
	store::{SessionStore, StateReceiver, StoreFuture, StoreLock},
};

/// In-process store; clones share the same state, change feed, and exclusive-access mutex.
#[derive(Clone, Debug)]
pub struct MemoryStore(Arc<MemoryInner>);
impl MemoryStore {
	/// Creates a store seeded with `state`.
	pub fn with_state(state: Option<State>) -> Self {
		let (state, _) = watch::channel(state);

		Self(Arc::new(MemoryInner { state, exclusive: Default::default() }))
	}

	/// Returns the committed state without awaiting.
	pub fn snapshot(&self) -> Option<State> {
		self.0.state.borrow().clone()
	}

	fn set_now(&self, next: Option<State>) {
		self.0.state.send_if_modified(|current| {
			if *current == next {
				return false;
			}

			*current = next;

			true
		});
	}
}
impl Default for MemoryStore {
	fn default() -> Self {
		Self::with_state(None)
	}
}
impl SessionStore for MemoryStore {
	fn get(&self) -> StoreFuture<'_, Option<State>> {
		Box::pin(async move { Ok(self.snapshot()) })
	}

	fn set(&self, state: Option<State>) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.set_now(state);

			Ok(())
		})
	}

	fn subscribe(&self) -> StateReceiver {
		self.0.state.subscribe()
	}

	fn lock(&self) -> StoreFuture<'_, StoreLock> {
		let exclusive = self.0.exclusive.clone();

		Box::pin(async move {
			let guard = exclusive.lock_arc().await;

			Ok(StoreLock::new(self.snapshot(), guard))
		})
	}
}

#[derive(Debug)]
struct MemoryInner {
	state: watch::Sender<Option<State>>,
	exclusive: Arc<AsyncMutex<()>>,
}
