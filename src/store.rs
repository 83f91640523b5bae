//! Shared state store contract and the built-in implementations.
//!
//! Every engine instance talks to the same [`SessionStore`]. The store persists one optional
//! [`State`], broadcasts committed changes to subscribers, and hands out an exclusive-access
//! [`StoreLock`] whose snapshot is exactly the state committed by the previous holder. Any
//! backend (in-process map, external key-value service, IPC bridge) honouring that contract can
//! drive the engine.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// crates.io
use tokio::sync::watch;
// self
use crate::{_prelude::*, state::State};

/// Boxed future returned by [`SessionStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Receiver half of a store subscription; its value is the latest committed state.
pub type StateReceiver = watch::Receiver<Option<State>>;

/// Storage backend contract shared by all engine instances of one session.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Reads the committed state.
	fn get(&self) -> StoreFuture<'_, Option<State>>;

	/// Replaces the committed state; `None` clears the session.
	fn set(&self, state: Option<State>) -> StoreFuture<'_, ()>;

	/// Subscribes to committed changes.
	///
	/// The returned receiver has already seen the current value; call
	/// [`watch::Receiver::mark_changed`] to have it fire immediately.
	fn subscribe(&self) -> StateReceiver;

	/// Waits for exclusive access across every user of the store.
	///
	/// Only one [`StoreLock`] exists at a time. Its snapshot is the state committed by the most
	/// recent holder, with no intervening writer. Dropping the lock releases it.
	fn lock(&self) -> StoreFuture<'_, StoreLock>;
}

/// Exclusive access to a [`SessionStore`] plus the state observed when it was granted.
pub struct StoreLock {
	snapshot: Option<State>,
	_release: Box<dyn Send + Sync>,
}
impl StoreLock {
	/// Wraps a backend-specific release handle; dropping `release` must release the lock.
	pub fn new(snapshot: Option<State>, release: impl 'static + Send + Sync) -> Self {
		Self { snapshot, _release: Box::new(release) }
	}

	/// State committed at the moment the lock was granted.
	pub fn snapshot(&self) -> Option<&State> {
		self.snapshot.as_ref()
	}

	/// Releases exclusive access.
	pub fn release(self) {}
}
impl Debug for StoreLock {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StoreLock").field("snapshot", &self.snapshot).finish_non_exhaustive()
	}
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// The store stopped broadcasting changes.
	#[error("State store closed its change feed.")]
	Closed,
}
