//! File-backed [`SessionStore`] that keeps the session across process restarts.
//!
//! Notifications and exclusive access cover the engines of one process; the file only adds
//! durability. Instances in other processes need a store with its own change feed.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// crates.io
use tokio::sync::watch;
// self
use crate::{
	_prelude::*,
	state::State,
	store::{SessionStore, StateReceiver, StoreError, StoreFuture, StoreLock},
};

/// Persists the session to a JSON file after each committed change.
#[derive(Clone, Debug)]
pub struct FileStore(Arc<FileInner>);
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading an existing session.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		ensure_parent_exists(&path)?;

		let (state, _) = watch::channel(load_snapshot(&path)?);

		Ok(Self(Arc::new(FileInner { path, state, exclusive: Default::default() })))
	}

	/// Path of the backing file.
	pub fn path(&self) -> &Path {
		&self.0.path
	}

	fn commit(&self, next: Option<State>) -> Result<(), StoreError> {
		if *self.0.state.borrow() == next {
			return Ok(());
		}

		persist(&self.0.path, next.as_ref())?;
		self.0.state.send_replace(next);

		Ok(())
	}
}
impl SessionStore for FileStore {
	fn get(&self) -> StoreFuture<'_, Option<State>> {
		Box::pin(async move { Ok(self.0.state.borrow().clone()) })
	}

	fn set(&self, state: Option<State>) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.commit(state) })
	}

	fn subscribe(&self) -> StateReceiver {
		self.0.state.subscribe()
	}

	fn lock(&self) -> StoreFuture<'_, StoreLock> {
		let exclusive = self.0.exclusive.clone();

		Box::pin(async move {
			let guard = exclusive.lock_arc().await;

			Ok(StoreLock::new(self.0.state.borrow().clone(), guard))
		})
	}
}

#[derive(Debug)]
struct FileInner {
	path: PathBuf,
	state: watch::Sender<Option<State>>,
	exclusive: Arc<AsyncMutex<()>>,
}

fn load_snapshot(path: &Path) -> Result<Option<State>, StoreError> {
	if !path.exists() {
		return Ok(None);
	}

	let bytes = fs::read(path).map_err(|e| StoreError::Backend {
		message: format!("Failed to read {}: {e}", path.display()),
	})?;

	if bytes.is_empty() {
		return Ok(None);
	}

	serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
		message: format!("Failed to parse {}: {e}", path.display()),
	})
}

fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
			message: format!("Failed to create store directory {}: {e}", parent.display()),
		})?;
	}

	Ok(())
}

fn persist(path: &Path, state: Option<&State>) -> Result<(), StoreError> {
	ensure_parent_exists(path)?;

	let serialized = serde_json::to_vec_pretty(&state).map_err(|e| StoreError::Serialization {
		message: format!("Failed to serialize session snapshot: {e}"),
	})?;
	let mut tmp_path = path.to_path_buf();

	tmp_path.set_extension("tmp");

	{
		let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
			message: format!("Failed to create {}: {e}", tmp_path.display()),
		})?;

		file.write_all(&serialized).map_err(|e| StoreError::Backend {
			message: format!("Failed to write {}: {e}", tmp_path.display()),
		})?;
		file.sync_all().map_err(|e| StoreError::Backend {
			message: format!("Failed to sync {}: {e}", tmp_path.display()),
		})?;
	}

	fs::rename(&tmp_path, path).map_err(|e| StoreError::Backend {
		message: format!("Failed to replace {}: {e}", path.display()),
	})
}
