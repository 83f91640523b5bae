//! Session view: a reactive projection of the store onto "logged out" or a live access token.
//!
//! The outer [`Session`] value changes only when a session appears or disappears. While logged
//! in, the [`TokenHandle`] it carries tracks `pair.auth` and fires only when that string
//! changes, so lock/unlock churn on an unchanged pair stays silent. Logging out drops the
//! handle's sender, which ends every outstanding handle.

// crates.io
use tokio::sync::watch;
// self
use crate::{state::State, store::StateReceiver, token::TokenSecret};

/// Login state observed by one engine instance.
#[derive(Clone, Debug)]
pub enum Session {
	/// No session is stored.
	LoggedOut,
	/// A session is stored; the handle follows its access token.
	LoggedIn(TokenHandle),
}
impl Session {
	/// Returns `true` while a session is present.
	pub fn is_logged_in(&self) -> bool {
		matches!(self, Self::LoggedIn(_))
	}

	/// Current access token, if logged in.
	pub fn token(&self) -> Option<TokenSecret> {
		match self {
			Self::LoggedOut => None,
			Self::LoggedIn(handle) => Some(handle.current()),
		}
	}
}

/// Reactive cell holding the live access token of one login.
#[derive(Clone, Debug)]
pub struct TokenHandle(watch::Receiver<TokenSecret>);
impl TokenHandle {
	/// Current access token.
	pub fn current(&self) -> TokenSecret {
		self.0.borrow().clone()
	}

	/// Waits for the access token to change; returns `false` once the session has ended.
	pub async fn changed(&mut self) -> bool {
		self.0.changed().await.is_ok()
	}

	/// Returns `true` if the access token changed since it was last read through this handle.
	pub fn has_changed(&self) -> bool {
		self.0.has_changed().unwrap_or(false)
	}

	/// Returns `true` once the login this handle belongs to has ended.
	pub fn is_ended(&self) -> bool {
		self.0.has_changed().is_err()
	}
}

/// Subscription-management state that folds store changes into the two-level view.
#[derive(Debug)]
pub(crate) struct SessionProjection {
	outer: watch::Sender<Session>,
	inner: Option<watch::Sender<TokenSecret>>,
}
impl SessionProjection {
	pub(crate) fn new(initial: Option<&State>) -> (Self, watch::Receiver<Session>) {
		let inner = initial.map(|state| watch::channel(state.pair.auth.clone()));
		let session = match &inner {
			Some((_, handle)) => Session::LoggedIn(TokenHandle(handle.clone())),
			None => Session::LoggedOut,
		};
		let (outer, view) = watch::channel(session);

		(Self { outer, inner: inner.map(|(token, _)| token) }, view)
	}

	pub(crate) fn apply(&mut self, state: Option<&State>) {
		match (state, &self.inner) {
			(None, None) => {},
			(None, Some(_)) => {
				self.inner = None;
				self.outer.send_replace(Session::LoggedOut);
			},
			(Some(state), Some(token)) => {
				token.send_if_modified(|current| {
					if *current == state.pair.auth {
						return false;
					}

					*current = state.pair.auth.clone();

					true
				});
			},
			(Some(state), None) => {
				let (token, handle) = watch::channel(state.pair.auth.clone());

				self.inner = Some(token);
				self.outer.send_replace(Session::LoggedIn(TokenHandle(handle)));
			},
		}
	}

	pub(crate) async fn run(mut self, mut changes: StateReceiver) {
		while changes.changed().await.is_ok() {
			let state = changes.borrow_and_update().clone();

			self.apply(state.as_ref());
		}
	}
}
