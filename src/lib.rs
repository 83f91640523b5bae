//! Rotating refresh-token renewal that keeps one access/refresh pair fresh across many concurrent
//! instances sharing a single persisted store, without ever issuing two refresh calls at once.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod clock;
pub mod engine;
pub mod error;
pub mod obs;
pub mod refresh;
pub mod state;
pub mod store;
pub mod token;

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	#[cfg(feature = "reqwest")]
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use engine::{EngineConfig, RenewalEngine, Session};
pub use error::{Error, ErrorKind, Result};
pub use state::State;
pub use token::{TokenPair, TokenSecret};

#[cfg(feature = "reqwest")] pub use reqwest;
#[cfg(feature = "reqwest")] pub use url;
#[cfg(test)] use httpmock as _;
