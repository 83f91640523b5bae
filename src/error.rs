//! Engine-level error taxonomy shared by the renewal loop, public operations, and collaborators.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Canonical engine error exposed by public APIs.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Refresh call failed for a transient reason; retried once the lock expires.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// A stored token could not be introspected.
	#[error(transparent)]
	MalformedToken(#[from] crate::token::TokenError),

	/// The refresh endpoint rejected the refresh token; the session was cleared.
	#[error("Refresh token was rejected; the session has been cleared.")]
	InvalidRefreshToken,
	/// An operation that needs a session ran while the store was blank.
	#[error("No active session.")]
	NoSession,
	/// The refresh collaborator broke its contract by yielding an empty success value.
	#[error("Refresher violated its contract: {reason}.")]
	ContractViolation {
		/// Description of the violated contract.
		reason: String,
	},
	/// The persisted lock stamp changed underneath an in-flight refresh.
	#[error("Lock stamp changed during refresh (expected {expected}, found {found:?}).")]
	LockIntegrity {
		/// Stamp written by this instance before the call.
		expected: OffsetDateTime,
		/// Stamp observed after the call returned.
		found: Option<OffsetDateTime>,
	},
	/// A lock stamp was observed in the future.
	#[error("Lock stamp {locked_at} lies in the future of {now}.")]
	ClockInconsistency {
		/// Persisted lock stamp.
		locked_at: OffsetDateTime,
		/// Clock reading at the time of the check.
		now: OffsetDateTime,
	},
	/// The renewal loop was started while it was already running.
	#[error("Renewal loop is already running.")]
	AlreadyRunning,
}
impl Error {
	/// Returns the taxonomy kind of this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Storage(_) => ErrorKind::Storage,
			Self::Config(_) => ErrorKind::Config,
			Self::Transient(_) => ErrorKind::Transient,
			Self::MalformedToken(_) => ErrorKind::MalformedToken,
			Self::InvalidRefreshToken => ErrorKind::InvalidRefreshToken,
			Self::NoSession => ErrorKind::NoSession,
			Self::ContractViolation { .. } => ErrorKind::ContractViolation,
			Self::LockIntegrity { .. } => ErrorKind::LockIntegrity,
			Self::ClockInconsistency { .. } => ErrorKind::ClockInconsistency,
			Self::AlreadyRunning => ErrorKind::AlreadyRunning,
		}
	}

	/// Returns `true` if this error stops the renewal loop.
	pub fn is_fatal(&self) -> bool {
		self.kind().is_fatal()
	}
}

/// Closed enumeration of error kinds, used to tell fatal errors from absorbed ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// See [`Error::Storage`].
	Storage,
	/// See [`Error::Config`].
	Config,
	/// See [`Error::Transient`].
	Transient,
	/// See [`Error::MalformedToken`].
	MalformedToken,
	/// See [`Error::InvalidRefreshToken`].
	InvalidRefreshToken,
	/// See [`Error::NoSession`].
	NoSession,
	/// See [`Error::ContractViolation`].
	ContractViolation,
	/// See [`Error::LockIntegrity`].
	LockIntegrity,
	/// See [`Error::ClockInconsistency`].
	ClockInconsistency,
	/// See [`Error::AlreadyRunning`].
	AlreadyRunning,
}
impl ErrorKind {
	/// Returns `true` for kinds that terminate the renewal loop of the instance that hit them.
	pub const fn is_fatal(self) -> bool {
		match self {
			Self::Storage
			| Self::Config
			| Self::MalformedToken
			| Self::ContractViolation
			| Self::LockIntegrity
			| Self::ClockInconsistency
			| Self::AlreadyRunning => true,
			Self::Transient | Self::InvalidRefreshToken | Self::NoSession => false,
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Storage => "storage",
			Self::Config => "config",
			Self::Transient => "transient",
			Self::MalformedToken => "malformed_token",
			Self::InvalidRefreshToken => "invalid_refresh_token",
			Self::NoSession => "no_session",
			Self::ContractViolation => "contract_violation",
			Self::LockIntegrity => "lock_integrity",
			Self::ClockInconsistency => "clock_inconsistency",
			Self::AlreadyRunning => "already_running",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Configuration and validation failures raised by the engine.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
	/// `renew_on_ttl` must not be negative.
	#[error("The renew_on_ttl value must not be negative.")]
	NegativeRenewOnTtl,
	/// `lock_expiry` must be positive.
	#[error("The lock_expiry value must be positive.")]
	NonPositiveLockExpiry,
	/// A pinned unique delay lies outside `[0, 1)` seconds.
	#[error("The unique_delay value must lie within [0, 1) seconds.")]
	UniqueDelayOutOfRange,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry once the lock expires).
#[derive(Clone, Debug, ThisError)]
pub enum TransientError {
	/// Refresh endpoint returned an unexpected but non-fatal response.
	#[error("Refresh endpoint returned an unexpected response: {message}.")]
	RefreshEndpoint {
		/// Endpoint- or engine-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Refresh endpoint responded with malformed JSON that could not be parsed.
	#[cfg(feature = "reqwest")]
	#[error("Refresh endpoint returned malformed JSON.")]
	RefreshResponseParse {
		/// Structured parsing failure.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::error::Error>>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Underlying transport reported a network failure.
	#[error("Network error occurred while calling the refresh endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
}
impl TransientError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Arc::new(src) }
	}

	/// Builds an endpoint failure from a plain message.
	pub fn endpoint(message: impl Into<String>, status: Option<u16>) -> Self {
		Self::RefreshEndpoint { message: message.into(), status }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransientError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
