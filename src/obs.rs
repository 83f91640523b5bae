//! Optional observability helpers for the renewal engine.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to run engine work inside spans named `token_rotor.renewal` with `trigger`
//!   and `stage` fields, and to log every loop transition as an event.
//! - Enable `metrics` to increment the `token_rotor_refresh_total` counter for every refresh
//!   attempt and outcome, labeled by `trigger` + `outcome`, and the
//!   `token_rotor_loop_stopped_total` counter, labeled by the fatal `error` kind, whenever a
//!   control loop stops. Fatal refresh outcomes use the error kind as their `outcome` label.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::{_prelude::*, error::ErrorKind};

/// What caused a refresh or state write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenewalTrigger {
	/// The background control loop.
	Background,
	/// An explicit `force_refresh` call.
	Forced,
	/// A login, logout, or user switch through `set_pair`.
	SetPair,
}
impl RenewalTrigger {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RenewalTrigger::Background => "background",
			RenewalTrigger::Forced => "forced",
			RenewalTrigger::SetPair => "set_pair",
		}
	}
}
impl Display for RenewalTrigger {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each refresh call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshOutcomeLabel {
	/// A refresh call was dispatched.
	Attempt,
	/// The pair was rotated and persisted.
	Renewed,
	/// The refresh token was rejected and the session cleared.
	Invalid,
	/// The call failed transiently; the lock was left in place.
	Transient,
	/// The call ended in a fatal error of the given kind.
	Fatal(ErrorKind),
}
impl RefreshOutcomeLabel {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshOutcomeLabel::Attempt => "attempt",
			RefreshOutcomeLabel::Renewed => "renewed",
			RefreshOutcomeLabel::Invalid => "invalid",
			RefreshOutcomeLabel::Transient => "transient",
			RefreshOutcomeLabel::Fatal(kind) => kind.as_str(),
		}
	}
}
impl Display for RefreshOutcomeLabel {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
