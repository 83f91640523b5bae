// self
use crate::{
	error::ErrorKind,
	obs::{RefreshOutcomeLabel, RenewalTrigger},
};

/// Counts refresh calls and their outcomes, labeled by what triggered them.
pub fn record_refresh_outcome(trigger: RenewalTrigger, outcome: RefreshOutcomeLabel) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"token_rotor_refresh_total",
			"trigger" => trigger.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (trigger, outcome);
	}
}

/// Counts control loops stopped by a fatal error.
pub fn record_loop_stop(kind: ErrorKind) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("token_rotor_loop_stopped_total", "error" => kind.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = kind;
	}
}
