// self
use crate::obs::{FlowKind, FlowOutcome};

/// Counter incremented once per recorded flow outcome.
pub const FLOW_COUNTER: &str = "token_broker_flow_total";

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			FLOW_COUNTER,
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashSet;
	// self
	use super::*;

	const KINDS: [FlowKind; 3] = [FlowKind::Token, FlowKind::Refresh, FlowKind::ClientCredentials];
	const OUTCOMES: [FlowOutcome; 4] =
		[FlowOutcome::Attempt, FlowOutcome::CacheHit, FlowOutcome::Success, FlowOutcome::Failure];

	#[test]
	fn broker_flow_labels_are_distinct_snake_case() {
		let labels = KINDS
			.iter()
			.map(|kind| kind.as_str())
			.chain(OUTCOMES.iter().map(|outcome| outcome.as_str()))
			.collect::<Vec<_>>();

		assert_eq!(labels.iter().collect::<HashSet<_>>().len(), KINDS.len() + OUTCOMES.len());
		assert!(labels.iter().all(|label| label.chars().all(|c| c.is_ascii_lowercase() || c == '_')));
		assert_eq!(FlowKind::ClientCredentials.as_str(), "client_credentials");
		assert_eq!(FlowOutcome::CacheHit.to_string(), "cache_hit");
		assert!(FLOW_COUNTER.starts_with("token_broker_"));
	}

	#[test]
	fn recording_without_a_recorder_is_a_no_op() {
		// Without an installed recorder every combination must be a silent no-op.
		for outcome in OUTCOMES {
			record_flow_outcome(FlowKind::Token, outcome);
		}

		record_flow_outcome(FlowKind::Refresh, FlowOutcome::Failure);
		record_flow_outcome(FlowKind::ClientCredentials, FlowOutcome::Success);
	}
}
