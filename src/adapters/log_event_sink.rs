//! Structured-log event sink.
//!
//! Writes observability events to the tracing pipeline instead of a message
//! bus. Useful as the default sink in CLI runs and tests.

use crate::domain::error::PublishError;
use crate::ports::event_port::{DecisionEvaluatedEvent, EventPort, IndicatorComputedEvent};
use tracing::info;

#[derive(Debug, Default)]
pub struct LogEventSink;

impl EventPort for LogEventSink {
    fn publish_indicator_computed(
        &self,
        event: &IndicatorComputedEvent,
    ) -> Result<(), PublishError> {
        info!(
            correlation_id = %event.correlation_id,
            symbol = %event.symbol,
            indicator = %event.indicator,
            window = event.window,
            value = %event.value,
            "indicator computed"
        );
        Ok(())
    }

    fn publish_decision_evaluated(
        &self,
        event: &DecisionEvaluatedEvent,
    ) -> Result<(), PublishError> {
        info!(
            correlation_id = %event.correlation_id,
            condition = %event.condition,
            result = event.result,
            branch = %event.branch,
            weights = ?event.weights,
            "decision evaluated"
        );
        Ok(())
    }
}
