//! Observability event sink port trait.
//!
//! Fire-and-forget: the evaluator logs publish failures and carries on.
//! Failures surface as [`PublishError`], a type distinct from evaluation
//! errors, so callers can ignore observability problems without masking
//! real evaluation bugs.

use crate::domain::error::PublishError;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorComputedEvent {
    pub correlation_id: String,
    pub symbol: String,
    pub indicator: String,
    pub window: usize,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionEvaluatedEvent {
    pub correlation_id: String,
    pub condition: String,
    pub result: bool,
    pub branch: String,
    /// The selected branch's fragment weights, when the branch produced one.
    pub weights: Option<BTreeMap<String, Decimal>>,
}

pub trait EventPort {
    fn publish_indicator_computed(
        &self,
        event: &IndicatorComputedEvent,
    ) -> Result<(), PublishError>;

    fn publish_decision_evaluated(
        &self,
        event: &DecisionEvaluatedEvent,
    ) -> Result<(), PublishError>;
}
