//! Remote backfill invocation port trait.
//!
//! Absence of this collaborator (no configuration) is a valid, expected
//! state, not an error; the scoring engine simply skips the remote tier.

use crate::domain::error::MaestroError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillOutcome {
    pub success: bool,
    pub processed: u32,
    pub failed: u32,
}

pub trait BackfillPort {
    /// Synchronously ask the remote collaborator to backfill a group's
    /// historical returns for the given lookback window.
    fn invoke(
        &self,
        group_id: &str,
        group_name: &str,
        lookback_days: u32,
        correlation_id: &str,
    ) -> Result<BackfillOutcome, MaestroError>;
}
