//! Indicator computation port trait.

use crate::domain::error::MaestroError;
use crate::domain::indicator::{IndicatorRequest, TechnicalIndicator};

pub trait IndicatorPort {
    /// Compute an indicator snapshot. Fails with an indicator-specific error
    /// on missing data; there is no silent fallback in this path.
    fn get_indicator(&self, request: &IndicatorRequest)
    -> Result<TechnicalIndicator, MaestroError>;
}
