//! Market data access port trait.

use crate::domain::error::MaestroError;
use crate::domain::ohlcv::Bar;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    Day,
}

pub trait MarketDataPort {
    /// Fetch up to `period_days` calendar days of bars ending at `as_of`
    /// (`None` = now). Bars are returned oldest-first.
    fn get_bars(
        &self,
        symbol: &str,
        period_days: u32,
        timeframe: Timeframe,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, MaestroError>;
}
