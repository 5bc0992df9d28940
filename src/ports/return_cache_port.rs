//! Persistent historical-return cache port trait.
//!
//! Entries are append-only per (group_id, record_date); re-backfill of the
//! same date overwrites with an equivalent deterministic result.

use crate::domain::error::MaestroError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct CachedReturn {
    pub record_date: NaiveDate,
    pub portfolio_daily_return: Decimal,
}

pub trait ReturnCachePort {
    /// Up to `lookback_days` returns ending at (or before) `end_date`,
    /// oldest-first.
    fn lookup_historical_returns(
        &self,
        group_id: &str,
        lookback_days: usize,
        end_date: NaiveDate,
    ) -> Result<Vec<CachedReturn>, MaestroError>;

    fn write_historical_return(
        &self,
        group_id: &str,
        record_date: NaiveDate,
        selections: &BTreeMap<String, Decimal>,
        portfolio_daily_return: Decimal,
    ) -> Result<(), MaestroError>;

    fn is_cache_available(&self) -> bool;
}
