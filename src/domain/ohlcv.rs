//! Daily OHLCV bar representation.

use chrono::NaiveDate;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
    /// Set on the most recent bar when the trading session is still open.
    pub is_incomplete: bool,
}

impl Bar {
    /// close / prev_close - 1, or None when the previous close is zero.
    pub fn daily_return(&self, prev_close: Decimal) -> Option<Decimal> {
        if prev_close.is_zero() {
            return None;
        }
        Some(self.close / prev_close - Decimal::ONE)
    }
}
