//! Price and return standard deviation.

use crate::domain::indicator::moving_average::daily_returns;
use crate::domain::series_metrics::ANNUALIZATION;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

/// Population stdev of the last `window` closes.
pub fn stdev_price(closes: &[Decimal], window: usize) -> Option<Decimal> {
    if window == 0 || closes.len() < window {
        return None;
    }
    population_stdev(&closes[closes.len() - window..])
}

/// Population stdev of the last `window` daily percentage returns,
/// annualized by √252.
pub fn stdev_return(closes: &[Decimal], window: usize) -> Option<Decimal> {
    let returns = daily_returns(closes, window)?;
    let pct: Vec<Decimal> = returns.iter().map(|r| *r * dec!(100)).collect();
    population_stdev(&pct).map(|daily| daily * ANNUALIZATION)
}

fn population_stdev(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let n = Decimal::from(values.len());
    let mean: Decimal = values.iter().copied().sum::<Decimal>() / n;
    let variance: Decimal = values
        .iter()
        .map(|v| (*v - mean) * (*v - mean))
        .sum::<Decimal>()
        / n;
    variance.sqrt()
}
