//! Simple moving averages and cumulative return over close prices.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const HUNDRED: Decimal = dec!(100);

/// Mean of the last `window` closes.
pub fn sma(closes: &[Decimal], window: usize) -> Option<Decimal> {
    if window == 0 || closes.len() < window {
        return None;
    }
    let tail = &closes[closes.len() - window..];
    Some(tail.iter().copied().sum::<Decimal>() / Decimal::from(window))
}

/// Mean of the last `window` daily percentage returns.
pub fn moving_average_return(closes: &[Decimal], window: usize) -> Option<Decimal> {
    let returns = daily_returns(closes, window)?;
    Some(returns.iter().copied().sum::<Decimal>() / Decimal::from(window) * HUNDRED)
}

/// Percentage change over the last `window` trading days.
pub fn cumulative_return(closes: &[Decimal], window: usize) -> Option<Decimal> {
    if window == 0 || closes.len() < window + 1 {
        return None;
    }
    let start = closes[closes.len() - 1 - window];
    if start.is_zero() {
        return None;
    }
    let end = closes[closes.len() - 1];
    Some((end / start - Decimal::ONE) * HUNDRED)
}

/// The last `window` fractional daily returns, oldest-first. Needs
/// `window + 1` closes; zero closes make the series uncomputable.
pub fn daily_returns(closes: &[Decimal], window: usize) -> Option<Vec<Decimal>> {
    if window == 0 || closes.len() < window + 1 {
        return None;
    }
    let tail = &closes[closes.len() - 1 - window..];
    let mut returns = Vec::with_capacity(window);
    for pair in tail.windows(2) {
        if pair[0].is_zero() {
            return None;
        }
        returns.push(pair[1] / pair[0] - Decimal::ONE);
    }
    Some(returns)
}
