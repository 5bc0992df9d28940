//! Rolling metrics over a pre-built daily return series.
//!
//! These mirror the live-indicator formulas but operate on cached portfolio
//! returns instead of raw prices. Unlike the single-symbol indicator path,
//! insufficient data yields no score (`None`), never a fabricated neutral
//! value; a missing group-level score has a defined fallback higher up the
//! call chain.

use crate::domain::indicator::IndicatorKind;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

/// √252 at fixed 10-decimal precision, for annualizing daily stdev. Chosen to
/// match an external reference platform's output; do not recompute.
pub const ANNUALIZATION: Decimal = dec!(15.8745078664);

/// Every series metric needs at least this many returns to score.
pub const MIN_SERIES_POINTS: usize = 3;

const HUNDRED: Decimal = dec!(100);

/// Compute the named metric over a daily return series (fractional returns,
/// oldest-first). `None` on insufficient data or an unsupported metric.
pub fn metric_from_returns(
    kind: IndicatorKind,
    window: usize,
    returns: &[Decimal],
) -> Option<Decimal> {
    if returns.len() < MIN_SERIES_POINTS {
        return None;
    }
    match kind {
        IndicatorKind::MovingAverageReturn => moving_average_return(returns),
        IndicatorKind::CumulativeReturn => cumulative_return(returns),
        IndicatorKind::StdevReturn => stdev_return(returns),
        IndicatorKind::MaxDrawdown => max_drawdown(returns),
        IndicatorKind::Rsi => rsi_from_returns(returns, window),
        _ => None,
    }
}

/// mean(returns) × 100.
pub fn moving_average_return(returns: &[Decimal]) -> Option<Decimal> {
    if returns.is_empty() {
        return None;
    }
    let sum: Decimal = returns.iter().copied().sum();
    Some(sum / Decimal::from(returns.len()) * HUNDRED)
}

/// (∏(1+r) − 1) × 100.
pub fn cumulative_return(returns: &[Decimal]) -> Option<Decimal> {
    if returns.is_empty() {
        return None;
    }
    let mut compounded = Decimal::ONE;
    for r in returns {
        compounded *= Decimal::ONE + *r;
    }
    Some((compounded - Decimal::ONE) * HUNDRED)
}

/// Population stdev of percentage returns, annualized by √252.
pub fn stdev_return(returns: &[Decimal]) -> Option<Decimal> {
    if returns.is_empty() {
        return None;
    }
    let pct: Vec<Decimal> = returns.iter().map(|r| *r * HUNDRED).collect();
    let n = Decimal::from(pct.len());
    let mean: Decimal = pct.iter().copied().sum::<Decimal>() / n;
    let variance: Decimal = pct
        .iter()
        .map(|x| (*x - mean) * (*x - mean))
        .sum::<Decimal>()
        / n;
    variance.sqrt().map(|daily| daily * ANNUALIZATION)
}

/// Largest peak-to-trough fractional decline of the reconstructed unit
/// equity curve, × 100.
pub fn max_drawdown(returns: &[Decimal]) -> Option<Decimal> {
    if returns.is_empty() {
        return None;
    }
    let mut equity = Decimal::ONE;
    let mut peak = Decimal::ONE;
    let mut worst = Decimal::ZERO;
    for r in returns {
        equity *= Decimal::ONE + *r;
        if equity > peak {
            peak = equity;
        }
        let drawdown = (peak - equity) / peak;
        if drawdown > worst {
            worst = drawdown;
        }
    }
    Some(worst * HUNDRED)
}

/// Wilder RSI over a synthetic price series reconstructed from the returns
/// (starting at 100), smoothing with α = 1/window.
pub fn rsi_from_returns(returns: &[Decimal], window: usize) -> Option<Decimal> {
    if returns.is_empty() || window == 0 {
        return None;
    }
    let mut prices = Vec::with_capacity(returns.len() + 1);
    prices.push(HUNDRED);
    for r in returns {
        let last = *prices.last().unwrap();
        prices.push(last * (Decimal::ONE + *r));
    }

    let deltas: Vec<Decimal> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let seed_len = window.min(deltas.len());
    let seed = Decimal::from(seed_len);
    let mut avg_gain: Decimal = deltas[..seed_len]
        .iter()
        .map(|d| if *d > Decimal::ZERO { *d } else { Decimal::ZERO })
        .sum::<Decimal>()
        / seed;
    let mut avg_loss: Decimal = deltas[..seed_len]
        .iter()
        .map(|d| if *d < Decimal::ZERO { -*d } else { Decimal::ZERO })
        .sum::<Decimal>()
        / seed;

    let alpha = Decimal::ONE / Decimal::from(window);
    for delta in &deltas[seed_len..] {
        let gain = if *delta > Decimal::ZERO { *delta } else { Decimal::ZERO };
        let loss = if *delta < Decimal::ZERO { -*delta } else { Decimal::ZERO };
        avg_gain = avg_gain + alpha * (gain - avg_gain);
        avg_loss = avg_loss + alpha * (loss - avg_loss);
    }

    if avg_loss.is_zero() {
        return Some(HUNDRED);
    }
    let rs = avg_gain / avg_loss;
    Some(HUNDRED - HUNDRED / (Decimal::ONE + rs))
}
