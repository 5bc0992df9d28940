//! Wilder RSI over a close-price series.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const NEUTRAL: Decimal = dec!(50);
const HUNDRED: Decimal = dec!(100);

/// RSI with Wilder smoothing (α = 1/window) over closes, oldest-first.
///
/// Needs at least `window + 1` closes. A series with zero computable deltas
/// (every close identical) yields the neutral 50; this is the only place a
/// neutral value is ever substituted.
pub fn rsi(closes: &[Decimal], window: usize) -> Option<Decimal> {
    if window == 0 || closes.len() < window + 1 {
        return None;
    }
    let deltas: Vec<Decimal> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    if deltas.iter().all(Decimal::is_zero) {
        return Some(NEUTRAL);
    }

    let seed = Decimal::from(window);
    let mut avg_gain: Decimal = deltas[..window]
        .iter()
        .map(|d| if *d > Decimal::ZERO { *d } else { Decimal::ZERO })
        .sum::<Decimal>()
        / seed;
    let mut avg_loss: Decimal = deltas[..window]
        .iter()
        .map(|d| if *d < Decimal::ZERO { -*d } else { Decimal::ZERO })
        .sum::<Decimal>()
        / seed;

    let alpha = Decimal::ONE / seed;
    for delta in &deltas[window..] {
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
