//! Exponential moving average and PPO.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const PPO_FAST: usize = 12;
const PPO_SLOW: usize = 26;

/// EMA with multiplier 2/(window+1), seeded by the SMA of the first
/// `window` closes.
pub fn ema(closes: &[Decimal], window: usize) -> Option<Decimal> {
    if window == 0 || closes.len() < window {
        return None;
    }
    let k = dec!(2) / Decimal::from(window + 1);
    let mut value: Decimal =
        closes[..window].iter().copied().sum::<Decimal>() / Decimal::from(window);
    for close in &closes[window..] {
        value = *close * k + value * (Decimal::ONE - k);
    }
    Some(value)
}

/// Percentage price oscillator: (EMA12 − EMA26) / EMA26 × 100.
pub fn ppo(closes: &[Decimal]) -> Option<Decimal> {
    let fast = ema(closes, PPO_FAST)?;
    let slow = ema(closes, PPO_SLOW)?;
    if slow.is_zero() {
        return None;
    }
    Some((fast - slow) / slow * dec!(100))
}
