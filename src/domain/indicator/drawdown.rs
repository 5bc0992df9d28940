//! Maximum drawdown over a close-price series.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Largest peak-to-trough percentage decline over the last `window + 1`
/// closes.
pub fn max_drawdown(closes: &[Decimal], window: usize) -> Option<Decimal> {
    if window == 0 || closes.len() < window + 1 {
        return None;
    }
    let tail = &closes[closes.len() - 1 - window..];
    let mut peak = tail[0];
    let mut worst = Decimal::ZERO;
    for close in tail {
        if *close > peak {
            peak = *close;
        }
        if peak.is_zero() {
            continue;
        }
        let drawdown = (peak - *close) / peak;
        if drawdown > worst {
            worst = drawdown;
        }
    }
    Some(worst * dec!(100))
}
