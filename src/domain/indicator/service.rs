//! Default [`IndicatorPort`] implementation computing indicators from bars.

use crate::domain::error::MaestroError;
use crate::domain::indicator::{
    IndicatorKind, IndicatorRequest, TechnicalIndicator, drawdown, ema, moving_average, rsi,
    stddev,
};
use crate::domain::ohlcv::Bar;
use crate::ports::indicator_port::IndicatorPort;
use crate::ports::market_data_port::{MarketDataPort, Timeframe};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

/// Generic warm-up requirement when a window does not demand more.
const DEFAULT_TRADING_DAYS: usize = 252;

pub struct IndicatorService<'a> {
    market_data: &'a dyn MarketDataPort,
}

impl<'a> IndicatorService<'a> {
    pub fn new(market_data: &'a dyn MarketDataPort) -> Self {
        Self { market_data }
    }
}

/// Trading-day warm-up estimate per indicator type. RSI needs proportionally
/// more history for Wilder smoothing to converge.
fn required_bars(kind: IndicatorKind, window: usize) -> usize {
    match kind {
        IndicatorKind::CurrentPrice => 1,
        IndicatorKind::Rsi => (window * 5).max(DEFAULT_TRADING_DAYS),
        _ => (window * 2).max(DEFAULT_TRADING_DAYS),
    }
}

/// Hard minimum below which the computation is undefined, used for the
/// insufficient-data error detail.
fn minimum_bars(kind: IndicatorKind, window: usize) -> usize {
    match kind {
        IndicatorKind::CurrentPrice => 1,
        IndicatorKind::MovingAveragePrice
        | IndicatorKind::ExponentialMovingAveragePrice
        | IndicatorKind::StdevPrice => window,
        IndicatorKind::Ppo => 26,
        _ => window + 1,
    }
}

/// Trading days to calendar days with a 10% safety buffer for holidays.
fn calendar_period(trading_days: usize) -> u32 {
    let calendar = trading_days * 7 / 5;
    (calendar + calendar / 10 + 1) as u32
}

fn compute(kind: IndicatorKind, closes: &[Decimal], window: usize) -> Option<Decimal> {
    match kind {
        IndicatorKind::CurrentPrice => closes.last().copied(),
        IndicatorKind::Rsi => rsi::rsi(closes, window),
        IndicatorKind::MovingAveragePrice => moving_average::sma(closes, window),
        IndicatorKind::MovingAverageReturn => moving_average::moving_average_return(closes, window),
        IndicatorKind::CumulativeReturn => moving_average::cumulative_return(closes, window),
        IndicatorKind::ExponentialMovingAveragePrice => ema::ema(closes, window),
        IndicatorKind::StdevReturn => stddev::stdev_return(closes, window),
        IndicatorKind::StdevPrice => stddev::stdev_price(closes, window),
        IndicatorKind::MaxDrawdown => drawdown::max_drawdown(closes, window),
        IndicatorKind::Ppo => ema::ppo(closes),
    }
}

impl IndicatorPort for IndicatorService<'_> {
    fn get_indicator(
        &self,
        request: &IndicatorRequest,
    ) -> Result<TechnicalIndicator, MaestroError> {
        let trading_days = required_bars(request.kind, request.window);
        let period = calendar_period(trading_days);
        let mut bars = self.market_data.get_bars(
            &request.symbol,
            period,
            Timeframe::Day,
            request.as_of,
        )?;

        // The in-progress session bar would contaminate any closed-bar
        // computation.
        if !request.kind.consumes_partial_bar()
            && bars.last().is_some_and(|bar| bar.is_incomplete)
        {
            bars.pop();
        }

        let minimum = minimum_bars(request.kind, request.window);
        if bars.len() < minimum {
            return Err(MaestroError::InsufficientData {
                symbol: request.symbol.clone(),
                indicator: request.kind.to_string(),
                bars: bars.len(),
                minimum,
            });
        }

        let closes: Vec<Decimal> = bars.iter().map(|bar| bar.close).collect();
        let value = compute(request.kind, &closes, request.window).ok_or_else(|| {
            MaestroError::InsufficientData {
                symbol: request.symbol.clone(),
                indicator: request.kind.to_string(),
                bars: bars.len(),
                minimum,
            }
        })?;

        let last: &Bar = bars.last().ok_or_else(|| MaestroError::MarketData {
            reason: format!("no bars for {}", request.symbol),
        })?;
        debug!(
            symbol = %request.symbol,
            kind = %request.kind,
            window = request.window,
            %value,
            "indicator computed"
        );

        let mut values = BTreeMap::new();
        values.insert(request.kind.field_key(request.window), value);
        Ok(TechnicalIndicator {
            symbol: request.symbol.clone(),
            timestamp: last.date,
            current_price: Some(last.close),
            values,
            data_source: "bars".to_string(),
            metadata: BTreeMap::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};
    use rust_decimal_macros::dec;

    /// Serves a fixed close series as consecutive calendar days, the last
    /// bar optionally incomplete.
    struct FixedBars {
        closes: Vec<Decimal>,
        last_incomplete: bool,
    }

    impl MarketDataPort for FixedBars {
        fn get_bars(
            &self,
            symbol: &str,
            _period_days: u32,
            _timeframe: Timeframe,
            _as_of: Option<NaiveDate>,
        ) -> Result<Vec<Bar>, MaestroError> {
            let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            Ok(self
                .closes
                .iter()
                .enumerate()
                .map(|(i, close)| Bar {
                    symbol: symbol.to_string(),
                    date: start + Days::new(i as u64),
                    open: *close,
                    high: *close,
                    low: *close,
                    close: *close,
                    volume: 1_000,
                    is_incomplete: self.last_incomplete && i == self.closes.len() - 1,
                })
                .collect())
        }
    }

    fn request(kind: IndicatorKind, window: usize) -> IndicatorRequest {
        IndicatorRequest {
            symbol: "SPY".into(),
            kind,
            window,
            as_of: None,
        }
    }

    #[test]
    fn computes_and_keys_by_window() {
        let market = FixedBars {
            closes: vec![dec!(1), dec!(2), dec!(3), dec!(4)],
            last_incomplete: false,
        };
        let service = IndicatorService::new(&market);
        let snapshot = service
            .get_indicator(&request(IndicatorKind::MovingAveragePrice, 2))
            .unwrap();
        assert_eq!(snapshot.values["ma_2"], dec!(3.5));
        assert_eq!(snapshot.current_price, Some(dec!(4)));
    }

    #[test]
    fn strips_partial_bar_for_closed_bar_indicators() {
        let market = FixedBars {
            closes: vec![dec!(1), dec!(2), dec!(3), dec!(1000)],
            last_incomplete: true,
        };
        let service = IndicatorService::new(&market);
        let snapshot = service
            .get_indicator(&request(IndicatorKind::MovingAveragePrice, 3))
            .unwrap();
        // The incomplete 1000 close is excluded.
        assert_eq!(snapshot.values["ma_3"], dec!(2));
    }

    #[test]
    fn current_price_consumes_the_partial_bar() {
        let market = FixedBars {
            closes: vec![dec!(1), dec!(2), dec!(500)],
            last_incomplete: true,
        };
        let service = IndicatorService::new(&market);
        let snapshot = service
            .get_indicator(&request(IndicatorKind::CurrentPrice, 0))
            .unwrap();
        assert_eq!(snapshot.values["current_price"], dec!(500));
    }

    #[test]
    fn insufficient_bars_is_fatal() {
        let market = FixedBars {
            closes: vec![dec!(1), dec!(2)],
            last_incomplete: false,
        };
        let service = IndicatorService::new(&market);
        let err = service
            .get_indicator(&request(IndicatorKind::Rsi, 14))
            .unwrap_err();
        assert!(matches!(
            err,
            MaestroError::InsufficientData { bars: 2, minimum: 15, .. }
        ));
    }

    #[test]
    fn market_data_errors_propagate() {
        struct Failing;
        impl MarketDataPort for Failing {
            fn get_bars(
                &self,
                _symbol: &str,
                _period_days: u32,
                _timeframe: Timeframe,
                _as_of: Option<NaiveDate>,
            ) -> Result<Vec<Bar>, MaestroError> {
                Err(MaestroError::MarketData {
                    reason: "feed down".into(),
                })
            }
        }
        let service = IndicatorService::new(&Failing);
        assert!(matches!(
            service.get_indicator(&request(IndicatorKind::Rsi, 14)),
            Err(MaestroError::MarketData { .. })
        ));
    }

    #[test]
    fn calendar_period_adds_weekend_and_holiday_buffer() {
        // 252 trading days spans roughly 353 calendar days; the buffer lands
        // near 389.
        let period = calendar_period(252);
        assert!(period > 352 && period < 400, "period {period}");
    }
}
