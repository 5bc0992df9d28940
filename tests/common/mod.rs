#![allow(dead_code)]

use chrono::{Datelike, Days, NaiveDate, Weekday};
use maestro::domain::error::MaestroError;
use maestro::domain::indicator::{IndicatorRequest, TechnicalIndicator};
use maestro::domain::ohlcv::Bar;
use maestro::ports::backfill_port::{BackfillOutcome, BackfillPort};
use maestro::ports::event_port::{DecisionEvaluatedEvent, EventPort, IndicatorComputedEvent};
use maestro::ports::indicator_port::IndicatorPort;
use maestro::ports::market_data_port::{MarketDataPort, Timeframe};
use maestro::ports::return_cache_port::{CachedReturn, ReturnCachePort};
use rust_decimal::Decimal;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Market-data stub serving one geometric close series per symbol on
/// consecutive weekdays.
pub struct StubMarketData {
    pub start: NaiveDate,
    pub days: usize,
    /// Per-symbol daily growth factor; symbols not listed get 1.01.
    pub growth: HashMap<String, Decimal>,
}

impl StubMarketData {
    pub fn steady(start: NaiveDate, days: usize) -> Self {
        Self {
            start,
            days,
            growth: HashMap::new(),
        }
    }

    pub fn with_growth(mut self, symbol: &str, factor: Decimal) -> Self {
        self.growth.insert(symbol.to_string(), factor);
        self
    }

    fn closes(&self, symbol: &str) -> Vec<(NaiveDate, Decimal)> {
        let factor = self
            .growth
            .get(symbol)
            .copied()
            .unwrap_or_else(|| Decimal::new(101, 2));
        let mut out = Vec::new();
        let mut price = Decimal::from(100);
        let mut day = self.start;
        while out.len() < self.days {
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                out.push((day, price));
                price *= factor;
            }
            day = day + Days::new(1);
        }
        out
    }
}

impl MarketDataPort for StubMarketData {
    fn get_bars(
        &self,
        symbol: &str,
        _period_days: u32,
        _timeframe: Timeframe,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, MaestroError> {
        let cutoff = as_of.unwrap_or(NaiveDate::MAX);
        Ok(self
            .closes(symbol)
            .into_iter()
            .filter(|(d, _)| *d <= cutoff)
            .map(|(d, close)| Bar {
                symbol: symbol.to_string(),
                date: d,
                open: close,
                high: close,
                low: close,
                close,
                volume: 1_000,
                is_incomplete: false,
            })
            .collect())
    }
}

/// Indicator stub answering every request for a known symbol with a fixed
/// value, recording each request's symbol.
pub struct StubIndicators {
    pub values: HashMap<String, Decimal>,
    pub requests: RefCell<Vec<String>>,
}

impl StubIndicators {
    pub fn new(values: &[(&str, Decimal)]) -> Self {
        Self {
            values: values
                .iter()
                .map(|(s, v)| (s.to_string(), *v))
                .collect(),
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl IndicatorPort for StubIndicators {
    fn get_indicator(
        &self,
        request: &IndicatorRequest,
    ) -> Result<TechnicalIndicator, MaestroError> {
        self.requests.borrow_mut().push(request.symbol.clone());
        let value = self.values.get(&request.symbol).copied().ok_or_else(|| {
            MaestroError::Indicator {
                symbol: request.symbol.clone(),
                indicator: request.kind.to_string(),
                reason: "no stubbed value".into(),
            }
        })?;
        let mut values = BTreeMap::new();
        values.insert(request.kind.field_key(request.window), value);
        Ok(TechnicalIndicator {
            symbol: request.symbol.clone(),
            timestamp: date(2024, 3, 1),
            current_price: Some(value),
            values,
            data_source: "stub".into(),
            metadata: BTreeMap::new(),
        })
    }
}

/// In-memory return cache with optional write failure injection.
#[derive(Default)]
pub struct MemoryReturnCache {
    pub rows: RefCell<HashMap<String, Vec<CachedReturn>>>,
    pub fail_writes: bool,
}

impl MemoryReturnCache {
    pub fn preload(&self, group_id: &str, start: NaiveDate, returns: &[Decimal]) {
        let mut day = start;
        for r in returns {
            while matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                day = day + Days::new(1);
            }
            self.write_historical_return(group_id, day, &BTreeMap::new(), *r)
                .unwrap();
            day = day + Days::new(1);
        }
    }
}

impl ReturnCachePort for MemoryReturnCache {
    fn lookup_historical_returns(
        &self,
        group_id: &str,
        lookback_days: usize,
        end_date: NaiveDate,
    ) -> Result<Vec<CachedReturn>, MaestroError> {
        let rows = self.rows.borrow();
        let mut matching: Vec<CachedReturn> = rows
            .get(group_id)
            .map(|v| {
                v.iter()
                    .filter(|r| r.record_date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        matching.sort_by_key(|r| r.record_date);
        let skip = matching.len().saturating_sub(lookback_days);
        Ok(matching.split_off(skip))
    }

    fn write_historical_return(
        &self,
        group_id: &str,
        record_date: NaiveDate,
        _selections: &BTreeMap<String, Decimal>,
        portfolio_daily_return: Decimal,
    ) -> Result<(), MaestroError> {
        if self.fail_writes {
            return Err(MaestroError::ReturnCache {
                reason: "writes disabled".into(),
            });
        }
        let mut rows = self.rows.borrow_mut();
        let entries = rows.entry(group_id.to_string()).or_default();
        entries.retain(|r| r.record_date != record_date);
        entries.push(CachedReturn {
            record_date,
            portfolio_daily_return,
        });
        Ok(())
    }

    fn is_cache_available(&self) -> bool {
        true
    }
}

/// Backfill stub recording invocations, always reporting failure so the
/// engine continues to the in-process tier.
#[derive(Default)]
pub struct StubBackfill {
    pub invocations: RefCell<Vec<String>>,
}

impl BackfillPort for StubBackfill {
    fn invoke(
        &self,
        group_id: &str,
        _group_name: &str,
        _lookback_days: u32,
        _correlation_id: &str,
    ) -> Result<BackfillOutcome, MaestroError> {
        self.invocations.borrow_mut().push(group_id.to_string());
        Ok(BackfillOutcome {
            success: false,
            processed: 0,
            failed: 0,
        })
    }
}

/// Event sink capturing everything published.
#[derive(Default)]
pub struct RecordingEventSink {
    pub decisions: RefCell<Vec<DecisionEvaluatedEvent>>,
    pub indicators: RefCell<Vec<IndicatorComputedEvent>>,
}

impl EventPort for RecordingEventSink {
    fn publish_indicator_computed(
        &self,
        event: &IndicatorComputedEvent,
    ) -> Result<(), maestro::domain::error::PublishError> {
        self.indicators.borrow_mut().push(event.clone());
        Ok(())
    }

    fn publish_decision_evaluated(
        &self,
        event: &DecisionEvaluatedEvent,
    ) -> Result<(), maestro::domain::error::PublishError> {
        self.decisions.borrow_mut().push(event.clone());
        Ok(())
    }
}
