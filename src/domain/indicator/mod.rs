//! Technical indicator types and the indicator service.
//!
//! - [`IndicatorKind`]: indicator identity (serves as the dispatch key)
//! - [`IndicatorRequest`]: what an operator asks the indicator port for
//! - [`TechnicalIndicator`]: per-symbol computed snapshot, immutable
//! - [`service::IndicatorService`]: the default port implementation computing
//!   indicators from bars fetched through the market-data port

pub mod drawdown;
pub mod ema;
pub mod moving_average;
pub mod rsi;
pub mod service;
pub mod stddev;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Rsi,
    CurrentPrice,
    MovingAveragePrice,
    MovingAverageReturn,
    CumulativeReturn,
    ExponentialMovingAveragePrice,
    StdevReturn,
    StdevPrice,
    MaxDrawdown,
    Ppo,
}

impl IndicatorKind {
    /// Resolve a DSL operator symbol to its indicator kind.
    pub fn from_operator(symbol: &str) -> Option<Self> {
        match symbol {
            "rsi" => Some(IndicatorKind::Rsi),
            "current-price" => Some(IndicatorKind::CurrentPrice),
            "moving-average-price" => Some(IndicatorKind::MovingAveragePrice),
            "moving-average-return" => Some(IndicatorKind::MovingAverageReturn),
            "cumulative-return" => Some(IndicatorKind::CumulativeReturn),
            "exponential-moving-average-price" => {
                Some(IndicatorKind::ExponentialMovingAveragePrice)
            }
            "stdev-return" => Some(IndicatorKind::StdevReturn),
            "stdev-price" => Some(IndicatorKind::StdevPrice),
            "max-drawdown" => Some(IndicatorKind::MaxDrawdown),
            "ppo" => Some(IndicatorKind::Ppo),
            _ => None,
        }
    }

    /// Canonical field name for a computed value at a given window,
    /// e.g. `rsi_14`, `ma_200`, `ema_12`.
    pub fn field_key(&self, window: usize) -> String {
        match self {
            IndicatorKind::Rsi => format!("rsi_{}", window),
            IndicatorKind::CurrentPrice => "current_price".to_string(),
            IndicatorKind::MovingAveragePrice => format!("ma_{}", window),
            IndicatorKind::MovingAverageReturn => format!("ma_return_{}", window),
            IndicatorKind::CumulativeReturn => format!("cumulative_return_{}", window),
            IndicatorKind::ExponentialMovingAveragePrice => format!("ema_{}", window),
            IndicatorKind::StdevReturn => format!("stdev_return_{}", window),
            IndicatorKind::StdevPrice => format!("stdev_price_{}", window),
            IndicatorKind::MaxDrawdown => format!("max_drawdown_{}", window),
            IndicatorKind::Ppo => format!("ppo_{}", window),
        }
    }

    /// Whether this indicator consumes an in-progress partial bar instead of
    /// having it stripped.
    pub fn consumes_partial_bar(&self) -> bool {
        matches!(self, IndicatorKind::CurrentPrice)
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndicatorKind::Rsi => "rsi",
            IndicatorKind::CurrentPrice => "current-price",
            IndicatorKind::MovingAveragePrice => "moving-average-price",
            IndicatorKind::MovingAverageReturn => "moving-average-return",
            IndicatorKind::CumulativeReturn => "cumulative-return",
            IndicatorKind::ExponentialMovingAveragePrice => "exponential-moving-average-price",
            IndicatorKind::StdevReturn => "stdev-return",
            IndicatorKind::StdevPrice => "stdev-price",
            IndicatorKind::MaxDrawdown => "max-drawdown",
            IndicatorKind::Ppo => "ppo",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRequest {
    pub symbol: String,
    pub kind: IndicatorKind,
    pub window: usize,
    /// Historical date context; `None` means live/today.
    pub as_of: Option<NaiveDate>,
}

/// Immutable computed snapshot for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct TechnicalIndicator {
    pub symbol: String,
    pub timestamp: NaiveDate,
    pub current_price: Option<Decimal>,
    /// Named indicator fields keyed by window, e.g. `rsi_14`.
    pub values: BTreeMap<String, Decimal>,
    pub data_source: String,
    pub metadata: BTreeMap<String, String>,
}

impl TechnicalIndicator {
    /// Extract the window-specific field, falling back to the generic
    /// `metadata.value` slot when the requested window does not match a
    /// pre-computed canonical field.
    pub fn value_for(&self, kind: IndicatorKind, window: usize) -> Option<Decimal> {
        if let Some(value) = self.values.get(&kind.field_key(window)) {
            return Some(*value);
        }
        self.metadata.get("value").and_then(|raw| raw.parse().ok())
    }
}
