//! Per-run evaluation state.
//!
//! One [`EvalContext`] exclusively owns the decision path, trace and
//! correlation id for a single evaluation run. The [`Session`] inside it
//! holds the group-body store, the (group, date) signal memo and the
//! backfill recursion guard; giving each run its own session (instead of
//! module-level statics) is what makes concurrent evaluations safe without
//! locking. `Session::clear` runs at the start of every top-level evaluation.

use crate::domain::decision::DecisionNode;
use crate::domain::groups::GroupInfo;
use crate::ports::backfill_port::BackfillPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::event_port::{DecisionEvaluatedEvent, EventPort, IndicatorComputedEvent};
use crate::ports::indicator_port::IndicatorPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::return_cache_port::ReturnCachePort;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::warn;
use uuid::Uuid;

/// Engine tunables, read once from config.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// In-process backfill is bounded to this many calendar days per
    /// invocation to cap execution time.
    pub backfill_cap_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backfill_cap_days: 45,
        }
    }
}

impl EngineConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Self {
        Self {
            backfill_cap_days: config.get_int("engine", "backfill_cap_days", 45),
        }
    }
}

/// Memoized signal: symbol→weight map a group produced as of a date, or
/// `None` when that evaluation failed (failures are not retried in-run).
pub type SignalMemo = HashMap<(String, NaiveDate), Option<BTreeMap<String, Decimal>>>;

#[derive(Debug, Default)]
pub struct Session {
    /// Group bodies discovered by the pre-evaluation AST walk, by group id.
    pub group_bodies: HashMap<String, GroupInfo>,
    pub signal_memo: SignalMemo,
    /// Group ids currently backfilling in-process; a hit here short-circuits
    /// to "no data from this path" rather than recursing.
    pub backfilling: HashSet<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.group_bodies.clear();
        self.signal_memo.clear();
        self.backfilling.clear();
    }
}

pub struct EvalContext<'a> {
    pub correlation_id: String,
    /// Historical date context for indicator and bar lookups; `None` = live.
    pub as_of: Option<NaiveDate>,
    pub market_data: &'a dyn MarketDataPort,
    pub indicators: &'a dyn IndicatorPort,
    pub return_cache: Option<&'a dyn ReturnCachePort>,
    pub backfill: Option<&'a dyn BackfillPort>,
    pub events: Option<&'a dyn EventPort>,
    pub config: EngineConfig,
    pub session: Session,
    pub decision_path: Vec<DecisionNode>,
    pub trace: Vec<String>,
}

impl<'a> EvalContext<'a> {
    pub fn new(market_data: &'a dyn MarketDataPort, indicators: &'a dyn IndicatorPort) -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
            as_of: None,
            market_data,
            indicators,
            return_cache: None,
            backfill: None,
            events: None,
            config: EngineConfig::default(),
            session: Session::new(),
            decision_path: Vec::new(),
            trace: Vec::new(),
        }
    }

    pub fn with_return_cache(mut self, cache: &'a dyn ReturnCachePort) -> Self {
        self.return_cache = Some(cache);
        self
    }

    pub fn with_backfill(mut self, backfill: &'a dyn BackfillPort) -> Self {
        self.backfill = Some(backfill);
        self
    }

    pub fn with_events(mut self, events: &'a dyn EventPort) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The evaluation's current as-of date (today when live).
    pub fn current_date(&self) -> NaiveDate {
        self.as_of
            .unwrap_or_else(|| chrono::Utc::now().date_naive())
    }

    pub fn push_trace(&mut self, entry: impl Into<String>) {
        self.trace.push(entry.into());
    }

    /// Fire-and-forget decision event.
    pub fn publish_decision(&self, event: &DecisionEvaluatedEvent) {
        if let Some(sink) = self.events {
            if let Err(err) = sink.publish_decision_evaluated(event) {
                warn!(correlation_id = %self.correlation_id, %err, "decision event publish failed");
            }
        }
    }

    /// Fire-and-forget indicator event.
    pub fn publish_indicator(&self, event: &IndicatorComputedEvent) {
        if let Some(sink) = self.events {
            if let Err(err) = sink.publish_indicator_computed(event) {
                warn!(correlation_id = %self.correlation_id, %err, "indicator event publish failed");
            }
        }
    }
}
