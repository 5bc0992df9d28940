//! Group scoring and on-demand historical-return backfill.
//!
//! Scoring a named group escalates through three tiers:
//!
//! 1. cache-first: enough cached returns end the request immediately
//! 2. remote backfill: a configured collaborator is invoked synchronously,
//!    then the cache is re-queried
//! 3. in-process backfill: the group's own body is re-evaluated once per
//!    missing trading day, oldest to newest, persisting each computed return
//!
//! If all three leave the series short of the requested window the caller
//! falls back to a today-only per-symbol snapshot; that degradation happens
//! in `filter`, not here.

use crate::domain::context::EvalContext;
use crate::domain::eval::Evaluator;
use crate::domain::fragment::to_fragment;
use crate::domain::groups::GroupInfo;
use crate::domain::indicator::IndicatorKind;
use crate::domain::series_metrics;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// How many days of bars to request when pricing one position day. Covers
/// long weekends and holiday clusters around the target date.
const PRICING_LOOKBACK_DAYS: u32 = 10;

/// Score a group on a metric over `window` cached daily returns.
///
/// `None` means no usable series after every tier, never a partial answer.
pub fn score_group(
    group: &GroupInfo,
    kind: IndicatorKind,
    window: usize,
    ev: &Evaluator,
    ctx: &mut EvalContext,
) -> Option<Decimal> {
    let cache = ctx.return_cache?;
    if !cache.is_cache_available() {
        debug!(group_id = %group.group_id, "return cache unavailable, skipping series scoring");
        return None;
    }

    // Tier 1: cache-first.
    if let Some(score) = score_from_cache(group, kind, window, ctx) {
        return Some(score);
    }

    // A group already mid-backfill never triggers another backfill of
    // itself, remote or in-process.
    if ctx.session.backfilling.contains(&group.group_id) {
        debug!(group_id = %group.group_id, "scoring recursion guard hit");
        return None;
    }

    // Tier 2: remote backfill, then re-query.
    if let Some(remote) = ctx.backfill {
        match remote.invoke(
            &group.group_id,
            &group.name,
            window as u32,
            &ctx.correlation_id,
        ) {
            Ok(outcome) if outcome.success => {
                info!(
                    group_id = %group.group_id,
                    processed = outcome.processed,
                    failed = outcome.failed,
                    "remote backfill completed"
                );
            }
            Ok(outcome) => {
                warn!(
                    group_id = %group.group_id,
                    processed = outcome.processed,
                    failed = outcome.failed,
                    "remote backfill reported failure, trying in-process"
                );
            }
            Err(err) => {
                warn!(group_id = %group.group_id, %err, "remote backfill errored, trying in-process");
            }
        }
        if let Some(score) = score_from_cache(group, kind, window, ctx) {
            return Some(score);
        }
    }

    // Tier 3: in-process backfill, then re-query.
    backfill_group(group, ev, ctx);
    score_from_cache(group, kind, window, ctx)
}

/// Tier-1 read path: `Some(score)` only when the cache already holds a full
/// window of returns.
fn score_from_cache(
    group: &GroupInfo,
    kind: IndicatorKind,
    window: usize,
    ctx: &EvalContext,
) -> Option<Decimal> {
    let cache = ctx.return_cache?;
    let end_date = ctx.current_date();
    let returns = match cache.lookup_historical_returns(&group.group_id, window, end_date) {
        Ok(returns) => returns,
        Err(err) => {
            warn!(group_id = %group.group_id, %err, "return cache lookup failed");
            return None;
        }
    };
    if returns.len() < window {
        debug!(
            group_id = %group.group_id,
            have = returns.len(),
            want = window,
            "cached return series is short"
        );
        return None;
    }
    let series: Vec<Decimal> = returns.iter().map(|r| r.portfolio_daily_return).collect();
    series_metrics::metric_from_returns(kind, window, &series)
}

/// Re-evaluate the group's body for each missing trading day and persist the
/// resulting daily returns.
///
/// The held-position state machine: day D's signal establishes the position
/// whose return accrues on day D+1; the first actionable day only records a
/// signal. Days are processed strictly oldest to newest because each day's
/// return depends on the previous day's signal.
pub fn backfill_group(group: &GroupInfo, ev: &Evaluator, ctx: &mut EvalContext) {
    if ctx.session.backfilling.contains(&group.group_id) {
        // Guard hit: the group's own re-evaluation reached itself (or an
        // ancestor). Short-circuit to "no data from this path".
        debug!(group_id = %group.group_id, "backfill recursion guard hit");
        return;
    }
    ctx.session.backfilling.insert(group.group_id.clone());
    run_backfill_loop(group, ev, ctx);
    ctx.session.backfilling.remove(&group.group_id);
}

fn run_backfill_loop(group: &GroupInfo, ev: &Evaluator, ctx: &mut EvalContext) {
    let Some(cache) = ctx.return_cache else {
        return;
    };
    let end_date = ctx.current_date();
    let cap_start = end_date - Days::new(ctx.config.backfill_cap_days.unsigned_abs());

    // Resume after the newest cached date when one exists inside the cap.
    let start_date = match cache.lookup_historical_returns(&group.group_id, 1, end_date) {
        Ok(cached) => cached
            .last()
            .map(|r| r.record_date + Days::new(1))
            .filter(|d| *d > cap_start)
            .unwrap_or(cap_start),
        Err(err) => {
            warn!(group_id = %group.group_id, %err, "cache probe failed before backfill");
            cap_start
        }
    };
    if start_date > end_date {
        return;
    }

    info!(
        group_id = %group.group_id,
        name = %group.name,
        %start_date,
        %end_date,
        "starting in-process backfill"
    );

    // When resuming mid-series the first day's return accrues from the
    // signal of the trading day before the gap; without the seed that day
    // would stay a permanent hole.
    let mut held: Option<BTreeMap<String, Decimal>> = None;
    if start_date > cap_start {
        if let Some(prev) = previous_trading_day(start_date) {
            held = signal_for_date(group, prev, ev, ctx);
        }
    }
    let mut computed: u32 = 0;
    let mut persisted: u32 = 0;
    let mut unsaved: u32 = 0;

    let mut day = start_date;
    while day <= end_date {
        if matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            day = day + Days::new(1);
            continue;
        }

        if let Some(selections) = &held {
            if let Some(daily_return) = position_return(selections, day, ctx) {
                computed += 1;
                match cache.write_historical_return(&group.group_id, day, selections, daily_return)
                {
                    Ok(()) => persisted += 1,
                    Err(err) => {
                        // Computed but unsaved, distinct from never computed.
                        unsaved += 1;
                        warn!(
                            group_id = %group.group_id,
                            record_date = %day,
                            %err,
                            "return computed but not persisted"
                        );
                    }
                }
            }
        }

        match signal_for_date(group, day, ev, ctx) {
            Some(signal) => held = Some(signal),
            None => {
                // Keep the prior holding when a day's signal fails; the
                // position does not liquidate on an evaluation error.
            }
        }
        day = day + Days::new(1);
    }

    if computed > 0 && persisted == 0 {
        error!(
            group_id = %group.group_id,
            computed,
            "backfill persisted zero rows despite computed returns, storage backend likely misconfigured"
        );
    }
    info!(
        group_id = %group.group_id,
        computed,
        persisted,
        unsaved,
        "in-process backfill finished"
    );
}

fn previous_trading_day(date: NaiveDate) -> Option<NaiveDate> {
    let mut day = date.pred_opt()?;
    while matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
        day = day.pred_opt()?;
    }
    Some(day)
}

/// The weight map the group would produce as of a historical date, memoized
/// per (group, date) for the run. A failed evaluation memoizes as "no
/// signal" so it is not retried in-run.
pub fn signal_for_date(
    group: &GroupInfo,
    date: NaiveDate,
    ev: &Evaluator,
    ctx: &mut EvalContext,
) -> Option<BTreeMap<String, Decimal>> {
    let memo_key = (group.group_id.clone(), date);
    if let Some(memoized) = ctx.session.signal_memo.get(&memo_key) {
        return memoized.clone();
    }

    let saved_as_of = ctx.as_of;
    ctx.as_of = Some(date);
    let signal = match ev
        .eval_body(&group.body, ctx)
        .and_then(|value| to_fragment(&value, "group-signal"))
    {
        Ok(fragment) if !fragment.weights.is_empty() => Some(fragment.normalized_map()),
        Ok(_) => {
            debug!(group_id = %group.group_id, %date, "group signal evaluated to zero holdings");
            None
        }
        Err(err) => {
            debug!(group_id = %group.group_id, %date, %err, "group signal evaluation failed");
            None
        }
    };
    ctx.as_of = saved_as_of;

    ctx.session.signal_memo.insert(memo_key, signal.clone());
    signal
}

/// Weighted daily return of a held position on `date`. `None` when no
/// holding can be priced (a non-trading day, or missing bars everywhere).
fn position_return(
    selections: &BTreeMap<String, Decimal>,
    date: NaiveDate,
    ctx: &EvalContext,
) -> Option<Decimal> {
    let mut weighted = Decimal::ZERO;
    let mut covered = Decimal::ZERO;

    for (symbol, weight) in selections {
        let bars = match ctx.market_data.get_bars(
            symbol,
            PRICING_LOOKBACK_DAYS,
            crate::ports::market_data_port::Timeframe::Day,
            Some(date),
        ) {
            Ok(bars) => bars,
            Err(err) => {
                debug!(symbol, %date, %err, "no bars while pricing position");
                continue;
            }
        };
        let [.., prev, last] = bars.as_slice() else {
            continue;
        };
        if last.date != date {
            // Symbol did not trade on this date.
            continue;
        }
        if let Some(r) = last.daily_return(prev.close) {
            weighted += *weight * r;
            covered += *weight;
        }
    }

    if covered.is_zero() {
        return None;
    }
    // Rescale to the weight actually priced so partial coverage does not
    // understate the portfolio move.
    Some(weighted / covered)
}
