//! Asset, group and filter/selection operators.

use crate::domain::ast::AstNode;
use crate::domain::context::EvalContext;
use crate::domain::error::MaestroError;
use crate::domain::eval::Evaluator;
use crate::domain::fragment::{PortfolioFragment, to_fragment};
use crate::domain::groups::{self, GroupInfo};
use crate::domain::indicator::IndicatorKind;
use crate::domain::ops::indicators;
use crate::domain::scoring;
use crate::domain::value::Value;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, warn};

pub fn op_asset(
    ev: &Evaluator,
    args: &[AstNode],
    ctx: &mut EvalContext,
) -> Result<Value, MaestroError> {
    if args.len() != 1 {
        return Err(MaestroError::Arity {
            operator: "asset".to_string(),
            expected: "exactly 1".to_string(),
            got: args.len(),
        });
    }
    let symbol = ev.eval_node(&args[0], ctx)?;
    let symbol = symbol.as_str("asset")?;
    Ok(Value::Str(symbol.to_string()))
}

/// A naming container: evaluates its body in order and returns the last
/// result as a fragment tagged with the group's name, no weight math. The
/// tag is what routes the group through historical-series scoring, so even
/// a bare `(asset …)` body is wrapped.
pub fn op_group(
    ev: &Evaluator,
    args: &[AstNode],
    ctx: &mut EvalContext,
) -> Result<Value, MaestroError> {
    if args.len() < 2 {
        return Err(MaestroError::Arity {
            operator: "group".to_string(),
            expected: "a name and at least 1 body expression".to_string(),
            got: args.len(),
        });
    }
    let name = match &args[0] {
        AstNode::Str(name) => name.clone(),
        other => {
            return Err(MaestroError::ArgType {
                operator: "group".to_string(),
                expected: "string group name".to_string(),
                got: other.to_string(),
            });
        }
    };

    let result = ev.eval_body(&args[1..], ctx)?;
    let mut fragment = to_fragment(&result, "group")?;
    fragment.source_step = format!("group:{name}");
    fragment.metadata.insert("group_name".to_string(), name);
    Ok(Value::Fragment(fragment))
}

fn selection_count(
    ev: &Evaluator,
    args: &[AstNode],
    ctx: &mut EvalContext,
    operator: &str,
    direction: &str,
) -> Result<Value, MaestroError> {
    if args.len() != 1 {
        return Err(MaestroError::Arity {
            operator: operator.to_string(),
            expected: "exactly 1".to_string(),
            got: args.len(),
        });
    }
    let count = ev.eval_node(&args[0], ctx)?.as_decimal(operator)?;
    // Truncation, not rounding.
    let truncated = count.trunc();
    if truncated < Decimal::ZERO {
        warn!(operator, %count, "negative selection count");
        ctx.push_trace(format!(
            "{operator}: unusual negative count {count}, selects nothing"
        ));
    }
    Ok(Value::List(vec![
        Value::Str(direction.to_string()),
        Value::Number(truncated),
    ]))
}

pub fn op_select_top(
    ev: &Evaluator,
    args: &[AstNode],
    ctx: &mut EvalContext,
) -> Result<Value, MaestroError> {
    selection_count(ev, args, ctx, "select-top", "top")
}

pub fn op_select_bottom(
    ev: &Evaluator,
    args: &[AstNode],
    ctx: &mut EvalContext,
) -> Result<Value, MaestroError> {
    selection_count(ev, args, ctx, "select-bottom", "bottom")
}

/// A selector value as produced by `select-top`/`select-bottom`.
fn as_selector(value: &Value) -> Option<(bool, Decimal)> {
    if let Value::List(items) = value {
        if let [Value::Str(direction), Value::Number(count)] = items.as_slice() {
            match direction.as_str() {
                "top" => return Some((true, *count)),
                "bottom" => return Some((false, *count)),
                _ => {}
            }
        }
    }
    None
}

/// The ranking metric named by a filter condition: indicator kind plus
/// window, read from the condition's head symbol and `{:window n}` map.
fn condition_metric(condition: &AstNode) -> Result<(IndicatorKind, usize), MaestroError> {
    let head = condition.head_symbol().ok_or_else(|| MaestroError::ArgType {
        operator: "filter".to_string(),
        expected: "an indicator condition expression".to_string(),
        got: condition.to_string(),
    })?;
    let kind = IndicatorKind::from_operator(head).ok_or_else(|| MaestroError::ArgType {
        operator: "filter".to_string(),
        expected: "a rankable indicator condition".to_string(),
        got: head.to_string(),
    })?;

    let mut window = indicators::default_window(kind);
    for arg in condition.call_args() {
        if let AstNode::Map(pairs) = arg {
            for (key, value) in pairs {
                if key == "window" {
                    if let AstNode::Number(n) = value {
                        if let Some(w) = n.trunc().to_usize() {
                            window = w;
                        }
                    }
                }
            }
        }
    }
    Ok((kind, window))
}

/// Clone the condition with `symbol` injected as its first argument, so the
/// metric indicator evaluates against that symbol.
fn inject_symbol(condition: &AstNode, symbol: &str) -> AstNode {
    if let AstNode::List(children) = condition {
        if let Some((head, rest)) = children.split_first() {
            let mut injected = Vec::with_capacity(children.len() + 1);
            injected.push(head.clone());
            injected.push(AstNode::string(symbol));
            injected.extend(rest.iter().cloned());
            return AstNode::List(injected);
        }
    }
    condition.clone()
}

/// Score a single symbol by evaluating the condition against it. Failures
/// are soft: the symbol is excluded from ranking.
fn score_symbol(
    condition: &AstNode,
    symbol: &str,
    ev: &Evaluator,
    ctx: &mut EvalContext,
) -> Option<Decimal> {
    let injected = inject_symbol(condition, symbol);
    match ev.eval_node(&injected, ctx).and_then(|v| v.as_decimal("filter")) {
        Ok(score) => Some(score),
        Err(err) => {
            debug!(symbol, %err, "symbol excluded from ranking");
            None
        }
    }
}

/// Today-only weighted snapshot across a fragment's holdings. The explicit
/// degradation path when no historical return series is usable.
fn snapshot_score(
    condition: &AstNode,
    fragment: &PortfolioFragment,
    ev: &Evaluator,
    ctx: &mut EvalContext,
) -> Option<Decimal> {
    let mut weighted = Decimal::ZERO;
    let mut covered = Decimal::ZERO;
    for (symbol, weight) in fragment.normalized_map() {
        if let Some(score) = score_symbol(condition, &symbol, ev, ctx) {
            weighted += weight * score;
            covered += weight;
        }
    }
    if covered.is_zero() {
        return None;
    }
    Some(weighted / covered)
}

fn score_candidate(
    condition: &AstNode,
    kind: IndicatorKind,
    window: usize,
    candidate: &Value,
    ev: &Evaluator,
    ctx: &mut EvalContext,
) -> Option<Decimal> {
    if let Value::Str(symbol) = candidate {
        return score_symbol(condition, symbol, ev, ctx);
    }

    let fragment = match to_fragment(candidate, "filter") {
        Ok(fragment) => fragment,
        Err(err) => {
            debug!(%err, "candidate excluded from ranking");
            return None;
        }
    };

    if groups::is_bare_asset(&fragment) {
        let symbol = fragment.weights.keys().next().cloned()?;
        return score_symbol(condition, &symbol, ev, ctx);
    }

    // A genuine named group scores on its historical return series.
    if let Some(group) = lookup_group(&fragment, ctx) {
        if let Some(score) = scoring::score_group(&group, kind, window, ev, ctx) {
            return Some(score);
        }
        debug!(
            group_id = %group.group_id,
            "no historical series, degrading to today-only snapshot"
        );
        ctx.push_trace(format!(
            "filter: {} scored by today-only snapshot",
            group.name
        ));
    }
    snapshot_score(condition, &fragment, ev, ctx)
}

fn lookup_group(fragment: &PortfolioFragment, ctx: &EvalContext) -> Option<GroupInfo> {
    let name = fragment.metadata.get("group_name")?;
    let group_id = groups::derive_group_id(name);
    ctx.session.group_bodies.get(&group_id).cloned()
}

/// `filter(condition, selector, candidates…)`: score each candidate on the
/// condition metric, rank, truncate to the selector count and merge the
/// winners with equal weight per winner.
pub fn op_filter(
    ev: &Evaluator,
    args: &[AstNode],
    ctx: &mut EvalContext,
) -> Result<Value, MaestroError> {
    if args.len() < 2 {
        return Err(MaestroError::Arity {
            operator: "filter".to_string(),
            expected: "a condition, an optional selector and candidates".to_string(),
            got: args.len(),
        });
    }
    let condition = &args[0];
    let (kind, window) = condition_metric(condition)?;

    // The selector argument is optional; without one, top-1.
    let mut rest = &args[1..];
    let mut descending = true;
    let mut count = Decimal::ONE;
    if let Some(first) = rest.first() {
        if first.head_symbol() == Some("select-top") || first.head_symbol() == Some("select-bottom")
        {
            let selector = ev.eval_node(first, ctx)?;
            if let Some((is_top, n)) = as_selector(&selector) {
                descending = is_top;
                count = n;
                rest = &rest[1..];
            }
        }
    }

    // Evaluate candidates, flattening one level of list-wrapping.
    let mut candidates = Vec::new();
    for arg in rest {
        match ev.eval_node(arg, ctx)? {
            Value::List(items) => candidates.extend(items),
            value => candidates.push(value),
        }
    }
    if candidates.is_empty() {
        return Err(MaestroError::NoAssets {
            operator: "filter".to_string(),
        });
    }

    let mut scored: Vec<(Decimal, Value)> = Vec::new();
    for candidate in candidates {
        match score_candidate(condition, kind, window, &candidate, ev, ctx) {
            Some(score) => scored.push((score, candidate)),
            None => debug!("unscorable candidate dropped from ranking"),
        }
    }
    if scored.is_empty() {
        return Err(MaestroError::NoScorableCandidates {
            metric: kind.to_string(),
        });
    }

    // Stable sort keeps input order among equal scores.
    if descending {
        scored.sort_by(|a, b| b.0.cmp(&a.0));
    } else {
        scored.sort_by(|a, b| a.0.cmp(&b.0));
    }
    let take = count.to_usize().unwrap_or(0);
    scored.truncate(take);
    if scored.is_empty() {
        return Err(MaestroError::NoAssets {
            operator: "filter".to_string(),
        });
    }

    if scored.len() == 1 {
        // Single winner passes through with its weights unchanged.
        let (_, winner) = scored.into_iter().next().unwrap_or((Decimal::ZERO, Value::None));
        return Ok(Value::Fragment(to_fragment(&winner, "filter")?));
    }

    // Multiple winners merge at equal weight per winner, not per symbol.
    let share = Decimal::ONE / Decimal::from(scored.len());
    let mut merged = PortfolioFragment::new("filter");
    for (_, winner) in &scored {
        let fragment = to_fragment(winner, "filter")?;
        merged.accumulate_scaled(&fragment, share);
    }
    Ok(Value::Fragment(merged.normalize_weights()))
}
