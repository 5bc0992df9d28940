//! Weighting operators.
//!
//! # weight-equal child semantics
//!
//! Each top-level argument (after evaluating and flattening one level of
//! list-wrapping) is one "child" and receives exactly 1/n of total weight, no
//! matter how many underlying symbols it contains; the child's own weights
//! are renormalized to sum to 1 before scaling. Naive flat accumulation
//! over-weights symbols that recur across many nested branches.

use crate::domain::ast::AstNode;
use crate::domain::context::EvalContext;
use crate::domain::error::MaestroError;
use crate::domain::eval::Evaluator;
use crate::domain::fragment::{PortfolioFragment, to_fragment};
use crate::domain::indicator::{IndicatorKind, IndicatorRequest};
use crate::domain::value::Value;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use tracing::warn;

/// Fourth-root dampening applied to inverse volatilities. Empirically chosen
/// to match an external reference platform's observed output; pure 1/vol
/// over-concentrates. Do not simplify without a compatibility test against
/// known reference outputs.
pub const INVERSE_VOL_DAMPENING: Decimal = dec!(0.25);

/// Evaluate arguments and flatten one level of list-wrapping into children.
fn collect_children(
    ev: &Evaluator,
    args: &[AstNode],
    ctx: &mut EvalContext,
) -> Result<Vec<Value>, MaestroError> {
    let mut children = Vec::new();
    for arg in args {
        match ev.eval_node(arg, ctx)? {
            Value::List(items) => children.extend(items),
            value => children.push(value),
        }
    }
    Ok(children)
}

pub fn op_weight_equal(
    ev: &Evaluator,
    args: &[AstNode],
    ctx: &mut EvalContext,
) -> Result<Value, MaestroError> {
    let children = collect_children(ev, args, ctx)?;
    if children.is_empty() {
        return Err(MaestroError::NoAssets {
            operator: "weight-equal".to_string(),
        });
    }

    let share = Decimal::ONE / Decimal::from(children.len());
    let mut result = PortfolioFragment::new("weight-equal");
    for child in &children {
        let fragment = to_fragment(child, "weight-equal")?;
        result.accumulate_scaled(&fragment, share);
    }
    Ok(Value::Fragment(result.normalize_weights()))
}

pub fn op_weight_specified(
    ev: &Evaluator,
    args: &[AstNode],
    ctx: &mut EvalContext,
) -> Result<Value, MaestroError> {
    if args.len() < 2 || args.len() % 2 != 0 {
        return Err(MaestroError::Arity {
            operator: "weight-specified".to_string(),
            expected: "an even number (weight asset pairs), at least 2".to_string(),
            got: args.len(),
        });
    }

    let mut result = PortfolioFragment::new("weight-specified");
    for pair in args.chunks_exact(2) {
        let weight = ev.eval_node(&pair[0], ctx)?.as_decimal("weight-specified")?;
        let asset = ev.eval_node(&pair[1], ctx)?;
        let fragment = to_fragment(&asset, "weight-specified")?;
        result.accumulate_scaled(&fragment, weight);
    }
    Ok(Value::Fragment(result))
}

/// Collect candidate symbols from evaluated arguments: strings, fragment
/// holdings and nested lists all contribute.
fn collect_symbols(value: &Value, symbols: &mut Vec<String>) {
    match value {
        Value::Str(symbol) => symbols.push(symbol.clone()),
        Value::Fragment(fragment) => symbols.extend(fragment.weights.keys().cloned()),
        Value::List(items) => {
            for item in items {
                collect_symbols(item, symbols);
            }
        }
        _ => {}
    }
}

pub fn op_weight_inverse_volatility(
    ev: &Evaluator,
    args: &[AstNode],
    ctx: &mut EvalContext,
) -> Result<Value, MaestroError> {
    if args.len() < 2 {
        return Err(MaestroError::Arity {
            operator: "weight-inverse-volatility".to_string(),
            expected: "a window and at least 1 asset".to_string(),
            got: args.len(),
        });
    }

    let window_value = ev.eval_node(&args[0], ctx)?.as_decimal("weight-inverse-volatility")?;
    let window = window_value
        .trunc()
        .to_usize()
        .ok_or_else(|| MaestroError::ArgType {
            operator: "weight-inverse-volatility".to_string(),
            expected: "positive integer window".to_string(),
            got: window_value.to_string(),
        })?;

    let mut symbols = Vec::new();
    for arg in &args[1..] {
        let value = ev.eval_node(arg, ctx)?;
        collect_symbols(&value, &mut symbols);
    }
    symbols.dedup();

    let mut raw_weights: Vec<(String, Decimal)> = Vec::new();
    for symbol in &symbols {
        let request = IndicatorRequest {
            symbol: symbol.clone(),
            kind: IndicatorKind::StdevReturn,
            window,
            as_of: ctx.as_of,
        };
        let volatility = match ctx.indicators.get_indicator(&request) {
            Ok(indicator) => indicator.value_for(IndicatorKind::StdevReturn, window),
            Err(err) => {
                warn!(symbol, %err, "skipping symbol with failed volatility lookup");
                None
            }
        };
        match volatility {
            Some(vol) if vol > Decimal::ZERO => {
                let dampened = (Decimal::ONE / vol).powd(INVERSE_VOL_DAMPENING);
                raw_weights.push((symbol.clone(), dampened));
            }
            Some(vol) => {
                warn!(symbol, %vol, "skipping symbol with non-positive volatility");
            }
            None => {
                warn!(symbol, window, "skipping symbol with missing volatility");
            }
        }
    }

    if raw_weights.is_empty() {
        return Err(MaestroError::NoValidVolatilities {
            candidates: symbols.len(),
        });
    }

    let mut result = PortfolioFragment::new("weight-inverse-volatility");
    for (symbol, weight) in raw_weights {
        result.weights.insert(symbol, weight);
    }
    Ok(Value::Fragment(result.normalize_weights()))
}
