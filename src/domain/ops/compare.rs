//! Comparison operators.
//!
//! `>`, `<`, `>=`, `<=` require exactly two arguments, evaluate both, coerce
//! both to exact decimals and compare. `=` never raises: both-numeric compares
//! exact decimal equality, both-string exact string equality, any other type
//! combination is `false`.

use crate::domain::ast::AstNode;
use crate::domain::context::EvalContext;
use crate::domain::error::MaestroError;
use crate::domain::eval::Evaluator;
use crate::domain::value::Value;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Relative closeness below which a comparison is flagged as fragile: a small
/// calculation difference could flip the branch outcome. Audit-only, does not
/// change the result.
const FRAGILE_THRESHOLD: Decimal = dec!(0.005);

fn compare_decimals(
    ev: &Evaluator,
    args: &[AstNode],
    ctx: &mut EvalContext,
    operator: &str,
    cmp: fn(Decimal, Decimal) -> bool,
) -> Result<Value, MaestroError> {
    if args.len() != 2 {
        return Err(MaestroError::Arity {
            operator: operator.to_string(),
            expected: "2".to_string(),
            got: args.len(),
        });
    }
    let left = ev.eval_node(&args[0], ctx)?.as_decimal(operator)?;
    let right = ev.eval_node(&args[1], ctx)?.as_decimal(operator)?;

    let magnitude = left.abs().max(right.abs()).max(Decimal::ONE);
    if (left - right).abs() / magnitude < FRAGILE_THRESHOLD {
        ctx.push_trace(format!(
            "fragile comparison: {left} {operator} {right}"
        ));
    }

    Ok(Value::Bool(cmp(left, right)))
}

pub fn op_gt(ev: &Evaluator, args: &[AstNode], ctx: &mut EvalContext) -> Result<Value, MaestroError> {
    compare_decimals(ev, args, ctx, ">", |l, r| l > r)
}

pub fn op_lt(ev: &Evaluator, args: &[AstNode], ctx: &mut EvalContext) -> Result<Value, MaestroError> {
    compare_decimals(ev, args, ctx, "<", |l, r| l < r)
}

pub fn op_ge(ev: &Evaluator, args: &[AstNode], ctx: &mut EvalContext) -> Result<Value, MaestroError> {
    compare_decimals(ev, args, ctx, ">=", |l, r| l >= r)
}

pub fn op_le(ev: &Evaluator, args: &[AstNode], ctx: &mut EvalContext) -> Result<Value, MaestroError> {
    compare_decimals(ev, args, ctx, "<=", |l, r| l <= r)
}

pub fn op_eq(ev: &Evaluator, args: &[AstNode], ctx: &mut EvalContext) -> Result<Value, MaestroError> {
    if args.len() != 2 {
        return Err(MaestroError::Arity {
            operator: "=".to_string(),
            expected: "2".to_string(),
            got: args.len(),
        });
    }
    let left = ev.eval_node(&args[0], ctx)?;
    let right = ev.eval_node(&args[1], ctx)?;
    let equal = match (&left, &right) {
        (Value::Number(l), Value::Number(r)) => l == r,
        (Value::Str(l), Value::Str(r)) => l == r,
        _ => false,
    };
    Ok(Value::Bool(equal))
}
