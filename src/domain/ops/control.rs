//! Control-flow operators: `if` and the strategy wrapper.
//!
//! `if` evaluates its condition eagerly and then exactly one branch; the
//! other branch is never evaluated, so it produces no side effects and no
//! indicator requests. A falsy condition with no else branch is a fatal
//! error, not an implicit hold.

use crate::domain::ast::AstNode;
use crate::domain::context::EvalContext;
use crate::domain::decision::{
    DecisionNode, collect_indicator_refs, collect_symbols, format_condition,
};
use crate::domain::error::MaestroError;
use crate::domain::eval::Evaluator;
use crate::domain::value::Value;
use crate::ports::event_port::DecisionEvaluatedEvent;
use rust_decimal::prelude::ToPrimitive;

pub fn op_if(
    ev: &Evaluator,
    args: &[AstNode],
    ctx: &mut EvalContext,
) -> Result<Value, MaestroError> {
    if args.len() < 2 {
        return Err(MaestroError::Arity {
            operator: "if".to_string(),
            expected: "2 or 3".to_string(),
            got: args.len(),
        });
    }

    let condition_node = &args[0];
    let condition = format_condition(condition_node);
    let result = ev.eval_node(condition_node, ctx)?.is_truthy();

    if !result && args.len() < 3 {
        return Err(MaestroError::MissingElseBranch { condition });
    }

    let (branch, branch_node) = if result {
        ("then", &args[1])
    } else {
        ("else", &args[2])
    };
    let value = ev.eval_node(branch_node, ctx)?;

    let decision = decision_node(condition_node, condition, result, branch);
    let weights = match &value {
        Value::Fragment(fragment) => Some(fragment.weights.clone()),
        _ => None,
    };
    ctx.publish_decision(&DecisionEvaluatedEvent {
        correlation_id: ctx.correlation_id.clone(),
        condition: decision.condition.clone(),
        result,
        branch: branch.to_string(),
        weights,
    });
    ctx.decision_path.push(decision);

    Ok(value)
}

fn decision_node(
    condition_node: &AstNode,
    condition: String,
    result: bool,
    branch: &str,
) -> DecisionNode {
    let mut node = DecisionNode {
        condition,
        result,
        branch: branch.to_string(),
        values: collect_indicator_refs(condition_node),
        condition_type: None,
        symbols_involved: collect_symbols(condition_node),
        operator_type: None,
        threshold: None,
        indicator_name: None,
        indicator_window: None,
    };

    // Binary comparisons carry richer audit metadata.
    if let Some(op) = condition_node.head_symbol() {
        let args = condition_node.call_args();
        if matches!(op, ">" | "<" | ">=" | "<=" | "=") && args.len() == 2 {
            node.condition_type = Some("comparison".to_string());
            node.operator_type = Some(op.to_string());
            if let AstNode::Number(threshold) = &args[1] {
                node.threshold = Some(*threshold);
            }
            if let Some(indicator) = args[0].head_symbol() {
                node.indicator_name = Some(indicator.to_string());
                node.indicator_window = indicator_window(&args[0]);
            }
        }
    }
    node
}

fn indicator_window(node: &AstNode) -> Option<usize> {
    for arg in node.call_args() {
        if let AstNode::Map(pairs) = arg {
            for (key, value) in pairs {
                if key == "window" {
                    if let AstNode::Number(n) = value {
                        return n.trunc().to_usize();
                    }
                }
            }
        }
    }
    None
}

/// Strategy wrapper: `(defsymphony "name" {config} body…)`. Name and config
/// are inert metadata; only the body is evaluated and returned.
pub fn op_defsymphony(
    ev: &Evaluator,
    args: &[AstNode],
    ctx: &mut EvalContext,
) -> Result<Value, MaestroError> {
    if args.len() < 3 {
        return Err(MaestroError::Arity {
            operator: "defsymphony".to_string(),
            expected: "at least 3".to_string(),
            got: args.len(),
        });
    }
    ev.eval_body(&args[2..], ctx)
}
