//! Decision audit records and human-readable condition formatting.
//!
//! Every `if` evaluated during a run appends one [`DecisionNode`] to the
//! context's decision path. Records are write-once: appended after the branch
//! is selected and never mutated afterwards.

use crate::domain::ast::AstNode;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionNode {
    /// Human-readable condition string, e.g. `rsi("SPY" {:window 14}) > 70`.
    pub condition: String,
    pub result: bool,
    /// "then" or "else".
    pub branch: String,
    /// Indicator references seen inside the condition.
    pub values: Vec<String>,
    pub condition_type: Option<String>,
    pub symbols_involved: Vec<String>,
    pub operator_type: Option<String>,
    pub threshold: Option<Decimal>,
    pub indicator_name: Option<String>,
    pub indicator_window: Option<usize>,
}

/// Operators whose calls inside a condition count as indicator references.
const INDICATOR_OPERATORS: &[&str] = &[
    "rsi",
    "current-price",
    "moving-average-price",
    "moving-average-return",
    "cumulative-return",
    "exponential-moving-average-price",
    "stdev-return",
    "stdev-price",
    "max-drawdown",
];

fn display_operator(op: &str) -> &str {
    match op {
        "=" => "==",
        "and" => "AND",
        "or" => "OR",
        other => other,
    }
}

/// Render a condition AST for humans.
///
/// Binary-looking list expressions (>= 3 children with a symbol head) render
/// as `LEFT OP RIGHT`; other call forms render as `func(a, b, …)`.
pub fn format_condition(node: &AstNode) -> String {
    match node {
        AstNode::Symbol(name) => name.clone(),
        AstNode::Number(n) => n.to_string(),
        AstNode::Str(s) => format!("\"{}\"", s),
        AstNode::Vector(_) | AstNode::Map(_) => node.to_string(),
        AstNode::List(children) => {
            if let Some(AstNode::Symbol(op)) = children.first() {
                if children.len() >= 3 {
                    let left = format_condition(&children[1]);
                    let right = children[2..]
                        .iter()
                        .map(format_condition)
                        .collect::<Vec<_>>()
                        .join(" ");
                    return format!("{} {} {}", left, display_operator(op), right);
                }
                let args = children[1..]
                    .iter()
                    .map(format_condition)
                    .collect::<Vec<_>>()
                    .join(", ");
                return format!("{}({})", op, args);
            }
            node.to_string()
        }
    }
}

/// Collect `"indicator(symbol, window)"` placeholders referenced by a condition.
pub fn collect_indicator_refs(node: &AstNode) -> Vec<String> {
    let mut refs = Vec::new();
    collect_into(node, &mut refs);
    refs
}

fn collect_into(node: &AstNode, refs: &mut Vec<String>) {
    match node {
        AstNode::List(children) => {
            if let Some(op) = node.head_symbol() {
                if INDICATOR_OPERATORS.contains(&op) {
                    let args = node
                        .call_args()
                        .iter()
                        .map(format_condition)
                        .collect::<Vec<_>>()
                        .join(", ");
                    refs.push(format!("{}({})", op, args));
                }
            }
            for child in children {
                collect_into(child, refs);
            }
        }
        AstNode::Vector(children) => {
            for child in children {
                collect_into(child, refs);
            }
        }
        AstNode::Map(pairs) => {
            for (_, value) in pairs {
                collect_into(value, refs);
            }
        }
        _ => {}
    }
}

/// Collect string/symbol leaves of a condition (candidate ticker symbols).
pub fn collect_symbols(node: &AstNode) -> Vec<String> {
    let mut symbols = Vec::new();
    collect_symbols_into(node, &mut symbols);
    symbols
}

fn collect_symbols_into(node: &AstNode, symbols: &mut Vec<String>) {
    match node {
        AstNode::Str(s) => symbols.push(s.clone()),
        AstNode::List(children) | AstNode::Vector(children) => {
            for child in children {
                collect_symbols_into(child, symbols);
            }
        }
        AstNode::Map(pairs) => {
            for (_, value) in pairs {
                collect_symbols_into(value, symbols);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rsi_condition() -> AstNode {
        AstNode::List(vec![
            AstNode::symbol(">"),
            AstNode::List(vec![
                AstNode::symbol("rsi"),
                AstNode::string("SPY"),
                AstNode::Map(vec![("window".into(), AstNode::Number(dec!(14)))]),
            ]),
            AstNode::Number(dec!(70)),
        ])
    }

    #[test]
    fn binary_expression_renders_infix() {
        assert_eq!(
            format_condition(&rsi_condition()),
            "rsi(\"SPY\", {:window 14}) > 70"
        );
    }

    #[test]
    fn equality_translates_to_double_equals() {
        let node = AstNode::List(vec![
            AstNode::symbol("="),
            AstNode::Number(dec!(1)),
            AstNode::Number(dec!(2)),
        ]);
        assert_eq!(format_condition(&node), "1 == 2");
    }

    #[test]
    fn short_call_renders_as_function() {
        let node = AstNode::List(vec![AstNode::symbol("current-price"), AstNode::string("QQQ")]);
        assert_eq!(format_condition(&node), "current-price(\"QQQ\")");
    }

    #[test]
    fn atoms_stringify_directly() {
        assert_eq!(format_condition(&AstNode::symbol("x")), "x");
        assert_eq!(format_condition(&AstNode::Number(dec!(3.5))), "3.5");
    }

    #[test]
    fn indicator_refs_collected_recursively() {
        let refs = collect_indicator_refs(&rsi_condition());
        assert_eq!(refs.len(), 1);
        assert!(refs[0].starts_with("rsi("));
    }

    #[test]
    fn symbols_collected_from_condition() {
        assert_eq!(collect_symbols(&rsi_condition()), vec!["SPY".to_string()]);
    }
}
