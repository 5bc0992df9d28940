//! Strategy AST data structures.
//!
//! The DSL is a small s-expression language. A strategy is a tree of
//! [`AstNode`]s, built once by the parser and consumed read-only by the
//! evaluator. Identity is structural; nodes hold no back-references.
//!
//! - `Symbol`: an operator or bare identifier, e.g. `rsi`, `weight-equal`
//! - `Number`/`Str`: literal atoms
//! - `List`: a call form `(op arg1 arg2 …)`
//! - `Vector`: a grouping form `[expr expr …]` (no operator dispatch)
//! - `Map`: a keyword parameter map `{:window 14}`

use rust_decimal::Decimal;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    Symbol(String),
    Number(Decimal),
    Str(String),
    List(Vec<AstNode>),
    Vector(Vec<AstNode>),
    Map(Vec<(String, AstNode)>),
}

impl AstNode {
    pub fn symbol(name: &str) -> Self {
        AstNode::Symbol(name.to_string())
    }

    pub fn string(value: &str) -> Self {
        AstNode::Str(value.to_string())
    }

    /// The leading symbol of a call form, if this node is one.
    pub fn head_symbol(&self) -> Option<&str> {
        match self {
            AstNode::List(children) => match children.first() {
                Some(AstNode::Symbol(name)) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }

    /// The arguments of a call form (everything after the head symbol).
    pub fn call_args(&self) -> &[AstNode] {
        match self {
            AstNode::List(children) if self.head_symbol().is_some() => &children[1..],
            _ => &[],
        }
    }
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AstNode::Symbol(name) => write!(f, "{}", name),
            AstNode::Number(n) => write!(f, "{}", n),
            AstNode::Str(s) => write!(f, "\"{}\"", s),
            AstNode::List(children) => {
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
            AstNode::Vector(children) => {
                write!(f, "[")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, "]")
            }
            AstNode::Map(pairs) => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, ":{} {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn head_symbol_of_call_form() {
        let node = AstNode::List(vec![
            AstNode::symbol("rsi"),
            AstNode::string("SPY"),
            AstNode::Map(vec![("window".into(), AstNode::Number(dec!(14)))]),
        ]);
        assert_eq!(node.head_symbol(), Some("rsi"));
        assert_eq!(node.call_args().len(), 2);
    }

    #[test]
    fn head_symbol_absent_for_atoms_and_vectors() {
        assert_eq!(AstNode::string("SPY").head_symbol(), None);
        assert_eq!(AstNode::Vector(vec![]).head_symbol(), None);
        assert_eq!(
            AstNode::List(vec![AstNode::Number(dec!(1))]).head_symbol(),
            None
        );
    }

    #[test]
    fn display_round_trips_shape() {
        let node = AstNode::List(vec![
            AstNode::symbol("if"),
            AstNode::List(vec![
                AstNode::symbol(">"),
                AstNode::Number(dec!(1)),
                AstNode::Number(dec!(2)),
            ]),
            AstNode::List(vec![AstNode::symbol("asset"), AstNode::string("BIL")]),
        ]);
        assert_eq!(node.to_string(), "(if (> 1 2) (asset \"BIL\"))");
    }

    #[test]
    fn display_map_and_vector() {
        let node = AstNode::Vector(vec![AstNode::Map(vec![(
            "window".into(),
            AstNode::Number(dec!(14)),
        )])]);
        assert_eq!(node.to_string(), "[{:window 14}]");
    }
}
