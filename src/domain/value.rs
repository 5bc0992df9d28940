//! Runtime values produced by operator invocations.
//!
//! `Value` is the full union flowing through the evaluator. Truthiness is
//! defined explicitly here rather than borrowed from any ambient language
//! convention: zero, empty string, empty collections and `None` are falsy.

use crate::domain::error::MaestroError;
use crate::domain::fragment::PortfolioFragment;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(Decimal),
    Str(String),
    Bool(bool),
    Fragment(PortfolioFragment),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    None,
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Fragment(_) => "portfolio",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::None => "none",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => !n.is_zero(),
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::Fragment(fragment) => !fragment.weights.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
            Value::None => false,
        }
    }

    /// Exact-decimal coercion for comparison and weight arithmetic.
    pub fn as_decimal(&self, operator: &str) -> Result<Decimal, MaestroError> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(MaestroError::ArgType {
                operator: operator.to_string(),
                expected: "number".to_string(),
                got: other.kind().to_string(),
            }),
        }
    }

    pub fn as_str(&self, operator: &str) -> Result<&str, MaestroError> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(MaestroError::ArgType {
                operator: operator.to_string(),
                expected: "string".to_string(),
                got: other.kind().to_string(),
            }),
        }
    }

    pub fn as_map(&self, operator: &str) -> Result<&BTreeMap<String, Value>, MaestroError> {
        match self {
            Value::Map(entries) => Ok(entries),
            other => Err(MaestroError::ArgType {
                operator: operator.to_string(),
                expected: "parameter map".to_string(),
                got: other.kind().to_string(),
            }),
        }
    }
}
