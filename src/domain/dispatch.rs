//! Operator registry: name→function dispatch table.
//!
//! Registration happens once at startup and is not safe for concurrent
//! mutation; read-only dispatch after setup is safe for concurrent reads.
//! Dispatch fails closed: an unregistered symbol is a fatal evaluation error.

use crate::domain::ast::AstNode;
use crate::domain::context::EvalContext;
use crate::domain::error::MaestroError;
use crate::domain::eval::Evaluator;
use crate::domain::value::Value;
use std::collections::HashMap;
use tracing::warn;

/// Operators receive their argument nodes *unevaluated* and choose which
/// children to evaluate and in what order; this is what enables
/// short-circuiting in `if`.
pub type OperatorFn =
    fn(&Evaluator, &[AstNode], &mut EvalContext) -> Result<Value, MaestroError>;

#[derive(Default)]
pub struct OperatorRegistry {
    operators: HashMap<String, OperatorFn>,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Overwrites are logged, not rejected, so callers
    /// can shadow built-ins deliberately.
    pub fn register(&mut self, symbol: &str, operator: OperatorFn) {
        if self.operators.insert(symbol.to_string(), operator).is_some() {
            warn!(symbol, "operator overwritten in registry");
        }
    }

    pub fn lookup(&self, symbol: &str) -> Result<OperatorFn, MaestroError> {
        self.operators
            .get(symbol)
            .copied()
            .ok_or_else(|| MaestroError::UnknownOperator {
                symbol: symbol.to_string(),
            })
    }

    pub fn is_registered(&self, symbol: &str) -> bool {
        self.operators.contains_key(symbol)
    }

    pub fn list_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.operators.keys().cloned().collect();
        symbols.sort();
        symbols
    }
}
