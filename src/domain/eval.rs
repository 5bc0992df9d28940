//! Recursive-descent strategy evaluator.
//!
//! # Evaluation semantics
//!
//! - Atoms resolve to literal values; bare symbols resolve to their name
//! - Vectors evaluate their children in order into a list value
//! - List nodes with a leading symbol dispatch to the registered operator,
//!   passing the remaining children *unevaluated*
//! - A fatal error unwinds the whole expression immediately; an allocation
//!   either exists completely or not at all

use crate::domain::ast::AstNode;
use crate::domain::context::EvalContext;
use crate::domain::dispatch::OperatorRegistry;
use crate::domain::error::MaestroError;
use crate::domain::fragment::to_fragment;
use crate::domain::groups;
use crate::domain::ops;
use crate::domain::value::Value;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

/// A final target allocation: symbol → weight, summing to 1.
pub type Allocation = BTreeMap<String, Decimal>;

pub struct Evaluator {
    registry: OperatorRegistry,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            registry: ops::default_registry(),
        }
    }

    pub fn with_registry(registry: OperatorRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    /// Evaluate a full strategy to a target allocation.
    ///
    /// Resets the per-run session caches and runs group discovery before
    /// walking the body, then normalizes the final value into a symbol→weight
    /// map summing to 1.
    pub fn evaluate(
        &self,
        ast: &AstNode,
        ctx: &mut EvalContext,
    ) -> Result<Allocation, MaestroError> {
        ctx.session.clear();
        groups::discover_groups(ast, &mut ctx.session);
        debug!(
            correlation_id = %ctx.correlation_id,
            groups = ctx.session.group_bodies.len(),
            "starting strategy evaluation"
        );

        let value = self.eval_node(ast, ctx)?;
        let fragment = to_fragment(&value, "strategy")?;
        if fragment.weights.is_empty() {
            return Err(MaestroError::NoAssets {
                operator: "strategy".to_string(),
            });
        }
        Ok(fragment.normalized_map())
    }

    pub fn eval_node(
        &self,
        node: &AstNode,
        ctx: &mut EvalContext,
    ) -> Result<Value, MaestroError> {
        match node {
            AstNode::Symbol(name) => Ok(Value::Str(name.clone())),
            AstNode::Number(n) => Ok(Value::Number(*n)),
            AstNode::Str(s) => Ok(Value::Str(s.clone())),
            AstNode::Vector(children) => {
                let mut items = Vec::with_capacity(children.len());
                for child in children {
                    items.push(self.eval_node(child, ctx)?);
                }
                Ok(Value::List(items))
            }
            AstNode::Map(pairs) => {
                let mut entries = BTreeMap::new();
                for (key, value_node) in pairs {
                    entries.insert(key.clone(), self.eval_node(value_node, ctx)?);
                }
                Ok(Value::Map(entries))
            }
            AstNode::List(children) => {
                if let Some(symbol) = node.head_symbol() {
                    let operator = self.registry.lookup(symbol)?;
                    return operator(self, node.call_args(), ctx);
                }
                // A list without an operator head is plain data.
                let mut items = Vec::with_capacity(children.len());
                for child in children {
                    items.push(self.eval_node(child, ctx)?);
                }
                Ok(Value::List(items))
            }
        }
    }

    /// Evaluate a sequence of body expressions, returning the last result.
    pub fn eval_body(
        &self,
        body: &[AstNode],
        ctx: &mut EvalContext,
    ) -> Result<Value, MaestroError> {
        let mut last = Value::None;
        for expr in body {
            // A vector in body position is a sequence of expressions, not data.
            if let AstNode::Vector(children) = expr {
                for child in children {
                    last = self.eval_node(child, ctx)?;
                }
            } else {
                last = self.eval_node(expr, ctx)?;
            }
        }
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    mod stubs {
        use crate::domain::error::MaestroError;
        use crate::domain::indicator::{IndicatorRequest, TechnicalIndicator};
        use crate::domain::ohlcv::Bar;
        use crate::ports::indicator_port::IndicatorPort;
        use crate::ports::market_data_port::{MarketDataPort, Timeframe};
        use chrono::NaiveDate;

        pub struct NoData;

        impl MarketDataPort for NoData {
            fn get_bars(
                &self,
                symbol: &str,
                _period_days: u32,
                _timeframe: Timeframe,
                _as_of: Option<NaiveDate>,
            ) -> Result<Vec<Bar>, MaestroError> {
                Err(MaestroError::MarketData {
                    reason: format!("no data for {symbol}"),
                })
            }
        }

        impl IndicatorPort for NoData {
            fn get_indicator(
                &self,
                request: &IndicatorRequest,
            ) -> Result<TechnicalIndicator, MaestroError> {
                Err(MaestroError::Indicator {
                    symbol: request.symbol.clone(),
                    indicator: request.kind.to_string(),
                    reason: "stub".into(),
                })
            }
        }
    }

    fn no_data_ctx(ports: &stubs::NoData) -> EvalContext<'_> {
        EvalContext::new(ports, ports)
    }

    #[test]
    fn atoms_resolve_to_literals() {
        let ports = stubs::NoData;
        let mut ctx = no_data_ctx(&ports);
        let ev = Evaluator::new();
        assert_eq!(
            ev.eval_node(&AstNode::Number(dec!(3.5)), &mut ctx).unwrap(),
            Value::Number(dec!(3.5))
        );
        assert_eq!(
            ev.eval_node(&AstNode::string("SPY"), &mut ctx).unwrap(),
            Value::Str("SPY".into())
        );
        assert_eq!(
            ev.eval_node(&AstNode::symbol("close"), &mut ctx).unwrap(),
            Value::Str("close".into())
        );
    }

    #[test]
    fn vector_evaluates_to_list() {
        let ports = stubs::NoData;
        let mut ctx = no_data_ctx(&ports);
        let ev = Evaluator::new();
        let node = AstNode::Vector(vec![AstNode::Number(dec!(1)), AstNode::Number(dec!(2))]);
        assert_eq!(
            ev.eval_node(&node, &mut ctx).unwrap(),
            Value::List(vec![Value::Number(dec!(1)), Value::Number(dec!(2))])
        );
    }

    #[test]
    fn unknown_operator_is_fatal() {
        let ports = stubs::NoData;
        let mut ctx = no_data_ctx(&ports);
        let ev = Evaluator::new();
        let node = AstNode::List(vec![AstNode::symbol("frobnicate"), AstNode::Number(dec!(1))]);
        assert!(matches!(
            ev.eval_node(&node, &mut ctx),
            Err(MaestroError::UnknownOperator { .. })
        ));
    }

    #[test]
    fn evaluate_simple_asset_strategy() {
        let ports = stubs::NoData;
        let mut ctx = no_data_ctx(&ports);
        let ev = Evaluator::new();
        let node = AstNode::List(vec![AstNode::symbol("asset"), AstNode::string("SPY")]);
        let allocation = ev.evaluate(&node, &mut ctx).unwrap();
        assert_eq!(allocation["SPY"], Decimal::ONE);
    }

    #[test]
    fn map_evaluates_values() {
        let ports = stubs::NoData;
        let mut ctx = no_data_ctx(&ports);
        let ev = Evaluator::new();
        let node = AstNode::Map(vec![("window".into(), AstNode::Number(dec!(14)))]);
        match ev.eval_node(&node, &mut ctx).unwrap() {
            Value::Map(entries) => assert_eq!(entries["window"], Value::Number(dec!(14))),
            other => panic!("expected map, got {other:?}"),
        }
    }
}
