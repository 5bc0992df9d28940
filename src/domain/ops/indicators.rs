//! Indicator operators.
//!
//! Each operator takes an evaluated symbol argument (must be a string) and an
//! optional parameter map whose `window` key controls the lookback. The
//! operator builds an [`IndicatorRequest`], asks the indicator port for a
//! computed snapshot and extracts the window-specific field, falling back to
//! the generic `metadata.value` slot; a missing value is fatal.

use crate::domain::ast::AstNode;
use crate::domain::context::EvalContext;
use crate::domain::error::MaestroError;
use crate::domain::eval::Evaluator;
use crate::domain::indicator::{IndicatorKind, IndicatorRequest};
use crate::domain::value::Value;
use crate::ports::event_port::IndicatorComputedEvent;
use rust_decimal::prelude::ToPrimitive;

pub fn default_window(kind: IndicatorKind) -> usize {
    match kind {
        IndicatorKind::Rsi => 14,
        IndicatorKind::CurrentPrice => 0,
        IndicatorKind::MovingAveragePrice => 200,
        IndicatorKind::ExponentialMovingAveragePrice => 12,
        IndicatorKind::Ppo => 12,
        _ => 10,
    }
}

/// Shared argument handling for every indicator operator.
fn indicator_value(
    ev: &Evaluator,
    args: &[AstNode],
    ctx: &mut EvalContext,
    kind: IndicatorKind,
) -> Result<Value, MaestroError> {
    let operator = kind.to_string();
    if args.is_empty() || args.len() > 2 {
        return Err(MaestroError::Arity {
            operator,
            expected: "1 or 2".to_string(),
            got: args.len(),
        });
    }

    let symbol = ev.eval_node(&args[0], ctx)?.as_str(&operator)?.to_string();

    let mut window = default_window(kind);
    if let Some(params_node) = args.get(1) {
        let params_value = ev.eval_node(params_node, ctx)?;
        let params = params_value.as_map(&operator)?;
        if let Some(raw) = params.get("window") {
            let n = raw.as_decimal(&operator)?;
            window = n.trunc().to_usize().ok_or_else(|| MaestroError::ArgType {
                operator: operator.clone(),
                expected: "non-negative integer window".to_string(),
                got: n.to_string(),
            })?;
        }
    }

    let request = IndicatorRequest {
        symbol: symbol.clone(),
        kind,
        window,
        as_of: ctx.as_of,
    };
    let indicator = ctx.indicators.get_indicator(&request)?;

    let value = if kind == IndicatorKind::CurrentPrice {
        indicator
            .current_price
            .or_else(|| indicator.value_for(kind, window))
    } else {
        indicator.value_for(kind, window)
    };
    let value = value.ok_or_else(|| MaestroError::Indicator {
        symbol: symbol.clone(),
        indicator: operator.clone(),
        reason: format!("no computed value for window {window}"),
    })?;

    ctx.publish_indicator(&IndicatorComputedEvent {
        correlation_id: ctx.correlation_id.clone(),
        symbol,
        indicator: operator,
        window,
        value,
    });

    Ok(Value::Number(value))
}

pub fn op_rsi(ev: &Evaluator, args: &[AstNode], ctx: &mut EvalContext) -> Result<Value, MaestroError> {
    indicator_value(ev, args, ctx, IndicatorKind::Rsi)
}

pub fn op_current_price(
    ev: &Evaluator,
    args: &[AstNode],
    ctx: &mut EvalContext,
) -> Result<Value, MaestroError> {
    indicator_value(ev, args, ctx, IndicatorKind::CurrentPrice)
}

pub fn op_moving_average_price(
    ev: &Evaluator,
    args: &[AstNode],
    ctx: &mut EvalContext,
) -> Result<Value, MaestroError> {
    indicator_value(ev, args, ctx, IndicatorKind::MovingAveragePrice)
}

pub fn op_moving_average_return(
    ev: &Evaluator,
    args: &[AstNode],
    ctx: &mut EvalContext,
) -> Result<Value, MaestroError> {
    indicator_value(ev, args, ctx, IndicatorKind::MovingAverageReturn)
}

pub fn op_cumulative_return(
    ev: &Evaluator,
    args: &[AstNode],
    ctx: &mut EvalContext,
) -> Result<Value, MaestroError> {
    indicator_value(ev, args, ctx, IndicatorKind::CumulativeReturn)
}

pub fn op_exponential_moving_average_price(
    ev: &Evaluator,
    args: &[AstNode],
    ctx: &mut EvalContext,
) -> Result<Value, MaestroError> {
    indicator_value(ev, args, ctx, IndicatorKind::ExponentialMovingAveragePrice)
}

pub fn op_stdev_return(
    ev: &Evaluator,
    args: &[AstNode],
    ctx: &mut EvalContext,
) -> Result<Value, MaestroError> {
    indicator_value(ev, args, ctx, IndicatorKind::StdevReturn)
}

pub fn op_stdev_price(
    ev: &Evaluator,
    args: &[AstNode],
    ctx: &mut EvalContext,
) -> Result<Value, MaestroError> {
    indicator_value(ev, args, ctx, IndicatorKind::StdevPrice)
}

pub fn op_max_drawdown(
    ev: &Evaluator,
    args: &[AstNode],
    ctx: &mut EvalContext,
) -> Result<Value, MaestroError> {
    indicator_value(ev, args, ctx, IndicatorKind::MaxDrawdown)
}

pub fn op_ma_deprecated(
    _ev: &Evaluator,
    _args: &[AstNode],
    _ctx: &mut EvalContext,
) -> Result<Value, MaestroError> {
    Err(MaestroError::DeprecatedOperator {
        operator: "ma".to_string(),
        guidance: "use moving-average-price or exponential-moving-average-price".to_string(),
    })
}

pub fn op_volatility_deprecated(
    _ev: &Evaluator,
    _args: &[AstNode],
    _ctx: &mut EvalContext,
) -> Result<Value, MaestroError> {
    Err(MaestroError::DeprecatedOperator {
        operator: "volatility".to_string(),
        guidance: "use stdev-return or stdev-price".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::TechnicalIndicator;
    use crate::domain::ohlcv::Bar;
    use crate::ports::indicator_port::IndicatorPort;
    use crate::ports::market_data_port::{MarketDataPort, Timeframe};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    struct FixedIndicator {
        key: String,
        value: Decimal,
        metadata_value: Option<Decimal>,
    }

    impl MarketDataPort for FixedIndicator {
        fn get_bars(
            &self,
            _symbol: &str,
            _period_days: u32,
            _timeframe: Timeframe,
            _as_of: Option<NaiveDate>,
        ) -> Result<Vec<Bar>, MaestroError> {
            Ok(Vec::new())
        }
    }

    impl IndicatorPort for FixedIndicator {
        fn get_indicator(
            &self,
            request: &IndicatorRequest,
        ) -> Result<TechnicalIndicator, MaestroError> {
            let mut values = BTreeMap::new();
            values.insert(self.key.clone(), self.value);
            let mut metadata = BTreeMap::new();
            if let Some(fallback) = self.metadata_value {
                metadata.insert("value".to_string(), fallback.to_string());
            }
            Ok(TechnicalIndicator {
                symbol: request.symbol.clone(),
                timestamp: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                current_price: Some(dec!(100)),
                values,
                data_source: "stub".into(),
                metadata,
            })
        }
    }

    fn rsi_call(window: Option<AstNode>) -> AstNode {
        let mut children = vec![AstNode::symbol("rsi"), AstNode::string("SPY")];
        if let Some(w) = window {
            children.push(AstNode::Map(vec![("window".into(), w)]));
        }
        AstNode::List(children)
    }

    #[test]
    fn extracts_window_specific_field() {
        let ports = FixedIndicator {
            key: "rsi_21".into(),
            value: dec!(63),
            metadata_value: None,
        };
        let mut ctx = EvalContext::new(&ports, &ports);
        let ev = Evaluator::new();
        let value = ev
            .eval_node(&rsi_call(Some(AstNode::Number(dec!(21)))), &mut ctx)
            .unwrap();
        assert_eq!(value, Value::Number(dec!(63)));
    }

    #[test]
    fn default_window_applies_without_params() {
        let ports = FixedIndicator {
            key: "rsi_14".into(),
            value: dec!(55),
            metadata_value: None,
        };
        let mut ctx = EvalContext::new(&ports, &ports);
        let ev = Evaluator::new();
        let value = ev.eval_node(&rsi_call(None), &mut ctx).unwrap();
        assert_eq!(value, Value::Number(dec!(55)));
    }

    #[test]
    fn falls_back_to_metadata_value() {
        let ports = FixedIndicator {
            key: "rsi_14".into(),
            value: dec!(55),
            metadata_value: Some(dec!(48.5)),
        };
        let mut ctx = EvalContext::new(&ports, &ports);
        let ev = Evaluator::new();
        // Window 30 has no canonical field; the metadata slot backs it.
        let value = ev
            .eval_node(&rsi_call(Some(AstNode::Number(dec!(30)))), &mut ctx)
            .unwrap();
        assert_eq!(value, Value::Number(dec!(48.5)));
    }

    #[test]
    fn missing_value_for_window_is_fatal() {
        let ports = FixedIndicator {
            key: "rsi_14".into(),
            value: dec!(55),
            metadata_value: None,
        };
        let mut ctx = EvalContext::new(&ports, &ports);
        let ev = Evaluator::new();
        let result = ev.eval_node(&rsi_call(Some(AstNode::Number(dec!(30)))), &mut ctx);
        assert!(matches!(result, Err(MaestroError::Indicator { .. })));
    }

    #[test]
    fn symbol_argument_must_be_string() {
        let ports = FixedIndicator {
            key: "rsi_14".into(),
            value: dec!(55),
            metadata_value: None,
        };
        let mut ctx = EvalContext::new(&ports, &ports);
        let ev = Evaluator::new();
        let node = AstNode::List(vec![AstNode::symbol("rsi"), AstNode::Number(dec!(42))]);
        assert!(matches!(
            ev.eval_node(&node, &mut ctx),
            Err(MaestroError::ArgType { .. })
        ));
    }

    #[test]
    fn current_price_uses_snapshot_price() {
        let ports = FixedIndicator {
            key: "unused".into(),
            value: dec!(0),
            metadata_value: None,
        };
        let mut ctx = EvalContext::new(&ports, &ports);
        let ev = Evaluator::new();
        let node = AstNode::List(vec![
            AstNode::symbol("current-price"),
            AstNode::string("SPY"),
        ]);
        assert_eq!(
            ev.eval_node(&node, &mut ctx).unwrap(),
            Value::Number(dec!(100))
        );
    }

    #[test]
    fn deprecated_operators_fail_with_guidance() {
        let ports = FixedIndicator {
            key: "x".into(),
            value: dec!(0),
            metadata_value: None,
        };
        let mut ctx = EvalContext::new(&ports, &ports);
        let ev = Evaluator::new();

        for (op, replacement) in [("ma", "moving-average-price"), ("volatility", "stdev-return")] {
            let node = AstNode::List(vec![AstNode::symbol(op), AstNode::string("SPY")]);
            match ev.eval_node(&node, &mut ctx) {
                Err(MaestroError::DeprecatedOperator { guidance, .. }) => {
                    assert!(guidance.contains(replacement));
                }
                other => panic!("expected deprecation error, got {other:?}"),
            }
        }
    }
}
