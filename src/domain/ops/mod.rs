//! Operator implementations, grouped by family.

pub mod compare;
pub mod control;
pub mod indicators;
pub mod select;
pub mod weights;

use crate::domain::dispatch::OperatorRegistry;

/// The full built-in dispatch table.
pub fn default_registry() -> OperatorRegistry {
    let mut registry = OperatorRegistry::new();

    // Control flow
    registry.register("if", control::op_if);
    registry.register("defsymphony", control::op_defsymphony);

    // Comparison
    registry.register(">", compare::op_gt);
    registry.register("<", compare::op_lt);
    registry.register(">=", compare::op_ge);
    registry.register("<=", compare::op_le);
    registry.register("=", compare::op_eq);

    // Indicators
    registry.register("rsi", indicators::op_rsi);
    registry.register("current-price", indicators::op_current_price);
    registry.register("moving-average-price", indicators::op_moving_average_price);
    registry.register("moving-average-return", indicators::op_moving_average_return);
    registry.register("cumulative-return", indicators::op_cumulative_return);
    registry.register(
        "exponential-moving-average-price",
        indicators::op_exponential_moving_average_price,
    );
    registry.register("stdev-return", indicators::op_stdev_return);
    registry.register("stdev-price", indicators::op_stdev_price);
    registry.register("max-drawdown", indicators::op_max_drawdown);
    registry.register("ma", indicators::op_ma_deprecated);
    registry.register("volatility", indicators::op_volatility_deprecated);

    // Portfolio construction
    registry.register("asset", select::op_asset);
    registry.register("group", select::op_group);
    registry.register("filter", select::op_filter);
    registry.register("select-top", select::op_select_top);
    registry.register("select-bottom", select::op_select_bottom);
    registry.register("weight-equal", weights::op_weight_equal);
    registry.register("weight-specified", weights::op_weight_specified);
    registry.register("weight-inverse-volatility", weights::op_weight_inverse_volatility);

    registry
}
