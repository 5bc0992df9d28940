//! Portfolio fragments: intermediate symbol→weight allocations.
//!
//! Fragments are values, not shared-mutable state. Every operator that builds
//! one generates a fresh `fragment_id`; provenance travels in `source_step`.

use crate::domain::error::MaestroError;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Provenance tag used by fragments that wrap a single bare ticker.
pub const SOURCE_ASSET: &str = "asset";

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioFragment {
    pub fragment_id: String,
    pub source_step: String,
    pub weights: BTreeMap<String, Decimal>,
    /// Invariant: 0 <= total_weight <= 1. Defaults to 1.
    pub total_weight: Decimal,
    pub correlation_id: Option<String>,
    pub causation_id: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl PortfolioFragment {
    pub fn new(source_step: &str) -> Self {
        Self {
            fragment_id: Uuid::new_v4().to_string(),
            source_step: source_step.to_string(),
            weights: BTreeMap::new(),
            total_weight: Decimal::ONE,
            correlation_id: None,
            causation_id: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Wrap a single ticker at full weight.
    pub fn from_symbol(symbol: &str) -> Self {
        let mut fragment = Self::new(SOURCE_ASSET);
        fragment.weights.insert(symbol.to_string(), Decimal::ONE);
        fragment
    }

    pub fn with_weights(source_step: &str, weights: BTreeMap<String, Decimal>) -> Self {
        let mut fragment = Self::new(source_step);
        fragment.weights = weights;
        fragment
    }

    pub fn weight_sum(&self) -> Decimal {
        self.weights.values().copied().sum()
    }

    /// Rescale weights so they sum to `total_weight`.
    ///
    /// No-op on empty or zero-sum input: the scale operation is only ever a
    /// division, never a fabrication of weight.
    pub fn normalize_weights(mut self) -> Self {
        let sum = self.weight_sum();
        if self.weights.is_empty() || sum.is_zero() {
            return self;
        }
        for weight in self.weights.values_mut() {
            *weight = *weight / sum * self.total_weight;
        }
        self
    }

    /// The fragment's weights rescaled to sum to exactly 1, as a plain map.
    pub fn normalized_map(&self) -> BTreeMap<String, Decimal> {
        let sum = self.weight_sum();
        if self.weights.is_empty() || sum.is_zero() {
            return self.weights.clone();
        }
        self.weights
            .iter()
            .map(|(symbol, weight)| (symbol.clone(), *weight / sum))
            .collect()
    }

    /// Add `weight * normalized(child)` into this fragment's weights.
    pub fn accumulate_scaled(&mut self, child: &PortfolioFragment, scale: Decimal) {
        for (symbol, weight) in child.normalized_map() {
            let entry = self.weights.entry(symbol).or_insert(Decimal::ZERO);
            *entry += weight * scale;
        }
    }

    pub fn display_name(&self) -> &str {
        self.metadata
            .get("group_name")
            .map(String::as_str)
            .unwrap_or(&self.source_step)
    }
}

/// Fatal conversion of an evaluated value into a fragment.
///
/// Strings become bare-asset fragments, lists are merged symbol-by-symbol with
/// each element first normalized to 1 and scaled equally.
pub fn to_fragment(
    value: &crate::domain::value::Value,
    operator: &str,
) -> Result<PortfolioFragment, MaestroError> {
    use crate::domain::value::Value;
    match value {
        Value::Fragment(fragment) => Ok(fragment.clone()),
        Value::Str(symbol) => Ok(PortfolioFragment::from_symbol(symbol)),
        Value::List(items) => {
            if items.is_empty() {
                return Err(MaestroError::NoAssets {
                    operator: operator.to_string(),
                });
            }
            let scale = Decimal::ONE / Decimal::from(items.len());
            let mut merged = PortfolioFragment::new(operator);
            for item in items {
                let child = to_fragment(item, operator)?;
                merged.accumulate_scaled(&child, scale);
            }
            Ok(merged)
        }
        other => Err(MaestroError::ArgType {
            operator: operator.to_string(),
            expected: "portfolio, symbol string, or list".to_string(),
            got: other.kind().to_string(),
        }),
    }
}
