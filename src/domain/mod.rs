//! Core domain types and logic.

pub mod ast;
pub mod value;
pub mod fragment;
pub mod decision;
pub mod ohlcv;
pub mod context;
pub mod dispatch;
pub mod eval;
pub mod ops;
pub mod groups;
pub mod scoring;
pub mod series_metrics;
pub mod indicator;
pub mod parser;
pub mod error;
