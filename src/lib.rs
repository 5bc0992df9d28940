//! maestro — trading-strategy DSL evaluation engine.
//!
//! Evaluates tree-structured strategy expressions against live or historical
//! market data to produce target portfolio allocations.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in
//! [`ports`], concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
