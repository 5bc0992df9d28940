//! Port traits consumed by the evaluation engine. Implementations live in
//! [`crate::adapters`] or with the caller.

pub mod backfill_port;
pub mod config_port;
pub mod event_port;
pub mod indicator_port;
pub mod market_data_port;
pub mod return_cache_port;
