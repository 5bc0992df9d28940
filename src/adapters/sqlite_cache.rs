//! SQLite historical-return cache adapter.
//!
//! One row per (group_id, record_date). Re-backfill of the same date
//! overwrites the row; the backfill is deterministic so the replacement is
//! equivalent.

use crate::domain::error::MaestroError;
use crate::ports::config_port::ConfigPort;
use crate::ports::return_cache_port::{CachedReturn, ReturnCachePort};
use chrono::NaiveDate;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

pub struct SqliteReturnCache {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteReturnCache {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, MaestroError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| MaestroError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;
        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| MaestroError::ReturnCache {
                reason: e.to_string(),
            })?;
        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, MaestroError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| MaestroError::ReturnCache {
                reason: e.to_string(),
            })?;
        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), MaestroError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS group_returns (
                group_id TEXT NOT NULL,
                record_date TEXT NOT NULL,
                selections TEXT NOT NULL,
                portfolio_daily_return TEXT NOT NULL,
                PRIMARY KEY (group_id, record_date)
            );
            CREATE INDEX IF NOT EXISTS idx_group_returns_date
                ON group_returns(group_id, record_date);",
        )
        .map_err(|e: rusqlite::Error| MaestroError::ReturnCache {
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn conn(
        &self,
    ) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, MaestroError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| MaestroError::ReturnCache {
                reason: e.to_string(),
            })
    }
}

/// `SYM:weight` pairs joined by `;`, a stable text form that avoids binding
/// the schema to a serialization library.
fn encode_selections(selections: &BTreeMap<String, Decimal>) -> String {
    selections
        .iter()
        .map(|(symbol, weight)| format!("{}:{}", symbol, weight))
        .collect::<Vec<_>>()
        .join(";")
}

impl ReturnCachePort for SqliteReturnCache {
    fn lookup_historical_returns(
        &self,
        group_id: &str,
        lookback_days: usize,
        end_date: NaiveDate,
    ) -> Result<Vec<CachedReturn>, MaestroError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT record_date, portfolio_daily_return FROM group_returns
                 WHERE group_id = ?1 AND record_date <= ?2
                 ORDER BY record_date DESC LIMIT ?3",
            )
            .map_err(|e: rusqlite::Error| MaestroError::ReturnCache {
                reason: e.to_string(),
            })?;

        let rows = stmt
            .query_map(
                params![group_id, end_date.to_string(), lookback_days as i64],
                |row| {
                    let date: String = row.get(0)?;
                    let daily_return: String = row.get(1)?;
                    Ok((date, daily_return))
                },
            )
            .map_err(|e: rusqlite::Error| MaestroError::ReturnCache {
                reason: e.to_string(),
            })?;

        let mut returns = Vec::new();
        for row in rows {
            let (date, daily_return) = row.map_err(|e: rusqlite::Error| {
                MaestroError::ReturnCache {
                    reason: e.to_string(),
                }
            })?;
            let record_date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| {
                MaestroError::ReturnCache {
                    reason: format!("invalid record_date '{}': {}", date, e),
                }
            })?;
            let portfolio_daily_return =
                daily_return
                    .parse::<Decimal>()
                    .map_err(|e| MaestroError::ReturnCache {
                        reason: format!("invalid return '{}': {}", daily_return, e),
                    })?;
            returns.push(CachedReturn {
                record_date,
                portfolio_daily_return,
            });
        }
        // Query was newest-first for the LIMIT; callers expect oldest-first.
        returns.reverse();
        Ok(returns)
    }

    fn write_historical_return(
        &self,
        group_id: &str,
        record_date: NaiveDate,
        selections: &BTreeMap<String, Decimal>,
        portfolio_daily_return: Decimal,
    ) -> Result<(), MaestroError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO group_returns
                 (group_id, record_date, selections, portfolio_daily_return)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                group_id,
                record_date.to_string(),
                encode_selections(selections),
                portfolio_daily_return.to_string()
            ],
        )
        .map_err(|e: rusqlite::Error| MaestroError::ReturnCache {
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn is_cache_available(&self) -> bool {
        self.pool.get().is_ok()
    }
}
