//! CSV file market-data adapter.
//!
//! Serves daily bars from one `SYMBOL.csv` per symbol under a base
//! directory, columns `date,open,high,low,close,volume`, oldest-first.

use crate::domain::error::MaestroError;
use crate::domain::ohlcv::Bar;
use crate::ports::market_data_port::{MarketDataPort, Timeframe};
use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

fn column<'r>(
    record: &'r csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<&'r str, MaestroError> {
    record.get(index).ok_or_else(|| MaestroError::MarketData {
        reason: format!("missing {} column", name),
    })
}

fn decimal_column(record: &csv::StringRecord, index: usize, name: &str) -> Result<Decimal, MaestroError> {
    column(record, index, name)?
        .parse()
        .map_err(|e| MaestroError::MarketData {
            reason: format!("invalid {} value: {}", name, e),
        })
}

impl MarketDataPort for CsvAdapter {
    fn get_bars(
        &self,
        symbol: &str,
        period_days: u32,
        _timeframe: Timeframe,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, MaestroError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| MaestroError::MarketData {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let end_date = as_of.unwrap_or_else(|| Utc::now().date_naive());
        let start_date = end_date - Days::new(u64::from(period_days));

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| MaestroError::MarketData {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = column(&record, 0, "date")?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                MaestroError::MarketData {
                    reason: format!("invalid date format: {}", e),
                }
            })?;
            if date < start_date || date > end_date {
                continue;
            }

            let volume: i64 = column(&record, 5, "volume")?
                .parse()
                .map_err(|e| MaestroError::MarketData {
                    reason: format!("invalid volume value: {}", e),
                })?;

            bars.push(Bar {
                symbol: symbol.to_string(),
                date,
                open: decimal_column(&record, 1, "open")?,
                high: decimal_column(&record, 2, "high")?,
                low: decimal_column(&record, 3, "low")?,
                close: decimal_column(&record, 4, "close")?,
                volume,
                // Files hold settled end-of-day data only.
                is_incomplete: false,
            });
        }

        bars.sort_by_key(|bar| bar.date);
        Ok(bars)
    }
}
