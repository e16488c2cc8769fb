//! CSV file market-data adapter.
//!
//! Expects a header row of `timestamp,open,high,low,close,volume` with
//! timestamps formatted as `%Y-%m-%d %H:%M:%S`. Rows outside the requested
//! window are skipped; output is sorted and de-duplicated by timestamp.

use crate::domain::error::CryptosimError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::market_data_port::MarketDataPort;
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::path::PathBuf;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

pub struct CsvMarketData {
    path: PathBuf,
}

impl CsvMarketData {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn fetch_error(&self, symbol: &str, interval: &str, reason: String) -> CryptosimError {
        CryptosimError::DataFetch {
            symbol: symbol.to_string(),
            interval: interval.to_string(),
            reason,
        }
    }
}

impl MarketDataPort for CsvMarketData {
    fn fetch_bars(
        &self,
        symbol: &str,
        interval: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PriceBar>, CryptosimError> {
        let mut reader = csv::Reader::from_path(&self.path).map_err(|e| {
            self.fetch_error(
                symbol,
                interval,
                format!("failed to open {}: {e}", self.path.display()),
            )
        })?;

        let mut bars = Vec::new();
        for result in reader.deserialize::<CsvRow>() {
            let row = result
                .map_err(|e| self.fetch_error(symbol, interval, format!("CSV parse error: {e}")))?;
            let timestamp = NaiveDateTime::parse_from_str(&row.timestamp, TIMESTAMP_FORMAT)
                .map_err(|e| {
                    self.fetch_error(
                        symbol,
                        interval,
                        format!("invalid timestamp {:?}: {e}", row.timestamp),
                    )
                })?;

            if timestamp < start || timestamp > end {
                continue;
            }
            bars.push(PriceBar {
                timestamp,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);

        if bars.is_empty() {
            return Err(CryptosimError::EmptySeries {
                symbol: symbol.to_string(),
            });
        }
        Ok(bars)
    }
}
