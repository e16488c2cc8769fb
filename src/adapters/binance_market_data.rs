//! Binance klines market-data adapter.
//!
//! Pulls `/api/v3/klines` pages of up to 1000 bars and walks forward until
//! the requested window is covered. Binance encodes numeric fields as JSON
//! strings inside positional arrays, so rows are decoded by hand from
//! `serde_json::Value`.

use crate::domain::error::CryptosimError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::market_data_port::MarketDataPort;
use chrono::{DateTime, NaiveDateTime};
use log::debug;
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;

const PAGE_LIMIT: usize = 1000;

pub struct BinanceMarketData {
    client: Client,
    base_url: String,
}

impl BinanceMarketData {
    pub fn new(base_url: String) -> Result<Self, CryptosimError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CryptosimError::DataFetch {
                symbol: String::new(),
                interval: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, base_url })
    }

    fn fetch_page(
        &self,
        symbol: &str,
        interval: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<PriceBar>, CryptosimError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("interval", interval),
                ("startTime", &start_ms.to_string()),
                ("endTime", &end_ms.to_string()),
                ("limit", &PAGE_LIMIT.to_string()),
            ])
            .send()
            .map_err(|e| fetch_error(symbol, interval, format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| fetch_error(symbol, interval, format!("server error: {e}")))?;

        let rows: Vec<Value> = response
            .json()
            .map_err(|e| fetch_error(symbol, interval, format!("undecodable response: {e}")))?;

        rows.iter()
            .map(|row| parse_kline(row).ok_or_else(|| {
                fetch_error(symbol, interval, format!("malformed kline row: {row}"))
            }))
            .collect()
    }
}

fn fetch_error(symbol: &str, interval: &str, reason: String) -> CryptosimError {
    CryptosimError::DataFetch {
        symbol: symbol.to_string(),
        interval: interval.to_string(),
        reason,
    }
}

/// Kline rows are positional: [openTime, open, high, low, close, volume, ...]
/// with prices and volume as strings.
fn parse_kline(row: &Value) -> Option<PriceBar> {
    let fields = row.as_array()?;
    let open_time_ms = fields.first()?.as_i64()?;
    let timestamp = DateTime::from_timestamp_millis(open_time_ms)?.naive_utc();

    let number = |idx: usize| -> Option<f64> { fields.get(idx)?.as_str()?.parse().ok() };

    Some(PriceBar {
        timestamp,
        open: number(1)?,
        high: number(2)?,
        low: number(3)?,
        close: number(4)?,
        volume: number(5)?,
    })
}

impl MarketDataPort for BinanceMarketData {
    fn fetch_bars(
        &self,
        symbol: &str,
        interval: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PriceBar>, CryptosimError> {
        let end_ms = end.and_utc().timestamp_millis();
        let mut cursor_ms = start.and_utc().timestamp_millis();
        let mut bars: Vec<PriceBar> = Vec::new();

        loop {
            let page = self.fetch_page(symbol, interval, cursor_ms, end_ms)?;
            let page_len = page.len();
            debug!("fetched {page_len} bars for {symbol} from {cursor_ms}");
            if let Some(last) = page.last() {
                cursor_ms = last.timestamp.and_utc().timestamp_millis() + 1;
            }
            bars.extend(page);

            if page_len < PAGE_LIMIT || cursor_ms > end_ms {
                break;
            }
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
