#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use cryptosim::domain::error::CryptosimError;
pub use cryptosim::domain::ohlcv::PriceBar;
use cryptosim::ports::market_data_port::MarketDataPort;
use cryptosim::ports::oracle_port::{OraclePort, OracleReply, OracleRequest};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct MockMarketData {
    pub bars: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            bars: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.bars.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl MarketDataPort for MockMarketData {
    fn fetch_bars(
        &self,
        symbol: &str,
        interval: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PriceBar>, CryptosimError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(CryptosimError::DataFetch {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self
            .bars
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.timestamp >= start && b.timestamp <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Oracle that always fails, as an unreachable inference server would.
pub struct UnavailableOracle {
    pub calls: AtomicUsize,
}

impl UnavailableOracle {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl OraclePort for UnavailableOracle {
    fn consult(&self, _request: &OracleRequest) -> Result<OracleReply, CryptosimError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Err(CryptosimError::Oracle {
            reason: "connection timed out".into(),
        })
    }
}

/// Oracle that always proposes the same fixed reply.
pub struct FixedOracle {
    pub reply: OracleReply,
    pub calls: AtomicUsize,
}

impl FixedOracle {
    pub fn new(action: &str, size_percent: f64, reason: &str) -> Self {
        Self {
            reply: OracleReply {
                action: action.to_string(),
                size_percent,
                reason: reason.to_string(),
                improvement: None,
            },
            calls: AtomicUsize::new(0),
        }
    }
}

impl OraclePort for FixedOracle {
    fn consult(&self, _request: &OracleRequest) -> Result<OracleReply, CryptosimError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.reply.clone())
    }
}

pub fn hourly_timestamp(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::hours(i as i64)
}

pub fn make_bar(i: usize, close: f64) -> PriceBar {
    PriceBar {
        timestamp: hourly_timestamp(i),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1_000.0,
    }
}

/// A flat tape: every close identical.
pub fn flat_bars(len: usize, close: f64) -> Vec<PriceBar> {
    (0..len).map(|i| make_bar(i, close)).collect()
}

/// A steady uptrend.
pub fn rising_bars(len: usize, start: f64, step: f64) -> Vec<PriceBar> {
    (0..len)
        .map(|i| make_bar(i, start + step * i as f64))
        .collect()
}
