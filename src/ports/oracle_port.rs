//! Advisory oracle port trait and its wire contract.

use crate::domain::decision::Decision;
use crate::domain::error::CryptosimError;
use crate::domain::ledger::PortfolioState;
use crate::domain::snapshot::MarketSnapshot;
use serde::{Deserialize, Serialize};

/// Everything the oracle gets to see for one consultation.
#[derive(Debug, Clone, Serialize)]
pub struct OracleRequest {
    pub price: f64,
    pub rsi: f64,
    pub sma50: f64,
    pub sma200: f64,
    pub macd: f64,
    pub atr: f64,
    pub cash: f64,
    pub holdings: f64,
    pub rule_action: String,
    pub rule_size_percent: f64,
    pub rule_reason: String,
}

impl OracleRequest {
    pub fn new(snapshot: &MarketSnapshot, portfolio: &PortfolioState, rule: &Decision) -> Self {
        OracleRequest {
            price: snapshot.price,
            rsi: snapshot.rsi,
            sma50: snapshot.sma50,
            sma200: snapshot.sma200,
            macd: snapshot.macd,
            atr: snapshot.atr,
            cash: portfolio.cash,
            holdings: portfolio.holdings,
            rule_action: rule.action.to_string(),
            rule_size_percent: rule.size_percent,
            rule_reason: rule.reason.clone(),
        }
    }
}

/// Raw, untrusted oracle response. The arbitration layer normalizes and
/// range-clamps it before anything downstream sees it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OracleReply {
    pub action: String,
    pub size_percent: f64,
    pub reason: String,
    #[serde(default)]
    pub improvement: Option<String>,
}

pub trait OraclePort {
    /// Consult the oracle. Must return within a bounded time; transport
    /// errors, timeouts and undecodable responses all surface as `Err`.
    fn consult(&self, request: &OracleRequest) -> Result<OracleReply, CryptosimError>;
}
