//! Rule-based decision policy.
//!
//! Pure function of (market snapshot, portfolio state): no side effects,
//! no hidden state. Classification order is fixed — the volatility check
//! dominates everything, then trend (SMA50 vs SMA200) selects a ladder.

use crate::domain::decision::{Action, Decision, DecisionSource};
use crate::domain::ledger::PortfolioState;
use crate::domain::snapshot::MarketSnapshot;

const RSI_OVERSOLD: f64 = 30.0;
const RSI_OVERBOUGHT: f64 = 70.0;
const RSI_SIDEWAYS_LOW: f64 = 35.0;
const RSI_SIDEWAYS_HIGH: f64 = 65.0;

/// Policy thresholds, passed in explicitly — no ambient configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    /// ATR above this is treated as dangerous volatility: always HOLD.
    pub atr_high: f64,
    /// Cash must exceed this for any BUY branch to be considered.
    pub min_trade_usd: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            atr_high: 1000.0,
            min_trade_usd: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trend {
    Bullish,
    Bearish,
    Sideways,
}

fn classify_trend(snapshot: &MarketSnapshot) -> Trend {
    if snapshot.sma50 > snapshot.sma200 {
        Trend::Bullish
    } else if snapshot.sma50 < snapshot.sma200 {
        Trend::Bearish
    } else {
        Trend::Sideways
    }
}

/// Evaluate the rule ladder for one bar.
pub fn decide(
    snapshot: &MarketSnapshot,
    portfolio: &PortfolioState,
    params: &StrategyParams,
) -> Decision {
    let cash_available = portfolio.cash > params.min_trade_usd;
    let holdings_available = portfolio.holdings > 0.0;

    if snapshot.atr > params.atr_high {
        return Decision::hold("high volatility risk control");
    }

    let (action, size_percent, reason) = match classify_trend(snapshot) {
        Trend::Bullish => {
            if snapshot.rsi < RSI_OVERSOLD && cash_available {
                (Action::Buy, 15.0, "bullish trend with RSI oversold")
            } else if snapshot.macd > 0.0 && snapshot.rsi < 60.0 && cash_available {
                (Action::Buy, 10.0, "bullish momentum with room to grow")
            } else if snapshot.price > snapshot.ema12
                && snapshot.ema12 > snapshot.ema26
                && cash_available
            {
                (Action::Buy, 8.0, "strong uptrend confirmation")
            } else {
                (Action::Hold, 0.0, "bullish but waiting for better entry")
            }
        }
        Trend::Bearish => {
            if snapshot.rsi > RSI_OVERBOUGHT && holdings_available {
                (Action::Sell, 15.0, "bearish trend with RSI overbought")
            } else if snapshot.macd < 0.0 && snapshot.rsi > 40.0 && holdings_available {
                (Action::Sell, 10.0, "bearish momentum building")
            } else if snapshot.price < snapshot.ema12
                && snapshot.ema12 < snapshot.ema26
                && holdings_available
            {
                (Action::Sell, 8.0, "strong downtrend confirmation")
            } else {
                (Action::Hold, 0.0, "bearish but waiting for better exit")
            }
        }
        Trend::Sideways => {
            if snapshot.rsi < RSI_SIDEWAYS_LOW && cash_available {
                (Action::Buy, 5.0, "RSI oversold in sideways market")
            } else if snapshot.rsi > RSI_SIDEWAYS_HIGH && holdings_available {
                (Action::Sell, 5.0, "RSI overbought in sideways market")
            } else {
                (Action::Hold, 0.0, "sideways market, no clear signal")
            }
        }
    };

    Decision {
        action,
        size_percent,
        reason: reason.into(),
        source: DecisionSource::Rule,
    }
}
