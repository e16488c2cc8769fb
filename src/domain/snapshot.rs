//! Point-in-time market view handed to the decision policy.

use crate::domain::indicator::IndicatorFrame;
use serde::Serialize;

/// Flattened single-bar view of an [`IndicatorFrame`]. Derived on demand,
/// never persisted on its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketSnapshot {
    pub price: f64,
    pub rsi: f64,
    pub sma20: f64,
    pub sma50: f64,
    pub sma200: f64,
    pub ema12: f64,
    pub ema26: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub atr: f64,
}

impl From<&IndicatorFrame> for MarketSnapshot {
    fn from(frame: &IndicatorFrame) -> Self {
        MarketSnapshot {
            price: frame.bar.close,
            rsi: frame.rsi14,
            sma20: frame.sma20,
            sma50: frame.sma50,
            sma200: frame.sma200,
            ema12: frame.ema12,
            ema26: frame.ema26,
            macd: frame.macd,
            macd_signal: frame.macd_signal,
            atr: frame.atr14,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::PriceBar;
    use chrono::NaiveDate;

    #[test]
    fn snapshot_flattens_frame() {
        let frame = IndicatorFrame {
            bar: PriceBar {
                timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                open: 99.0,
                high: 101.0,
                low: 98.0,
                close: 100.0,
                volume: 10.0,
            },
            rsi14: 55.0,
            sma20: 101.0,
            sma50: 102.0,
            sma200: 103.0,
            ema12: 104.0,
            ema26: 105.0,
            macd: -1.0,
            macd_signal: -0.5,
            atr14: 2.0,
        };

        let snap = MarketSnapshot::from(&frame);
        assert_eq!(snap.price, 100.0);
        assert_eq!(snap.rsi, 55.0);
        assert_eq!(snap.sma50, 102.0);
        assert_eq!(snap.macd, -1.0);
        assert_eq!(snap.atr, 2.0);
    }
}
