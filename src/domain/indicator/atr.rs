//! ATR (Average True Range): rolling mean of the per-bar true range.
//!
//! Bar 0 has no previous close, so its true range is just high - low.

use super::sma::rolling_mean;
use crate::domain::ohlcv::PriceBar;

/// ATR over `period` bars.
pub fn average_true_range(bars: &[PriceBar], period: usize) -> Vec<Option<f64>> {
    let mut tr = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        if i == 0 {
            tr.push(bar.high - bar.low);
        } else {
            tr.push(bar.true_range(bars[i - 1].close));
        }
    }

    rolling_mean(&tr, period)
}
