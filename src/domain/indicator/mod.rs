//! Technical indicator engine.
//!
//! Derives one [`IndicatorFrame`] per input bar. Individual indicators
//! return `Option<f64>` series with `None` over their warm-up window;
//! [`compute_frames`] then forward-fills and backward-fills every column so
//! downstream policy code never observes an undefined number. The fill is a
//! deliberate simplification carried over from the reference behavior, not
//! a numerically rigorous treatment of the warm-up window.

pub mod atr;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

use crate::domain::error::CryptosimError;
use crate::domain::ohlcv::PriceBar;

pub const RSI_PERIOD: usize = 14;
pub const SMA_SHORT: usize = 20;
pub const SMA_MID: usize = 50;
pub const SMA_LONG: usize = 200;
pub const EMA_FAST: usize = 12;
pub const EMA_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const ATR_PERIOD: usize = 14;

/// A price bar annotated with every derived indicator, fully filled.
#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    pub bar: PriceBar,
    pub rsi14: f64,
    pub sma20: f64,
    pub sma50: f64,
    pub sma200: f64,
    pub ema12: f64,
    pub ema26: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub atr14: f64,
}

/// Forward-fill then backward-fill, so a column that is defined anywhere is
/// defined everywhere. A column with no defined value at all falls back to
/// `default`.
fn fill(series: &[Option<f64>], default: f64) -> Vec<f64> {
    let mut out: Vec<Option<f64>> = Vec::with_capacity(series.len());
    let mut last = None;
    for v in series {
        if v.is_some() {
            last = *v;
        }
        out.push(last);
    }

    let mut next = None;
    for slot in out.iter_mut().rev() {
        if slot.is_some() {
            next = *slot;
        } else {
            *slot = next;
        }
    }

    out.into_iter().map(|v| v.unwrap_or(default)).collect()
}

/// Annotate an ordered bar series with indicators.
///
/// Fails only on an empty input; series shorter than the longest warm-up
/// window still produce fully-filled frames.
pub fn compute_frames(bars: &[PriceBar]) -> Result<Vec<IndicatorFrame>, CryptosimError> {
    if bars.is_empty() {
        return Err(CryptosimError::EmptySeries {
            symbol: String::new(),
        });
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let last_close = *closes.last().unwrap_or(&0.0);

    let rsi = fill(&rsi::relative_strength(&closes, RSI_PERIOD), 50.0);
    let sma20 = fill(&sma::rolling_mean(&closes, SMA_SHORT), last_close);
    let sma50 = fill(&sma::rolling_mean(&closes, SMA_MID), last_close);
    let sma200 = fill(&sma::rolling_mean(&closes, SMA_LONG), last_close);
    let ema12 = fill(&ema::exponential(&closes, EMA_FAST), last_close);
    let ema26 = fill(&ema::exponential(&closes, EMA_SLOW), last_close);
    let macd_series = macd::macd(&closes, EMA_FAST, EMA_SLOW, MACD_SIGNAL);
    let macd_line = fill(&macd_series.line, 0.0);
    let macd_signal = fill(&macd_series.signal, 0.0);
    let atr = fill(&atr::average_true_range(bars, ATR_PERIOD), 0.0);

    Ok(bars
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorFrame {
            bar: bar.clone(),
            rsi14: rsi[i],
            sma20: sma20[i],
            sma50: sma50[i],
            sma200: sma200[i],
            ema12: ema12[i],
            ema26: ema26[i],
            macd: macd_line[i],
            macd_signal: macd_signal[i],
            atr14: atr[i],
        })
        .collect())
}
