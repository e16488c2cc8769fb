//! MACD line and signal line.
//!
//! MACD = EMA12 - EMA26 over the closes; the signal line is the 9-period
//! EMA of the MACD itself.

use super::ema::exponential;

pub struct MacdSeries {
    pub line: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
}

/// MACD(fast, slow) with an EMA(signal_period) signal line.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdSeries {
    let fast_ema = exponential(closes, fast);
    let slow_ema = exponential(closes, slow);

    let line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    // EMAs are defined from bar 0, so the line has no gaps to skip over.
    let line_values: Vec<f64> = line.iter().map(|v| v.unwrap_or(0.0)).collect();
    let signal = exponential(&line_values, signal_period);

    MacdSeries { line, signal }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn line_is_ema_difference() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let series = macd(&closes, 12, 26, 9);
        let fast = exponential(&closes, 12);
        let slow = exponential(&closes, 26);

        for i in 0..closes.len() {
            assert_relative_eq!(
                series.line[i].unwrap(),
                fast[i].unwrap() - slow[i].unwrap()
            );
        }
    }

    #[test]
    fn signal_is_ema_of_line() {
        let closes: Vec<f64> = (0..40)
            .map(|i| 100.0 + ((i * 3) % 11) as f64)
            .collect();
        let series = macd(&closes, 12, 26, 9);
        let line: Vec<f64> = series.line.iter().map(|v| v.unwrap()).collect();
        let expected = exponential(&line, 9);

        for i in 0..closes.len() {
            assert_relative_eq!(series.signal[i].unwrap(), expected[i].unwrap());
        }
    }

    #[test]
    fn flat_series_has_zero_macd() {
        let series = macd(&[50_000.0; 30], 12, 26, 9);
        for i in 0..30 {
            assert_relative_eq!(series.line[i].unwrap(), 0.0);
            assert_relative_eq!(series.signal[i].unwrap(), 0.0);
        }
    }

    #[test]
    fn rising_series_has_positive_macd() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64) * 2.0).collect();
        let series = macd(&closes, 12, 26, 9);
        assert!(series.line.last().unwrap().unwrap() > 0.0);
    }
}
