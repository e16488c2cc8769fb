//! Exponential moving average.
//!
//! k = 2/(n+1), seeded with the first value, then
//! EMA[i] = v[i]*k + EMA[i-1]*(1-k). Defined from the first bar onward,
//! unlike the SMA which has a hard warm-up gap.

/// Exponentially weighted mean with smoothing factor 2/(period+1).
pub fn exponential(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut ema = 0.0;

    for (i, &v) in values.iter().enumerate() {
        ema = if i == 0 { v } else { v * k + ema * (1.0 - k) };
        out.push(Some(ema));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn seeded_from_first_value() {
        let out = exponential(&[10.0, 20.0, 30.0], 3);
        assert_relative_eq!(out[0].unwrap(), 10.0);
    }

    #[test]
    fn recursive_calculation() {
        let out = exponential(&[10.0, 20.0, 30.0], 3);
        let k = 2.0 / 4.0;
        let e1 = 20.0 * k + 10.0 * (1.0 - k);
        let e2 = 30.0 * k + e1 * (1.0 - k);
        assert_relative_eq!(out[1].unwrap(), e1);
        assert_relative_eq!(out[2].unwrap(), e2);
    }

    #[test]
    fn defined_everywhere() {
        let out = exponential(&[1.0, 2.0, 3.0, 4.0], 26);
        assert!(out.iter().all(Option::is_some));
    }

    #[test]
    fn constant_series_stays_constant() {
        let out = exponential(&[100.0; 10], 5);
        for v in out {
            assert_relative_eq!(v.unwrap(), 100.0);
        }
    }

    #[test]
    fn zero_period() {
        assert!(exponential(&[1.0, 2.0], 0).iter().all(Option::is_none));
    }

    #[test]
    fn smoothing_factor() {
        let k = 2.0 / (12.0 + 1.0);
        assert_relative_eq!(k, 2.0 / 13.0);
    }
}
