//! RSI (Relative Strength Index) from simple rolling means.
//!
//! Average gain and average loss are plain rolling means of the positive
//! and negative close-to-close deltas (not Wilder smoothing):
//! RSI = 100 - 100/(1 + avg_gain/avg_loss).
//! A loss mean of zero means every delta in the window was non-negative,
//! so the ratio is taken as infinite and RSI = 100.
//!
//! Warm-up: `period` deltas are needed, so the first `period` bars are None.

/// RSI over closing prices.
pub fn relative_strength(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || closes.len() < 2 {
        return vec![None; closes.len()];
    }

    let mut gains = Vec::with_capacity(closes.len() - 1);
    let mut losses = Vec::with_capacity(closes.len() - 1);
    for pair in closes.windows(2) {
        let change = pair[1] - pair[0];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let avg_gains = super::sma::rolling_mean(&gains, period);
    let avg_losses = super::sma::rolling_mean(&losses, period);

    let mut out = vec![None];
    for (g, l) in avg_gains.iter().zip(&avg_losses) {
        out.push(match (g, l) {
            (Some(gain), Some(loss)) => {
                if *loss == 0.0 {
                    Some(100.0)
                } else {
                    Some(100.0 - 100.0 / (1.0 + gain / loss))
                }
            }
            _ => None,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn warmup_length() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + (i % 5) as f64).collect();
        let out = relative_strength(&closes, 14);
        assert_eq!(out.len(), 20);
        for v in out.iter().take(14) {
            assert!(v.is_none());
        }
        assert!(out[14].is_some());
    }

    #[test]
    fn all_gains_is_100() {
        let closes: Vec<f64> = (0..16).map(|i| 100.0 + i as f64).collect();
        let out = relative_strength(&closes, 14);
        assert_relative_eq!(out[14].unwrap(), 100.0);
    }

    #[test]
    fn all_losses_is_0() {
        let closes: Vec<f64> = (0..16).map(|i| 100.0 - i as f64).collect();
        let out = relative_strength(&closes, 14);
        assert_relative_eq!(out[14].unwrap(), 0.0);
    }

    #[test]
    fn flat_series_is_100() {
        // Zero losses, zero gains: the loss mean is zero so the convention
        // RSI = 100 applies.
        let closes = vec![100.0; 16];
        let out = relative_strength(&closes, 14);
        assert_relative_eq!(out[15].unwrap(), 100.0);
    }

    #[test]
    fn balanced_gains_and_losses_near_50() {
        // Alternating +1/-1: gain mean equals loss mean, RSI = 50.
        let closes: Vec<f64> = (0..20)
            .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
            .collect();
        let out = relative_strength(&closes, 14);
        assert_relative_eq!(out[14].unwrap(), 50.0, epsilon = 1e-9);
    }

    #[test]
    fn always_in_range() {
        let closes: Vec<f64> = (0..60)
            .map(|i| 100.0 + ((i * 7) % 13) as f64 - 6.0)
            .collect();
        for v in relative_strength(&closes, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }

    #[test]
    fn single_bar() {
        assert_eq!(relative_strength(&[100.0], 14), vec![None]);
    }

    #[test]
    fn zero_period() {
        assert!(
            relative_strength(&[1.0, 2.0, 3.0], 0)
                .iter()
                .all(Option::is_none)
        );
    }
}
