//! Advisory arbitration layer.
//!
//! Wraps the rule engine's decision with an optional oracle consultation.
//! The oracle is only asked when the situation is interesting (significance
//! gate) and not more often than the cooldown allows; its answer is adopted
//! only when it differs meaningfully from the rule decision. Every failure
//! mode — transport error, timeout, undecodable reply, unknown action —
//! falls back to the rule decision unchanged.

use crate::domain::decision::{Action, Decision, DecisionSource};
use crate::domain::ledger::PortfolioState;
use crate::domain::snapshot::MarketSnapshot;
use crate::ports::oracle_port::{OraclePort, OracleReply, OracleRequest};
use log::{debug, warn};
use std::time::{Duration, Instant};

const DEFAULT_IMPROVEMENT: &str = "risk-adjusted position sizing";

#[derive(Debug, Clone, PartialEq)]
pub struct ArbitrationConfig {
    /// Minimum spacing between oracle consultations.
    pub cooldown: Duration,
    /// Price deviation from SMA50 (as a fraction) that counts as significant.
    pub deviation_threshold: f64,
    /// |RSI - 50| beyond this counts as extreme.
    pub rsi_extreme_band: f64,
    /// ATR above this counts as significant volatility.
    pub atr_floor: f64,
    /// Rule sizes at or above this are worth a second opinion.
    pub large_size_percent: f64,
    /// Hard ceiling applied to any oracle-proposed size.
    pub size_ceiling: f64,
    /// Size difference below this (with the same action) is noise.
    pub improvement_margin: f64,
}

impl Default for ArbitrationConfig {
    fn default() -> Self {
        ArbitrationConfig {
            cooldown: Duration::from_secs(2),
            deviation_threshold: 0.05,
            rsi_extreme_band: 20.0,
            atr_floor: 800.0,
            large_size_percent: 15.0,
            size_ceiling: 20.0,
            improvement_margin: 5.0,
        }
    }
}

/// Arbitrates between the rule engine and an optional advisory oracle.
pub struct Arbiter<'a> {
    oracle: Option<&'a dyn OraclePort>,
    config: ArbitrationConfig,
    last_consult: Option<Instant>,
}

impl<'a> Arbiter<'a> {
    pub fn new(oracle: Option<&'a dyn OraclePort>, config: ArbitrationConfig) -> Self {
        Arbiter {
            oracle,
            config,
            last_consult: None,
        }
    }

    /// Resolve the final decision for one bar. `now` is injected so the
    /// cooldown can be driven deterministically in tests.
    pub fn arbitrate(
        &mut self,
        snapshot: &MarketSnapshot,
        portfolio: &PortfolioState,
        rule: Decision,
        now: Instant,
    ) -> Decision {
        let Some(oracle) = self.oracle else {
            return rule;
        };

        if !self.is_significant(snapshot, &rule) {
            return rule;
        }

        if let Some(last) = self.last_consult {
            if now.duration_since(last) < self.config.cooldown {
                debug!("oracle consultation skipped: cooldown");
                return rule;
            }
        }
        self.last_consult = Some(now);

        let request = OracleRequest::new(snapshot, portfolio, &rule);
        let reply = match oracle.consult(&request) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("oracle unavailable, keeping rule decision: {e}");
                return rule;
            }
        };

        let Some(candidate) = self.validate(reply) else {
            warn!("oracle reply failed validation, keeping rule decision");
            return rule;
        };

        if self.is_meaningful_improvement(&rule, &candidate) {
            debug!(
                "adopting advisory decision: {} {}%",
                candidate.action, candidate.size_percent
            );
            candidate
        } else {
            debug!("no meaningful improvement over rule decision");
            rule
        }
    }

    /// Only consult for significant market situations; the common case
    /// skips the oracle entirely.
    fn is_significant(&self, snapshot: &MarketSnapshot, rule: &Decision) -> bool {
        let price_deviation = if snapshot.sma50 != 0.0 {
            ((snapshot.price - snapshot.sma50) / snapshot.sma50).abs()
        } else {
            0.0
        };

        price_deviation > self.config.deviation_threshold
            || (snapshot.rsi - 50.0).abs() > self.config.rsi_extreme_band
            || snapshot.atr > self.config.atr_floor
            || rule.size_percent >= self.config.large_size_percent
    }

    /// Normalize an untrusted reply into a [`Decision`], or reject it.
    fn validate(&self, reply: OracleReply) -> Option<Decision> {
        let action: Action = reply.action.parse().ok()?;
        if reply.reason.is_empty() || !reply.size_percent.is_finite() {
            return None;
        }

        let size_percent = reply.size_percent.clamp(0.0, self.config.size_ceiling);
        let improvement = reply
            .improvement
            .unwrap_or_else(|| DEFAULT_IMPROVEMENT.to_string());

        Some(Decision {
            action,
            size_percent,
            reason: format!("{} ({improvement})", reply.reason),
            source: DecisionSource::Advisory,
        })
    }

    fn is_meaningful_improvement(&self, rule: &Decision, candidate: &Decision) -> bool {
        candidate.action != rule.action
            || (candidate.size_percent - rule.size_percent).abs() > self.config.improvement_margin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::CryptosimError;
    use std::cell::Cell;

    struct FixedOracle {
        reply: Result<OracleReply, String>,
        calls: Cell<usize>,
    }

    impl FixedOracle {
        fn replying(reply: OracleReply) -> Self {
            FixedOracle {
                reply: Ok(reply),
                calls: Cell::new(0),
            }
        }

        fn failing(reason: &str) -> Self {
            FixedOracle {
                reply: Err(reason.to_string()),
                calls: Cell::new(0),
            }
        }
    }

    impl OraclePort for FixedOracle {
        fn consult(&self, _request: &OracleRequest) -> Result<OracleReply, CryptosimError> {
            self.calls.set(self.calls.get() + 1);
            self.reply
                .clone()
                .map_err(|reason| CryptosimError::Oracle { reason })
        }
    }

    fn significant_snapshot() -> MarketSnapshot {
        // RSI 80 is well outside the extreme band.
        MarketSnapshot {
            price: 50_000.0,
            rsi: 80.0,
            sma20: 50_000.0,
            sma50: 50_000.0,
            sma200: 49_000.0,
            ema12: 50_000.0,
            ema26: 50_000.0,
            macd: 0.0,
            macd_signal: 0.0,
            atr: 100.0,
        }
    }

    fn dull_snapshot() -> MarketSnapshot {
        let mut snap = significant_snapshot();
        snap.rsi = 50.0;
        snap
    }

    fn rule_buy() -> Decision {
        Decision {
            action: Action::Buy,
            size_percent: 10.0,
            reason: "bullish momentum with room to grow".into(),
            source: DecisionSource::Rule,
        }
    }

    fn portfolio() -> PortfolioState {
        PortfolioState::new(100_000.0)
    }

    #[test]
    fn no_oracle_passes_rule_through() {
        let mut arbiter = Arbiter::new(None, ArbitrationConfig::default());
        let d = arbiter.arbitrate(
            &significant_snapshot(),
            &portfolio(),
            rule_buy(),
            Instant::now(),
        );
        assert_eq!(d, rule_buy());
    }

    #[test]
    fn dull_market_skips_oracle() {
        let oracle = FixedOracle::replying(OracleReply {
            action: "SELL".into(),
            size_percent: 10.0,
            reason: "contrarian".into(),
            improvement: None,
        });
        let mut arbiter = Arbiter::new(Some(&oracle), ArbitrationConfig::default());

        let d = arbiter.arbitrate(&dull_snapshot(), &portfolio(), rule_buy(), Instant::now());
        assert_eq!(d.source, DecisionSource::Rule);
        assert_eq!(oracle.calls.get(), 0);
    }

    #[test]
    fn large_rule_size_is_significant_on_its_own() {
        let oracle = FixedOracle::replying(OracleReply {
            action: "HOLD".into(),
            size_percent: 0.0,
            reason: "overextended".into(),
            improvement: None,
        });
        let mut arbiter = Arbiter::new(Some(&oracle), ArbitrationConfig::default());

        let mut rule = rule_buy();
        rule.size_percent = 15.0;
        arbiter.arbitrate(&dull_snapshot(), &portfolio(), rule, Instant::now());
        assert_eq!(oracle.calls.get(), 1);
    }

    #[test]
    fn failure_falls_back_to_rule() {
        let oracle = FixedOracle::failing("timeout");
        let mut arbiter = Arbiter::new(Some(&oracle), ArbitrationConfig::default());

        let d = arbiter.arbitrate(
            &significant_snapshot(),
            &portfolio(),
            rule_buy(),
            Instant::now(),
        );
        assert_eq!(d, rule_buy());
        assert_eq!(oracle.calls.get(), 1);
    }

    #[test]
    fn different_action_is_adopted_and_tagged_advisory() {
        let oracle = FixedOracle::replying(OracleReply {
            action: "sell".into(),
            size_percent: 12.0,
            reason: "take profit".into(),
            improvement: Some("exit timing".into()),
        });
        let mut arbiter = Arbiter::new(Some(&oracle), ArbitrationConfig::default());

        let d = arbiter.arbitrate(
            &significant_snapshot(),
            &portfolio(),
            rule_buy(),
            Instant::now(),
        );
        assert_eq!(d.action, Action::Sell);
        assert_eq!(d.source, DecisionSource::Advisory);
        assert!(d.reason.contains("exit timing"));
    }

    #[test]
    fn small_size_difference_is_not_meaningful() {
        let oracle = FixedOracle::replying(OracleReply {
            action: "BUY".into(),
            size_percent: 13.0, // within the 5-point margin of the rule's 10
            reason: "slightly bigger".into(),
            improvement: None,
        });
        let mut arbiter = Arbiter::new(Some(&oracle), ArbitrationConfig::default());

        let d = arbiter.arbitrate(
            &significant_snapshot(),
            &portfolio(),
            rule_buy(),
            Instant::now(),
        );
        assert_eq!(d.source, DecisionSource::Rule);
        assert_eq!(d.size_percent, 10.0);
    }

    #[test]
    fn oversized_reply_is_clamped_to_ceiling() {
        let oracle = FixedOracle::replying(OracleReply {
            action: "BUY".into(),
            size_percent: 90.0,
            reason: "all in".into(),
            improvement: None,
        });
        let mut arbiter = Arbiter::new(Some(&oracle), ArbitrationConfig::default());

        let d = arbiter.arbitrate(
            &significant_snapshot(),
            &portfolio(),
            rule_buy(),
            Instant::now(),
        );
        assert_eq!(d.source, DecisionSource::Advisory);
        assert_eq!(d.size_percent, 20.0);
    }

    #[test]
    fn unknown_action_falls_back() {
        let oracle = FixedOracle::replying(OracleReply {
            action: "SHORT".into(),
            size_percent: 10.0,
            reason: "leverage".into(),
            improvement: None,
        });
        let mut arbiter = Arbiter::new(Some(&oracle), ArbitrationConfig::default());

        let d = arbiter.arbitrate(
            &significant_snapshot(),
            &portfolio(),
            rule_buy(),
            Instant::now(),
        );
        assert_eq!(d, rule_buy());
    }

    #[test]
    fn cooldown_limits_consultations() {
        let oracle = FixedOracle::replying(OracleReply {
            action: "SELL".into(),
            size_percent: 10.0,
            reason: "flip".into(),
            improvement: None,
        });
        let mut arbiter = Arbiter::new(Some(&oracle), ArbitrationConfig::default());

        let t0 = Instant::now();
        arbiter.arbitrate(&significant_snapshot(), &portfolio(), rule_buy(), t0);
        // One second later: still cooling down.
        let d = arbiter.arbitrate(
            &significant_snapshot(),
            &portfolio(),
            rule_buy(),
            t0 + Duration::from_secs(1),
        );
        assert_eq!(d.source, DecisionSource::Rule);
        assert_eq!(oracle.calls.get(), 1);

        // Past the cooldown the oracle is consulted again.
        arbiter.arbitrate(
            &significant_snapshot(),
            &portfolio(),
            rule_buy(),
            t0 + Duration::from_secs(3),
        );
        assert_eq!(oracle.calls.get(), 2);
    }

    #[test]
    fn missing_improvement_gets_placeholder() {
        let config = ArbitrationConfig::default();
        let arbiter = Arbiter::new(None, config);
        let d = arbiter
            .validate(OracleReply {
                action: "SELL".into(),
                size_percent: 5.0,
                reason: "cooling market".into(),
                improvement: None,
            })
            .unwrap();
        assert!(d.reason.contains(DEFAULT_IMPROVEMENT));
    }
}
