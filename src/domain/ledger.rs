//! Portfolio state and the transactional trade ledger.
//!
//! The ledger is the sole mutator of portfolio state; everything else sees
//! it read-only. Applying a decision is atomic: it either executes fully and
//! yields a [`TradeRecord`], or leaves cash and holdings untouched.
//!
//! Realized profit uses the aggregate cash/holdings ratio as an approximate
//! cost basis and only accumulates non-negative per-trade deltas. This is
//! economically inconsistent (no per-lot tracking, losses never reduce it)
//! but is preserved deliberately for parity with the system being replayed.

use crate::domain::decision::{Action, Decision, DecisionSource};
use chrono::NaiveDateTime;
use serde::Serialize;

/// Simulated portfolio balances. `total_value` is derived and refreshed on
/// every tick; `cash` and `holdings` never go negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PortfolioState {
    pub cash: f64,
    pub holdings: f64,
    pub realized_profit: f64,
    pub total_value: f64,
}

impl PortfolioState {
    pub fn new(initial_cash: f64) -> Self {
        PortfolioState {
            cash: initial_cash,
            holdings: 0.0,
            realized_profit: 0.0,
            total_value: initial_cash,
        }
    }

    /// Recompute `total_value` at the given price. Runs unconditionally
    /// every bar: unrealized value moves with price even when no trade does.
    pub fn revalue(&mut self, price: f64) {
        self.total_value = self.cash + self.holdings * price;
    }
}

/// Immutable audit-trail entry, one per executed trade.
#[derive(Debug, Clone, Serialize)]
pub struct TradeRecord {
    pub timestamp: NaiveDateTime,
    pub action: Action,
    pub price: f64,
    pub size_percent: f64,
    /// Quote currency moved by the trade.
    pub traded_amount: f64,
    /// Base units moved by the trade.
    pub traded_quantity: f64,
    pub reason: String,
    pub decision_source: DecisionSource,
    pub cash_before: f64,
    pub holdings_before: f64,
    pub total_value_before: f64,
    pub cash_after: f64,
    pub holdings_after: f64,
    pub total_value_after: f64,
    pub realized_profit_delta: f64,
}

/// Periodic equity-curve point, recorded independently of trade activity.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioSnapshot {
    pub timestamp: NaiveDateTime,
    pub price: f64,
    pub cash: f64,
    pub holdings: f64,
    pub holdings_value: f64,
    pub total_value: f64,
    pub realized_profit: f64,
    pub unrealized_profit: f64,
}

/// Owns the mutable [`PortfolioState`] for one run.
#[derive(Debug)]
pub struct Ledger {
    state: PortfolioState,
    initial_cash: f64,
    min_trade_usd: f64,
}

impl Ledger {
    pub fn new(initial_cash: f64, min_trade_usd: f64) -> Self {
        Ledger {
            state: PortfolioState::new(initial_cash),
            initial_cash,
            min_trade_usd,
        }
    }

    pub fn state(&self) -> &PortfolioState {
        &self.state
    }

    /// Apply a decision at the given price.
    ///
    /// Returns `None` for HOLD and for rejected trades (below the minimum
    /// trade size, or a SELL with nothing to sell); rejections are silent
    /// no-ops, not errors. The state is revalued at `price` either way.
    pub fn apply(
        &mut self,
        decision: &Decision,
        timestamp: NaiveDateTime,
        price: f64,
    ) -> Option<TradeRecord> {
        let before = self.state;

        let record = match decision.action {
            Action::Hold => None,
            Action::Buy => self.apply_buy(decision, timestamp, price, &before),
            Action::Sell => self.apply_sell(decision, timestamp, price, &before),
        };

        self.state.revalue(price);
        record.map(|mut r| {
            r.total_value_after = self.state.total_value;
            r
        })
    }

    fn apply_buy(
        &mut self,
        decision: &Decision,
        timestamp: NaiveDateTime,
        price: f64,
        before: &PortfolioState,
    ) -> Option<TradeRecord> {
        if !(0.0..=100.0).contains(&decision.size_percent) || price <= 0.0 {
            return None;
        }

        let traded_amount = self.state.cash * decision.size_percent / 100.0;
        if traded_amount < self.min_trade_usd {
            return None;
        }

        let traded_quantity = traded_amount / price;
        self.state.cash -= traded_amount;
        self.state.holdings += traded_quantity;

        Some(self.record(
            decision,
            timestamp,
            price,
            traded_amount,
            traded_quantity,
            0.0,
            before,
        ))
    }

    fn apply_sell(
        &mut self,
        decision: &Decision,
        timestamp: NaiveDateTime,
        price: f64,
        before: &PortfolioState,
    ) -> Option<TradeRecord> {
        if !(0.0..=100.0).contains(&decision.size_percent) || price <= 0.0 {
            return None;
        }

        let traded_quantity = self.state.holdings * decision.size_percent / 100.0;
        let traded_amount = traded_quantity * price;
        if traded_quantity <= 0.0 || traded_amount <= 0.0 {
            return None;
        }

        // Approximate cost basis from the aggregate cash/holdings ratio.
        let cost_basis = self.state.cash / self.state.holdings;
        let profit = (traded_quantity * (price - cost_basis)).max(0.0);

        self.state.holdings -= traded_quantity;
        self.state.cash += traded_amount;
        self.state.realized_profit += profit;

        Some(self.record(
            decision,
            timestamp,
            price,
            traded_amount,
            traded_quantity,
            profit,
            before,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        decision: &Decision,
        timestamp: NaiveDateTime,
        price: f64,
        traded_amount: f64,
        traded_quantity: f64,
        realized_profit_delta: f64,
        before: &PortfolioState,
    ) -> TradeRecord {
        TradeRecord {
            timestamp,
            action: decision.action,
            price,
            size_percent: decision.size_percent,
            traded_amount,
            traded_quantity,
            reason: decision.reason.clone(),
            decision_source: decision.source,
            cash_before: before.cash,
            holdings_before: before.holdings,
            total_value_before: before.total_value,
            cash_after: self.state.cash,
            holdings_after: self.state.holdings,
            // Filled in by apply() after revaluation.
            total_value_after: 0.0,
            realized_profit_delta,
        }
    }

    /// Equity-curve point at the given price.
    pub fn snapshot(&self, timestamp: NaiveDateTime, price: f64) -> PortfolioSnapshot {
        let holdings_value = self.state.holdings * price;
        PortfolioSnapshot {
            timestamp,
            price,
            cash: self.state.cash,
            holdings: self.state.holdings,
            holdings_value,
            total_value: self.state.cash + holdings_value,
            realized_profit: self.state.realized_profit,
            unrealized_profit: self.state.cash + holdings_value - self.initial_cash,
        }
    }
}
