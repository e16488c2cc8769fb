//! Backtest driver: the orchestration state machine.
//!
//! Owns the single logical thread of control for a run. The stepping loop is
//! strictly sequential because every bar's decision depends on the portfolio
//! state mutated by the previous bar. The only call that may block inside
//! the loop is the oracle consultation, which the arbitration layer bounds.

use crate::domain::arbitration::{Arbiter, ArbitrationConfig};
use crate::domain::decision::{Action, Decision, DecisionSource};
use crate::domain::error::CryptosimError;
use crate::domain::indicator::{self, IndicatorFrame};
use crate::domain::ledger::{Ledger, PortfolioSnapshot, TradeRecord};
use crate::domain::snapshot::MarketSnapshot;
use crate::domain::strategy::{self, StrategyParams};
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::notify_port::NotifyPort;
use crate::ports::oracle_port::OraclePort;
use crate::ports::report_port::ReportPort;
use chrono::NaiveDateTime;
use log::{info, warn};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Lifecycle of one run. FAILED is reachable from FETCHING_DATA (a data
/// source failure aborts the whole run, no partial artifacts) and from
/// later stages only through unexpected internal errors; oracle trouble
/// inside STEPPING never changes the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Initializing,
    FetchingData,
    IndicatorsReady,
    Stepping,
    Finalizing,
    Done,
    Failed,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Initializing => "INITIALIZING",
            RunStage::FetchingData => "FETCHING_DATA",
            RunStage::IndicatorsReady => "INDICATORS_READY",
            RunStage::Stepping => "STEPPING",
            RunStage::Finalizing => "FINALIZING",
            RunStage::Done => "DONE",
            RunStage::Failed => "FAILED",
        };
        write!(f, "{name}")
    }
}

/// Optional dollar-cost-averaging probe, evaluated before the rule policy
/// on each processed bar.
#[derive(Debug, Clone, PartialEq)]
pub struct DcaSettings {
    /// Fixed quote-currency amount bought per triggered dip.
    pub amount_usd: f64,
    /// Close must drop more than this percentage versus the previous
    /// processed bar to trigger.
    pub dip_percent: f64,
}

/// Everything one run needs, resolved up front from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub symbol: String,
    pub interval: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub initial_capital: f64,
    /// Process every Nth bar rather than every bar.
    pub stride: usize,
    /// Bars skipped at the front for indicator convergence.
    pub warmup_bars: usize,
    /// Equity-curve snapshot every Nth processed bar (plus the first).
    pub snapshot_every: usize,
    pub strategy: StrategyParams,
    pub arbitration: ArbitrationConfig,
    pub dca: Option<DcaSettings>,
}

impl Default for RunSettings {
    fn default() -> Self {
        RunSettings {
            symbol: "BTCUSDT".into(),
            interval: "1h".into(),
            start: NaiveDateTime::MIN,
            end: NaiveDateTime::MAX,
            initial_capital: 100_000.0,
            stride: 24,
            warmup_bars: 200,
            snapshot_every: 30,
            strategy: StrategyParams::default(),
            arbitration: ArbitrationConfig::default(),
            dca: None,
        }
    }
}

/// Executed-trade counts by the layer that produced the decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecisionSourceCounts {
    pub rule: usize,
    pub advisory: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunPeriod {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Summary performance record. The serialized field names are a stable
/// contract with downstream readers of `performance.json`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub initial_capital: f64,
    pub final_value: f64,
    pub total_return_percent: f64,
    pub realized_profit: f64,
    pub final_holdings: f64,
    pub final_cash: f64,
    pub trade_count: usize,
    pub decision_source_counts: DecisionSourceCounts,
    pub run_period: RunPeriod,
    pub buy_and_hold_return_percent: f64,
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub summary: PerformanceSummary,
    pub trades: Vec<TradeRecord>,
    pub snapshots: Vec<PortfolioSnapshot>,
}

pub struct Driver<'a> {
    data: &'a dyn MarketDataPort,
    oracle: Option<&'a dyn OraclePort>,
    report: Option<&'a dyn ReportPort>,
    notifier: Option<&'a dyn NotifyPort>,
    settings: RunSettings,
    stage: RunStage,
    stop: Arc<AtomicBool>,
}

impl<'a> Driver<'a> {
    pub fn new(data: &'a dyn MarketDataPort, settings: RunSettings) -> Self {
        Driver {
            data,
            oracle: None,
            report: None,
            notifier: None,
            settings,
            stage: RunStage::Initializing,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_oracle(mut self, oracle: &'a dyn OraclePort) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_report(mut self, report: &'a dyn ReportPort) -> Self {
        self.report = Some(report);
        self
    }

    pub fn with_notifier(mut self, notifier: &'a dyn NotifyPort) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    /// Handle for requesting cooperative termination between bars. Already
    /// appended history stays valid; the run finalizes from wherever the
    /// loop stopped.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    fn set_stage(&mut self, stage: RunStage) {
        info!("run stage: {} -> {stage}", self.stage);
        self.stage = stage;
    }

    /// Execute the full run: fetch, annotate, step, finalize, persist.
    pub fn run(&mut self) -> Result<RunOutcome, CryptosimError> {
        self.set_stage(RunStage::FetchingData);
        let bars = match self.data.fetch_bars(
            &self.settings.symbol,
            &self.settings.interval,
            self.settings.start,
            self.settings.end,
        ) {
            Ok(bars) if !bars.is_empty() => bars,
            Ok(_) => {
                self.set_stage(RunStage::Failed);
                return Err(CryptosimError::EmptySeries {
                    symbol: self.settings.symbol.clone(),
                });
            }
            Err(e) => {
                self.set_stage(RunStage::Failed);
                return Err(e);
            }
        };
        info!(
            "fetched {} bars for {} {}",
            bars.len(),
            self.settings.symbol,
            self.settings.interval
        );

        let frames = match indicator::compute_frames(&bars) {
            Ok(frames) => frames,
            Err(e) => {
                self.set_stage(RunStage::Failed);
                return Err(e);
            }
        };
        self.set_stage(RunStage::IndicatorsReady);

        let outcome = self.run_frames(&frames);
        match &outcome {
            Ok(_) => self.set_stage(RunStage::Done),
            Err(_) => self.set_stage(RunStage::Failed),
        }
        outcome
    }

    /// Step an already-annotated series. Split out from [`run`] so the loop
    /// can be exercised without a data source.
    pub fn run_frames(&mut self, frames: &[IndicatorFrame]) -> Result<RunOutcome, CryptosimError> {
        if frames.is_empty() {
            return Err(CryptosimError::EmptySeries {
                symbol: self.settings.symbol.clone(),
            });
        }

        self.set_stage(RunStage::Stepping);
        let stride = self.settings.stride.max(1);
        let snapshot_every = self.settings.snapshot_every.max(1);

        let mut ledger = Ledger::new(
            self.settings.initial_capital,
            self.settings.strategy.min_trade_usd,
        );
        let mut arbiter = Arbiter::new(self.oracle, self.settings.arbitration.clone());
        let mut trades: Vec<TradeRecord> = Vec::new();
        let mut snapshots: Vec<PortfolioSnapshot> = Vec::new();
        let mut counts = DecisionSourceCounts::default();
        let mut processed = 0usize;
        let mut prev_close: Option<f64> = None;

        for (idx, frame) in frames.iter().enumerate().step_by(stride) {
            if self.stop.load(Ordering::Relaxed) {
                info!("stop requested, ending run after bar {idx}");
                break;
            }
            if idx < self.settings.warmup_bars {
                continue;
            }

            let price = frame.bar.close;
            let timestamp = frame.bar.timestamp;
            let snapshot = MarketSnapshot::from(frame);

            if let Some(dca) = &self.settings.dca {
                if let Some(record) =
                    self.dca_probe(dca, &mut ledger, prev_close, price, timestamp)
                {
                    counts.rule += 1;
                    self.notify_trade(&record, &ledger);
                    trades.push(record);
                }
            }

            let rule = strategy::decide(&snapshot, ledger.state(), &self.settings.strategy);
            let decision = arbiter.arbitrate(&snapshot, ledger.state(), rule, Instant::now());

            if let Some(record) = ledger.apply(&decision, timestamp, price) {
                match record.decision_source {
                    DecisionSource::Rule => counts.rule += 1,
                    DecisionSource::Advisory => counts.advisory += 1,
                }
                self.notify_trade(&record, &ledger);
                trades.push(record);
            }

            if processed % snapshot_every == 0 {
                snapshots.push(ledger.snapshot(timestamp, price));
            }
            prev_close = Some(price);
            processed += 1;
        }

        self.set_stage(RunStage::Finalizing);
        let summary = self.summarize(frames, &ledger, &trades, counts);

        if let Some(report) = self.report {
            report.save_run(&trades, &snapshots, &summary)?;
        }
        if let Some(notifier) = self.notifier {
            if let Err(e) = notifier.run_completed(&summary) {
                warn!("run-completed notification failed: {e}");
            }
        }

        Ok(RunOutcome {
            summary,
            trades,
            snapshots,
        })
    }

    /// Fixed-amount buy on a sufficient dip versus the previous processed
    /// bar, evaluated before the rule policy.
    fn dca_probe(
        &self,
        dca: &DcaSettings,
        ledger: &mut Ledger,
        prev_close: Option<f64>,
        price: f64,
        timestamp: NaiveDateTime,
    ) -> Option<TradeRecord> {
        let prev = prev_close?;
        if prev <= 0.0 {
            return None;
        }
        let drop_percent = (prev - price) / prev * 100.0;
        if drop_percent <= dca.dip_percent {
            return None;
        }
        let cash = ledger.state().cash;
        if cash < dca.amount_usd {
            return None;
        }

        let decision = Decision {
            action: Action::Buy,
            size_percent: dca.amount_usd / cash * 100.0,
            reason: format!("dollar cost averaging on {drop_percent:.1}% dip"),
            source: DecisionSource::Rule,
        };
        ledger.apply(&decision, timestamp, price)
    }

    fn notify_trade(&self, record: &TradeRecord, ledger: &Ledger) {
        if let Some(notifier) = self.notifier {
            if let Err(e) = notifier.trade_executed(record, ledger.state()) {
                warn!("trade notification failed: {e}");
            }
        }
    }

    fn summarize(
        &self,
        frames: &[IndicatorFrame],
        ledger: &Ledger,
        trades: &[TradeRecord],
        counts: DecisionSourceCounts,
    ) -> PerformanceSummary {
        // Valuation and the passive baseline both close at the final bar.
        let last = &frames[frames.len() - 1];
        let exit_price = last.bar.close;
        let entry_idx = self.settings.warmup_bars.min(frames.len() - 1);
        let entry_price = frames[entry_idx].bar.close;

        let final_snapshot = ledger.snapshot(last.bar.timestamp, exit_price);
        let initial = self.settings.initial_capital;
        let final_value = final_snapshot.total_value;

        let total_return_percent = if initial > 0.0 {
            (final_value - initial) / initial * 100.0
        } else {
            0.0
        };
        let buy_and_hold_return_percent = if entry_price > 0.0 {
            (exit_price - entry_price) / entry_price * 100.0
        } else {
            0.0
        };

        PerformanceSummary {
            initial_capital: initial,
            final_value,
            total_return_percent,
            realized_profit: ledger.state().realized_profit,
            final_holdings: ledger.state().holdings,
            final_cash: ledger.state().cash,
            trade_count: trades.len(),
            decision_source_counts: counts,
            run_period: RunPeriod {
                start: frames[0].bar.timestamp,
                end: last.bar.timestamp,
            },
            buy_and_hold_return_percent,
        }
    }
}
