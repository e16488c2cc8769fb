//! Trade notification port trait.
//!
//! Fire-and-forget: the driver logs delivery failures and moves on; a
//! notifier must never block the stepping loop for long or abort a run.

use crate::domain::driver::PerformanceSummary;
use crate::domain::error::CryptosimError;
use crate::domain::ledger::{PortfolioState, TradeRecord};

pub trait NotifyPort {
    fn trade_executed(
        &self,
        record: &TradeRecord,
        state: &PortfolioState,
    ) -> Result<(), CryptosimError>;

    fn run_completed(&self, summary: &PerformanceSummary) -> Result<(), CryptosimError>;
}
