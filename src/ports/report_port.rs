//! Run-artifact persistence port trait.

use crate::domain::driver::PerformanceSummary;
use crate::domain::error::CryptosimError;
use crate::domain::ledger::{PortfolioSnapshot, TradeRecord};

pub trait ReportPort {
    /// Persist the three run artifacts: full trade ledger, equity-curve
    /// snapshots, and the performance summary.
    fn save_run(
        &self,
        trades: &[TradeRecord],
        snapshots: &[PortfolioSnapshot],
        summary: &PerformanceSummary,
    ) -> Result<(), CryptosimError>;
}
