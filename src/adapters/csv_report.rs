//! Flat-file report adapter.
//!
//! Writes three artifacts per run into the output directory:
//! `trading_history.csv`, `portfolio_history.csv` and `performance.json`.
//! The JSON field names are the compatibility contract for downstream
//! readers; the CSV columns follow the record structs.

use crate::domain::driver::PerformanceSummary;
use crate::domain::error::CryptosimError;
use crate::domain::ledger::{PortfolioSnapshot, TradeRecord};
use crate::ports::report_port::ReportPort;
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvReportAdapter {
    output_dir: PathBuf,
}

impl CsvReportAdapter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    fn write_csv<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<(), CryptosimError> {
        let path = self.output_dir.join(name);
        let mut writer = csv::Writer::from_path(&path).map_err(|e| report_error(&path, e))?;
        for row in rows {
            writer.serialize(row).map_err(|e| report_error(&path, e))?;
        }
        writer.flush().map_err(|e| report_error(&path, e))?;
        Ok(())
    }
}

fn report_error(path: &Path, err: impl std::fmt::Display) -> CryptosimError {
    CryptosimError::Report {
        reason: format!("{}: {err}", path.display()),
    }
}

impl ReportPort for CsvReportAdapter {
    fn save_run(
        &self,
        trades: &[TradeRecord],
        snapshots: &[PortfolioSnapshot],
        summary: &PerformanceSummary,
    ) -> Result<(), CryptosimError> {
        fs::create_dir_all(&self.output_dir)
            .map_err(|e| report_error(&self.output_dir, e))?;

        self.write_csv("trading_history.csv", trades)?;
        self.write_csv("portfolio_history.csv", snapshots)?;

        let path = self.output_dir.join("performance.json");
        let json =
            serde_json::to_string_pretty(summary).map_err(|e| report_error(&path, e))?;
        fs::write(&path, json).map_err(|e| report_error(&path, e))?;

        info!(
            "saved {} trades and {} snapshots to {}",
            trades.len(),
            snapshots.len(),
            self.output_dir.display()
        );
        Ok(())
    }
}
