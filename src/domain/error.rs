//! Domain error types.
//!
//! Three severities, handled at the driver:
//! - fatal: data fetch failures and empty series abort the run
//! - recoverable: oracle failures degrade to the rule decision
//! - non-fatal side effects: report/notification delivery is logged only

/// Top-level error type for cryptosim.
#[derive(Debug, thiserror::Error)]
pub enum CryptosimError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("market data fetch failed for {symbol} {interval}: {reason}")]
    DataFetch {
        symbol: String,
        interval: String,
        reason: String,
    },

    #[error("empty price series for {symbol}")]
    EmptySeries { symbol: String },

    #[error("oracle error: {reason}")]
    Oracle { reason: String },

    #[error("report write failed: {reason}")]
    Report { reason: String },

    #[error("notification failed: {reason}")]
    Notify { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&CryptosimError> for std::process::ExitCode {
    fn from(err: &CryptosimError) -> Self {
        let code: u8 = match err {
            CryptosimError::Io(_) => 1,
            CryptosimError::ConfigParse { .. }
            | CryptosimError::ConfigMissing { .. }
            | CryptosimError::ConfigInvalid { .. } => 2,
            CryptosimError::DataFetch { .. } | CryptosimError::EmptySeries { .. } => 3,
            CryptosimError::Oracle { .. } => 4,
            CryptosimError::Report { .. } | CryptosimError::Notify { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_data_fetch() {
        let err = CryptosimError::DataFetch {
            symbol: "BTCUSDT".into(),
            interval: "1h".into(),
            reason: "connection refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "market data fetch failed for BTCUSDT 1h: connection refused"
        );
    }

    #[test]
    fn display_config_missing() {
        let err = CryptosimError::ConfigMissing {
            section: "backtest".into(),
            key: "initial_cash".into(),
        };
        assert_eq!(err.to_string(), "missing config key [backtest] initial_cash");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CryptosimError = io.into();
        assert!(matches!(err, CryptosimError::Io(_)));
    }
}
