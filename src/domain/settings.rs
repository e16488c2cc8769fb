//! Typed run configuration, validated up front.
//!
//! Reads the INI-style sections through [`ConfigPort`] and rejects bad
//! values before any data is fetched, so a misconfigured run fails fast
//! with a section/key-qualified error instead of mid-run surprises.

use crate::domain::arbitration::ArbitrationConfig;
use crate::domain::driver::{DcaSettings, RunSettings};
use crate::domain::error::CryptosimError;
use crate::domain::strategy::StrategyParams;
use crate::ports::config_port::ConfigPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::time::Duration;

/// Where price bars come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Csv { path: String },
    Binance { base_url: String },
}

/// Advisory oracle transport configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleSettings {
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
}

/// Telegram delivery configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifySettings {
    pub bot_token: String,
    pub chat_id: String,
}

/// Fully validated configuration for one backtest invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub run: RunSettings,
    pub data: DataSource,
    pub oracle: Option<OracleSettings>,
    pub notify: Option<NotifySettings>,
    pub output_dir: String,
}

impl Settings {
    pub fn load(config: &dyn ConfigPort) -> Result<Self, CryptosimError> {
        let run = load_run_settings(config)?;
        let data = load_data_source(config)?;
        let oracle = load_oracle(config)?;
        let notify = load_notify(config)?;
        let output_dir = config
            .get_string("report", "output_dir")
            .unwrap_or_else(|| "reports".to_string());

        Ok(Settings {
            run,
            data,
            oracle,
            notify,
            output_dir,
        })
    }
}

fn load_run_settings(config: &dyn ConfigPort) -> Result<RunSettings, CryptosimError> {
    let symbol = require_string(config, "backtest", "symbol")?;
    let interval = config
        .get_string("backtest", "interval")
        .unwrap_or_else(|| "1h".to_string());

    let start = parse_date(config, "backtest", "start_date")?;
    let end = parse_date(config, "backtest", "end_date")?;
    if start >= end {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }

    let initial_capital = config.get_double("backtest", "initial_capital", 100_000.0);
    if initial_capital <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }

    let stride = positive_int(config, "backtest", "stride", 24)?;
    let warmup_bars = config.get_int("backtest", "warmup_bars", 200);
    if warmup_bars < 0 {
        return Err(invalid(
            "backtest",
            "warmup_bars",
            "warmup_bars must be non-negative",
        ));
    }
    let snapshot_every = positive_int(config, "backtest", "snapshot_every", 30)?;

    let strategy = load_strategy(config)?;
    let arbitration = load_arbitration(config);
    let dca = load_dca(config)?;

    Ok(RunSettings {
        symbol,
        interval,
        start,
        end,
        initial_capital,
        stride,
        warmup_bars: warmup_bars as usize,
        snapshot_every,
        strategy,
        arbitration,
        dca,
    })
}

fn load_strategy(config: &dyn ConfigPort) -> Result<StrategyParams, CryptosimError> {
    let defaults = StrategyParams::default();
    let atr_high = config.get_double("strategy", "atr_high", defaults.atr_high);
    if atr_high <= 0.0 {
        return Err(invalid("strategy", "atr_high", "atr_high must be positive"));
    }
    let min_trade_usd = config.get_double("strategy", "min_trade_usd", defaults.min_trade_usd);
    if min_trade_usd < 0.0 {
        return Err(invalid(
            "strategy",
            "min_trade_usd",
            "min_trade_usd must be non-negative",
        ));
    }
    Ok(StrategyParams {
        atr_high,
        min_trade_usd,
    })
}

fn load_arbitration(config: &dyn ConfigPort) -> ArbitrationConfig {
    let defaults = ArbitrationConfig::default();
    ArbitrationConfig {
        cooldown: Duration::from_secs_f64(
            config
                .get_double("oracle", "cooldown_secs", defaults.cooldown.as_secs_f64())
                .max(0.0),
        ),
        deviation_threshold: config.get_double(
            "oracle",
            "deviation_threshold",
            defaults.deviation_threshold,
        ),
        rsi_extreme_band: config.get_double("oracle", "rsi_extreme_band", defaults.rsi_extreme_band),
        atr_floor: config.get_double("oracle", "atr_floor", defaults.atr_floor),
        large_size_percent: config.get_double(
            "oracle",
            "large_size_percent",
            defaults.large_size_percent,
        ),
        size_ceiling: config.get_double("oracle", "size_ceiling", defaults.size_ceiling),
        improvement_margin: config.get_double(
            "oracle",
            "improvement_margin",
            defaults.improvement_margin,
        ),
    }
}

fn load_dca(config: &dyn ConfigPort) -> Result<Option<DcaSettings>, CryptosimError> {
    if !config.get_bool("dca", "enabled", false) {
        return Ok(None);
    }
    let amount_usd = config.get_double("dca", "amount_usd", 0.0);
    if amount_usd <= 0.0 {
        return Err(invalid("dca", "amount_usd", "amount_usd must be positive"));
    }
    let dip_percent = config.get_double("dca", "dip_percent", 5.0);
    if dip_percent <= 0.0 {
        return Err(invalid(
            "dca",
            "dip_percent",
            "dip_percent must be positive",
        ));
    }
    Ok(Some(DcaSettings {
        amount_usd,
        dip_percent,
    }))
}

fn load_data_source(config: &dyn ConfigPort) -> Result<DataSource, CryptosimError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "binance".to_string());
    match source.trim().to_lowercase().as_str() {
        "csv" => {
            let path = require_string(config, "data", "csv_path")?;
            Ok(DataSource::Csv { path })
        }
        "binance" => {
            let base_url = config
                .get_string("data", "base_url")
                .unwrap_or_else(|| "https://api.binance.com".to_string());
            Ok(DataSource::Binance { base_url })
        }
        other => Err(invalid(
            "data",
            "source",
            &format!("unknown data source {other:?}, expected csv or binance"),
        )),
    }
}

fn load_oracle(config: &dyn ConfigPort) -> Result<Option<OracleSettings>, CryptosimError> {
    if !config.get_bool("oracle", "enabled", false) {
        return Ok(None);
    }
    let endpoint = config
        .get_string("oracle", "endpoint")
        .unwrap_or_else(|| "http://localhost:11434".to_string());
    let model = require_string(config, "oracle", "model")?;
    let timeout_secs = config.get_double("oracle", "timeout_secs", 8.0);
    if timeout_secs <= 0.0 {
        return Err(invalid(
            "oracle",
            "timeout_secs",
            "timeout_secs must be positive",
        ));
    }
    Ok(Some(OracleSettings {
        endpoint,
        model,
        timeout: Duration::from_secs_f64(timeout_secs),
    }))
}

fn load_notify(config: &dyn ConfigPort) -> Result<Option<NotifySettings>, CryptosimError> {
    if !config.get_bool("notify", "enabled", false) {
        return Ok(None);
    }
    Ok(Some(NotifySettings {
        bot_token: require_string(config, "notify", "bot_token")?,
        chat_id: require_string(config, "notify", "chat_id")?,
    }))
}

fn require_string(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<String, CryptosimError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(CryptosimError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<usize, CryptosimError> {
    let value = config.get_int(section, key, default);
    if value <= 0 {
        return Err(invalid(section, key, &format!("{key} must be positive")));
    }
    Ok(value as usize)
}

fn parse_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<NaiveDateTime, CryptosimError> {
    let raw = require_string(config, section, key)?;
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| invalid(section, key, &format!("invalid {key}, expected YYYY-MM-DD")))?;
    date.and_hms_opt(0, 0, 0)
        .ok_or_else(|| invalid(section, key, "date has no midnight representation"))
}

fn invalid(section: &str, key: &str, reason: &str) -> CryptosimError {
    CryptosimError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
