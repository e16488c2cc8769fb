//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::binance_market_data::BinanceMarketData;
use crate::adapters::csv_market_data::CsvMarketData;
use crate::adapters::csv_report::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::ollama_oracle::OllamaOracle;
use crate::adapters::telegram_notifier::TelegramNotifier;
use crate::domain::driver::{Driver, RunOutcome};
use crate::domain::error::CryptosimError;
use crate::domain::settings::{DataSource, Settings};
use crate::ports::market_data_port::MarketDataPort;

#[derive(Parser, Debug)]
#[command(name = "cryptosim", about = "Crypto market replay simulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a historical window and report performance
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Override the configured report directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Override the configured trading pair
        #[arg(long)]
        symbol: Option<String>,
        /// Run without the advisory oracle even if configured
        #[arg(long)]
        no_oracle: bool,
    },
    /// Check a configuration file without running anything
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            output,
            symbol,
            no_oracle,
        } => run_backtest(&config, output.as_ref(), symbol.as_deref(), no_oracle),
        Command::Validate { config } => run_validate(&config),
    }
}

fn load_settings(path: &PathBuf) -> Result<Settings, CryptosimError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    Settings::load(&adapter)
}

fn run_backtest(
    config_path: &PathBuf,
    output_override: Option<&PathBuf>,
    symbol_override: Option<&str>,
    no_oracle: bool,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let mut settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if let Some(symbol) = symbol_override {
        settings.run.symbol = symbol.to_string();
    }
    if let Some(output) = output_override {
        settings.output_dir = output.display().to_string();
    }

    let data: Box<dyn MarketDataPort> = match &settings.data {
        DataSource::Csv { path } => Box::new(CsvMarketData::new(PathBuf::from(path))),
        DataSource::Binance { base_url } => match BinanceMarketData::new(base_url.clone()) {
            Ok(adapter) => Box::new(adapter),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        },
    };

    let oracle = match settings.oracle.as_ref().filter(|_| !no_oracle) {
        Some(cfg) => {
            match OllamaOracle::new(cfg.endpoint.clone(), cfg.model.clone(), cfg.timeout) {
                Ok(oracle) if oracle.is_available() => {
                    eprintln!("Advisory oracle available: {}", cfg.model);
                    Some(oracle)
                }
                Ok(_) => {
                    eprintln!(
                        "warning: oracle {} not reachable at {}, running rules only",
                        cfg.model, cfg.endpoint
                    );
                    None
                }
                Err(e) => {
                    eprintln!("error: {e}");
                    return (&e).into();
                }
            }
        }
        None => None,
    };

    let notifier = match settings.notify.as_ref() {
        Some(cfg) => match TelegramNotifier::new(cfg.bot_token.clone(), cfg.chat_id.clone()) {
            Ok(n) => Some(n),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        },
        None => None,
    };

    let report = CsvReportAdapter::new(PathBuf::from(&settings.output_dir));

    eprintln!(
        "Running {} {} from {} to {}",
        settings.run.symbol, settings.run.interval, settings.run.start, settings.run.end
    );
    let mut driver = Driver::new(data.as_ref(), settings.run.clone()).with_report(&report);
    if let Some(oracle) = oracle.as_ref() {
        driver = driver.with_oracle(oracle);
    }
    if let Some(notifier) = notifier.as_ref() {
        driver = driver.with_notifier(notifier);
    }

    match driver.run() {
        Ok(outcome) => {
            print_summary(&outcome);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn print_summary(outcome: &RunOutcome) {
    let s = &outcome.summary;
    println!("Period:          {} -> {}", s.run_period.start, s.run_period.end);
    println!("Initial capital: {:.2} USD", s.initial_capital);
    println!("Final value:     {:.2} USD", s.final_value);
    println!(
        "Return:          {:.2}% (buy & hold {:.2}%)",
        s.total_return_percent, s.buy_and_hold_return_percent
    );
    println!("Realized profit: {:.2} USD", s.realized_profit);
    println!(
        "Trades:          {} ({} rule, {} advisory)",
        s.trade_count, s.decision_source_counts.rule, s.decision_source_counts.advisory
    );
    println!(
        "Final balances:  {:.2} USD cash, {:.6} units",
        s.final_cash, s.final_holdings
    );
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    match load_settings(config_path) {
        Ok(settings) => {
            println!(
                "{} is valid: {} {} from {} to {}",
                config_path.display(),
                settings.run.symbol,
                settings.run.interval,
                settings.run.start.date(),
                settings.run.end.date()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
