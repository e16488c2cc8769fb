//! Concrete adapter implementations for ports.

pub mod binance_market_data;
pub mod csv_market_data;
pub mod csv_report;
pub mod file_config_adapter;
pub mod ollama_oracle;
pub mod telegram_notifier;
