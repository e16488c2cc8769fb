//! Port traits for external collaborators.

pub mod config_port;
pub mod market_data_port;
pub mod notify_port;
pub mod oracle_port;
pub mod report_port;
