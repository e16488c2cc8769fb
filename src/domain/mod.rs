//! Core domain logic: pure, deterministic, no I/O.
//!
//! Everything that touches the outside world goes through the traits in
//! `crate::ports`; adapters live in `crate::adapters`.

pub mod arbitration;
pub mod decision;
pub mod driver;
pub mod error;
pub mod indicator;
pub mod ledger;
pub mod ohlcv;
pub mod settings;
pub mod snapshot;
pub mod strategy;
