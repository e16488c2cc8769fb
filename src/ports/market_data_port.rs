//! Market data access port trait.

use crate::domain::error::CryptosimError;
use crate::domain::ohlcv::PriceBar;
use chrono::NaiveDateTime;

pub trait MarketDataPort {
    /// Fetch an ordered, duplicate-free bar series for a symbol/interval
    /// within the given window. Any failure is fatal for the run; bars are
    /// never fabricated.
    fn fetch_bars(
        &self,
        symbol: &str,
        interval: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PriceBar>, CryptosimError>;
}
