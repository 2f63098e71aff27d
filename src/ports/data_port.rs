//! Price data access port trait.

use crate::domain::error::SignalError;
use crate::domain::ohlcv::PriceSeries;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily bars for `instrument` with `start <= date < end`.
    fn fetch_series(
        &self,
        instrument: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, SignalError>;

    fn list_instruments(&self) -> Result<Vec<String>, SignalError>;
}
