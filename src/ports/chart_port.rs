//! Chart rendering port trait.

use std::path::PathBuf;

use crate::domain::error::SignalError;
use crate::domain::indicator::IndicatorHistory;
use crate::domain::ohlcv::PriceSeries;

/// Port for drawing the price series and its indicators. Returns the paths written.
pub trait ChartPort {
    fn render(
        &self,
        instrument: &str,
        series: &PriceSeries,
        history: &IndicatorHistory,
    ) -> Result<Vec<PathBuf>, SignalError>;
}
