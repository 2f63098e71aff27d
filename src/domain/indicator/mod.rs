//! Indicator pipeline: rolling statistics, Bollinger Bands and CCI.
//!
//! - `IndicatorConfig`: window size and warm-up policy
//! - `IndicatorRow`: every derived metric for one bar
//! - `IndicatorHistory`: rows aligned one-to-one with a `PriceSeries`
//! - `compute`: the pure function from series to history
//!
//! Undefined values are NaN. Under `WarmupPolicy::BackFill` a series shorter
//! than the window has no defined rolling values at all.

pub mod bollinger;
pub mod cci;
pub mod rolling;

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::domain::ohlcv::PriceSeries;
use bollinger::{calculate_bands, BAND_MULTIPLIER};
use cci::calculate_cci;
use rolling::{rolling_mean, rolling_sample_std};

pub const DEFAULT_WINDOW: usize = 20;

/// How rows before the first full window get their rolling values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WarmupPolicy {
    /// Only full windows are computed; leading rows take the first full value.
    #[default]
    BackFill,
    /// Leading rows use every bar seen so far.
    Expanding,
}

impl fmt::Display for WarmupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarmupPolicy::BackFill => write!(f, "backfill"),
            WarmupPolicy::Expanding => write!(f, "expanding"),
        }
    }
}

impl FromStr for WarmupPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "backfill" | "bfill" => Ok(WarmupPolicy::BackFill),
            "expanding" => Ok(WarmupPolicy::Expanding),
            other => Err(format!("unknown warm-up policy '{other}' (expected backfill or expanding)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndicatorConfig {
    pub window: usize,
    pub warmup: WarmupPolicy,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            warmup: WarmupPolicy::BackFill,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorRow {
    pub date: NaiveDate,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub typical_price: f64,
    pub moving_average: f64,
    pub std_dev: f64,
    pub upper_band: f64,
    pub lower_band: f64,
    pub mean_deviation: f64,
    pub cci: f64,
}

impl IndicatorRow {
    /// Whether this row's CCI is a usable directional vote.
    pub fn has_signal(&self) -> bool {
        self.cci.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorHistory {
    config: IndicatorConfig,
    rows: Vec<IndicatorRow>,
}

impl IndicatorHistory {
    pub fn from_rows(config: IndicatorConfig, rows: Vec<IndicatorRow>) -> Self {
        Self { config, rows }
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    pub fn rows(&self) -> &[IndicatorRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&IndicatorRow> {
        self.rows.last()
    }

    /// The trailing `n` rows, or all of them when there are fewer.
    pub fn tail(&self, n: usize) -> &[IndicatorRow] {
        &self.rows[self.rows.len().saturating_sub(n)..]
    }

    /// Rows whose CCI is undefined.
    pub fn singular_rows(&self) -> usize {
        self.rows.iter().filter(|r| !r.has_signal()).count()
    }

    /// True when no full window fits and back-fill had nothing to copy from.
    pub fn is_short(&self) -> bool {
        self.config.warmup == WarmupPolicy::BackFill && self.rows.len() < self.config.window
    }
}

/// Derive the full indicator history for `series`. Pure and deterministic.
pub fn compute(series: &PriceSeries, config: &IndicatorConfig) -> IndicatorHistory {
    let bars = series.bars();
    let window = config.window;

    let closes = series.closes();
    let typical: Vec<f64> = bars.iter().map(|b| b.typical_price()).collect();

    let moving_average = rolling_mean(&closes, window, config.warmup);
    let std_dev = rolling_sample_std(&closes, window, config.warmup);
    let bands = calculate_bands(&moving_average, &std_dev, BAND_MULTIPLIER);
    let cci = calculate_cci(&typical, window, config.warmup);

    let rows: Vec<IndicatorRow> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorRow {
            date: bar.date,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            typical_price: typical[i],
            moving_average: moving_average[i],
            std_dev: std_dev[i],
            upper_band: bands[i].upper,
            lower_band: bands[i].lower,
            mean_deviation: cci.mean_deviation[i],
            cci: cci.cci[i],
        })
        .collect();

    let history = IndicatorHistory::from_rows(*config, rows);
    if history.is_short() {
        log::warn!(
            "series has {} bars, fewer than the {}-bar window; rolling values are undefined",
            history.len(),
            window
        );
    }
    log::debug!(
        "computed {} indicator rows (window {}, warm-up {}), {} without CCI signal",
        history.len(),
        window,
        config.warmup,
        history.singular_rows()
    );
    history
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::Bar;
    use approx::assert_relative_eq;

    fn linear_series(count: usize) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let step = if count > 1 { 20.0 / (count - 1) as f64 } else { 0.0 };
        let bars = (0..count)
            .map(|i| {
                let close = 80.0 + step * i as f64;
                Bar::new(
                    start + chrono::Duration::days(i as i64),
                    close + 0.5,
                    close - 0.5,
                    close,
                )
                .unwrap()
            })
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    #[test]
    fn warmup_policy_parse_and_display() {
        assert_eq!("backfill".parse::<WarmupPolicy>().unwrap(), WarmupPolicy::BackFill);
        assert_eq!(" Expanding ".parse::<WarmupPolicy>().unwrap(), WarmupPolicy::Expanding);
        assert!("forward".parse::<WarmupPolicy>().is_err());
        assert_eq!(WarmupPolicy::Expanding.to_string(), "expanding");
    }

    #[test]
    fn history_aligned_with_series() {
        let series = linear_series(25);
        let history = compute(&series, &IndicatorConfig::default());
        assert_eq!(history.len(), series.len());
        for (row, bar) in history.rows().iter().zip(series.bars()) {
            assert_eq!(row.date, bar.date);
            assert_eq!(row.close, bar.close);
            assert_eq!(row.typical_price, bar.typical_price());
        }
    }

    #[test]
    fn leading_rows_inherit_first_full_window() {
        let series = linear_series(25);
        let history = compute(&series, &IndicatorConfig::default());
        let first_full = &history.rows()[19];
        for row in &history.rows()[..19] {
            assert_eq!(row.moving_average, first_full.moving_average);
            assert_eq!(row.std_dev, first_full.std_dev);
            assert_eq!(row.mean_deviation, first_full.mean_deviation);
        }
    }

    #[test]
    fn band_width_is_four_std() {
        let series = linear_series(25);
        let history = compute(&series, &IndicatorConfig::default());
        for row in history.rows() {
            assert_relative_eq!(row.upper_band - row.lower_band, 4.0 * row.std_dev, epsilon = 1e-9);
        }
    }

    #[test]
    fn short_series_backfill_is_undefined() {
        let series = linear_series(5);
        let history = compute(&series, &IndicatorConfig::default());
        assert!(history.is_short());
        assert!(history.rows().iter().all(|r| r.moving_average.is_nan()));
        assert_eq!(history.singular_rows(), 5);
    }

    #[test]
    fn short_series_expanding_is_defined() {
        let series = linear_series(5);
        let config = IndicatorConfig {
            window: 20,
            warmup: WarmupPolicy::Expanding,
        };
        let history = compute(&series, &config);
        assert!(!history.is_short());
        assert!(history.rows().iter().all(|r| r.moving_average.is_finite()));
        assert!(history.rows().iter().all(|r| r.std_dev.is_finite()));
    }

    #[test]
    fn single_bar_series() {
        let series = linear_series(1);
        let config = IndicatorConfig {
            window: 1,
            warmup: WarmupPolicy::BackFill,
        };
        let history = compute(&series, &config);
        assert_eq!(history.len(), 1);
        assert_eq!(history.rows()[0].moving_average, 80.0);
        assert!(history.rows()[0].std_dev.is_nan());
        assert!(!history.rows()[0].has_signal());
    }

    #[test]
    fn tail_clamps_to_length() {
        let series = linear_series(4);
        let history = compute(&series, &IndicatorConfig::default());
        assert_eq!(history.tail(6).len(), 4);
        assert_eq!(history.tail(2).len(), 2);
        assert_eq!(history.tail(2)[1].date, series.last_date());
    }
}
