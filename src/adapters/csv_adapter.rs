//! CSV file price data adapter.
//!
//! Reads `<base_path>/<instrument>.csv`. Columns are found by header name
//! (`date`, `high`, `low`, `close`, case-insensitive), so provider exports
//! with extra columns such as `Open`, `Adj Close` or `Volume` load as-is.

use crate::domain::error::SignalError;
use crate::domain::ohlcv::{Bar, PriceSeries};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

struct Columns {
    date: usize,
    high: usize,
    low: usize,
    close: usize,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, instrument: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", instrument))
    }

    fn locate_columns(headers: &csv::StringRecord) -> Result<Columns, SignalError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| SignalError::DataSource {
                    reason: format!("missing {} column", name),
                })
        };
        Ok(Columns {
            date: find("date")?,
            high: find("high")?,
            low: find("low")?,
            close: find("close")?,
        })
    }

    /// `None` for an empty, `null` or `NaN` cell, which providers emit for non-trading days.
    fn parse_price(record: &csv::StringRecord, index: usize, name: &str) -> Result<Option<f64>, SignalError> {
        let raw = record.get(index).map(str::trim).unwrap_or("");
        if raw.is_empty() || raw.eq_ignore_ascii_case("null") || raw.eq_ignore_ascii_case("nan") {
            return Ok(None);
        }
        raw.parse().map(Some).map_err(|e| SignalError::DataSource {
            reason: format!("invalid {} value '{}': {}", name, raw, e),
        })
    }
}

impl DataPort for CsvAdapter {
    fn fetch_series(
        &self,
        instrument: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, SignalError> {
        let path = self.csv_path(instrument);
        let content = fs::read_to_string(&path).map_err(|e| SignalError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| SignalError::DataSource {
                reason: format!("CSV header error: {}", e),
            })?
            .clone();
        let cols = Self::locate_columns(&headers)?;

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| SignalError::DataSource {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(cols.date).map(str::trim).unwrap_or("");
            // Some exports carry a time part ("2023-01-02 00:00:00+00:00").
            let date_part = date_str.get(..10).unwrap_or(date_str);
            let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|e| {
                SignalError::DataSource {
                    reason: format!("invalid date '{}': {}", date_str, e),
                }
            })?;

            if date < start || date >= end {
                continue;
            }

            let high = Self::parse_price(&record, cols.high, "high")?;
            let low = Self::parse_price(&record, cols.low, "low")?;
            let close = Self::parse_price(&record, cols.close, "close")?;

            match (high, low, close) {
                (Some(high), Some(low), Some(close)) => bars.push(Bar::new(date, high, low, close)?),
                _ => log::warn!("skipping {} {}: missing price", instrument, date),
            }
        }

        bars.sort_by_key(|b| b.date);
        log::info!(
            "loaded {} bars for {} from {}",
            bars.len(),
            instrument,
            path.display()
        );
        PriceSeries::new(bars)
    }

    fn list_instruments(&self) -> Result<Vec<String>, SignalError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| SignalError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut instruments = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SignalError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(instrument) = name_str.strip_suffix(".csv") {
                instruments.push(instrument.to_string());
            }
        }

        instruments.sort();
        Ok(instruments)
    }
}
