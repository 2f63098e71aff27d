#![allow(dead_code)]

use chrono::NaiveDate;
use fxsignal::domain::error::SignalError;
pub use fxsignal::domain::ohlcv::{Bar, PriceSeries};
use fxsignal::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, instrument: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(instrument.to_string(), bars);
        self
    }

    pub fn with_error(mut self, instrument: &str, reason: &str) -> Self {
        self.errors.insert(instrument.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_series(
        &self,
        instrument: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, SignalError> {
        if let Some(reason) = self.errors.get(instrument) {
            return Err(SignalError::DataSource {
                reason: reason.clone(),
            });
        }
        let bars = self
            .data
            .get(instrument)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start && b.date < end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        PriceSeries::new(bars)
    }

    fn list_instruments(&self) -> Result<Vec<String>, SignalError> {
        let mut names: Vec<String> = self.data.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One bar per calendar day with high = low = close.
pub fn bars_from_closes(start: NaiveDate, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::new(start + chrono::Duration::days(i as i64), c, c, c).unwrap())
        .collect()
}

/// Closes rising linearly from `from` to `to` inclusive.
pub fn linear_closes(count: usize, from: f64, to: f64) -> Vec<f64> {
    if count < 2 {
        return vec![from; count];
    }
    let step = (to - from) / (count - 1) as f64;
    (0..count).map(|i| from + step * i as f64).collect()
}

pub fn linear_bars(count: usize, from: f64, to: f64) -> Vec<Bar> {
    bars_from_closes(date(2023, 1, 2), &linear_closes(count, from, to))
}

pub fn flat_bars(count: usize, price: f64) -> Vec<Bar> {
    bars_from_closes(date(2023, 1, 2), &vec![price; count])
}

pub fn series(bars: Vec<Bar>) -> PriceSeries {
    PriceSeries::new(bars).unwrap()
}

/// Daily CSV in the layout a market-data provider exports.
pub fn provider_csv(bars: &[Bar]) -> String {
    let mut out = String::from("Date,Open,High,Low,Close,Adj Close,Volume\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{},0\n",
            b.date, b.close, b.high, b.low, b.close, b.close
        ));
    }
    out
}
