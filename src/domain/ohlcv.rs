//! Daily price bars and the ordered series built from them.

use chrono::NaiveDate;

use crate::domain::error::SignalError;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub date: NaiveDate,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    /// Build a bar, rejecting non-finite or non-positive prices and `high < low`.
    pub fn new(date: NaiveDate, high: f64, low: f64, close: f64) -> Result<Self, SignalError> {
        for (name, value) in [("high", high), ("low", low), ("close", close)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SignalError::InvalidBar {
                    date,
                    reason: format!("{name} must be a positive number, got {value}"),
                });
            }
        }
        if high < low {
            return Err(SignalError::InvalidBar {
                date,
                reason: format!("high {high} is below low {low}"),
            });
        }
        Ok(Self {
            date,
            high,
            low,
            close,
        })
    }

    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Bars in strictly increasing date order. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<Bar>) -> Result<Self, SignalError> {
        if bars.is_empty() {
            return Err(SignalError::InsufficientHistory);
        }
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(SignalError::UnorderedSeries { date: pair[1].date });
            }
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.bars[self.bars.len() - 1].date
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
    }

    #[test]
    fn typical_price() {
        let bar = Bar::new(day(2), 90.5, 89.5, 90.2).unwrap();
        let expected = (90.5 + 89.5 + 90.2) / 3.0;
        assert!((bar.typical_price() - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn bar_rejects_high_below_low() {
        let err = Bar::new(day(2), 89.0, 90.0, 89.5).unwrap_err();
        assert!(matches!(err, SignalError::InvalidBar { .. }));
    }

    #[test]
    fn bar_rejects_non_positive_and_nan() {
        assert!(Bar::new(day(2), 90.0, 0.0, 89.5).is_err());
        assert!(Bar::new(day(2), 90.0, 89.0, -1.0).is_err());
        assert!(Bar::new(day(2), f64::NAN, 89.0, 89.5).is_err());
    }

    #[test]
    fn bar_allows_flat_prices() {
        let bar = Bar::new(day(2), 90.0, 90.0, 90.0).unwrap();
        assert_eq!(bar.typical_price(), 90.0);
    }

    #[test]
    fn series_rejects_empty() {
        let err = PriceSeries::new(vec![]).unwrap_err();
        assert!(matches!(err, SignalError::InsufficientHistory));
    }

    #[test]
    fn series_rejects_duplicate_and_descending_dates() {
        let a = Bar::new(day(3), 91.0, 90.0, 90.5).unwrap();
        let b = Bar::new(day(2), 91.0, 90.0, 90.5).unwrap();
        let err = PriceSeries::new(vec![a.clone(), b]).unwrap_err();
        assert!(matches!(err, SignalError::UnorderedSeries { date } if date == day(2)));

        let err = PriceSeries::new(vec![a.clone(), a]).unwrap_err();
        assert!(matches!(err, SignalError::UnorderedSeries { .. }));
    }

    #[test]
    fn series_accessors() {
        let bars = vec![
            Bar::new(day(2), 91.0, 90.0, 90.5).unwrap(),
            Bar::new(day(3), 92.0, 90.5, 91.5).unwrap(),
        ];
        let series = PriceSeries::new(bars).unwrap();
        assert_eq!(series.len(), 2);
        assert!(!series.is_empty());
        assert_eq!(series.first_date(), day(2));
        assert_eq!(series.last_date(), day(3));
        assert_eq!(series.closes(), vec![90.5, 91.5]);
    }
}
