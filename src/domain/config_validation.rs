//! Configuration validation.
//!
//! Checks every recognised key before anything is loaded or computed. Keys
//! that are absent fall back to their defaults and always pass.

use crate::domain::decision::MaComparison;
use crate::domain::error::SignalError;
use crate::domain::indicator::WarmupPolicy;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::str::FromStr;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), SignalError> {
    validate_window(config)?;
    validate_warmup(config)?;
    validate_trend_window(config)?;
    validate_portfolio_value(config)?;
    validate_risk_tolerance(config)?;
    validate_thresholds(config)?;
    validate_percentages(config)?;
    validate_ma_comparison(config)?;
    validate_dates(config)?;
    Ok(())
}

/// The data source must name a directory and an instrument.
pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), SignalError> {
    for key in ["dir", "instrument"] {
        match config.get_string("data", key) {
            Some(s) if !s.trim().is_empty() => {}
            _ => {
                return Err(SignalError::ConfigMissing {
                    section: "data".to_string(),
                    key: key.to_string(),
                })
            }
        }
    }
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> SignalError {
    SignalError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Parse an optional key, reporting a malformed value instead of defaulting it.
fn parse_optional<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, SignalError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("cannot parse '{}'", raw.trim()))),
    }
}

fn validate_window(config: &dyn ConfigPort) -> Result<(), SignalError> {
    if let Some(window) = parse_optional::<i64>(config, "indicators", "window")? {
        if window < 1 {
            return Err(invalid("indicators", "window", "window must be at least 1"));
        }
    }
    Ok(())
}

fn validate_warmup(config: &dyn ConfigPort) -> Result<(), SignalError> {
    if let Some(raw) = config.get_string("indicators", "warmup") {
        raw.parse::<WarmupPolicy>()
            .map_err(|reason| invalid("indicators", "warmup", reason))?;
    }
    Ok(())
}

fn validate_trend_window(config: &dyn ConfigPort) -> Result<(), SignalError> {
    if let Some(n) = parse_optional::<i64>(config, "decision", "trend_window")? {
        if n < 1 {
            return Err(invalid("decision", "trend_window", "trend_window must be at least 1"));
        }
    }
    Ok(())
}

fn validate_portfolio_value(config: &dyn ConfigPort) -> Result<(), SignalError> {
    if let Some(value) = parse_optional::<f64>(config, "decision", "portfolio_value")? {
        if !value.is_finite() || value <= 0.0 {
            return Err(invalid(
                "decision",
                "portfolio_value",
                "portfolio_value must be positive",
            ));
        }
    }
    Ok(())
}

fn validate_risk_tolerance(config: &dyn ConfigPort) -> Result<(), SignalError> {
    if let Some(value) = parse_optional::<f64>(config, "decision", "risk_tolerance")? {
        if !(0.0..=1.0).contains(&value) {
            return Err(invalid(
                "decision",
                "risk_tolerance",
                "risk_tolerance must be between 0 and 1",
            ));
        }
    }
    Ok(())
}

fn validate_thresholds(config: &dyn ConfigPort) -> Result<(), SignalError> {
    for key in [
        "bullish_threshold",
        "bearish_threshold",
        "aux_value",
        "aux_threshold",
    ] {
        if let Some(value) = parse_optional::<f64>(config, "decision", key)? {
            if !value.is_finite() {
                return Err(invalid("decision", key, format!("{key} must be finite")));
            }
        }
    }
    Ok(())
}

fn validate_percentages(config: &dyn ConfigPort) -> Result<(), SignalError> {
    for key in ["buy_min_bullish_pct", "sell_min_bearish_pct"] {
        if let Some(value) = parse_optional::<f64>(config, "decision", key)? {
            if !(0.0..=100.0).contains(&value) {
                return Err(invalid(
                    "decision",
                    key,
                    format!("{key} must be between 0 and 100"),
                ));
            }
        }
    }
    Ok(())
}

fn validate_ma_comparison(config: &dyn ConfigPort) -> Result<(), SignalError> {
    if let Some(raw) = config.get_string("decision", "ma_comparison") {
        raw.parse::<MaComparison>()
            .map_err(|reason| invalid("decision", "ma_comparison", reason))?;
    }
    Ok(())
}

pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate, SignalError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        invalid(
            "data",
            field,
            format!("invalid {} format, expected YYYY-MM-DD", field),
        )
    })
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), SignalError> {
    let start = config
        .get_string("data", "start_date")
        .map(|s| parse_date(&s, "start_date"))
        .transpose()?;
    let end = config
        .get_string("data", "end_date")
        .map(|s| parse_date(&s, "end_date"))
        .transpose()?;

    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(invalid(
                "data",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok(())
}
