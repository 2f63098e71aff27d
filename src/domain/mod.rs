//! Core domain types and logic: price series, indicators, decisions.

pub mod ohlcv;
pub mod indicator;
pub mod decision;
pub mod config_validation;
pub mod error;
