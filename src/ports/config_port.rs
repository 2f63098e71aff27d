//! Configuration access port trait.
//!
//! Lookups never fail: a missing or unparsable numeric value yields the
//! caller's default. Validation reports malformed values separately.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
}
