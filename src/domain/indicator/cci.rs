//! Commodity Channel Index over typical price.
//!
//! x[i]   = rolling mean of typical price (warm-up filled)
//! md[i]  = rolling mean of |tp[j] - x[j]| (warm-up filled)
//! cci[i] = (tp[i] - x[i]) / (0.015 * md[i])
//!
//! The mean deviation averages each row's distance from its own baseline,
//! not from the baseline of the row being scored.
//!
//! A zero mean deviation has no defined CCI: the row gets NaN and carries no
//! directional signal. Deviations within `f64::EPSILON` of the baseline's
//! magnitude are treated as zero, since flat prices can leave rounding
//! residue in the rolling sums.

use crate::domain::indicator::rolling::rolling_mean;
use crate::domain::indicator::WarmupPolicy;

pub const CCI_SCALE: f64 = 0.015;

#[derive(Debug, Clone)]
pub struct CciColumns {
    pub baseline: Vec<f64>,
    pub mean_deviation: Vec<f64>,
    pub cci: Vec<f64>,
}

/// CCI for one row. NaN when the mean deviation is zero or undefined.
pub fn cci_value(typical_price: f64, baseline: f64, mean_deviation: f64) -> f64 {
    if !mean_deviation.is_finite() || mean_deviation <= f64::EPSILON * baseline.abs() {
        return f64::NAN;
    }
    (typical_price - baseline) / (CCI_SCALE * mean_deviation)
}

pub fn calculate_cci(typical_price: &[f64], window: usize, policy: WarmupPolicy) -> CciColumns {
    let baseline = rolling_mean(typical_price, window, policy);

    let deviation: Vec<f64> = typical_price
        .iter()
        .zip(&baseline)
        .map(|(tp, x)| (tp - x).abs())
        .collect();
    let mean_deviation = rolling_mean(&deviation, window, policy);

    let cci = typical_price
        .iter()
        .zip(&baseline)
        .zip(&mean_deviation)
        .map(|((&tp, &x), &md)| cci_value(tp, x, md))
        .collect();

    CciColumns {
        baseline,
        mean_deviation,
        cci,
    }
}
