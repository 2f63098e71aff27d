//! Bollinger Bands.
//!
//! - Upper: moving average + (multiplier × std dev)
//! - Lower: moving average - (multiplier × std dev)
//!
//! The std dev column is the sample standard deviation of closes over the
//! same window as the moving average. Default multiplier is 2.0.

pub const BAND_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub upper: f64,
    pub lower: f64,
}

pub fn band(moving_average: f64, std_dev: f64, multiplier: f64) -> Band {
    Band {
        upper: moving_average + multiplier * std_dev,
        lower: moving_average - multiplier * std_dev,
    }
}

/// Row-aligned bands for precomputed moving-average and std-dev columns.
pub fn calculate_bands(moving_average: &[f64], std_dev: &[f64], multiplier: f64) -> Vec<Band> {
    moving_average
        .iter()
        .zip(std_dev)
        .map(|(&ma, &sd)| band(ma, sd, multiplier))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_symmetric_around_average() {
        let b = band(100.0, 1.5, BAND_MULTIPLIER);
        assert!((b.upper - 103.0).abs() < 1e-12);
        assert!((b.lower - 97.0).abs() < 1e-12);
        assert!(((b.upper - 100.0) - (100.0 - b.lower)).abs() < 1e-12);
    }

    #[test]
    fn zero_std_collapses_bands() {
        let b = band(87.5, 0.0, BAND_MULTIPLIER);
        assert_eq!(b.upper, 87.5);
        assert_eq!(b.lower, 87.5);
    }

    #[test]
    fn multiplier_variations() {
        let b = band(20.0, 10.0, 1.0);
        assert_eq!(b.upper, 30.0);
        assert_eq!(b.lower, 10.0);
    }

    #[test]
    fn undefined_inputs_stay_undefined() {
        let bands = calculate_bands(&[f64::NAN, 10.0], &[f64::NAN, 1.0], BAND_MULTIPLIER);
        assert!(bands[0].upper.is_nan());
        assert!(bands[0].lower.is_nan());
        assert_eq!(bands[1], Band { upper: 12.0, lower: 8.0 });
    }
}
