//! Fixed-size sliding-window accumulators and the warm-up fill policy.
//!
//! Values are accumulated relative to the first value ever pushed (shifted
//! sums), which keeps the sum-of-squares variance well conditioned for price
//! levels far from zero. The running sums are rebuilt from the buffered
//! values once per `window` evictions so subtraction drift cannot build up.

use std::collections::VecDeque;

use crate::domain::indicator::WarmupPolicy;

#[derive(Debug, Clone)]
pub struct RollingWindow {
    window: usize,
    values: VecDeque<f64>,
    shift: Option<f64>,
    sum: f64,
    sum_sq: f64,
    evictions: usize,
}

impl RollingWindow {
    /// A window of zero is treated as one. Nothing is allocated up front.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            values: VecDeque::new(),
            shift: None,
            sum: 0.0,
            sum_sq: 0.0,
            evictions: 0,
        }
    }

    /// Reserves room for `len` values at most, however large the window.
    pub fn for_input(window: usize, len: usize) -> Self {
        let mut acc = Self::new(window);
        acc.values.reserve(acc.window.min(len));
        acc
    }

    pub fn push(&mut self, value: f64) {
        let shift = *self.shift.get_or_insert(value);

        if self.values.len() == self.window {
            if let Some(old) = self.values.pop_front() {
                let d = old - shift;
                self.sum -= d;
                self.sum_sq -= d * d;
                self.evictions += 1;
            }
        }

        let d = value - shift;
        self.values.push_back(value);
        self.sum += d;
        self.sum_sq += d * d;

        if self.evictions >= self.window {
            self.resync(shift);
        }
    }

    fn resync(&mut self, shift: f64) {
        self.sum = self.values.iter().map(|v| v - shift).sum();
        self.sum_sq = self.values.iter().map(|v| (v - shift) * (v - shift)).sum();
        self.evictions = 0;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.window
    }

    pub fn mean(&self) -> Option<f64> {
        let n = self.values.len();
        let shift = self.shift?;
        if n == 0 {
            return None;
        }
        Some(shift + self.sum / n as f64)
    }

    /// Sample standard deviation (N-1). Needs at least two values.
    pub fn sample_std(&self) -> Option<f64> {
        let n = self.values.len();
        if n < 2 {
            return None;
        }
        let n_f = n as f64;
        let variance = (self.sum_sq - self.sum * self.sum / n_f) / (n_f - 1.0);
        Some(variance.max(0.0).sqrt())
    }
}

/// Replace each `None` with the nearest later `Some`. Rows with no later
/// defined value become NaN.
pub fn backfill(values: Vec<Option<f64>>) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    let mut next = f64::NAN;
    for (i, v) in values.into_iter().enumerate().rev() {
        if let Some(v) = v {
            next = v;
        }
        out[i] = next;
    }
    out
}

fn rolling_with<F>(values: &[f64], window: usize, policy: WarmupPolicy, stat: F) -> Vec<f64>
where
    F: Fn(&RollingWindow) -> Option<f64>,
{
    let mut acc = RollingWindow::for_input(window, values.len());
    let raw = values
        .iter()
        .map(|&v| {
            acc.push(v);
            match policy {
                WarmupPolicy::BackFill if !acc.is_full() => None,
                _ => stat(&acc),
            }
        })
        .collect();
    backfill(raw)
}

/// Rolling mean under the given warm-up policy, back-filled.
pub fn rolling_mean(values: &[f64], window: usize, policy: WarmupPolicy) -> Vec<f64> {
    rolling_with(values, window, policy, RollingWindow::mean)
}

/// Rolling sample standard deviation under the given warm-up policy, back-filled.
pub fn rolling_sample_std(values: &[f64], window: usize, policy: WarmupPolicy) -> Vec<f64> {
    rolling_with(values, window, policy, RollingWindow::sample_std)
}
