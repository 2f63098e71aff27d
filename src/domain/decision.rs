//! Decision engine: CCI vote counting and the BUY/SELL/NEUTRAL rule set.
//!
//! Every row of the history votes bullish (`cci > bullish_threshold`) or
//! bearish (`cci < bearish_threshold`); rows with undefined CCI abstain.
//! The last row and the trailing `trend_window` rows then feed the buy and
//! sell conditions. The engine holds no state between calls.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::SignalError;
use crate::domain::indicator::{IndicatorHistory, IndicatorRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Label {
    Buy,
    Sell,
    Neutral,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Buy => write!(f, "BUY"),
            Label::Sell => write!(f, "SELL"),
            Label::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Majority direction of the historical votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Bullish,
    Bearish,
    NoClearTrend,
}

/// What the last moving average is compared against in the buy/sell rules.
///
/// `SelfCompare` compares the last row's moving average with itself, so
/// `>=` always holds and `<` never does. `PriorPeriod` compares against the
/// previous row instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaComparison {
    #[default]
    SelfCompare,
    PriorPeriod,
}

impl fmt::Display for MaComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaComparison::SelfCompare => write!(f, "self"),
            MaComparison::PriorPeriod => write!(f, "prior"),
        }
    }
}

impl FromStr for MaComparison {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "self" => Ok(MaComparison::SelfCompare),
            "prior" | "previous" => Ok(MaComparison::PriorPeriod),
            other => Err(format!("unknown MA comparison '{other}' (expected self or prior)")),
        }
    }
}

/// Non-fatal conditions noticed while deciding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// No row voted either way; the decision is NEUTRAL.
    InsufficientSignal,
    /// Rows whose CCI was undefined (zero mean deviation or no full window).
    SingularCci { rows: usize },
    /// Fewer bars than the indicator window under back-fill warm-up.
    ShortSeries { bars: usize, window: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::InsufficientSignal => {
                write!(f, "insufficient signal: no bullish or bearish CCI readings")
            }
            Diagnostic::SingularCci { rows } => {
                write!(f, "{rows} row(s) without a defined CCI")
            }
            Diagnostic::ShortSeries { bars, window } => {
                write!(f, "only {bars} bar(s) for a {window}-bar window")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionConfig {
    pub trend_window: usize,
    pub portfolio_value: f64,
    pub risk_tolerance: f64,
    pub bullish_threshold: f64,
    pub bearish_threshold: f64,
    pub aux_value: f64,
    pub aux_threshold: f64,
    pub buy_min_bullish_pct: f64,
    pub sell_min_bearish_pct: f64,
    pub ma_comparison: MaComparison,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            trend_window: 6,
            portfolio_value: 10_000.0,
            risk_tolerance: 0.05,
            bullish_threshold: 0.0,
            bearish_threshold: 0.0,
            aux_value: 1.0,
            aux_threshold: 0.0,
            buy_min_bullish_pct: 50.0,
            sell_min_bearish_pct: 45.0,
            ma_comparison: MaComparison::SelfCompare,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub label: Label,
    pub position_size: f64,
    pub bullish_percentage: f64,
    pub bearish_percentage: f64,
    pub bullish_count: usize,
    pub bearish_count: usize,
    pub trend: Option<Trend>,
    pub last_moving_average: f64,
    pub last_cci: f64,
    pub week_cci_mean: Option<f64>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Decision {
    pub fn has_signal(&self) -> bool {
        !self.diagnostics.contains(&Diagnostic::InsufficientSignal)
    }
}

/// Mean of the defined CCI values in `rows`; `None` when there are none.
pub fn mean_cci(rows: &[IndicatorRow]) -> Option<f64> {
    let (sum, n) = rows
        .iter()
        .filter(|r| r.has_signal())
        .fold((0.0, 0usize), |(sum, n), r| (sum + r.cci, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn count_votes(rows: &[IndicatorRow], config: &DecisionConfig) -> (usize, usize) {
    rows.iter()
        .filter(|r| r.has_signal())
        .fold((0, 0), |(bull, bear), r| {
            if r.cci > config.bullish_threshold {
                (bull + 1, bear)
            } else if r.cci < config.bearish_threshold {
                (bull, bear + 1)
            } else {
                (bull, bear)
            }
        })
}

fn reference_moving_average(history: &IndicatorHistory, comparison: MaComparison) -> f64 {
    let rows = history.rows();
    let last = rows.len() - 1;
    match comparison {
        MaComparison::SelfCompare => rows[last].moving_average,
        MaComparison::PriorPeriod => rows[last.saturating_sub(1)].moving_average,
    }
}

pub fn decide(history: &IndicatorHistory, config: &DecisionConfig) -> Result<Decision, SignalError> {
    let last = history.last().ok_or(SignalError::InsufficientHistory)?;

    let mut diagnostics = Vec::new();
    if history.is_short() {
        diagnostics.push(Diagnostic::ShortSeries {
            bars: history.len(),
            window: history.config().window,
        });
    }
    let singular = history.singular_rows();
    if singular > 0 {
        diagnostics.push(Diagnostic::SingularCci { rows: singular });
    }

    let (bullish_count, bearish_count) = count_votes(history.rows(), config);
    let total = bullish_count + bearish_count;

    if total == 0 {
        log::warn!("insufficient historical signal for a trend prediction");
        diagnostics.push(Diagnostic::InsufficientSignal);
        return Ok(Decision {
            label: Label::Neutral,
            position_size: 0.0,
            bullish_percentage: 0.0,
            bearish_percentage: 0.0,
            bullish_count,
            bearish_count,
            trend: None,
            last_moving_average: last.moving_average,
            last_cci: last.cci,
            week_cci_mean: None,
            diagnostics,
        });
    }

    let bullish_percentage = 100.0 * bullish_count as f64 / total as f64;
    let bearish_percentage = 100.0 * bearish_count as f64 / total as f64;
    let trend = if bullish_percentage > bearish_percentage {
        Trend::Bullish
    } else if bearish_percentage > bullish_percentage {
        Trend::Bearish
    } else {
        Trend::NoClearTrend
    };

    let week_cci_mean = mean_cci(history.tail(config.trend_window));
    let week = week_cci_mean.unwrap_or(f64::NAN);
    let ma = last.moving_average;
    let reference_ma = reference_moving_average(history, config.ma_comparison);

    let buy = ma >= reference_ma
        && last.cci > 0.0
        && week > 0.0
        && config.aux_value > config.aux_threshold
        && bullish_percentage > config.buy_min_bullish_pct;

    let sell = ma < reference_ma
        && last.cci < 0.0
        && week < 0.0
        && config.aux_value < config.aux_threshold
        && bearish_percentage > config.sell_min_bearish_pct;

    let (label, position_size) = if buy {
        (Label::Buy, config.risk_tolerance * config.portfolio_value)
    } else if sell {
        (Label::Sell, config.risk_tolerance * config.portfolio_value)
    } else {
        (Label::Neutral, 0.0)
    };

    log::debug!(
        "votes: {bullish_count} bullish, {bearish_count} bearish; last MA {ma}, last CCI {}, week CCI mean {week}",
        last.cci
    );

    Ok(Decision {
        label,
        position_size,
        bullish_percentage,
        bearish_percentage,
        bullish_count,
        bearish_count,
        trend: Some(trend),
        last_moving_average: ma,
        last_cci: last.cci,
        week_cci_mean,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::{IndicatorConfig, WarmupPolicy};
    use chrono::NaiveDate;

    fn row(day: u32, moving_average: f64, cci: f64) -> IndicatorRow {
        IndicatorRow {
            date: NaiveDate::from_ymd_opt(2023, 5, day).unwrap(),
            high: 91.0,
            low: 89.0,
            close: 90.0,
            typical_price: 90.0,
            moving_average,
            std_dev: 1.0,
            upper_band: moving_average + 2.0,
            lower_band: moving_average - 2.0,
            mean_deviation: 1.0,
            cci,
        }
    }

    fn history(rows: Vec<IndicatorRow>) -> IndicatorHistory {
        let config = IndicatorConfig {
            window: 1,
            warmup: WarmupPolicy::BackFill,
        };
        IndicatorHistory::from_rows(config, rows)
    }

    fn from_ccis(ccis: &[f64]) -> IndicatorHistory {
        history(
            ccis.iter()
                .enumerate()
                .map(|(i, &c)| row(i as u32 + 1, 90.0, c))
                .collect(),
        )
    }

    #[test]
    fn empty_history_is_an_error() {
        let err = decide(&from_ccis(&[]), &DecisionConfig::default()).unwrap_err();
        assert!(matches!(err, SignalError::InsufficientHistory));
    }

    #[test]
    fn bullish_history_buys() {
        let d = decide(&from_ccis(&[-50.0, 40.0, 80.0, 120.0]), &DecisionConfig::default()).unwrap();
        assert_eq!(d.label, Label::Buy);
        assert_eq!(d.position_size, 500.0);
        assert_eq!(d.bullish_count, 3);
        assert_eq!(d.bearish_count, 1);
        assert_eq!(d.bullish_percentage, 75.0);
        assert_eq!(d.bearish_percentage, 25.0);
        assert_eq!(d.trend, Some(Trend::Bullish));
    }

    #[test]
    fn zero_cci_abstains() {
        let d = decide(&from_ccis(&[0.0, 10.0, -10.0, 0.0, 30.0]), &DecisionConfig::default()).unwrap();
        assert_eq!(d.bullish_count, 2);
        assert_eq!(d.bearish_count, 1);
    }

    #[test]
    fn all_singular_is_neutral_with_insufficient_signal() {
        let d = decide(&from_ccis(&[f64::NAN, f64::NAN, f64::NAN]), &DecisionConfig::default())
            .unwrap();
        assert_eq!(d.label, Label::Neutral);
        assert_eq!(d.position_size, 0.0);
        assert_eq!(d.bullish_percentage, 0.0);
        assert_eq!(d.trend, None);
        assert!(!d.has_signal());
        assert!(d.diagnostics.contains(&Diagnostic::InsufficientSignal));
        assert!(d.diagnostics.contains(&Diagnostic::SingularCci { rows: 3 }));
    }

    #[test]
    fn infinite_cci_does_not_vote() {
        let d = decide(&from_ccis(&[f64::INFINITY, -20.0]), &DecisionConfig::default()).unwrap();
        assert_eq!(d.bullish_count, 0);
        assert_eq!(d.bearish_count, 1);
    }

    #[test]
    fn bearish_history_never_sells_with_default_aux() {
        let d = decide(&from_ccis(&[-10.0, -20.0, -30.0, -40.0]), &DecisionConfig::default()).unwrap();
        assert_eq!(d.trend, Some(Trend::Bearish));
        assert_eq!(d.bearish_percentage, 100.0);
        assert_eq!(d.label, Label::Neutral);
        assert_eq!(d.position_size, 0.0);
    }

    #[test]
    fn sell_reachable_with_prior_period_and_inverted_aux() {
        let rows = vec![row(1, 92.0, -10.0), row(2, 91.0, -20.0), row(3, 90.0, -30.0)];
        let config = DecisionConfig {
            ma_comparison: MaComparison::PriorPeriod,
            aux_value: -1.0,
            ..DecisionConfig::default()
        };
        let d = decide(&history(rows), &config).unwrap();
        assert_eq!(d.label, Label::Sell);
        assert_eq!(d.position_size, 500.0);
    }

    #[test]
    fn self_compare_blocks_sell_even_with_inverted_aux() {
        let rows = vec![row(1, 92.0, -10.0), row(2, 91.0, -20.0), row(3, 90.0, -30.0)];
        let config = DecisionConfig {
            aux_value: -1.0,
            ..DecisionConfig::default()
        };
        let d = decide(&history(rows), &config).unwrap();
        assert_eq!(d.label, Label::Neutral);
    }

    #[test]
    fn prior_period_blocks_buy_on_falling_average() {
        let rows = vec![row(1, 92.0, 10.0), row(2, 91.0, 20.0), row(3, 90.0, 30.0)];
        let config = DecisionConfig {
            ma_comparison: MaComparison::PriorPeriod,
            ..DecisionConfig::default()
        };
        assert_eq!(decide(&history(rows.clone()), &config).unwrap().label, Label::Neutral);
        assert_eq!(
            decide(&history(rows), &DecisionConfig::default()).unwrap().label,
            Label::Buy
        );
    }

    #[test]
    fn aux_condition_can_block_buy() {
        let config = DecisionConfig {
            aux_value: 0.0,
            ..DecisionConfig::default()
        };
        let d = decide(&from_ccis(&[10.0, 20.0, 30.0]), &config).unwrap();
        assert_eq!(d.label, Label::Neutral);
    }

    #[test]
    fn negative_week_mean_blocks_buy() {
        // last cci positive, but trailing six average below zero
        let d = decide(
            &from_ccis(&[
                50.0, 50.0, 50.0, 50.0, 50.0, 50.0, -100.0, -100.0, -100.0, -100.0, -100.0, 10.0,
            ]),
            &DecisionConfig::default(),
        )
        .unwrap();
        assert!(d.bullish_percentage > 50.0);
        assert!(d.week_cci_mean.unwrap() < 0.0);
        assert_eq!(d.label, Label::Neutral);
    }

    #[test]
    fn week_mean_uses_trailing_window() {
        let config = DecisionConfig {
            trend_window: 3,
            ..DecisionConfig::default()
        };
        let d = decide(&from_ccis(&[-600.0, 10.0, 20.0, 30.0]), &config).unwrap();
        assert_eq!(d.week_cci_mean, Some(20.0));
    }

    #[test]
    fn week_mean_skips_undefined_rows() {
        assert_eq!(mean_cci(from_ccis(&[f64::NAN, 10.0, 30.0]).rows()), Some(20.0));
        assert_eq!(mean_cci(from_ccis(&[f64::NAN]).rows()), None);
    }

    #[test]
    fn bullish_share_must_exceed_threshold() {
        let d = decide(&from_ccis(&[-10.0, 10.0]), &DecisionConfig::default()).unwrap();
        assert_eq!(d.bullish_percentage, 50.0);
        assert_eq!(d.trend, Some(Trend::NoClearTrend));
        assert_eq!(d.label, Label::Neutral);
    }

    #[test]
    fn custom_thresholds_change_votes() {
        let config = DecisionConfig {
            bullish_threshold: 100.0,
            bearish_threshold: -100.0,
            ..DecisionConfig::default()
        };
        let d = decide(&from_ccis(&[150.0, 50.0, -50.0, -150.0]), &config).unwrap();
        assert_eq!(d.bullish_count, 1);
        assert_eq!(d.bearish_count, 1);
    }

    #[test]
    fn position_size_follows_risk_and_portfolio() {
        let config = DecisionConfig {
            portfolio_value: 25_000.0,
            risk_tolerance: 0.02,
            ..DecisionConfig::default()
        };
        let d = decide(&from_ccis(&[10.0, 20.0]), &config).unwrap();
        assert_eq!(d.label, Label::Buy);
        assert_eq!(d.position_size, 500.0);
    }

    #[test]
    fn parse_ma_comparison() {
        assert_eq!("self".parse::<MaComparison>().unwrap(), MaComparison::SelfCompare);
        assert_eq!("Prior".parse::<MaComparison>().unwrap(), MaComparison::PriorPeriod);
        assert!("next".parse::<MaComparison>().is_err());
        assert_eq!(MaComparison::PriorPeriod.to_string(), "prior");
    }

    #[test]
    fn label_display() {
        assert_eq!(Label::Buy.to_string(), "BUY");
        assert_eq!(Label::Sell.to_string(), "SELL");
        assert_eq!(Label::Neutral.to_string(), "NEUTRAL");
    }
}
