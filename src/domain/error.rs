//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for fxsignal.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("insufficient history: no bars to analyse")]
    InsufficientHistory,

    #[error("invalid bar on {date}: {reason}")]
    InvalidBar { date: NaiveDate, reason: String },

    #[error("series is not strictly increasing by date at {date}")]
    UnorderedSeries { date: NaiveDate },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SignalError> for std::process::ExitCode {
    fn from(err: &SignalError) -> Self {
        let code: u8 = match err {
            SignalError::Io(_) => 1,
            SignalError::ConfigParse { .. }
            | SignalError::ConfigMissing { .. }
            | SignalError::ConfigInvalid { .. } => 2,
            SignalError::DataSource { .. } => 3,
            SignalError::InsufficientHistory
            | SignalError::InvalidBar { .. }
            | SignalError::UnorderedSeries { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::ExitCode;

    #[test]
    fn display_config_invalid() {
        let err = SignalError::ConfigInvalid {
            section: "indicators".into(),
            key: "window".into(),
            reason: "window must be at least 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value [indicators] window: window must be at least 1"
        );
    }

    #[test]
    fn display_invalid_bar_includes_date() {
        let err = SignalError::InvalidBar {
            date: NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(),
            reason: "high below low".into(),
        };
        assert_eq!(err.to_string(), "invalid bar on 2023-03-01: high below low");
    }

    fn code(err: &SignalError) -> String {
        format!("{:?}", ExitCode::from(err))
    }

    #[test]
    fn exit_codes_by_category() {
        let five = format!("{:?}", ExitCode::from(5));
        assert_eq!(code(&SignalError::InsufficientHistory), five);
        assert_eq!(
            code(&SignalError::DataSource { reason: "x".into() }),
            format!("{:?}", ExitCode::from(3))
        );
        assert_eq!(
            code(&SignalError::ConfigMissing {
                section: "data".into(),
                key: "instrument".into()
            }),
            format!("{:?}", ExitCode::from(2))
        );
        let io = std::io::Error::other("boom");
        assert_eq!(code(&SignalError::Io(io)), format!("{:?}", ExitCode::from(1)));
    }
}
