//! Pipeline error types.

use ratebridge_common::Currency;
use rust_decimal::Decimal;
use thiserror::Error;

/// Which side of a quote diverged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteSide {
    Sell,
    Buy,
}

impl std::fmt::Display for QuoteSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuoteSide::Sell => f.write_str("selling"),
            QuoteSide::Buy => f.write_str("buying"),
        }
    }
}

/// Errors that can occur while deriving or publishing the rate table.
#[derive(Debug, Error)]
pub enum FxError {
    /// A source table could not be retrieved.
    #[error("Failed to fetch source {source_name}: {reason}")]
    SourceFetch { source_name: String, reason: String },

    /// A source yielded no usable quote after parsing.
    #[error("Source {0} returned no usable quotes")]
    EmptySource(String),

    /// Primary and secondary sources disagree by more than the tolerance.
    #[error(
        "{currency} {side} price diverges {diff_pct}% between {primary} and {secondary} (tolerance {tolerance_pct}%)"
    )]
    ToleranceExceeded {
        currency: Currency,
        side: QuoteSide,
        primary: String,
        secondary: String,
        diff_pct: Decimal,
        tolerance_pct: Decimal,
    },

    /// Another pipeline instance holds the run lock.
    #[error("Run lock already held: {0}")]
    RunLockHeld(String),

    /// Configuration is missing or inconsistent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A sink failed to persist a record or could not be opened.
    #[error("Sink error: {0}")]
    Sink(String),

    /// The report could not be rendered or delivered.
    #[error("Report error: {0}")]
    Report(String),
}

impl FxError {
    /// Fatal errors abort the run before any output is produced. Sink and
    /// report failures happen while publishing and are not.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FxError::Sink(_) | FxError::Report(_))
    }

    /// Stable code for logs and exit diagnostics.
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::SourceFetch { .. } => "SOURCE_FETCH",
            FxError::EmptySource(_) => "EMPTY_SOURCE",
            FxError::ToleranceExceeded { .. } => "TOLERANCE_EXCEEDED",
            FxError::RunLockHeld(_) => "RUN_LOCK_HELD",
            FxError::Configuration(_) => "CONFIGURATION_ERROR",
            FxError::Sink(_) => "SINK_ERROR",
            FxError::Report(_) => "REPORT_ERROR",
        }
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_tolerance_message() {
        let err = FxError::ToleranceExceeded {
            currency: Currency::usd(),
            side: QuoteSide::Sell,
            primary: "HB".to_string(),
            secondary: "BOC".to_string(),
            diff_pct: dec!(5.45),
            tolerance_pct: dec!(5),
        };
        assert_eq!(
            err.to_string(),
            "USD selling price diverges 5.45% between HB and BOC (tolerance 5%)"
        );
        assert_eq!(err.error_code(), "TOLERANCE_EXCEEDED");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_sink_errors_are_not_fatal() {
        assert!(!FxError::Sink("disk full".to_string()).is_fatal());
        assert!(!FxError::Report("closed pipe".to_string()).is_fatal());
        assert!(FxError::EmptySource("HB".to_string()).is_fatal());
    }
}
