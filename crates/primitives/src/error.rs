//! Error types for primitive validation.

use crate::Date;

/// Errors raised when a series violates its invariants.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeriesError {
    /// Dates and values differ in length.
    #[error("length mismatch: {dates} dates, {values} values")]
    LengthMismatch {
        /// Number of dates.
        dates: usize,
        /// Number of values.
        values: usize,
    },

    /// Dates are not strictly increasing.
    #[error("dates not strictly increasing at {0}")]
    NotIncreasing(Date),

    /// A value is NaN or infinite.
    #[error("non-finite value at {0}")]
    NonFinite(Date),
}

/// Errors raised while interpreting factor metadata.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    /// Transform rule name is not known.
    #[error("unsupported transform: {0}")]
    UnsupportedTransform(String),

    /// Frequency code is not known.
    #[error("unsupported frequency: {0}")]
    UnsupportedFrequency(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SeriesError::LengthMismatch { dates: 3, values: 2 };
        assert_eq!(err.to_string(), "length mismatch: 3 dates, 2 values");

        let err = DefinitionError::UnsupportedTransform("pct".to_string());
        assert_eq!(err.to_string(), "unsupported transform: pct");
    }
}
