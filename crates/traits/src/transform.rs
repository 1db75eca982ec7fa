//! Return transformation trait definitions.

use factorbeta_primitives::{DefinitionError, LevelSeries, ReturnSeries, TransformRule};

/// Errors raised when a factor's transform configuration can't be honoured.
///
/// Transforms themselves never fail; these come from metadata.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// Transform rule is not supported.
    #[error("unsupported transform: {0}")]
    UnsupportedTransform(String),

    /// Frequency is not supported.
    #[error("unsupported frequency: {0}")]
    UnsupportedFrequency(String),
}

impl From<DefinitionError> for TransformError {
    fn from(err: DefinitionError) -> Self {
        match err {
            DefinitionError::UnsupportedTransform(s) => Self::UnsupportedTransform(s),
            DefinitionError::UnsupportedFrequency(s) => Self::UnsupportedFrequency(s),
        }
    }
}

impl TransformError {
    /// Short reason recorded when a factor is excluded, e.g.
    /// `unsupported_transform(yoy)`.
    #[must_use]
    pub fn exclusion_reason(&self) -> String {
        match self {
            Self::UnsupportedTransform(rule) => format!("unsupported_transform({rule})"),
            Self::UnsupportedFrequency(freq) => format!("unsupported_frequency({freq})"),
        }
    }
}

/// Level-to-return transformation.
///
/// Implementations are total over their domain: rows outside the domain are
/// dropped, never reported as errors, so the output has at most `n - 1`
/// observations for an input of `n`.
pub trait ReturnTransform: Send + Sync {
    /// Transform a level series into a return series.
    fn apply(&self, levels: &LevelSeries) -> ReturnSeries;

    /// The rule this transform implements.
    fn rule(&self) -> TransformRule;

    /// Returns the name of this transformation.
    fn name(&self) -> &str {
        self.rule().name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_error_display() {
        let err = TransformError::UnsupportedTransform("pct".to_string());
        assert_eq!(err.to_string(), "unsupported transform: pct");
        assert_eq!(err.exclusion_reason(), "unsupported_transform(pct)");

        let err = TransformError::UnsupportedFrequency("W".to_string());
        assert_eq!(err.exclusion_reason(), "unsupported_frequency(W)");
    }

    #[test]
    fn definition_error_converts() {
        let err: TransformError = DefinitionError::UnsupportedFrequency("W".to_string()).into();
        assert!(matches!(err, TransformError::UnsupportedFrequency(ref s) if s == "W"));
    }
}
