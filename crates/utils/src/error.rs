//! Error types for series preparation.

use factorbeta_primitives::{Date, SeriesError};
use factorbeta_traits::{CollaboratorError, TransformError};

/// Errors that can occur while preparing series and the factor matrix.
#[derive(Debug, thiserror::Error)]
pub enum UtilsError {
    /// Polars error.
    #[error("polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Invalid parameter.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Missing column.
    #[error("missing column: {0}")]
    MissingColumn(String),

    /// Too few usable observations.
    #[error("insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations.
        required: usize,
        /// Actual number of observations.
        actual: usize,
    },

    /// Two observations share a date but disagree on the value.
    #[error("conflicting duplicate on {date}: {kept} vs {discarded}")]
    ConflictingDuplicate {
        /// Duplicated date.
        date: Date,
        /// Value that would be kept.
        kept: f64,
        /// Value that would be discarded.
        discarded: f64,
    },

    /// Collaborator error.
    #[error("collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// Transform error.
    #[error("transform error: {0}")]
    Transform(#[from] TransformError),

    /// Series invariant violated.
    #[error("series error: {0}")]
    Series(#[from] SeriesError),
}

impl UtilsError {
    /// Returns whether the error is confined to the series being prepared.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientData { .. }
                | Self::ConflictingDuplicate { .. }
                | Self::Collaborator(_)
                | Self::Series(_)
        )
    }
}
