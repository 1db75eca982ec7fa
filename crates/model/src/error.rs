//! Error types for beta estimation runs.

use factorbeta_traits::{CollaboratorError, EstimatorError};
use factorbeta_utils::UtilsError;

/// Errors that can occur during beta estimation and batch runs.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Estimator error.
    #[error("estimator error: {0}")]
    Estimator(#[from] EstimatorError),

    /// Series or matrix preparation error.
    #[error("preparation error: {0}")]
    Utils(#[from] UtilsError),

    /// Polars error.
    #[error("data processing error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Collaborator error.
    #[error("collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Factor metadata is empty.
    #[error("no factor definitions")]
    NoFactorDefinitions,

    /// No security had a single eligible factor.
    #[error("no eligible factors for any of {securities} securities")]
    NoEligibleFactors {
        /// Securities that reached the factor stage.
        securities: usize,
    },

    /// A chunk could not be persisted after retries.
    #[error("failed to persist chunk {chunk}: {source}")]
    Persistence {
        /// Zero-based chunk index.
        chunk: usize,
        /// Last collaborator error.
        source: CollaboratorError,
    },
}

impl ModelError {
    /// Returns whether this error is recoverable.
    ///
    /// Recoverable errors affect one security or one factor; the others abort
    /// the run.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Estimator(e) => e.is_recoverable(),
            Self::Utils(e) => e.is_recoverable(),
            Self::Collaborator(e) => e.is_recoverable(),
            _ => false,
        }
    }
}
