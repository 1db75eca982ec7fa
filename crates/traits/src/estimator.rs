//! Beta estimation trait definitions.

use ndarray::{Array1, Array2};

/// Errors that can occur during estimation.
#[derive(Debug, thiserror::Error)]
pub enum EstimatorError {
    /// Dimension mismatch in input data.
    #[error("dimension mismatch for {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
        /// Context description.
        context: String,
    },

    /// Insufficient data for estimation.
    #[error("insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations.
        required: usize,
        /// Actual number of observations.
        actual: usize,
    },

    /// Rank deficiency in design matrix.
    #[error("rank deficient design matrix: rank {rank} < columns {columns}")]
    RankDeficient {
        /// Actual rank.
        rank: usize,
        /// Number of columns.
        columns: usize,
    },
}

impl EstimatorError {
    /// Returns whether this error is recoverable.
    ///
    /// Recoverable errors concern one security or one regression and leave the
    /// rest of a batch untouched.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::InsufficientData { .. } | Self::RankDeficient { .. })
    }

    /// Whether the error came from the solver rather than from the sample.
    #[must_use]
    pub const fn is_solver_failure(&self) -> bool {
        matches!(self, Self::RankDeficient { .. })
    }
}

/// Coefficients of a linear fit with intercept.
///
/// Every coefficient is checked for finiteness on its own; a non-finite value
/// is reported as `None` without discarding the others.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    /// Intercept.
    pub alpha: Option<f64>,
    /// Slopes, one per regressor column in input order.
    pub betas: Vec<Option<f64>>,
    /// Coefficient of determination, `None` when the response is constant.
    pub r_squared: Option<f64>,
    /// Observations used.
    pub n_obs: usize,
}

impl LinearFit {
    /// Slope of the first regressor.
    #[must_use]
    pub fn beta(&self) -> Option<f64> {
        self.betas.first().copied().flatten()
    }
}

/// Trait for estimating factor sensitivities from a regression sample.
pub trait BetaEstimator: Send + Sync {
    /// Configuration type for this estimator.
    type Config: Default + Clone + Send + Sync;

    /// Create a new estimator with the given configuration.
    fn with_config(config: Self::Config) -> Self;

    /// Fit `y = alpha + x * betas`.
    ///
    /// # Arguments
    /// * `y` - Security returns (n_obs,)
    /// * `x` - Factor returns (n_obs x n_factors), without an intercept column
    ///
    /// # Errors
    /// Returns `EstimatorError` if dimensions mismatch, the sample is too
    /// small, or the design matrix is singular.
    fn fit(&self, y: &Array1<f64>, x: &Array2<f64>) -> Result<LinearFit, EstimatorError>;
}
