//! Ordinary least squares beta estimator.

use factorbeta_math::{MathError, ols};
use factorbeta_traits::{BetaEstimator, EstimatorError, LinearFit};
use ndarray::{Array1, Array2};

use crate::MIN_NOBS;

/// Configuration for the OLS estimator.
#[derive(Debug, Clone)]
pub struct OlsConfig {
    /// Minimum observations for a fit.
    pub min_nobs: usize,
}

impl Default for OlsConfig {
    fn default() -> Self {
        Self { min_nobs: MIN_NOBS }
    }
}

/// Fits `y = alpha + X beta` with an intercept by pivoted QR.
#[derive(Debug, Clone)]
pub struct OlsEstimator {
    config: OlsConfig,
}

impl OlsEstimator {
    /// Create a new OLS estimator with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(OlsConfig::default())
    }

    /// Get the minimum sample size.
    #[must_use]
    pub const fn min_nobs(&self) -> usize {
        self.config.min_nobs
    }
}

impl Default for OlsEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl BetaEstimator for OlsEstimator {
    type Config = OlsConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn fit(&self, y: &Array1<f64>, x: &Array2<f64>) -> Result<LinearFit, EstimatorError> {
        let n = y.len();
        if x.nrows() != n {
            return Err(EstimatorError::DimensionMismatch {
                expected: n,
                actual: x.nrows(),
                context: "factor returns".to_string(),
            });
        }
        if n < self.config.min_nobs {
            return Err(EstimatorError::InsufficientData { required: self.config.min_nobs, actual: n });
        }

        let result = ols(y, x).map_err(from_math)?;

        Ok(LinearFit {
            alpha: finite(result.intercept),
            betas: result.slopes.iter().copied().map(finite).collect(),
            r_squared: result.r_squared.and_then(finite),
            n_obs: result.n_obs,
        })
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn from_math(err: MathError) -> EstimatorError {
    match err {
        MathError::DimensionMismatch { expected, actual } => EstimatorError::DimensionMismatch {
            expected,
            actual,
            context: "design matrix".to_string(),
        },
        MathError::InsufficientData { required, actual } => {
            EstimatorError::InsufficientData { required, actual }
        }
        MathError::EmptyData => EstimatorError::InsufficientData { required: 1, actual: 0 },
        MathError::RankDeficient { rank, columns } => {
            EstimatorError::RankDeficient { rank, columns }
        }
    }
}
