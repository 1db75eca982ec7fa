//! Overlap-aware regression engine.
//!
//! The security's returns are inner-joined against the whole factor matrix on
//! date. Rows are never dropped for the benefit of one factor at the expense of
//! another: each single-factor regression only drops rows missing its own
//! factor, and the multi-factor regression only considers factors that cleared
//! the overlap threshold on their own.

use factorbeta_primitives::{
    BetaEstimate, Date, FactorCode, Method, Provenance, ReturnSeries, SecurityCode,
};
use factorbeta_traits::{BetaEstimator, EstimatorError, LinearFit};
use factorbeta_utils::{DATE_COLUMN, FactorMatrix, date_values, f64_values, series_frame};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use tracing::{debug, warn};

use crate::{EngineConfig, ModelError, OlsConfig, OlsEstimator};

/// Column holding the security's returns in the regression sample.
const RETURN_COLUMN: &str = "security_return";

/// Fit of the security against one factor.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleFactorFit {
    /// Factor code.
    pub factor_code: FactorCode,
    /// Slope.
    pub beta: Option<f64>,
    /// Intercept.
    pub alpha: Option<f64>,
    /// Coefficient of determination.
    pub r_squared: Option<f64>,
    /// Observations in the truncated sample.
    pub n_obs: usize,
    /// Last date of the truncated sample.
    pub asof_date: Date,
}

/// Joint fit of the security against every eligible factor.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiFactorFit {
    /// Factor codes, in the order of `betas`.
    pub factor_codes: Vec<FactorCode>,
    /// One slope per factor.
    pub betas: Vec<Option<f64>>,
    /// Intercept.
    pub alpha: Option<f64>,
    /// Coefficient of determination.
    pub r_squared: Option<f64>,
    /// Observations in the truncated sample.
    pub n_obs: usize,
    /// Last date of the truncated sample.
    pub asof_date: Date,
}

/// What happened to the multi-factor regression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiOutcome {
    /// A fit was produced.
    Fitted,
    /// Too few rows had every eligible factor present.
    Degenerate {
        /// Rows in the truncated sample.
        n_obs: usize,
    },
    /// The solver rejected the sample.
    Failed {
        /// Error text.
        reason: String,
    },
    /// No factor cleared the overlap threshold.
    NoEligibleFactors,
}

/// Overlap of one factor with the security's returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorOverlap {
    /// Factor code.
    pub code: FactorCode,
    /// Dates on which both have a value.
    pub overlap: usize,
}

/// A regression that was attempted and failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorFailure {
    /// Factor code.
    pub code: FactorCode,
    /// Error text.
    pub reason: String,
}

/// Per-security account of what was estimated and what was left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    /// Overlap per candidate factor present in the matrix, in candidate order.
    pub overlaps: Vec<FactorOverlap>,
    /// Factors with overlap of at least the minimum.
    pub eligible: Vec<FactorCode>,
    /// Factors below the minimum overlap.
    pub skipped: Vec<FactorOverlap>,
    /// Candidate factors the matrix has no column for.
    pub missing: Vec<FactorCode>,
    /// Eligible factors whose single fit failed.
    pub failed: Vec<FactorFailure>,
    /// Multi-factor outcome.
    pub multi: MultiOutcome,
}

/// Everything estimated for one security.
#[derive(Debug, Clone, PartialEq)]
pub struct BetaEstimation {
    /// Single-factor fits, in candidate order.
    pub single: Vec<SingleFactorFit>,
    /// Multi-factor fit, if one was produced.
    pub multi: Option<MultiFactorFit>,
    /// Diagnostics.
    pub diagnostics: Diagnostics,
}

impl BetaEstimation {
    /// Whether no regression produced a fit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.single.is_empty() && self.multi.is_none()
    }

    /// Persistable estimates, single fits first.
    #[must_use]
    pub fn to_estimates(
        &self,
        security_code: &SecurityCode,
        window_days: usize,
        provenance: &Provenance,
    ) -> Vec<BetaEstimate> {
        let single = self.single.iter().map(|fit| BetaEstimate {
            asof_date: fit.asof_date,
            window_days,
            security_code: security_code.clone(),
            factor_code: fit.factor_code.clone(),
            method: Method::Single,
            beta: fit.beta,
            alpha: fit.alpha,
            r_squared: fit.r_squared,
            n_obs: fit.n_obs,
            provenance: provenance.clone(),
        });
        let multi = self.multi.iter().flat_map(|fit| {
            fit.factor_codes.iter().zip(&fit.betas).map(|(code, beta)| BetaEstimate {
                asof_date: fit.asof_date,
                window_days,
                security_code: security_code.clone(),
                factor_code: code.clone(),
                method: Method::Multi,
                beta: *beta,
                alpha: fit.alpha,
                r_squared: fit.r_squared,
                n_obs: fit.n_obs,
                provenance: provenance.clone(),
            })
        });
        single.chain(multi).collect()
    }
}

/// Rows of the joined table with the response and every requested factor
/// present, truncated to the trailing window.
struct Sample {
    dates: Vec<Date>,
    y: Array1<f64>,
    x: Array2<f64>,
}

impl Sample {
    fn n_obs(&self) -> usize {
        self.y.len()
    }

    fn asof_date(&self) -> Option<Date> {
        self.dates.last().copied()
    }
}

/// Runs the single- and multi-factor passes for one security at a time.
#[derive(Debug, Clone)]
pub struct BetaEngine<E = OlsEstimator> {
    estimator: E,
    config: EngineConfig,
}

impl BetaEngine<OlsEstimator> {
    /// Create an engine backed by OLS.
    ///
    /// `min_nobs` gates eligibility and the multi-factor sample; an eligible
    /// factor is fitted on whatever its truncated sample holds.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let estimator = OlsEstimator::with_config(OlsConfig { min_nobs: 2 });
        Self { estimator, config }
    }
}

impl Default for BetaEngine<OlsEstimator> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<E: BetaEstimator> BetaEngine<E> {
    /// Create an engine with a custom estimator.
    #[must_use]
    pub const fn with_estimator(estimator: E, config: EngineConfig) -> Self {
        Self { estimator, config }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Estimate the security's betas against `factor_codes`.
    ///
    /// # Errors
    /// Returns an error only when the regression sample can't be assembled.
    /// Failed fits are recorded in the diagnostics.
    pub fn estimate(
        &self,
        security_returns: &ReturnSeries,
        matrix: &FactorMatrix,
        factor_codes: &[FactorCode],
    ) -> Result<BetaEstimation, ModelError> {
        let min_nobs = self.config.min_nobs;
        let window = self.config.window_days;

        let mut present: Vec<FactorCode> = Vec::new();
        let mut missing = Vec::new();
        for code in factor_codes {
            if code.as_str() == RETURN_COLUMN {
                return Err(ModelError::InvalidConfig(format!("reserved factor code {code}")));
            }
            if present.contains(code) || missing.contains(code) {
                continue;
            }
            if matrix.contains(code) {
                present.push(code.clone());
            } else {
                missing.push(code.clone());
            }
        }

        let joined = join_security(security_returns, matrix, &present)?;

        let mut overlaps = Vec::with_capacity(present.len());
        let mut eligible = Vec::new();
        let mut skipped = Vec::new();
        for code in &present {
            let overlap = joined.height() - joined.column(code.as_str())?.null_count();
            debug!(factor = %code, overlap, "factor overlap");
            let entry = FactorOverlap { code: code.clone(), overlap };
            if overlap >= min_nobs {
                eligible.push(code.clone());
            } else {
                skipped.push(entry.clone());
            }
            overlaps.push(entry);
        }

        let mut single = Vec::with_capacity(eligible.len());
        let mut failed = Vec::new();
        for code in &eligible {
            let sample = sample(&joined, std::slice::from_ref(code), window)?;
            match self.fit(&sample) {
                Ok((fit, asof_date)) => single.push(SingleFactorFit {
                    factor_code: code.clone(),
                    beta: fit.beta(),
                    alpha: fit.alpha,
                    r_squared: fit.r_squared,
                    n_obs: fit.n_obs,
                    asof_date,
                }),
                Err(err) => {
                    if err.is_solver_failure() {
                        warn!(factor = %code, error = %err, "single fit rejected by solver");
                    } else {
                        debug!(factor = %code, error = %err, "single fit failed");
                    }
                    failed.push(FactorFailure { code: code.clone(), reason: err.to_string() });
                }
            }
        }

        let (multi, multi_outcome) = if eligible.is_empty() {
            (None, MultiOutcome::NoEligibleFactors)
        } else {
            let sample = sample(&joined, &eligible, window)?;
            if sample.n_obs() < min_nobs {
                (None, MultiOutcome::Degenerate { n_obs: sample.n_obs() })
            } else {
                match self.fit(&sample) {
                    Ok((fit, asof_date)) => (
                        Some(MultiFactorFit {
                            factor_codes: eligible.clone(),
                            betas: fit.betas,
                            alpha: fit.alpha,
                            r_squared: fit.r_squared,
                            n_obs: fit.n_obs,
                            asof_date,
                        }),
                        MultiOutcome::Fitted,
                    ),
                    Err(err) => {
                        if err.is_solver_failure() {
                            warn!(factors = eligible.len(), error = %err, "multi fit rejected by solver");
                        }
                        (None, MultiOutcome::Failed { reason: err.to_string() })
                    }
                }
            }
        };

        Ok(BetaEstimation {
            single,
            multi,
            diagnostics: Diagnostics {
                overlaps,
                eligible,
                skipped,
                missing,
                failed,
                multi: multi_outcome,
            },
        })
    }

    fn fit(&self, sample: &Sample) -> Result<(LinearFit, Date), EstimatorError> {
        let asof_date = sample
            .asof_date()
            .ok_or(EstimatorError::InsufficientData { required: 1, actual: 0 })?;
        Ok((self.estimator.fit(&sample.y, &sample.x)?, asof_date))
    }
}

/// Estimate betas of one security with OLS.
///
/// # Errors
/// Returns an error only when the regression sample can't be assembled.
pub fn estimate_betas(
    security_returns: &ReturnSeries,
    matrix: &FactorMatrix,
    factor_codes: &[FactorCode],
    window_days: usize,
    min_nobs: usize,
) -> Result<BetaEstimation, ModelError> {
    let config = EngineConfig { window_days, min_nobs, ..EngineConfig::default() };
    BetaEngine::new(config).estimate(security_returns, matrix, factor_codes)
}

fn join_security(
    security_returns: &ReturnSeries,
    matrix: &FactorMatrix,
    factors: &[FactorCode],
) -> Result<DataFrame, ModelError> {
    let security = series_frame(RETURN_COLUMN, security_returns)?;

    let mut columns = vec![col(DATE_COLUMN), col(RETURN_COLUMN)];
    columns.extend(factors.iter().map(|c| col(c.as_str())));

    Ok(security
        .lazy()
        .join(
            matrix.frame().clone().lazy(),
            [col(DATE_COLUMN)],
            [col(DATE_COLUMN)],
            JoinArgs::new(JoinType::Inner),
        )
        .select(columns)
        .sort([DATE_COLUMN], SortMultipleOptions::default())
        .collect()?)
}

fn sample(joined: &DataFrame, factors: &[FactorCode], window: usize) -> Result<Sample, ModelError> {
    let predicate = factors
        .iter()
        .fold(col(RETURN_COLUMN).is_not_null(), |acc, c| acc.and(col(c.as_str()).is_not_null()));
    let mut frame = joined.clone().lazy().filter(predicate).collect()?;
    if frame.height() > window {
        frame = frame.tail(Some(window));
    }

    let dates = date_values(frame.column(DATE_COLUMN)?)?.into_iter().flatten().collect();
    let y: Array1<f64> = f64_values(&frame, RETURN_COLUMN)?.into_iter().flatten().collect();

    let n = frame.height();
    let mut x = Array2::zeros((n, factors.len()));
    for (j, code) in factors.iter().enumerate() {
        for (i, value) in f64_values(&frame, code.as_str())?.into_iter().enumerate() {
            x[[i, j]] = value.unwrap_or(f64::NAN);
        }
    }

    Ok(Sample { dates, y, x })
}
