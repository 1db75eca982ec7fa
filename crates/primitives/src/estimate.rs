//! Beta estimate type definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Date, FactorCode, SecurityCode};

/// Regression specification that produced an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Method {
    /// `y = alpha + beta * x` against one factor.
    #[serde(rename = "OLS_SINGLE")]
    Single,
    /// Joint regression against every eligible factor.
    #[serde(rename = "OLS_MULTI")]
    Multi,
}

impl Method {
    /// Persisted method label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "OLS_SINGLE",
            Self::Multi => "OLS_MULTI",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the security prices behind an estimate came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Provenance {
    /// Sampling interval of the price series, e.g. `1d`.
    pub price_interval: String,
    /// Lookback label of the price request, e.g. `2y`.
    pub lookback_window: String,
    /// Identifier actually used at the price source.
    pub price_source: String,
}

/// Conflict key of a persisted estimate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EstimateKey {
    /// As-of date.
    pub asof_date: Date,
    /// Configured trailing window.
    pub window_days: usize,
    /// Security code.
    pub security_code: SecurityCode,
    /// Factor code.
    pub factor_code: FactorCode,
    /// Regression method.
    pub method: Method,
    /// Price interval label.
    pub price_interval: String,
    /// Lookback window label.
    pub lookback_window: String,
}

/// One coefficient of one regression for one security.
///
/// `beta`, `alpha` and `r_squared` are `None` when the fitted value was not
/// finite or, for R², when the dependent variable had no variance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetaEstimate {
    /// Last date of the regression sample.
    pub asof_date: Date,
    /// Configured trailing window.
    pub window_days: usize,
    /// Security code.
    pub security_code: SecurityCode,
    /// Factor code.
    pub factor_code: FactorCode,
    /// Regression method.
    pub method: Method,
    /// Slope coefficient.
    pub beta: Option<f64>,
    /// Intercept.
    pub alpha: Option<f64>,
    /// Coefficient of determination.
    pub r_squared: Option<f64>,
    /// Observations in the regression sample.
    pub n_obs: usize,
    /// Price provenance.
    pub provenance: Provenance,
}

impl BetaEstimate {
    /// Conflict key used for upserts.
    #[must_use]
    pub fn key(&self) -> EstimateKey {
        EstimateKey {
            asof_date: self.asof_date,
            window_days: self.window_days,
            security_code: self.security_code.clone(),
            factor_code: self.factor_code.clone(),
            method: self.method,
            price_interval: self.provenance.price_interval.clone(),
            lookback_window: self.provenance.lookback_window.clone(),
        }
    }
}
