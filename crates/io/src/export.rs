//! CSV writers for estimates and run reports.

use std::io::Write;

use factorbeta_primitives::{BetaEstimate, Date};
use serde::{Deserialize, Serialize};

use crate::IoError;

/// Flat, persisted shape of a [`BetaEstimate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateRecord {
    /// As-of date.
    pub asof_date: Date,
    /// Configured trailing window.
    pub window_days: usize,
    /// Security code.
    pub security_code: String,
    /// Factor code.
    pub factor_code: String,
    /// `OLS_SINGLE` or `OLS_MULTI`.
    pub method: String,
    /// Slope, empty when not finite.
    pub beta: Option<f64>,
    /// Intercept.
    pub alpha: Option<f64>,
    /// Coefficient of determination.
    pub r_squared: Option<f64>,
    /// Sample size.
    pub n_obs: usize,
    /// Price interval label.
    pub price_interval: String,
    /// Lookback window label.
    pub lookback_window: String,
    /// Price-source symbol.
    pub price_source: String,
}

impl From<&BetaEstimate> for EstimateRecord {
    fn from(estimate: &BetaEstimate) -> Self {
        Self {
            asof_date: estimate.asof_date,
            window_days: estimate.window_days,
            security_code: estimate.security_code.to_string(),
            factor_code: estimate.factor_code.to_string(),
            method: estimate.method.as_str().to_string(),
            beta: estimate.beta,
            alpha: estimate.alpha,
            r_squared: estimate.r_squared,
            n_obs: estimate.n_obs,
            price_interval: estimate.provenance.price_interval.clone(),
            lookback_window: estimate.provenance.lookback_window.clone(),
            price_source: estimate.provenance.price_source.clone(),
        }
    }
}

/// Write `rows` as CSV with a header line.
///
/// # Errors
/// Returns an error if a row can't be serialized or written.
pub fn write_csv<T: Serialize, W: Write>(writer: W, rows: &[T]) -> Result<(), IoError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write estimates in their flat record shape.
///
/// # Errors
/// Returns an error if a row can't be written.
pub fn write_estimates<W: Write>(writer: W, estimates: &[BetaEstimate]) -> Result<(), IoError> {
    let records: Vec<EstimateRecord> = estimates.iter().map(EstimateRecord::from).collect();
    write_csv(writer, &records)
}
