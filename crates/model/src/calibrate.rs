//! Best-lag calibration against a reference security.

use std::collections::HashMap;

use factorbeta_primitives::{Date, FactorCode, FactorDefinition, ReturnSeries, Security, SecurityCode};
use factorbeta_traits::{FactorObservationSource, LagPolicySink, SecurityReturnSource};
use factorbeta_utils::{FactorMatrix, FactorMatrixBuilder, align_lag};
use tracing::{info, warn};

use crate::{
    BetaEngine, CalibrationConfig, EngineConfig, ModelError, RunConfig, run::fetch_returns,
    symbol_candidates,
};

/// Fit of the reference security against the factor at one lag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagCandidate {
    /// Lag in observations.
    pub lag: i32,
    /// Slope.
    pub beta: f64,
    /// Coefficient of determination.
    pub r_squared: f64,
    /// Overlapping observations.
    pub n_obs: usize,
}

impl LagCandidate {
    /// Whether `self` ranks strictly above `other`: higher R², then larger
    /// absolute beta.
    #[must_use]
    pub fn beats(&self, other: &Self) -> bool {
        match self.r_squared.total_cmp(&other.r_squared) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => self.beta.abs() > other.beta.abs(),
        }
    }
}

/// Outcome of calibrating one factor.
#[derive(Debug, Clone, PartialEq)]
pub struct LagCalibration {
    /// Factor code.
    pub factor_code: FactorCode,
    /// Reference security.
    pub reference: SecurityCode,
    /// Price-source symbol the reference returns came from.
    pub used_source: Option<String>,
    /// Winning lag, if any lag produced a usable fit.
    pub best: Option<LagCandidate>,
    /// Every usable lag, in sweep order.
    pub candidates: Vec<LagCandidate>,
    /// Why no lag was chosen.
    pub reason: Option<String>,
    /// Whether the winning lag was written back.
    pub written: bool,
}

/// Sweeps lags of one factor against one security.
#[derive(Debug, Clone)]
pub struct LagCalibrator {
    config: CalibrationConfig,
    engine: BetaEngine,
}

impl LagCalibrator {
    /// Create a calibrator requiring `min_nobs` overlapping observations per
    /// lag.
    #[must_use]
    pub fn new(config: CalibrationConfig, min_nobs: usize) -> Self {
        // The whole overlap is used, no trailing window
        let engine = BetaEngine::new(EngineConfig {
            window_days: usize::MAX,
            min_nobs,
            ..EngineConfig::default()
        });
        Self { config, engine }
    }

    /// Get the sweep range.
    #[must_use]
    pub const fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Fit every lag and pick the best.
    ///
    /// Lags with too little overlap, or whose beta or R² is undefined, are
    /// left out. Ties keep the earlier lag.
    ///
    /// # Errors
    /// Returns an error if a regression sample can't be assembled.
    pub fn sweep(
        &self,
        code: &FactorCode,
        factor_returns: &ReturnSeries,
        security_returns: &ReturnSeries,
    ) -> Result<(Option<LagCandidate>, Vec<LagCandidate>), ModelError> {
        let mut candidates = Vec::new();
        let mut best: Option<LagCandidate> = None;

        for lag in self.config.min_lag..=self.config.max_lag {
            let aligned = align_lag(factor_returns, lag);
            let matrix = FactorMatrix::from_columns(&[(code.clone(), aligned)])?;
            let estimation =
                self.engine.estimate(security_returns, &matrix, std::slice::from_ref(code))?;

            let Some(fit) = estimation.single.first() else { continue };
            let (Some(beta), Some(r_squared)) = (fit.beta, fit.r_squared) else { continue };

            let candidate = LagCandidate { lag, beta, r_squared, n_obs: fit.n_obs };
            if best.is_none_or(|b| candidate.beats(&b)) {
                best = Some(candidate);
            }
            candidates.push(candidate);
        }

        Ok((best, candidates))
    }
}

/// Calibrate every daily factor with a lag reference and write the winning
/// lags to `sink` unless `dry_run`.
///
/// Reference returns are fetched once per security.
///
/// # Errors
/// Returns an error if a regression sample can't be assembled or a
/// write-back fails after retries.
pub fn calibrate_lags<F, P, L>(
    definitions: &[FactorDefinition],
    factors: &F,
    prices: &P,
    sink: &mut L,
    config: &RunConfig,
    end: Date,
    dry_run: bool,
) -> Result<Vec<LagCalibration>, ModelError>
where
    F: FactorObservationSource + ?Sized,
    P: SecurityReturnSource + ?Sized,
    L: LagPolicySink + ?Sized,
{
    let retry = config.retry_policy();
    let builder =
        FactorMatrixBuilder::with_config(factors, config.matrix_config()).with_retry(retry);
    let calibrator = LagCalibrator::new(config.calibration.clone(), config.engine.min_nobs);
    let mut references: HashMap<SecurityCode, Option<(String, ReturnSeries)>> = HashMap::new();
    let mut out = Vec::new();

    for definition in definitions {
        let code = &definition.code;
        if definition.is_monthly() {
            info!(factor = %code, "monthly factor, not calibrated");
            continue;
        }
        let Some(reference) = definition.lag_reference.clone() else {
            continue;
        };

        let mut calibration = LagCalibration {
            factor_code: code.clone(),
            reference: reference.clone(),
            used_source: None,
            best: None,
            candidates: Vec::new(),
            reason: None,
            written: false,
        };

        let factor_returns = match builder.factor_returns(definition, end) {
            Ok(returns) => returns,
            Err(err) => {
                warn!(factor = %code, error = %err, "factor returns unavailable");
                calibration.reason = Some(format!("factor_empty({err})"));
                out.push(calibration);
                continue;
            }
        };

        let fetched = references.entry(reference.clone()).or_insert_with(|| {
            let candidates = symbol_candidates(&Security::simple(reference.clone()));
            fetch_returns(prices, &retry, &candidates.symbols, end)
        });
        let Some((used_source, security_returns)) = fetched.as_ref() else {
            warn!(factor = %code, reference = %reference, "reference returns unavailable");
            calibration.reason = Some("price_empty".to_string());
            out.push(calibration);
            continue;
        };
        calibration.used_source = Some(used_source.clone());

        let (best, candidates) = calibrator.sweep(code, &factor_returns, security_returns)?;
        calibration.candidates = candidates;
        calibration.best = best;

        match best {
            Some(best) => {
                info!(
                    factor = %code,
                    reference = %reference,
                    lag = best.lag,
                    r_squared = best.r_squared,
                    beta = best.beta,
                    n_obs = best.n_obs,
                    "best lag"
                );
                if !dry_run {
                    retry.run(code.as_str(), || sink.update_lag_policy(code, best.lag))?;
                    calibration.written = true;
                }
            }
            None => {
                warn!(factor = %code, min_nobs = config.engine.min_nobs, "no valid lag");
                calibration.reason =
                    Some(format!("no_valid_lag(min_nobs={})", config.engine.min_nobs));
            }
        }
        out.push(calibration);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn candidate(lag: i32, beta: f64, r_squared: f64) -> LagCandidate {
        LagCandidate { lag, beta, r_squared, n_obs: 100 }
    }

    #[rstest]
    #[case(candidate(1, 0.5, 0.3), candidate(0, 0.9, 0.2), true)]
    #[case(candidate(1, 0.5, 0.2), candidate(0, -0.9, 0.2), false)]
    #[case(candidate(1, -1.2, 0.2), candidate(0, 0.9, 0.2), true)]
    #[case(candidate(1, 0.9, 0.2), candidate(0, 0.9, 0.2), false)]
    fn ranking(#[case] a: LagCandidate, #[case] b: LagCandidate, #[case] expected: bool) {
        assert_eq!(a.beats(&b), expected);
    }

    fn day(n: u32) -> Date {
        Date::from_num_days_from_ce_opt(738_886 + n as i32).unwrap()
    }

    fn noise(i: u32) -> f64 {
        ((i as f64) * 1.7).sin() * 0.01 + ((i as f64) * 0.31).cos() * 0.004
    }

    #[test]
    fn recovers_true_delay() {
        // The security reacts to the factor one observation late
        let factor = ReturnSeries::collect_ordered((0..200).map(|i| (day(i), noise(i))));
        let security = ReturnSeries::collect_ordered(
            (1..200).map(|i| (day(i), 0.8 * noise(i - 1) + 0.1 * noise(i + 500))),
        );

        let calibrator = LagCalibrator::new(CalibrationConfig::default(), 60);
        let (best, candidates) = calibrator.sweep(&"F_VOL_VIX".into(), &factor, &security).unwrap();

        assert_eq!(best.map(|b| b.lag), Some(1));
        assert_eq!(candidates.len(), 7);
        let lags: Vec<_> = candidates.iter().map(|c| c.lag).collect();
        assert_eq!(lags, vec![-3, -2, -1, 0, 1, 2, 3]);
    }

    #[test]
    fn thin_overlap_yields_nothing() {
        let factor = ReturnSeries::collect_ordered((0..30).map(|i| (day(i), noise(i))));
        let security = ReturnSeries::collect_ordered((0..30).map(|i| (day(i), noise(i))));

        let calibrator = LagCalibrator::new(CalibrationConfig::default(), 60);
        let (best, candidates) = calibrator.sweep(&"F".into(), &factor, &security).unwrap();

        assert!(best.is_none());
        assert!(candidates.is_empty());
    }
}
