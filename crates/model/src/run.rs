//! Batch estimation runs.

use factorbeta_primitives::{
    BetaEstimate, Date, FactorCode, FactorDefinition, Provenance, ReturnSeries, Security,
};
use factorbeta_traits::{BetaEstimateSink, FactorObservationSource, RetryPolicy, SecurityReturnSource};
use factorbeta_utils::{FactorExclusion, FactorMatrixBuilder, MatrixBuild};
use tracing::{debug, info, warn};

use crate::{BetaEngine, ModelError, ReportRow, RunConfig, RunSummary, Status, symbol_candidates};

/// Result of a batch run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Estimates of every security, in security order.
    pub estimates: Vec<BetaEstimate>,
    /// One row per security.
    pub report: Vec<ReportRow>,
    /// Factors left out of the matrix.
    pub exclusions: Vec<FactorExclusion>,
    /// Lag applied to each factor in the matrix.
    pub lags: Vec<(FactorCode, i32)>,
}

impl RunOutput {
    /// Status counts of the report.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary::from_rows(&self.report)
    }
}

/// Estimates every security of a run against one shared factor matrix.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    config: RunConfig,
    engine: BetaEngine,
}

impl BatchRunner {
    /// Create a runner.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidConfig`] if the configuration is invalid.
    pub fn new(config: RunConfig) -> Result<Self, ModelError> {
        config.validate()?;
        let engine = BetaEngine::new(config.engine.clone());
        Ok(Self { config, engine })
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Build the factor matrix and estimate every security.
    ///
    /// Failures confined to a factor or a security are recorded and the run
    /// continues.
    ///
    /// # Errors
    /// Returns [`ModelError::NoFactorDefinitions`] if `definitions` is empty,
    /// and [`ModelError::NoEligibleFactors`] if securities reached estimation
    /// but none had a single eligible factor.
    pub fn run<F, P>(
        &self,
        definitions: &[FactorDefinition],
        securities: &[Security],
        factors: &F,
        prices: &P,
        end: Date,
    ) -> Result<RunOutput, ModelError>
    where
        F: FactorObservationSource + ?Sized,
        P: SecurityReturnSource + ?Sized,
    {
        self.run_with_rejected(definitions, &[], securities, factors, prices, end)
    }

    /// Like [`Self::run`], carrying factors whose metadata was rejected
    /// before the run (e.g. an unsupported transform).
    ///
    /// Rejected factors lead [`RunOutput::exclusions`] and are listed as
    /// skipped in every estimated security's report row.
    ///
    /// # Errors
    /// Same as [`Self::run`].
    pub fn run_with_rejected<F, P>(
        &self,
        definitions: &[FactorDefinition],
        rejected: &[FactorExclusion],
        securities: &[Security],
        factors: &F,
        prices: &P,
        end: Date,
    ) -> Result<RunOutput, ModelError>
    where
        F: FactorObservationSource + ?Sized,
        P: SecurityReturnSource + ?Sized,
    {
        for exclusion in rejected {
            warn!(factor = %exclusion.code, reason = %exclusion.reason, "factor definition rejected");
        }
        if definitions.is_empty() {
            return Err(ModelError::NoFactorDefinitions);
        }

        let retry = self.config.retry_policy();
        let MatrixBuild { matrix, lags, exclusions: built } =
            FactorMatrixBuilder::with_config(factors, self.config.matrix_config())
                .with_retry(retry)
                .build(definitions, end)?;
        let exclusions: Vec<FactorExclusion> = rejected.iter().cloned().chain(built).collect();
        let factor_codes: Vec<FactorCode> = definitions
            .iter()
            .map(|d| d.code.clone())
            .chain(rejected.iter().map(|r| r.code.clone()))
            .collect();
        let window_days = self.config.engine.window_days;
        let min_nobs = self.config.engine.min_nobs;

        let mut estimates = Vec::new();
        let mut report = Vec::with_capacity(securities.len());
        let mut reached = 0;
        let mut with_eligible = 0;

        for security in securities {
            if security.code.is_cash() {
                report.push(ReportRow::skipped(security, "cash", ""));
                continue;
            }

            let candidates = symbol_candidates(security);
            if candidates.is_empty() {
                warn!(security = %security.code, note = %candidates.note, "no price symbol candidates");
                report.push(ReportRow::skipped(
                    security,
                    format!("no_candidates({})", candidates.note),
                    "",
                ));
                continue;
            }

            let Some((used_source, returns)) =
                fetch_returns(prices, &retry, &candidates.symbols, end)
            else {
                warn!(security = %security.code, "no prices from any candidate");
                report.push(ReportRow::skipped(
                    security,
                    "price_empty",
                    candidates.first().unwrap_or_default(),
                ));
                continue;
            };

            reached += 1;
            if matrix.is_empty() {
                report.push(ReportRow::skipped(security, "no_factors", &used_source));
                continue;
            }

            let estimation = match self.engine.estimate(&returns, &matrix, &factor_codes) {
                Ok(estimation) => estimation,
                Err(err) if err.is_recoverable() => {
                    warn!(security = %security.code, error = %err, "estimation failed");
                    let mut row = ReportRow::skipped(security, format!("error:{err}"), &used_source);
                    row.status = Status::Fail;
                    report.push(row);
                    continue;
                }
                Err(err) => return Err(err),
            };

            if !estimation.diagnostics.eligible.is_empty() {
                with_eligible += 1;
            }

            let row = ReportRow::from_estimation(security, &used_source, &estimation, min_nobs);
            match row.status {
                Status::Ok => info!(
                    security = %security.code,
                    source = %used_source,
                    single = estimation.single.len(),
                    multi = estimation.multi.is_some(),
                    n_obs = row.n_obs,
                    "estimated"
                ),
                _ => warn!(security = %security.code, status = %row.status, reason = %row.reason, "not estimated"),
            }

            let provenance = Provenance {
                price_interval: self.config.price_interval.clone(),
                lookback_window: self.config.lookback_window.clone(),
                price_source: used_source,
            };
            estimates.extend(estimation.to_estimates(&security.code, window_days, &provenance));
            report.push(row);
        }

        if reached > 0 && with_eligible == 0 {
            return Err(ModelError::NoEligibleFactors { securities: reached });
        }

        let output = RunOutput { estimates, report, exclusions, lags };
        let summary = output.summary();
        info!(
            ok = summary.ok,
            skip = summary.skip,
            fail = summary.fail,
            estimates = output.estimates.len(),
            "run finished"
        );
        Ok(output)
    }

    /// Upsert `estimates` through `sink` in chunks.
    ///
    /// # Errors
    /// Returns [`ModelError::Persistence`] for the first chunk that still
    /// fails after retries.
    pub fn persist<S>(&self, estimates: &[BetaEstimate], sink: &mut S) -> Result<usize, ModelError>
    where
        S: BetaEstimateSink + ?Sized,
    {
        let retry = self.config.retry_policy();
        let mut written = 0;
        for (chunk, rows) in estimates.chunks(self.config.upsert_chunk_size).enumerate() {
            written += retry
                .run("upsert", || sink.upsert(rows))
                .map_err(|source| ModelError::Persistence { chunk, source })?;
            debug!(chunk, rows = rows.len(), "chunk persisted");
        }
        info!(written, "estimates persisted");
        Ok(written)
    }
}

/// Returns of the first candidate symbol that yields any.
///
/// Exhausted retries count as absent data.
pub(crate) fn fetch_returns<P>(
    prices: &P,
    retry: &RetryPolicy,
    symbols: &[String],
    end: Date,
) -> Option<(String, ReturnSeries)>
where
    P: SecurityReturnSource + ?Sized,
{
    symbols.iter().find_map(|symbol| {
        match retry.run(symbol, || prices.security_returns(symbol, end)) {
            Ok(Some(returns)) if !returns.is_empty() => Some((symbol.clone(), returns)),
            Ok(_) => {
                debug!(%symbol, "no prices");
                None
            }
            Err(err) => {
                warn!(%symbol, error = %err, "price fetch failed");
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use factorbeta_primitives::RawObservation;
    use factorbeta_traits::CollaboratorError;

    use super::*;

    struct NoFactors;

    impl FactorObservationSource for NoFactors {
        fn factor_observations(
            &self,
            code: &FactorCode,
            _start: Date,
            _end: Date,
        ) -> Result<Vec<RawObservation>, CollaboratorError> {
            Err(CollaboratorError::Malformed(code.to_string()))
        }
    }

    struct Prices(HashMap<String, ReturnSeries>);

    impl SecurityReturnSource for Prices {
        fn security_returns(
            &self,
            symbol: &str,
            _end: Date,
        ) -> Result<Option<ReturnSeries>, CollaboratorError> {
            Ok(self.0.get(symbol).cloned())
        }
    }

    struct FlakySink {
        failures_left: usize,
        rows: usize,
    }

    impl BetaEstimateSink for FlakySink {
        fn upsert(&mut self, chunk: &[BetaEstimate]) -> Result<usize, CollaboratorError> {
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(CollaboratorError::Unavailable("busy".to_string()));
            }
            self.rows += chunk.len();
            Ok(chunk.len())
        }
    }

    fn config() -> RunConfig {
        RunConfig { retry_backoff_ms: 0, upsert_chunk_size: 2, ..RunConfig::default() }
    }

    fn end() -> Date {
        Date::from_ymd_opt(2024, 6, 28).unwrap()
    }

    fn returns() -> ReturnSeries {
        ReturnSeries::try_new(vec![end()], vec![0.01]).unwrap()
    }

    #[test]
    fn empty_definitions_fail_the_run() {
        let runner = BatchRunner::new(config()).unwrap();
        let err = runner.run(&[], &[], &NoFactors, &Prices(HashMap::new()), end()).unwrap_err();
        assert!(matches!(err, ModelError::NoFactorDefinitions));
    }

    #[test]
    fn securities_skip_before_estimation() {
        let runner = BatchRunner::new(config()).unwrap();
        let definitions = vec![FactorDefinition::new(
            "F_VOL_VIX",
            factorbeta_primitives::Frequency::Daily,
            factorbeta_primitives::TransformRule::LogReturn,
        )];
        let securities = vec![
            Security::simple("CASH".into()),
            Security::simple("AAPL".into()),
            Security::simple("000660".into()),
        ];

        let output =
            runner.run(&definitions, &securities, &NoFactors, &Prices(HashMap::new()), end()).unwrap();

        let reasons: Vec<_> = output.report.iter().map(|r| r.reason.as_str()).collect();
        assert_eq!(reasons, vec!["cash", "no_candidates(no_candidates)", "price_empty"]);
        assert_eq!(output.report[2].used_source, "000660.KS");
        assert_eq!(output.exclusions.len(), 1);
        assert!(output.estimates.is_empty());
    }

    #[test]
    fn empty_matrix_with_prices_is_run_fatal() {
        let runner = BatchRunner::new(config()).unwrap();
        let definitions = vec![FactorDefinition::new(
            "F_VOL_VIX",
            factorbeta_primitives::Frequency::Daily,
            factorbeta_primitives::TransformRule::LogReturn,
        )];
        let prices = Prices(HashMap::from([("000660.KQ".to_string(), returns())]));

        let err = runner
            .run(&definitions, &[Security::simple("000660".into())], &NoFactors, &prices, end())
            .unwrap_err();

        assert!(matches!(err, ModelError::NoEligibleFactors { securities: 1 }));
    }

    #[test]
    fn persist_retries_each_chunk() {
        let runner = BatchRunner::new(config()).unwrap();
        let estimate = BetaEstimate {
            asof_date: end(),
            window_days: 252,
            security_code: "000660".into(),
            factor_code: "F_VOL_VIX".into(),
            method: factorbeta_primitives::Method::Single,
            beta: Some(0.1),
            alpha: None,
            r_squared: None,
            n_obs: 100,
            provenance: Provenance {
                price_interval: "1d".to_string(),
                lookback_window: "2y".to_string(),
                price_source: "000660.KS".to_string(),
            },
        };
        let estimates = vec![estimate; 5];
        let mut sink = FlakySink { failures_left: 2, rows: 0 };

        assert_eq!(runner.persist(&estimates, &mut sink).unwrap(), 5);
        assert_eq!(sink.rows, 5);
    }

    #[test]
    fn persist_gives_up_after_retries() {
        let runner = BatchRunner::new(config()).unwrap();
        let mut sink = FlakySink { failures_left: 10, rows: 0 };
        let estimates = vec![
            BetaEstimate {
                asof_date: end(),
                window_days: 252,
                security_code: "000660".into(),
                factor_code: "F_VOL_VIX".into(),
                method: factorbeta_primitives::Method::Multi,
                beta: None,
                alpha: None,
                r_squared: None,
                n_obs: 0,
                provenance: Provenance {
                    price_interval: "1d".to_string(),
                    lookback_window: "2y".to_string(),
                    price_source: String::new(),
                },
            };
            3
        ];

        let err = runner.persist(&estimates, &mut sink).unwrap_err();
        assert!(matches!(err, ModelError::Persistence { chunk: 0, .. }));
    }
}
