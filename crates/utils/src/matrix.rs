//! Wide daily factor matrix.

use std::collections::{BTreeSet, HashSet};

use chrono::{Days, Months};
use factorbeta_primitives::{Date, FactorCode, FactorDefinition, Frequency, ReturnSeries};
use factorbeta_traits::{FactorObservationSource, RetryPolicy};
use factorbeta_transforms::apply_rule;
use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    FrequencyHarmonizer, HarmonizeConfig, LagPolicy, NormalizeConfig, SeriesNormalizer,
    UtilsError, align_lag,
};

/// Name of the date column in every frame built by this crate.
pub const DATE_COLUMN: &str = "date";

/// Days from 0001-01-01 (day 1) to 1970-01-01, the origin of polars dates.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Daily table of lag-aligned factor returns.
///
/// Backed by a polars frame with a `date` column and one nullable `Float64`
/// column per factor. A cell is null where the factor has no observation;
/// values are never zero-filled here (monthly factors arrive already expanded
/// with zeros by the harmonizer).
#[derive(Debug, Clone)]
pub struct FactorMatrix {
    frame: DataFrame,
    codes: Vec<FactorCode>,
}

impl FactorMatrix {
    /// Build the matrix from per-factor return series, on the union of their
    /// dates. Column order follows `columns`.
    ///
    /// # Errors
    /// Returns an error on duplicate factor codes or if the frame can't be
    /// built.
    pub fn from_columns(columns: &[(FactorCode, ReturnSeries)]) -> Result<Self, UtilsError> {
        let mut seen = HashSet::new();
        for (code, _) in columns {
            if code.as_str() == DATE_COLUMN || !seen.insert(code) {
                return Err(UtilsError::InvalidParameter(format!("duplicate factor column {code}")));
            }
        }

        let dates: Vec<Date> = columns
            .iter()
            .flat_map(|(_, s)| s.dates().iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut frame_columns = Vec::with_capacity(columns.len() + 1);
        for (code, series) in columns {
            let values: Vec<Option<f64>> = dates.iter().map(|d| series.get(*d)).collect();
            frame_columns.push(Column::new(code.as_str().into(), values));
        }
        frame_columns.insert(0, Column::new(DATE_COLUMN.into(), dates));

        Ok(Self {
            frame: DataFrame::new(frame_columns)?,
            codes: columns.iter().map(|(c, _)| c.clone()).collect(),
        })
    }

    /// Underlying frame.
    #[must_use]
    pub const fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Factor codes in column order.
    #[must_use]
    pub fn factor_codes(&self) -> &[FactorCode] {
        &self.codes
    }

    /// Whether the matrix has a column for `code`.
    #[must_use]
    pub fn contains(&self, code: &FactorCode) -> bool {
        self.codes.contains(code)
    }

    /// Number of dates.
    #[must_use]
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Whether the matrix has no factors or no dates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty() || self.frame.height() == 0
    }

    /// Dates of the matrix, ascending.
    ///
    /// # Errors
    /// Returns an error if the date column is malformed.
    pub fn dates(&self) -> Result<Vec<Date>, UtilsError> {
        date_values(self.frame.column(DATE_COLUMN)?)?
            .into_iter()
            .map(|d| d.ok_or_else(|| UtilsError::MissingColumn(DATE_COLUMN.to_string())))
            .collect()
    }

    /// Non-null observations of one factor.
    ///
    /// # Errors
    /// Returns [`UtilsError::MissingColumn`] if the factor is not in the matrix.
    pub fn column(&self, code: &FactorCode) -> Result<ReturnSeries, UtilsError> {
        if !self.contains(code) {
            return Err(UtilsError::MissingColumn(code.to_string()));
        }
        let dates = self.dates()?;
        let values = f64_values(&self.frame, code.as_str())?;
        Ok(ReturnSeries::collect_ordered(
            dates.into_iter().zip(values).filter_map(|(d, v)| v.map(|v| (d, v))),
        ))
    }
}

/// Two-column frame `date | name` holding `series`.
///
/// # Errors
/// Returns an error if the frame can't be built.
pub fn series_frame(name: &str, series: &ReturnSeries) -> Result<DataFrame, UtilsError> {
    Ok(DataFrame::new(vec![
        Column::new(DATE_COLUMN.into(), series.dates().to_vec()),
        Column::new(name.into(), series.values().to_vec()),
    ])?)
}

/// Calendar dates held in a polars `Date` column.
///
/// # Errors
/// Returns an error if the column can't be read as dates.
pub fn date_values(column: &Column) -> Result<Vec<Option<Date>>, UtilsError> {
    let days = column.cast(&DataType::Int32)?;
    Ok(days
        .i32()?
        .into_iter()
        .map(|d| d.and_then(|d| Date::from_num_days_from_ce_opt(d + UNIX_EPOCH_DAYS_FROM_CE)))
        .collect())
}

/// Values of a `Float64` column, nulls as `None`.
///
/// # Errors
/// Returns [`UtilsError::MissingColumn`] if the column is absent.
pub fn f64_values(frame: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, UtilsError> {
    let column =
        frame.column(name).map_err(|_| UtilsError::MissingColumn(name.to_string()))?;
    Ok(column.f64()?.into_iter().collect())
}

/// Configuration for building the factor matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixConfig {
    /// Calendar days of history before the run's end date.
    pub lookback_days: u32,
    /// Extra days fetched before the window for daily factors, so the first
    /// return of the window has a prior level.
    pub daily_buffer_days: u32,
    /// Extra months fetched before the window for monthly factors.
    pub monthly_buffer_months: u32,
    /// Release lag for monthly factors without their own.
    pub release_lag_months: u32,
    /// Normalization of raw observations.
    pub normalize: NormalizeConfig,
    /// Lag defaults.
    pub lag: LagPolicy,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            lookback_days: 850,
            daily_buffer_days: 14,
            monthly_buffer_months: 2,
            release_lag_months: 1,
            normalize: NormalizeConfig::default(),
            lag: LagPolicy::default(),
        }
    }
}

/// A factor left out of the matrix, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorExclusion {
    /// Factor code.
    pub code: FactorCode,
    /// Why it was excluded.
    pub reason: String,
}

/// Output of [`FactorMatrixBuilder::build`].
#[derive(Debug, Clone)]
pub struct MatrixBuild {
    /// The matrix.
    pub matrix: FactorMatrix,
    /// Lag applied to each included factor.
    pub lags: Vec<(FactorCode, i32)>,
    /// Factors left out.
    pub exclusions: Vec<FactorExclusion>,
}

/// Fetches, normalizes, transforms, harmonizes and lag-aligns every factor of
/// a run into one [`FactorMatrix`].
#[derive(Debug)]
pub struct FactorMatrixBuilder<'a, S: ?Sized> {
    source: &'a S,
    retry: RetryPolicy,
    config: MatrixConfig,
}

impl<'a, S: FactorObservationSource + ?Sized> FactorMatrixBuilder<'a, S> {
    /// Create a builder with default configuration.
    #[must_use]
    pub fn new(source: &'a S) -> Self {
        Self::with_config(source, MatrixConfig::default())
    }

    /// Create a builder with custom configuration.
    #[must_use]
    pub fn with_config(source: &'a S, config: MatrixConfig) -> Self {
        Self { source, retry: RetryPolicy::default(), config }
    }

    /// Set the retry policy for observation fetches.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &MatrixConfig {
        &self.config
    }

    /// `[start, end]` window of a run ending on `end`.
    #[must_use]
    pub fn window(&self, end: Date) -> (Date, Date) {
        let start = end.checked_sub_days(Days::new(u64::from(self.config.lookback_days))).unwrap_or(end);
        (start, end)
    }

    /// Daily returns of one factor within the run window, before lag alignment.
    ///
    /// # Errors
    /// Returns an error if the fetch fails after retries, too few
    /// observations survive normalization, or nothing is left in the window.
    pub fn factor_returns(
        &self,
        definition: &FactorDefinition,
        end: Date,
    ) -> Result<ReturnSeries, UtilsError> {
        let (start, end) = self.window(end);
        let fetch_start = match definition.frequency {
            Frequency::Daily => start.checked_sub_days(Days::new(u64::from(self.config.daily_buffer_days))),
            Frequency::Monthly => start.checked_sub_months(Months::new(self.config.monthly_buffer_months)),
        }
        .unwrap_or(start);

        let code = &definition.code;
        let raw = self.retry.run(code.as_str(), || {
            self.source.factor_observations(code, fetch_start, end)
        })?;

        let normalizer = SeriesNormalizer::with_config(self.config.normalize.clone());
        let (levels, report) = normalizer.normalize(&raw)?;
        if !report.conflicts.is_empty() {
            warn!(factor = %code, conflicts = report.conflicts.len(), "conflicting duplicate observations");
        }

        let returns = apply_rule(definition.transform, &levels);
        let returns = match definition.frequency {
            Frequency::Daily => returns.between(start, end),
            Frequency::Monthly => {
                let release_lag_months =
                    definition.release_lag_months.unwrap_or(self.config.release_lag_months);
                FrequencyHarmonizer::with_config(HarmonizeConfig { release_lag_months })
                    .harmonize(&returns, start, end)
            }
        };

        if returns.is_empty() {
            return Err(UtilsError::InsufficientData { required: 1, actual: 0 });
        }
        Ok(returns)
    }

    /// Build the matrix for `definitions`. Failures exclude the factor
    /// concerned and are reported, they never abort the build.
    ///
    /// # Errors
    /// Returns an error only if the frame itself can't be assembled.
    pub fn build(
        &self,
        definitions: &[FactorDefinition],
        end: Date,
    ) -> Result<MatrixBuild, UtilsError> {
        let mut columns: Vec<(FactorCode, ReturnSeries)> = Vec::new();
        let mut lags = Vec::new();
        let mut exclusions = Vec::new();
        let mut seen = HashSet::new();

        for definition in definitions {
            let code = &definition.code;
            if !seen.insert(code.clone()) {
                exclusions.push(FactorExclusion {
                    code: code.clone(),
                    reason: "duplicate definition".to_string(),
                });
                continue;
            }

            let returns = match self.factor_returns(definition, end) {
                Ok(returns) => returns,
                Err(err) => {
                    warn!(factor = %code, error = %err, "factor excluded");
                    exclusions.push(FactorExclusion { code: code.clone(), reason: err.to_string() });
                    continue;
                }
            };

            let lag = self.config.lag.resolve(definition);
            let aligned = align_lag(&returns, lag);
            if aligned.is_empty() {
                warn!(factor = %code, lag, "factor excluded, nothing left after lag");
                exclusions.push(FactorExclusion {
                    code: code.clone(),
                    reason: format!("empty after lag {lag}"),
                });
                continue;
            }

            debug!(factor = %code, lag, n_obs = aligned.len(), "factor prepared");
            lags.push((code.clone(), lag));
            columns.push((code.clone(), aligned));
        }

        let matrix = FactorMatrix::from_columns(&columns)?;
        info!(
            factors = matrix.factor_codes().len(),
            dates = matrix.height(),
            excluded = exclusions.len(),
            "factor matrix built"
        );
        Ok(MatrixBuild { matrix, lags, exclusions })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use approx::assert_relative_eq;
    use factorbeta_primitives::{RawObservation, TransformRule};
    use factorbeta_traits::CollaboratorError;

    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    struct MapSource(HashMap<String, Vec<RawObservation>>);

    impl FactorObservationSource for MapSource {
        fn factor_observations(
            &self,
            code: &FactorCode,
            start: Date,
            end: Date,
        ) -> Result<Vec<RawObservation>, CollaboratorError> {
            let rows = self
                .0
                .get(code.as_str())
                .ok_or_else(|| CollaboratorError::Unavailable(code.to_string()))?;
            Ok(rows
                .iter()
                .filter(|o| match o.date {
                    factorbeta_primitives::RawDate::Date(d) => d >= start && d <= end,
                    _ => true,
                })
                .cloned()
                .collect())
        }
    }

    fn levels(start: Date, n: usize, f: impl Fn(usize) -> f64) -> Vec<RawObservation> {
        crate::weekday_calendar(start, start + Days::new(3 * n as u64))
            .into_iter()
            .take(n)
            .enumerate()
            .map(|(i, d)| RawObservation::new(d, f(i)))
            .collect()
    }

    #[test]
    fn from_columns_keeps_nulls() {
        let a = ReturnSeries::try_new(vec![d(2024, 1, 2), d(2024, 1, 3)], vec![0.1, 0.2]).unwrap();
        let b = ReturnSeries::try_new(vec![d(2024, 1, 3), d(2024, 1, 4)], vec![1.0, 2.0]).unwrap();

        let matrix =
            FactorMatrix::from_columns(&[("A".into(), a), ("B".into(), b.clone())]).unwrap();

        assert_eq!(matrix.height(), 3);
        assert_eq!(matrix.dates().unwrap(), vec![d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 4)]);
        assert_eq!(f64_values(matrix.frame(), "A").unwrap(), vec![Some(0.1), Some(0.2), None]);
        assert_eq!(matrix.column(&"B".into()).unwrap(), b);
    }

    #[test]
    fn from_columns_rejects_duplicates() {
        let a = ReturnSeries::try_new(vec![d(2024, 1, 2)], vec![0.1]).unwrap();
        let err = FactorMatrix::from_columns(&[("A".into(), a.clone()), ("A".into(), a)]);
        assert!(matches!(err, Err(UtilsError::InvalidParameter(_))));
    }

    #[test]
    fn build_excludes_failing_factors_only() {
        let mut data = HashMap::new();
        data.insert("F_RATE_KR10Y".to_string(), levels(d(2024, 1, 1), 40, |i| 3.0 + 0.01 * i as f64));
        data.insert("F_VOL_VIX".to_string(), levels(d(2024, 1, 1), 40, |i| 15.0 + (i % 3) as f64));
        data.insert("F_BAD".to_string(), levels(d(2024, 1, 1), 1, |_| 1.0));
        let source = MapSource(data);

        let definitions = vec![
            FactorDefinition::new("F_RATE_KR10Y", Frequency::Daily, TransformRule::DiffPp),
            FactorDefinition::new("F_VOL_VIX", Frequency::Daily, TransformRule::LogReturn),
            FactorDefinition::new("F_BAD", Frequency::Daily, TransformRule::LogReturn),
            FactorDefinition::new("F_MISSING", Frequency::Daily, TransformRule::LogReturn),
        ];

        let builder = FactorMatrixBuilder::new(&source).with_retry(RetryPolicy::none());
        let build = builder.build(&definitions, d(2024, 3, 29)).unwrap();

        assert_eq!(
            build.matrix.factor_codes(),
            &[FactorCode::from("F_RATE_KR10Y"), FactorCode::from("F_VOL_VIX")]
        );
        assert_eq!(build.lags, vec![("F_RATE_KR10Y".into(), 0), ("F_VOL_VIX".into(), 1)]);
        let excluded: Vec<_> = build.exclusions.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(excluded, vec!["F_BAD", "F_MISSING"]);

        let rate = build.matrix.column(&"F_RATE_KR10Y".into()).unwrap();
        assert_eq!(rate.len(), 39);
        assert_relative_eq!(rate.values()[0], 0.01, epsilon = 1e-12);
        // One observation lost to the lag
        assert_eq!(build.matrix.column(&"F_VOL_VIX".into()).unwrap().len(), 38);
    }

    #[test]
    fn monthly_factor_is_harmonized() {
        let mut data = HashMap::new();
        data.insert(
            "F_INFL_KR_CPI".to_string(),
            vec![
                RawObservation::new("202312", 110.0),
                RawObservation::new("202401", 110.44),
            ],
        );
        let source = MapSource(data);
        let definition =
            FactorDefinition::new("F_INFL_KR_CPI", Frequency::Monthly, TransformRule::LogReturn);

        let returns = FactorMatrixBuilder::new(&source)
            .factor_returns(&definition, d(2024, 3, 29))
            .unwrap();

        // January's print (dated 2024-01-01) is released on 2024-02-01
        let released: Vec<_> = returns.iter().filter(|(_, v)| *v != 0.0).collect();
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].0, d(2024, 2, 1));
        assert_relative_eq!(released[0].1, (110.44_f64 / 110.0).ln(), epsilon = 1e-12);
    }
}
