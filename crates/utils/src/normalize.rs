//! Series normalization.
//!
//! Turns provider observations (unordered, possibly duplicated, mixed date
//! representations, text or missing values) into a canonical [`LevelSeries`].

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use factorbeta_primitives::{Date, LevelSeries, RawDate, RawObservation, RawValue};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::UtilsError;

/// How to treat two observations on the same date with different values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep the value that appears later in source order.
    #[default]
    KeepLast,
    /// Fail normalization.
    Reject,
}

/// Configuration for series normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Handling of conflicting duplicate dates.
    pub duplicate_policy: DuplicatePolicy,
    /// Minimum observations that must survive.
    pub min_observations: usize,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self { duplicate_policy: DuplicatePolicy::KeepLast, min_observations: 2 }
    }
}

/// Two observations on one date that disagreed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuplicateConflict {
    /// Duplicated date.
    pub date: Date,
    /// Value kept.
    pub kept: f64,
    /// Value discarded.
    pub discarded: f64,
}

/// What normalization removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeReport {
    /// Observations received.
    pub input_rows: usize,
    /// Rows dropped because the date could not be read.
    pub unparseable_dates: usize,
    /// Rows dropped because the value was missing or non-finite.
    pub missing_values: usize,
    /// Rows collapsed into a later row on the same date.
    pub duplicates: usize,
    /// Duplicates whose values disagreed.
    pub conflicts: Vec<DuplicateConflict>,
}

/// Canonicalizes raw observations.
#[derive(Debug, Clone, Default)]
pub struct SeriesNormalizer {
    config: NormalizeConfig,
}

impl SeriesNormalizer {
    /// Create a normalizer with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(NormalizeConfig::default())
    }

    /// Create a normalizer with custom configuration.
    #[must_use]
    pub const fn with_config(config: NormalizeConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &NormalizeConfig {
        &self.config
    }

    /// Normalize `raw` into a sorted, de-duplicated, finite level series.
    ///
    /// # Errors
    /// Returns [`UtilsError::InsufficientData`] when fewer than
    /// `min_observations` rows survive, and
    /// [`UtilsError::ConflictingDuplicate`] under [`DuplicatePolicy::Reject`].
    pub fn normalize(
        &self,
        raw: &[RawObservation],
    ) -> Result<(LevelSeries, NormalizeReport), UtilsError> {
        let mut report = NormalizeReport { input_rows: raw.len(), ..Default::default() };
        let mut by_date: BTreeMap<Date, f64> = BTreeMap::new();

        for obs in raw {
            let Some(date) = coerce_date(&obs.date) else {
                report.unparseable_dates += 1;
                continue;
            };
            let Some(value) = coerce_value(&obs.value) else {
                report.missing_values += 1;
                continue;
            };
            if let Some(previous) = by_date.insert(date, value) {
                report.duplicates += 1;
                if previous.to_bits() != value.to_bits() {
                    if self.config.duplicate_policy == DuplicatePolicy::Reject {
                        return Err(UtilsError::ConflictingDuplicate {
                            date,
                            kept: value,
                            discarded: previous,
                        });
                    }
                    report.conflicts.push(DuplicateConflict { date, kept: value, discarded: previous });
                }
            }
        }

        if !report.conflicts.is_empty() {
            warn!(
                conflicts = report.conflicts.len(),
                first = %report.conflicts[0].date,
                "duplicate dates with different values, keeping the later value"
            );
        }

        let required = self.config.min_observations;
        if by_date.len() < required {
            return Err(UtilsError::InsufficientData { required, actual: by_date.len() });
        }

        let (dates, values) = by_date.into_iter().unzip();
        Ok((LevelSeries::try_new(dates, values)?, report))
    }
}

/// Normalize with the default configuration.
///
/// # Errors
/// Returns [`UtilsError::InsufficientData`] when fewer than two observations
/// survive.
pub fn normalize_observations(raw: &[RawObservation]) -> Result<LevelSeries, UtilsError> {
    SeriesNormalizer::new().normalize(raw).map(|(series, _)| series)
}

/// Calendar date of a raw timestamp.
///
/// Zone-bearing timestamps keep their wall-clock date; the zone is dropped,
/// not converted. Text is read as `YYYY-MM-DD`, `YYYYMMDD`, `YYYYMM` (first of
/// the month), `YYYY-MM-DD HH:MM:SS` or RFC 3339.
#[must_use]
pub fn coerce_date(raw: &RawDate) -> Option<Date> {
    match raw {
        RawDate::Date(d) => Some(*d),
        RawDate::Naive(dt) => Some(dt.date()),
        RawDate::Zoned(dt) => Some(dt.naive_local().date()),
        RawDate::Text(s) => parse_date_text(s.trim()),
    }
}

fn parse_date_text(s: &str) -> Option<Date> {
    if s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year = s[..4].parse().ok()?;
        let month = s[4..].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, 1);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok().map(|dt| dt.date()))
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local().date()))
}

/// Finite numeric value of a raw value; `""` and `"."` count as missing.
#[must_use]
pub fn coerce_value(raw: &RawValue) -> Option<f64> {
    let value = match raw {
        RawValue::Number(v) => *v,
        RawValue::Text(s) => match s.trim() {
            "" | "." => return None,
            t => t.parse::<f64>().ok()?,
        },
        RawValue::Missing => return None,
    };
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};
    use rstest::rstest;

    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn sorts_and_drops_non_finite() {
        let raw = vec![
            RawObservation::new(d(2024, 1, 3), 3.0),
            RawObservation::new(d(2024, 1, 1), 1.0),
            RawObservation::new(d(2024, 1, 2), f64::NAN),
            RawObservation::new(d(2024, 1, 4), RawValue::Text(".".to_string())),
        ];

        let (series, report) = SeriesNormalizer::new().normalize(&raw).unwrap();

        assert_eq!(series.dates(), &[d(2024, 1, 1), d(2024, 1, 3)]);
        assert_eq!(series.values(), &[1.0, 3.0]);
        assert_eq!(report.missing_values, 2);
    }

    #[test]
    fn keeps_last_duplicate_and_reports_conflict() {
        let raw = vec![
            RawObservation::new(d(2024, 1, 1), 1.0),
            RawObservation::new(d(2024, 1, 2), 2.0),
            RawObservation::new(d(2024, 1, 2), 2.5),
            RawObservation::new(d(2024, 1, 1), 1.0),
        ];

        let (series, report) = SeriesNormalizer::new().normalize(&raw).unwrap();

        assert_eq!(series.values(), &[1.0, 2.5]);
        assert_eq!(report.duplicates, 2);
        assert_eq!(
            report.conflicts,
            vec![DuplicateConflict { date: d(2024, 1, 2), kept: 2.5, discarded: 2.0 }]
        );
    }

    #[test]
    fn reject_policy_fails_on_conflict() {
        let raw = vec![
            RawObservation::new(d(2024, 1, 2), 2.0),
            RawObservation::new(d(2024, 1, 2), 2.5),
        ];
        let normalizer = SeriesNormalizer::with_config(NormalizeConfig {
            duplicate_policy: DuplicatePolicy::Reject,
            ..Default::default()
        });

        let err = normalizer.normalize(&raw).unwrap_err();
        assert!(matches!(err, UtilsError::ConflictingDuplicate { kept, .. } if kept == 2.5));
    }

    #[test]
    fn fewer_than_two_is_insufficient() {
        let raw = vec![
            RawObservation::new(d(2024, 1, 1), 1.0),
            RawObservation::new(d(2024, 1, 1), 1.1),
        ];
        let err = normalize_observations(&raw).unwrap_err();
        assert!(matches!(err, UtilsError::InsufficientData { required: 2, actual: 1 }));
    }

    #[rstest]
    #[case("2024-03-15", d(2024, 3, 15))]
    #[case("20240315", d(2024, 3, 15))]
    #[case("202403", d(2024, 3, 1))]
    #[case("2024-03-15 16:00:00", d(2024, 3, 15))]
    #[case("2024-03-15T23:30:00-05:00", d(2024, 3, 15))]
    fn text_dates(#[case] text: &str, #[case] expected: Date) {
        assert_eq!(coerce_date(&RawDate::from(text)), Some(expected));
    }

    #[test]
    fn zoned_dates_keep_wall_clock() {
        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        let dt = tz.with_ymd_and_hms(2024, 3, 16, 0, 30, 0).unwrap();
        // 2024-03-15 15:30 UTC, but the local calendar day is the 16th
        assert_eq!(coerce_date(&RawDate::Zoned(dt)), Some(d(2024, 3, 16)));
    }

    #[rstest]
    #[case(RawValue::Text(" 4.25 ".to_string()), Some(4.25))]
    #[case(RawValue::Text(String::new()), None)]
    #[case(RawValue::Text("n/a".to_string()), None)]
    #[case(RawValue::Number(f64::INFINITY), None)]
    #[case(RawValue::Missing, None)]
    fn values(#[case] raw: RawValue, #[case] expected: Option<f64>) {
        assert_eq!(coerce_value(&raw), expected);
    }

    #[test]
    fn unparseable_dates_are_counted() {
        let raw = vec![
            RawObservation::new("not a date", 1.0),
            RawObservation::new(d(2024, 1, 1), 1.0),
            RawObservation::new(d(2024, 1, 2), 1.0),
        ];
        let (_, report) = SeriesNormalizer::new().normalize(&raw).unwrap();
        assert_eq!(report.unparseable_dates, 1);
        assert_eq!(report.input_rows, 3);
    }
}
