//! Monthly-to-daily frequency harmonization.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, Months, Weekday};
use factorbeta_primitives::{Date, ReturnSeries};
use tracing::warn;

/// Configuration for frequency harmonization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarmonizeConfig {
    /// Months between an observation date and its release.
    pub release_lag_months: u32,
}

impl Default for HarmonizeConfig {
    fn default() -> Self {
        Self { release_lag_months: 1 }
    }
}

/// Expands monthly returns onto the weekday calendar.
///
/// Each monthly return lands on its release date only; every other weekday in
/// the window carries a zero return.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrequencyHarmonizer {
    config: HarmonizeConfig,
}

impl FrequencyHarmonizer {
    /// Create a harmonizer with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HarmonizeConfig::default())
    }

    /// Create a harmonizer with custom configuration.
    #[must_use]
    pub const fn with_config(config: HarmonizeConfig) -> Self {
        Self { config }
    }

    /// Release date of an observation dated `observed`.
    ///
    /// Month arithmetic clamps to the end of the target month, and a release
    /// falling on a weekend moves to the following Monday.
    #[must_use]
    pub fn release_date(&self, observed: Date) -> Option<Date> {
        observed.checked_add_months(Months::new(self.config.release_lag_months)).map(next_weekday)
    }

    /// Daily series over the weekdays of `[start, end]`.
    ///
    /// Returns an empty series when no release date falls inside the window.
    /// Observations sharing a release date (month-end clamping, weekend
    /// rollover) keep the latest one, and each collision is logged.
    #[must_use]
    pub fn harmonize(&self, monthly: &ReturnSeries, start: Date, end: Date) -> ReturnSeries {
        let mut releases: BTreeMap<Date, f64> = BTreeMap::new();
        for (observed, value) in monthly.iter() {
            let Some(release) = self.release_date(observed) else { continue };
            if release < start || release > end {
                continue;
            }
            if let Some(dropped) = releases.insert(release, value) {
                warn!(
                    %release,
                    %observed,
                    kept = value,
                    dropped,
                    "monthly observations share a release date"
                );
            }
        }

        if releases.is_empty() {
            return ReturnSeries::empty();
        }

        ReturnSeries::collect_ordered(
            weekday_calendar(start, end)
                .into_iter()
                .map(|day| (day, releases.get(&day).copied().unwrap_or(0.0))),
        )
    }
}

/// Weekdays (Monday to Friday) within `[start, end]`.
#[must_use]
pub fn weekday_calendar(start: Date, end: Date) -> Vec<Date> {
    start.iter_days().take_while(|d| *d <= end).filter(|d| !is_weekend(*d)).collect()
}

fn is_weekend(date: Date) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn next_weekday(date: Date) -> Date {
    match date.weekday() {
        Weekday::Sat => date + Days::new(2),
        Weekday::Sun => date + Days::new(1),
        _ => date,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    fn cpi() -> ReturnSeries {
        ReturnSeries::try_new(vec![d(2023, 12, 31), d(2024, 1, 31)], vec![0.002, 0.004]).unwrap()
    }

    #[test]
    fn month_end_release_lands_on_leap_day() {
        let out = FrequencyHarmonizer::new().harmonize(&cpi(), d(2024, 2, 1), d(2024, 3, 15));

        assert_eq!(out.get(d(2024, 2, 29)), Some(0.004));
        let non_zero: Vec<_> = out.iter().filter(|(_, v)| *v != 0.0).collect();
        assert_eq!(non_zero, vec![(d(2024, 2, 29), 0.004)]);
        // Weekdays of Feb 1 - Mar 15, 2024
        assert_eq!(out.len(), 32);
    }

    #[test]
    fn weekend_release_rolls_to_monday() {
        // 2024-07-31 releases on 2024-08-31, a Saturday
        let monthly = ReturnSeries::try_new(vec![d(2024, 7, 31)], vec![0.01]).unwrap();
        let out = FrequencyHarmonizer::new().harmonize(&monthly, d(2024, 8, 26), d(2024, 9, 6));

        assert_eq!(out.get(d(2024, 9, 2)), Some(0.01));
        assert_eq!(out.get(d(2024, 8, 30)), Some(0.0));
    }

    #[test]
    fn no_release_in_window_is_empty() {
        let out = FrequencyHarmonizer::new().harmonize(&cpi(), d(2024, 3, 1), d(2024, 3, 31));
        assert!(out.is_empty());
    }

    #[test]
    fn harmonize_is_deterministic() {
        let h = FrequencyHarmonizer::new();
        let a = h.harmonize(&cpi(), d(2024, 1, 1), d(2024, 3, 1));
        let b = h.harmonize(&cpi(), d(2024, 1, 1), d(2024, 3, 1));
        assert_eq!(a.dates(), b.dates());
        let bits = |s: &ReturnSeries| s.values().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn shared_release_date_keeps_latest_observation() {
        // Jan 30 and Jan 31 both clamp to Feb 29 with a one-month lag
        let monthly =
            ReturnSeries::try_new(vec![d(2024, 1, 30), d(2024, 1, 31)], vec![0.001, 0.004])
                .unwrap();
        let out = FrequencyHarmonizer::new().harmonize(&monthly, d(2024, 2, 26), d(2024, 3, 1));

        assert_eq!(out.get(d(2024, 2, 29)), Some(0.004));
        assert_eq!(out.iter().filter(|(_, v)| *v != 0.0).count(), 1);
    }

    #[rstest]
    #[case(0, d(2024, 1, 31))]
    #[case(1, d(2024, 2, 29))]
    #[case(2, d(2024, 4, 1))]
    fn release_lag_months(#[case] lag: u32, #[case] expected: Date) {
        // 2024-03-31 is a Sunday
        let h = FrequencyHarmonizer::with_config(HarmonizeConfig { release_lag_months: lag });
        assert_eq!(h.release_date(d(2024, 1, 31)), Some(expected));
    }

    #[test]
    fn calendar_skips_weekends() {
        let days = weekday_calendar(d(2024, 6, 7), d(2024, 6, 10));
        assert_eq!(days, vec![d(2024, 6, 7), d(2024, 6, 10)]);
    }
}
