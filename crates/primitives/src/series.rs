//! Date-indexed series type definitions.

use std::marker::PhantomData;

use crate::{Date, SeriesError};

/// Marker for series of price or index levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level;

/// Marker for series of period returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Return;

/// A single-entity time series with strictly increasing dates and finite values.
///
/// The marker `K` records whether the values are levels or returns, so a level
/// series can't be regressed by accident.
#[derive(Debug, PartialEq)]
pub struct TimeSeries<K> {
    dates: Vec<Date>,
    values: Vec<f64>,
    kind: PhantomData<K>,
}

/// Series of levels (prices, yields, index values).
pub type LevelSeries = TimeSeries<Level>;

/// Series of returns derived from a [`LevelSeries`].
pub type ReturnSeries = TimeSeries<Return>;

impl<K> TimeSeries<K> {
    /// Create a series, validating its invariants.
    ///
    /// # Errors
    /// Returns [`SeriesError`] if lengths differ, dates are not strictly
    /// increasing, or any value is non-finite.
    pub fn try_new(dates: Vec<Date>, values: Vec<f64>) -> Result<Self, SeriesError> {
        if dates.len() != values.len() {
            return Err(SeriesError::LengthMismatch { dates: dates.len(), values: values.len() });
        }
        for (i, (&date, value)) in dates.iter().zip(&values).enumerate() {
            if i > 0 && dates[i - 1] >= date {
                return Err(SeriesError::NotIncreasing(date));
            }
            if !value.is_finite() {
                return Err(SeriesError::NonFinite(date));
            }
        }
        Ok(Self { dates, values, kind: PhantomData })
    }

    /// Create an empty series.
    #[must_use]
    pub const fn empty() -> Self {
        Self { dates: Vec::new(), values: Vec::new(), kind: PhantomData }
    }

    /// Collect `(date, value)` pairs that are already in date order, skipping
    /// pairs that would break the invariants (non-finite, or not after the
    /// previous date).
    pub fn collect_ordered(pairs: impl IntoIterator<Item = (Date, f64)>) -> Self {
        let mut dates: Vec<Date> = Vec::new();
        let mut values = Vec::new();
        for (date, value) in pairs {
            if !value.is_finite() || dates.last().is_some_and(|last| *last >= date) {
                continue;
            }
            dates.push(date);
            values.push(value);
        }
        Self { dates, values, kind: PhantomData }
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Observation dates, ascending.
    #[must_use]
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Observation values, aligned with [`Self::dates`].
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Iterate `(date, value)` pairs in date order.
    pub fn iter(&self) -> impl Iterator<Item = (Date, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// First observation date.
    #[must_use]
    pub fn first_date(&self) -> Option<Date> {
        self.dates.first().copied()
    }

    /// Last observation date.
    #[must_use]
    pub fn last_date(&self) -> Option<Date> {
        self.dates.last().copied()
    }

    /// Value observed on `date`.
    #[must_use]
    pub fn get(&self, date: Date) -> Option<f64> {
        self.dates.binary_search(&date).ok().map(|i| self.values[i])
    }

    /// Shift values along the series' own observation index.
    ///
    /// With a positive `lag` the value recorded at position `t` is attributed
    /// to position `t + lag`; the first `lag` dates have no value and are
    /// dropped. A negative lag moves values the other way and drops the tail.
    #[must_use]
    pub fn shifted(&self, lag: i32) -> Self {
        let n = self.len();
        let k = lag.unsigned_abs() as usize;
        if k == 0 {
            return self.clone();
        }
        if k >= n {
            return Self::empty();
        }
        let (dates, values) = if lag > 0 {
            (self.dates[k..].to_vec(), self.values[..n - k].to_vec())
        } else {
            (self.dates[..n - k].to_vec(), self.values[k..].to_vec())
        };
        Self { dates, values, kind: PhantomData }
    }

    /// Keep only observations within `[start, end]`.
    #[must_use]
    pub fn between(&self, start: Date, end: Date) -> Self {
        Self::collect_ordered(self.iter().filter(|(d, _)| *d >= start && *d <= end))
    }
}

// Manual impl: the marker needn't be `Clone`.
impl<K> Clone for TimeSeries<K> {
    fn clone(&self) -> Self {
        Self { dates: self.dates.clone(), values: self.values.clone(), kind: PhantomData }
    }
}

impl<K> Default for TimeSeries<K> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn d(day: u32) -> Date {
        Date::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample() -> ReturnSeries {
        ReturnSeries::try_new(vec![d(2), d(3), d(4), d(5)], vec![0.1, 0.2, 0.3, 0.4]).unwrap()
    }

    #[test]
    fn try_new_rejects_unsorted() {
        let err = LevelSeries::try_new(vec![d(3), d(2)], vec![1.0, 2.0]).unwrap_err();
        assert_eq!(err, SeriesError::NotIncreasing(d(2)));
    }

    #[test]
    fn try_new_rejects_duplicates_and_nan() {
        assert!(LevelSeries::try_new(vec![d(2), d(2)], vec![1.0, 2.0]).is_err());
        let err = LevelSeries::try_new(vec![d(2), d(3)], vec![1.0, f64::NAN]).unwrap_err();
        assert_eq!(err, SeriesError::NonFinite(d(3)));
    }

    #[test]
    fn collect_ordered_skips_bad_pairs() {
        let s = LevelSeries::collect_ordered([
            (d(2), 1.0),
            (d(2), 5.0),
            (d(3), f64::INFINITY),
            (d(4), 2.0),
        ]);
        assert_eq!(s.dates(), &[d(2), d(4)]);
        assert_eq!(s.values(), &[1.0, 2.0]);
    }

    #[test]
    fn shift_forward_delays_values() {
        let s = sample().shifted(1);
        assert_eq!(s.dates(), &[d(3), d(4), d(5)]);
        assert_eq!(s.values(), &[0.1, 0.2, 0.3]);
    }

    #[test]
    fn shift_backward_leads_values() {
        let s = sample().shifted(-2);
        assert_eq!(s.dates(), &[d(2), d(3)]);
        assert_eq!(s.values(), &[0.3, 0.4]);
    }

    #[rstest]
    #[case(4)]
    #[case(-7)]
    fn shift_past_length_is_empty(#[case] lag: i32) {
        assert!(sample().shifted(lag).is_empty());
    }

    #[test]
    fn zero_shift_is_a_copy() {
        let s = sample();
        assert_eq!(s.shifted(0), s);
    }

    #[test]
    fn clone_needs_no_marker_bound() {
        #[derive(Debug, PartialEq)]
        struct Opaque;

        let s = TimeSeries::<Opaque>::try_new(vec![d(2), d(3)], vec![1.0, 2.0]).unwrap();
        assert_eq!(s.shifted(0), s.clone());
        assert_eq!(s.shifted(1).values(), &[1.0]);
    }

    #[test]
    fn get_and_between() {
        let s = sample();
        assert_eq!(s.get(d(4)), Some(0.3));
        assert_eq!(s.get(d(9)), None);
        assert_eq!(s.between(d(3), d(4)).len(), 2);
    }
}
