//! Raw observation types as delivered by data collaborators.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::Date;

/// Timestamp of a raw observation, in whatever shape the provider used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawDate {
    /// Calendar date.
    Date(Date),
    /// Date-time without a zone.
    Naive(NaiveDateTime),
    /// Date-time carrying a UTC offset.
    Zoned(DateTime<FixedOffset>),
    /// Unparsed text.
    Text(String),
}

impl From<Date> for RawDate {
    fn from(d: Date) -> Self {
        Self::Date(d)
    }
}

impl From<&str> for RawDate {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Value of a raw observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawValue {
    /// Numeric value.
    Number(f64),
    /// Unparsed text.
    Text(String),
    /// Provider reported no value.
    Missing,
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<Option<f64>> for RawValue {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Self::Missing, Self::Number)
    }
}

/// One `(date, value)` pair for a single entity, in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    /// Observation timestamp.
    pub date: RawDate,
    /// Observed value.
    pub value: RawValue,
}

impl RawObservation {
    /// Create a new raw observation.
    #[must_use]
    pub fn new(date: impl Into<RawDate>, value: impl Into<RawValue>) -> Self {
        Self { date: date.into(), value: value.into() }
    }
}
