//! Factor-related type definitions.

use std::{fmt, str::FromStr};

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::{DefinitionError, SecurityCode};

/// Modified duration assumed by `duration_return` when none is configured.
pub const DEFAULT_DURATION_YEARS: f64 = 8.5;

/// Code of a factor, e.g. `F_RATE_US10Y`.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FactorCode(pub String);

impl FactorCode {
    /// Create a new factor code.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the factor code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FactorCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Native sampling frequency of a factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// One observation per trading day.
    Daily,
    /// One observation per month.
    Monthly,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => f.write_str("D"),
            Self::Monthly => f.write_str("M"),
        }
    }
}

impl FromStr for Frequency {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "d" | "daily" => Ok(Self::Daily),
            "m" | "monthly" => Ok(Self::Monthly),
            other => Err(DefinitionError::UnsupportedFrequency(other.to_string())),
        }
    }
}

/// Rule converting a level series into a return series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum TransformRule {
    /// `ln(l[t]) - ln(l[t-1])` over strictly positive levels.
    LogReturn,
    /// First difference in the level's own units (percentage points).
    DiffPp,
    /// Price-return approximation of a yield change: `-D * Δl / 100`.
    DurationReturn {
        /// Modified duration in years.
        duration_years: f64,
    },
}

impl TransformRule {
    /// Name of the rule as stored in factor metadata.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LogReturn => "log_return",
            Self::DiffPp => "diff_pp",
            Self::DurationReturn { .. } => "duration_return",
        }
    }

    /// Parse a rule name, attaching a duration to `duration_return`.
    ///
    /// # Errors
    /// Returns [`DefinitionError::UnsupportedTransform`] for unknown names.
    pub fn parse_with_duration(
        name: &str,
        duration_years: Option<f64>,
    ) -> Result<Self, DefinitionError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "log_return" => Ok(Self::LogReturn),
            "diff_pp" => Ok(Self::DiffPp),
            "duration_return" => Ok(Self::DurationReturn {
                duration_years: duration_years.unwrap_or(DEFAULT_DURATION_YEARS),
            }),
            other => Err(DefinitionError::UnsupportedTransform(other.to_string())),
        }
    }
}

impl fmt::Display for TransformRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransformRule {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with_duration(s, None)
    }
}

/// Static description of a factor, owned by the factor metadata store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorDefinition {
    /// Factor code.
    pub code: FactorCode,
    /// Human-readable name.
    pub name: Option<String>,
    /// Native frequency.
    pub frequency: Frequency,
    /// Level-to-return rule.
    pub transform: TransformRule,
    /// Explicit lag in observations, when the metadata carries one.
    pub lag: Option<i32>,
    /// Months between a monthly observation date and its release.
    pub release_lag_months: Option<u32>,
    /// Security used as reference when calibrating the lag.
    pub lag_reference: Option<SecurityCode>,
}

impl FactorDefinition {
    /// Create a definition with no explicit lag, release lag, or reference.
    #[must_use]
    pub fn new(code: impl Into<FactorCode>, frequency: Frequency, transform: TransformRule) -> Self {
        Self {
            code: code.into(),
            name: None,
            frequency,
            transform,
            lag: None,
            release_lag_months: None,
            lag_reference: None,
        }
    }

    /// Set an explicit lag.
    #[must_use]
    pub const fn with_lag(mut self, lag: i32) -> Self {
        self.lag = Some(lag);
        self
    }

    /// Set the calibration reference security.
    #[must_use]
    pub fn with_lag_reference(mut self, security: impl Into<SecurityCode>) -> Self {
        self.lag_reference = Some(security.into());
        self
    }

    /// Whether the factor is sampled monthly.
    #[must_use]
    pub fn is_monthly(&self) -> bool {
        self.frequency == Frequency::Monthly
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("log_return", TransformRule::LogReturn)]
    #[case("DIFF_PP", TransformRule::DiffPp)]
    #[case(" duration_return ", TransformRule::DurationReturn { duration_years: DEFAULT_DURATION_YEARS })]
    fn transform_rule_parses(#[case] input: &str, #[case] expected: TransformRule) {
        assert_eq!(input.parse::<TransformRule>().unwrap(), expected);
    }

    #[test]
    fn transform_rule_rejects_unknown() {
        let err = "pct_change".parse::<TransformRule>().unwrap_err();
        assert!(matches!(err, DefinitionError::UnsupportedTransform(ref s) if s == "pct_change"));
    }

    #[test]
    fn duration_is_attached() {
        let rule = TransformRule::parse_with_duration("duration_return", Some(4.5)).unwrap();
        assert_eq!(rule, TransformRule::DurationReturn { duration_years: 4.5 });
    }

    #[rstest]
    #[case("D", Frequency::Daily)]
    #[case("monthly", Frequency::Monthly)]
    #[case("m", Frequency::Monthly)]
    fn frequency_parses(#[case] input: &str, #[case] expected: Frequency) {
        assert_eq!(input.parse::<Frequency>().unwrap(), expected);
    }

    #[test]
    fn frequency_rejects_weekly() {
        assert!("W".parse::<Frequency>().is_err());
    }

    #[test]
    fn definition_builders() {
        let def = FactorDefinition::new("F_VOL_VIX", Frequency::Daily, TransformRule::LogReturn)
            .with_lag(1)
            .with_lag_reference("005930");
        assert_eq!(def.lag, Some(1));
        assert_eq!(def.lag_reference, Some(SecurityCode::new("005930")));
        assert!(!def.is_monthly());
    }
}
