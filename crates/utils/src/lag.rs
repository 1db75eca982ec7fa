//! Per-factor lag resolution and alignment.

use factorbeta_primitives::{FactorCode, FactorDefinition, ReturnSeries};

/// Factors observed on U.S. hours, which a non-U.S. security only reacts to on
/// its next session.
pub const DEFAULT_DELAY_SENSITIVE_FACTORS: [&str; 6] = [
    "F_GROWTH_US_EQ",
    "F_RATE_US10Y",
    "F_VOL_VIX",
    "F_CREDIT_US_HY_OAS",
    "F_INFL_US_BE10Y",
    "F_COMM_OIL_WTI",
];

/// Lag defaults applied when factor metadata has no explicit lag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LagPolicy {
    /// Lag for factors without an explicit policy.
    pub lag_default: i32,
    /// Lag for delay-sensitive factors without an explicit policy.
    pub delay_sensitive_lag: i32,
    /// Delay-sensitive factor codes.
    pub delay_sensitive_factors: Vec<FactorCode>,
}

impl Default for LagPolicy {
    fn default() -> Self {
        Self {
            lag_default: 0,
            delay_sensitive_lag: 1,
            delay_sensitive_factors: DEFAULT_DELAY_SENSITIVE_FACTORS
                .iter()
                .map(|c| FactorCode::from(*c))
                .collect(),
        }
    }
}

impl LagPolicy {
    /// Lag in observations for `definition`.
    #[must_use]
    pub fn resolve(&self, definition: &FactorDefinition) -> i32 {
        if let Some(lag) = definition.lag {
            return lag;
        }
        if self.delay_sensitive_factors.contains(&definition.code) {
            self.delay_sensitive_lag
        } else {
            self.lag_default
        }
    }
}

/// First signed integer embedded in a free-text lag policy, e.g. `"lag=1"`,
/// `"-2 obs"` or `"T+1"`.
#[must_use]
pub fn parse_lag_policy(text: &str) -> Option<i32> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(u8::is_ascii_digit)?;
    let end = bytes[start..].iter().position(|b| !b.is_ascii_digit()).map_or(bytes.len(), |n| start + n);
    let negative = start > 0 && bytes[start - 1] == b'-';
    let magnitude: i32 = text[start..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Shift `series` by `lag` observations on its own index.
///
/// `[r1, r2, r3, ...]` with lag 1 becomes `[-, r1, r2, ...]`; the leading
/// position has no value and is dropped.
#[must_use]
pub fn align_lag(series: &ReturnSeries, lag: i32) -> ReturnSeries {
    series.shifted(lag)
}
