//! Duration-approximated bond return transform.

use factorbeta_primitives::{DEFAULT_DURATION_YEARS, LevelSeries, ReturnSeries, TransformRule};
use factorbeta_traits::ReturnTransform;

/// Configuration for the duration return transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationConfig {
    /// Modified duration in years.
    pub duration_years: f64,
}

impl Default for DurationConfig {
    fn default() -> Self {
        Self { duration_years: DEFAULT_DURATION_YEARS }
    }
}

/// Price return implied by a yield or spread move: `-D * Δy / 100`.
///
/// Typical durations: 8.5 for a 10y government yield, 4.5 for a high-yield
/// OAS, 6.0 for an investment-grade OAS.
#[derive(Debug, Clone, Copy, Default)]
pub struct DurationReturn {
    config: DurationConfig,
}

impl DurationReturn {
    /// Create a transform with the default duration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DurationConfig::default())
    }

    /// Create a transform with a custom configuration.
    #[must_use]
    pub const fn with_config(config: DurationConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &DurationConfig {
        &self.config
    }
}

impl ReturnTransform for DurationReturn {
    fn apply(&self, levels: &LevelSeries) -> ReturnSeries {
        let duration = self.config.duration_years;
        let v = levels.values();
        ReturnSeries::collect_ordered(
            levels
                .dates()
                .iter()
                .enumerate()
                .skip(1)
                .map(|(i, &d)| (d, -duration * (v[i] - v[i - 1]) / 100.0)),
        )
    }

    fn rule(&self) -> TransformRule {
        TransformRule::DurationReturn { duration_years: self.config.duration_years }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use factorbeta_primitives::Date;
    use rstest::rstest;

    use super::*;

    fn yields() -> LevelSeries {
        let dates = (1..=3).map(|d| Date::from_ymd_opt(2024, 7, d).unwrap()).collect();
        LevelSeries::try_new(dates, vec![4.00, 4.10, 4.05]).unwrap()
    }

    #[test]
    fn default_duration() {
        let out = DurationReturn::new().apply(&yields());
        assert_eq!(out.len(), 2);
        // +10bp at D = 8.5 is a -0.85% price move
        assert_relative_eq!(out.values()[0], -0.0085, epsilon = 1e-12);
        assert_relative_eq!(out.values()[1], 0.00425, epsilon = 1e-12);
    }

    #[rstest]
    #[case(4.5, -0.0045)]
    #[case(6.0, -0.006)]
    fn configured_duration(#[case] duration_years: f64, #[case] first: f64) {
        let transform = DurationReturn::with_config(DurationConfig { duration_years });
        let out = transform.apply(&yields());
        assert_relative_eq!(out.values()[0], first, epsilon = 1e-12);
        assert_eq!(transform.rule(), TransformRule::DurationReturn { duration_years });
    }
}
