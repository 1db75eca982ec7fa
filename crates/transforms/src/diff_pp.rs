//! Percentage-point difference transform.

use factorbeta_primitives::{LevelSeries, ReturnSeries, TransformRule};
use factorbeta_traits::ReturnTransform;

/// First difference of a level quoted in percent, e.g. a yield or a spread.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffPp;

impl DiffPp {
    /// Create a new difference transform.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ReturnTransform for DiffPp {
    fn apply(&self, levels: &LevelSeries) -> ReturnSeries {
        let v = levels.values();
        ReturnSeries::collect_ordered(
            levels.dates().iter().enumerate().skip(1).map(|(i, &d)| (d, v[i] - v[i - 1])),
        )
    }

    fn rule(&self) -> TransformRule {
        TransformRule::DiffPp
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use factorbeta_primitives::Date;

    use super::*;

    #[test]
    fn diff_pp_values() {
        let dates = (1..=4).map(|d| Date::from_ymd_opt(2024, 5, d).unwrap()).collect();
        let levels = LevelSeries::try_new(dates, vec![4.25, 4.30, 4.10, 4.10]).unwrap();

        let out = DiffPp.apply(&levels);

        assert_eq!(out.len(), 3);
        assert_eq!(out.first_date(), Some(Date::from_ymd_opt(2024, 5, 2).unwrap()));
        assert_relative_eq!(out.values()[0], 0.05, epsilon = 1e-12);
        assert_relative_eq!(out.values()[1], -0.20, epsilon = 1e-12);
        assert_relative_eq!(out.values()[2], 0.0);
    }

    #[test]
    fn diff_pp_single_level_is_empty() {
        let levels =
            LevelSeries::try_new(vec![Date::from_ymd_opt(2024, 5, 1).unwrap()], vec![1.0]).unwrap();
        assert!(DiffPp.apply(&levels).is_empty());
    }
}
