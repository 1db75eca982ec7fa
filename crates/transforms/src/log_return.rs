//! Log return transform.

use factorbeta_primitives::{LevelSeries, ReturnSeries, TransformRule};
use factorbeta_traits::ReturnTransform;

/// Continuously compounded return between consecutive positive levels.
///
/// Non-positive levels are outside the domain of the logarithm. They are
/// removed before differencing, so the return on the next positive level is
/// measured against the previous positive one.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReturn;

impl LogReturn {
    /// Create a new log return transform.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ReturnTransform for LogReturn {
    fn apply(&self, levels: &LevelSeries) -> ReturnSeries {
        let positive: Vec<_> = levels.iter().filter(|(_, l)| *l > 0.0).collect();
        ReturnSeries::collect_ordered(
            positive.windows(2).map(|w| (w[1].0, w[1].1.ln() - w[0].1.ln())),
        )
    }

    fn rule(&self) -> TransformRule {
        TransformRule::LogReturn
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use factorbeta_primitives::Date;

    use super::*;

    fn levels(values: &[f64]) -> LevelSeries {
        let dates = (1..=values.len() as u32).map(|d| Date::from_ymd_opt(2024, 3, d).unwrap());
        LevelSeries::try_new(dates.collect(), values.to_vec()).unwrap()
    }

    #[test]
    fn log_return_values() {
        let out = LogReturn.apply(&levels(&[100.0, 110.0, 99.0]));
        assert_eq!(out.len(), 2);
        assert_relative_eq!(out.values()[0], (1.1_f64).ln(), epsilon = 1e-12);
        assert_relative_eq!(out.values()[1], (0.9_f64).ln(), epsilon = 1e-12);
    }

    #[test]
    fn log_return_drops_non_positive_levels_first() {
        let input = levels(&[100.0, 0.0, -5.0, 120.0]);
        let out = LogReturn.apply(&input);
        assert_eq!(out.len(), 1);
        assert_eq!(out.dates()[0], input.dates()[3]);
        assert_relative_eq!(out.values()[0], (1.2_f64).ln(), epsilon = 1e-12);
    }

    #[test]
    fn log_return_length_is_n_minus_one() {
        let out = LogReturn.apply(&levels(&[1.0, 2.0, 3.0, 4.0, 5.0]));
        assert_eq!(out.len(), 4);
        assert_eq!(LogReturn.name(), "log_return");
    }
}
