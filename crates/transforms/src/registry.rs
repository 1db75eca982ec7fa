//! Lookup from transform rules to implementations.

use factorbeta_primitives::{LevelSeries, ReturnSeries, TransformRule};
use factorbeta_traits::{ReturnTransform, TransformError};

use crate::{DiffPp, DurationConfig, DurationReturn, LogReturn};

/// Implementation of `rule`.
#[must_use]
pub fn transform_for(rule: TransformRule) -> Box<dyn ReturnTransform> {
    match rule {
        TransformRule::LogReturn => Box::new(LogReturn),
        TransformRule::DiffPp => Box::new(DiffPp),
        TransformRule::DurationReturn { duration_years } => {
            Box::new(DurationReturn::with_config(DurationConfig { duration_years }))
        }
    }
}

/// Implementation of the rule stored in factor metadata as `name`.
///
/// # Errors
/// Returns [`TransformError::UnsupportedTransform`] for unknown names.
pub fn transform_by_name(
    name: &str,
    duration_years: Option<f64>,
) -> Result<Box<dyn ReturnTransform>, TransformError> {
    Ok(transform_for(TransformRule::parse_with_duration(name, duration_years)?))
}

/// Apply `rule` to `levels`.
#[must_use]
pub fn apply_rule(rule: TransformRule, levels: &LevelSeries) -> ReturnSeries {
    transform_for(rule).apply(levels)
}
