#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/factorbeta/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod normalize;
pub use normalize::{
    DuplicateConflict, DuplicatePolicy, NormalizeConfig, NormalizeReport, SeriesNormalizer,
    coerce_date, coerce_value, normalize_observations,
};

mod harmonize;
pub use harmonize::{FrequencyHarmonizer, HarmonizeConfig, weekday_calendar};

mod lag;
pub use lag::{DEFAULT_DELAY_SENSITIVE_FACTORS, LagPolicy, align_lag, parse_lag_policy};

mod matrix;
pub use matrix::{
    DATE_COLUMN, FactorExclusion, FactorMatrix, FactorMatrixBuilder, MatrixBuild, MatrixConfig,
    date_values, f64_values, series_frame,
};

mod error;
pub use error::UtilsError;
