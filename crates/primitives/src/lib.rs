#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/factorbeta/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod security;
pub use security::{Security, SecurityCode};

mod factor;
pub use factor::{DEFAULT_DURATION_YEARS, FactorCode, FactorDefinition, Frequency, TransformRule};

mod series;
pub use series::{Level, LevelSeries, Return, ReturnSeries, TimeSeries};

mod observation;
pub use observation::{RawDate, RawObservation, RawValue};

mod estimate;
pub use estimate::{BetaEstimate, EstimateKey, Method, Provenance};

mod error;
pub use error::{DefinitionError, SeriesError};

/// Re-export common date type.
pub type Date = chrono::NaiveDate;
