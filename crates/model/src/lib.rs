#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/factorbeta/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod config;
pub use config::{CalibrationConfig, EngineConfig, MIN_NOBS, RunConfig, WINDOW_DAYS};

mod ols;
pub use ols::{OlsConfig, OlsEstimator};

mod engine;
pub use engine::{
    BetaEngine, BetaEstimation, Diagnostics, FactorFailure, FactorOverlap, MultiFactorFit,
    MultiOutcome, SingleFactorFit, estimate_betas,
};

mod calibrate;
pub use calibrate::{LagCalibration, LagCalibrator, LagCandidate, calibrate_lags};

mod symbols;
pub use symbols::{SymbolCandidates, symbol_candidates};

mod report;
pub use report::{ReportRow, RunSummary, Status};

mod run;
pub use run::{BatchRunner, RunOutput};

mod error;
pub use error::ModelError;

/// Re-export commonly used types.
pub mod prelude {
    pub use factorbeta_traits::BetaEstimator;

    pub use super::{
        BatchRunner, BetaEngine, BetaEstimation, EngineConfig, ModelError, RunConfig,
        estimate_betas,
    };
}
