#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/factorbeta/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod observations;
pub use observations::CsvFactorObservations;

mod definitions;
pub use definitions::{CsvFactorDefinitions, DefinitionRecord};

mod securities;
pub use securities::{SecurityRecord, read_securities};

mod prices;
pub use prices::{CsvPriceSource, PriceSourceConfig};

mod store;
pub use store::{MemoryEstimateStore, MemoryLagPolicyStore};

mod export;
pub use export::{EstimateRecord, write_csv, write_estimates};

mod error;
pub use error::IoError;
