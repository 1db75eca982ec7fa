#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/factorbeta/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod log_return;
pub use log_return::LogReturn;

mod diff_pp;
pub use diff_pp::DiffPp;

mod duration_return;
pub use duration_return::{DurationConfig, DurationReturn};

mod registry;
pub use registry::{apply_rule, transform_by_name, transform_for};
