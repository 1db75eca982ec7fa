#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/factorbeta/issues/")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

// Only the binary uses these.
#[cfg(feature = "cli")]
use {chrono as _, clap as _, tracing as _, tracing_subscriber as _};

#[cfg(feature = "primitives")]
#[doc(inline)]
pub use factorbeta_primitives as primitives;
#[cfg(feature = "traits")]
#[doc(inline)]
pub use factorbeta_traits as traits;
#[cfg(feature = "math")]
#[doc(inline)]
pub use factorbeta_math as math;
#[cfg(feature = "transforms")]
#[doc(inline)]
pub use factorbeta_transforms as transforms;
#[cfg(feature = "model")]
#[doc(inline)]
pub use factorbeta_model as model;
#[cfg(feature = "utils")]
#[doc(inline)]
pub use factorbeta_utils as utils;
#[cfg(feature = "io")]
#[doc(inline)]
pub use factorbeta_io as io;
