//! # sitepack-driver
//!
//! Build orchestration for the sitepack CLI: configuration loading and
//! merging, the straight-line pipeline (discover → locate assets → strip
//! → link → emit), and the aggregate error type the binary reports.

pub mod config;
pub mod error;
pub mod pipeline;

pub use config::{BuildOptions, ConfigError, ConfigFile, StaticCopy};
pub use error::BuildError;
pub use pipeline::{run_build, BuildReport};
