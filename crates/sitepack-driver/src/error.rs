//! Aggregate build error.

use thiserror::Error;

use crate::config::ConfigError;
use sitepack_emit::EmitError;
use sitepack_resolve::ResolveError;
use sitepack_strip::TranspileError;

/// Any failure a build can end with. Resolution and transpile errors
/// abort before emission; an emit error is the only failure that can
/// occur after the pipeline has produced output text.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Transpile(#[from] TranspileError),

    #[error(transparent)]
    Emit(#[from] EmitError),
}
