//! Transpile error types

use std::path::PathBuf;

use sitepack_graph::Span;
use thiserror::Error;

/// A syntax or unsupported-construct error, located to a file position.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}:{}:{}: {}", path.display(), line, column, message)]
pub struct TranspileError {
    pub path: PathBuf,
    /// 1-based line of the offending token.
    pub line: usize,
    /// 1-based column of the offending token.
    pub column: usize,
    pub span: Span,
    pub message: String,
}
