//! Resolution error types

use std::path::PathBuf;

use sitepack_graph::Span;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    /// An import specifier could not be mapped to a file on disk. Carries
    /// the offending specifier, the referencing module, and the specifier's
    /// source span for diagnostics.
    #[error("cannot resolve import '{}' from {}: {}", specifier, from.display(), detail)]
    UnresolvedModule {
        specifier: String,
        from: PathBuf,
        span: Span,
        detail: String,
    },

    #[error("failed to read module {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
