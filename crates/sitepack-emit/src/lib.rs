//! # sitepack-emit
//!
//! The back end of the pipeline: links stripped modules into one bundle
//! (dependencies first, entry last, import/export statements rewritten by
//! span) and emits the output directory atomically; bundle plus every
//! manifest copy goes through a temp file and a rename, so no partially
//! written file is ever visible under its final name.

mod emitter;
mod link;

pub use emitter::{emit, EmitError, EmitPlan, EmitReport};
pub use link::{link, OutputFormat};
