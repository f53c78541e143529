//! # sitepack-resolve
//!
//! The entry-resolver stage: scans modules for import/export references,
//! maps specifiers to files on disk (relative, absolute, and bare package
//! names via node_modules), and walks the full graph from one entry point.

pub mod discover;
pub mod error;
pub mod package;
pub mod resolver;
pub mod scan;

pub use discover::discover;
pub use error::ResolveError;
pub use resolver::ModuleResolver;
pub use scan::scan_module;
