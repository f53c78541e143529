//! # sitepack-strip
//!
//! The transpiler stage: erases type syntax from the typed dialect,
//! producing plain runtime code. Erasure replaces type-only source ranges
//! with spaces, so byte offsets, line numbers and columns all survive,
//! which keeps downstream span edits valid and makes the transform
//! trivially deterministic. Constructs whose runtime behavior erasure
//! cannot express (`enum`, `namespace`, constructor parameter properties)
//! are rejected with a located error.

mod error;
mod strip;

pub use error::TranspileError;
pub use strip::strip_types;
