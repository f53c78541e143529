//! # sitepack-assets
//!
//! The asset-locator stage: finds `new URL('<literal>', import.meta.url)`
//! references in modules, resolves them against the referencing module's
//! own directory, contributes copy entries to the output manifest, and
//! produces the span edits that point the bundle at the emitted copies.

mod locator;

pub use locator::{locate_assets, AssetRef};
