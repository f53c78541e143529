//! Token-pattern detection of runtime-relative asset references.
//!
//! Detection is token-aware rather than text-based: the pattern below can
//! never match inside a comment or a larger string, and a dynamic first
//! argument (template literal, concatenation) is simply not a match. A
//! full parse would buy nothing for an eleven-token pattern.

use std::path::{Path, PathBuf};

use sitepack_graph::{ModuleNode, OutputManifest, Span, TextEdit};
use sitepack_lexer::{Lexer, Token, TokenKind};
use tracing::warn;

/// Subdirectory of the output directory that scanned assets land in.
const ASSET_DIR: &str = "assets";

/// A file path embedded in source code pointing to a non-code resource.
#[derive(Debug, Clone)]
pub struct AssetRef {
    /// Module containing the reference.
    pub module: PathBuf,
    /// The path literal as written.
    pub literal: String,
    /// Span of the string literal, including quotes.
    pub span: Span,
}

/// Scan one module for asset references. Every reference to an existing
/// file is appended to the manifest (deduplicated by resolved source path)
/// and yields an edit rewriting the literal to the emitted location.
/// References to missing files are logged and skipped; a stale path in
/// otherwise-valid code must not fail the build.
pub fn locate_assets(node: &ModuleNode, manifest: &mut OutputManifest) -> Vec<TextEdit> {
    let tokens = Lexer::new(&node.source).tokenize();
    let mut edits = Vec::new();

    for asset in find_asset_refs(&tokens, &node.path) {
        if asset.literal.is_empty()
            || asset.literal.starts_with('/')
            || asset.literal.contains("://")
            || asset.literal.starts_with("data:")
        {
            continue;
        }

        let module_dir = match node.path.parent() {
            Some(dir) => dir,
            None => continue,
        };
        let candidate = module_dir.join(&asset.literal);

        let resolved = match candidate.canonicalize() {
            Ok(path) if path.is_file() => path,
            _ => {
                warn!(
                    module = %node.path.display(),
                    asset = %asset.literal,
                    "referenced asset not found; skipping"
                );
                continue;
            }
        };

        let file_name = resolved
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("asset"));
        let dest = manifest.insert(resolved, Path::new(ASSET_DIR).join(file_name));

        let quote = node.source[asset.span.start..].chars().next().unwrap_or('\'');
        edits.push(TextEdit::new(
            asset.span,
            format!("{}./{}{}", quote, dest.display(), quote),
        ));
    }

    edits
}

/// Find every `new URL(<string literal>, import.meta.url)` occurrence.
pub fn find_asset_refs(tokens: &[Token], module: &Path) -> Vec<AssetRef> {
    let mut refs = Vec::new();

    for window in tokens.windows(11) {
        let is_match = window[0].kind == TokenKind::New
            && window[1].kind == TokenKind::Identifier
            && window[1].value == "URL"
            && window[2].kind == TokenKind::LParen
            && window[3].kind == TokenKind::StringLiteral
            && window[4].kind == TokenKind::Comma
            && window[5].kind == TokenKind::Import
            && window[6].kind == TokenKind::Dot
            && window[7].kind == TokenKind::Identifier
            && window[7].value == "meta"
            && window[8].kind == TokenKind::Dot
            && window[9].kind == TokenKind::Identifier
            && window[9].value == "url"
            && window[10].kind == TokenKind::RParen;

        if is_match {
            refs.push(AssetRef {
                module: module.to_path_buf(),
                literal: window[3].value.clone(),
                span: window[3].span,
            });
        }
    }

    refs
}
