//! Module nodes and the import/export references recorded on them.

use std::path::PathBuf;

use crate::Span;

/// One resolved source file in the build graph.
///
/// Immutable once discovery has produced it; downstream stages only read.
#[derive(Debug, Clone)]
pub struct ModuleNode {
    /// Canonical path to the module file.
    pub path: PathBuf,
    /// Raw source text as read from disk.
    pub source: String,
    /// Import references in source order.
    pub imports: Vec<ImportRef>,
    /// Export references in source order.
    pub exports: Vec<ExportRef>,
}

impl ModuleNode {
    pub fn new(path: PathBuf, source: String) -> Self {
        Self {
            path,
            source,
            imports: Vec::new(),
            exports: Vec::new(),
        }
    }

    /// Resolved local dependencies in source order: static and dynamic
    /// imports plus re-export sources. Type-only references never resolve
    /// and therefore never appear here.
    pub fn dependencies(&self) -> impl Iterator<Item = &PathBuf> {
        let imports = self.imports.iter().filter_map(|i| i.resolved.as_ref());
        let reexports = self.exports.iter().filter_map(|e| match &e.kind {
            ExportKind::Named { from: Some(s), .. } | ExportKind::Star { from: s, .. } => {
                s.resolved.as_ref()
            }
            _ => None,
        });
        imports.chain(reexports)
    }

    /// Public names this module exports (named, declared, and `default`).
    /// Names behind `export * from` are not included; callers that need
    /// them must chase the target module themselves.
    pub fn export_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for export in &self.exports {
            match &export.kind {
                ExportKind::Decl { names: declared, .. } => {
                    names.extend(declared.iter().cloned());
                }
                ExportKind::Default { .. } => names.push("default".to_string()),
                ExportKind::Named { bindings, type_only, .. } => {
                    if !*type_only {
                        for b in bindings.iter().filter(|b| !b.type_only) {
                            names.push(b.public_name().to_string());
                        }
                    }
                }
                ExportKind::Star { namespace: Some(ns), .. } => names.push(ns.clone()),
                ExportKind::Star { namespace: None, .. } => {}
            }
        }
        names
    }
}

/// One `import`/`import()` reference found in a module.
#[derive(Debug, Clone)]
pub struct ImportRef {
    /// Span of the whole statement, or of the `import(...)` call.
    pub span: Span,
    /// The specifier text as written, unquoted.
    pub specifier: String,
    /// Span of the specifier string literal, including quotes.
    pub specifier_span: Span,
    pub clause: ImportClause,
    /// `import("...")` rather than a static declaration.
    pub dynamic: bool,
    /// `import type ...`: never resolved or traversed.
    pub type_only: bool,
    /// Filled in during graph discovery.
    pub resolved: Option<PathBuf>,
}

/// The bindings an import statement introduces.
#[derive(Debug, Clone, Default)]
pub struct ImportClause {
    /// `import name from "..."`
    pub default: Option<String>,
    /// `import * as ns from "..."`
    pub namespace: Option<String>,
    /// `import { a, b as c } from "..."`
    pub named: Vec<NamedBinding>,
}

impl ImportClause {
    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.namespace.is_none() && self.named.is_empty()
    }
}

/// One entry of a named import or export clause.
///
/// For imports, `name` is the remote (exported) name and `alias` the local
/// binding. For exports, `name` is the local name and `alias` the public one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedBinding {
    pub name: String,
    pub alias: Option<String>,
    pub type_only: bool,
}

impl NamedBinding {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            type_only: false,
        }
    }

    pub fn with_alias(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: Some(alias.into()),
            type_only: false,
        }
    }

    /// The name visible to the importing side of an export clause.
    pub fn public_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// The name bound locally by an import clause.
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A module specifier appearing in a re-export (`export ... from "..."`).
#[derive(Debug, Clone)]
pub struct SpecifierRef {
    pub specifier: String,
    pub span: Span,
    pub resolved: Option<PathBuf>,
}

/// One `export` statement found in a module.
#[derive(Debug, Clone)]
pub struct ExportRef {
    pub span: Span,
    pub kind: ExportKind,
}

#[derive(Debug, Clone)]
pub enum ExportKind {
    /// `export <decl>`: keyword span covers just the `export` keyword;
    /// `names` are the declared bindings.
    Decl { keyword_span: Span, names: Vec<String> },
    /// `export default <expr>`: keyword span covers both keywords.
    Default { keyword_span: Span },
    /// `export { a, b as c }`, optionally `from "..."`.
    Named {
        bindings: Vec<NamedBinding>,
        from: Option<SpecifierRef>,
        type_only: bool,
    },
    /// `export * from "..."`, optionally `as ns`.
    Star {
        namespace: Option<String>,
        from: SpecifierRef,
    },
}
