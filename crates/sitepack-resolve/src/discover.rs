//! Graph discovery: the worklist traversal from the entry module.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use sitepack_graph::{BuildGraph, ExportKind, ModuleNode, SpecifierRef};
use sitepack_lexer::Lexer;
use tracing::debug;

use crate::error::ResolveError;
use crate::resolver::ModuleResolver;
use crate::scan::scan_module;

/// Discover all modules statically reachable from `entry`.
///
/// Each module is read, tokenized, and scanned exactly once; the visited
/// set both guarantees single visits and makes import cycles safe. Any
/// unresolvable specifier aborts discovery. Lexically broken modules are
/// still added to the graph; the transpile stage owns syntax diagnostics
/// and will report them with line/column context.
pub fn discover(entry: &Path, resolver: &ModuleResolver) -> Result<BuildGraph, ResolveError> {
    let entry = entry.canonicalize().map_err(|e| ResolveError::Read {
        path: entry.to_path_buf(),
        source: e,
    })?;

    let mut graph = BuildGraph::new(entry.clone());
    let mut queue: VecDeque<PathBuf> = VecDeque::new();
    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut next_file_id = 0usize;

    queue.push_back(entry);

    while let Some(path) = queue.pop_front() {
        if !visited.insert(path.clone()) {
            continue;
        }

        let source = fs::read_to_string(&path).map_err(|e| ResolveError::Read {
            path: path.clone(),
            source: e,
        })?;

        let tokens = Lexer::with_file_id(&source, next_file_id).tokenize();
        next_file_id += 1;

        let (mut imports, mut exports) = scan_module(&tokens);

        for import in imports.iter_mut().filter(|i| !i.type_only) {
            let resolved = resolver
                .resolve(&import.specifier, &path)
                .map_err(|detail| ResolveError::UnresolvedModule {
                    specifier: import.specifier.clone(),
                    from: path.clone(),
                    span: import.specifier_span,
                    detail,
                })?;
            debug!(
                specifier = %import.specifier,
                from = %path.display(),
                to = %resolved.display(),
                "resolved import"
            );
            import.resolved = Some(resolved.clone());
            queue.push_back(resolved);
        }

        for export in exports.iter_mut() {
            let from_ref: Option<&mut SpecifierRef> = match &mut export.kind {
                ExportKind::Named {
                    from: Some(s),
                    type_only: false,
                    ..
                } => Some(s),
                ExportKind::Star { from, .. } => Some(from),
                _ => None,
            };
            if let Some(spec) = from_ref {
                let resolved = resolver
                    .resolve(&spec.specifier, &path)
                    .map_err(|detail| ResolveError::UnresolvedModule {
                        specifier: spec.specifier.clone(),
                        from: path.clone(),
                        span: spec.span,
                        detail,
                    })?;
                spec.resolved = Some(resolved.clone());
                queue.push_back(resolved);
            }
        }

        let mut node = ModuleNode::new(path, source);
        node.imports = imports;
        node.exports = exports;
        graph.insert(node);
    }

    Ok(graph)
}
