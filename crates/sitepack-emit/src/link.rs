//! Bundle assembly.
//!
//! Modules are concatenated in dependency-first order, so every top-level
//! binding is in scope before its importers run. Import statements of
//! bundled modules reduce to nothing or to `const` aliases; `export`
//! keywords survive only on the entry module of an ESM bundle. All
//! rewriting happens through span edits against the stripped module text,
//! whose offsets still match the original source.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use sitepack_graph::{BuildGraph, ExportKind, ModuleNode, TextEdit};
use tracing::warn;

/// Module format of the emitted bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// ES module: the entry's exports are preserved.
    #[default]
    Esm,
    /// CommonJS: the entry's exports become a `module.exports` object.
    Cjs,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Esm => write!(f, "esm"),
            Self::Cjs => write!(f, "cjs"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "esm" | "es" => Ok(Self::Esm),
            "cjs" | "commonjs" => Ok(Self::Cjs),
            other => Err(format!("unknown output format '{}' (expected esm or cjs)", other)),
        }
    }
}

/// Assemble the final bundle text.
///
/// `stripped` maps each module path to its type-stripped source (same
/// byte offsets as the original); `extra_edits` carries the asset-URL
/// rewrites contributed by the asset locator.
pub fn link(
    graph: &BuildGraph,
    stripped: &HashMap<PathBuf, String>,
    extra_edits: &HashMap<PathBuf, Vec<TextEdit>>,
    format: OutputFormat,
    project_root: &Path,
) -> String {
    let linker = Linker {
        graph,
        format,
        project_root,
    };
    linker.run(stripped, extra_edits)
}

struct Linker<'a> {
    graph: &'a BuildGraph,
    format: OutputFormat,
    project_root: &'a Path,
}

impl<'a> Linker<'a> {
    fn run(
        &self,
        stripped: &HashMap<PathBuf, String>,
        extra_edits: &HashMap<PathBuf, Vec<TextEdit>>,
    ) -> String {
        let mut bundle = String::new();
        let mut cjs_exports: Vec<(String, String)> = Vec::new();

        for path in self.graph.emit_order() {
            let Some(node) = self.graph.get(&path) else {
                continue;
            };
            let Some(text) = stripped.get(&path) else {
                continue;
            };
            let is_entry = path == self.graph.entry();

            let mut edits = extra_edits.get(&path).cloned().unwrap_or_default();
            self.rewrite_imports(node, &mut edits);
            self.rewrite_exports(node, is_entry, &mut edits, &mut cjs_exports);

            bundle.push_str(&format!("// {}\n", self.rel(&path)));
            let body = apply_edits(text, edits);
            bundle.push_str(body.trim_end());
            bundle.push('\n');
            bundle.push('\n');
        }

        if self.format == OutputFormat::Cjs && !cjs_exports.is_empty() {
            bundle.push_str(&render_cjs_exports(&cjs_exports));
            bundle.push('\n');
        }

        bundle
    }

    fn rewrite_imports(&self, node: &ModuleNode, edits: &mut Vec<TextEdit>) {
        for import in &node.imports {
            if import.type_only {
                continue; // already blanked by the stripper
            }
            let Some(target) = &import.resolved else {
                continue;
            };

            if import.dynamic {
                // The module is bundled and its top-level code already ran;
                // a namespace object is not reconstructed.
                warn!(
                    module = %node.path.display(),
                    specifier = %import.specifier,
                    "dynamic import of a bundled module resolves to an empty promise"
                );
                edits.push(TextEdit::new(import.span, "Promise.resolve()"));
                continue;
            }

            let mut parts: Vec<String> = Vec::new();
            let target_node = self.graph.get(target);

            if let Some(local) = &import.clause.default {
                parts.push(format!(
                    "const {} = {};",
                    local,
                    self.default_binding(target)
                ));
                if let Some(t) = target_node {
                    if !t.exports.iter().any(|e| matches!(e.kind, ExportKind::Default { .. })) {
                        warn!(
                            module = %node.path.display(),
                            specifier = %import.specifier,
                            "default import from a module with no default export"
                        );
                    }
                }
            }

            if let Some(ns) = &import.clause.namespace {
                parts.push(format!(
                    "const {} = {{ {} }};",
                    ns,
                    self.namespace_body(target)
                ));
            }

            for binding in import.clause.named.iter().filter(|b| !b.type_only) {
                let local = binding.local_name();
                let source_name = self.exported_local_name(target, &binding.name);
                if local != source_name {
                    parts.push(format!("const {} = {};", local, source_name));
                }
            }

            edits.push(TextEdit::new(import.span, parts.join(" ")));
        }
    }

    fn rewrite_exports(
        &self,
        node: &ModuleNode,
        is_entry: bool,
        edits: &mut Vec<TextEdit>,
        cjs_exports: &mut Vec<(String, String)>,
    ) {
        let keep_entry_exports = is_entry && self.format == OutputFormat::Esm;
        let collect_cjs = is_entry && self.format == OutputFormat::Cjs;

        for export in &node.exports {
            match &export.kind {
                ExportKind::Decl { keyword_span, names } => {
                    if keep_entry_exports {
                        continue;
                    }
                    edits.push(TextEdit::remove(*keyword_span));
                    if collect_cjs {
                        for name in names {
                            cjs_exports.push((name.clone(), name.clone()));
                        }
                    }
                }
                ExportKind::Default { keyword_span } => {
                    if keep_entry_exports {
                        continue;
                    }
                    let binding = self.default_binding(&node.path);
                    edits.push(TextEdit::new(*keyword_span, format!("const {} =", binding)));
                    if collect_cjs {
                        cjs_exports.push(("default".to_string(), binding));
                    }
                }
                ExportKind::Named { type_only: true, .. } => {}
                ExportKind::Named { bindings, from: None, .. } => {
                    if keep_entry_exports {
                        continue;
                    }
                    edits.push(TextEdit::remove(export.span));
                    if collect_cjs {
                        for b in bindings.iter().filter(|b| !b.type_only) {
                            cjs_exports.push((b.public_name().to_string(), b.name.clone()));
                        }
                    }
                }
                ExportKind::Named { bindings, from: Some(from), .. } => {
                    let Some(target) = &from.resolved else {
                        edits.push(TextEdit::remove(export.span));
                        continue;
                    };
                    if keep_entry_exports {
                        let list = bindings
                            .iter()
                            .filter(|b| !b.type_only)
                            .map(|b| {
                                let local = self.exported_local_name(target, &b.name);
                                let public = b.public_name();
                                if local == public {
                                    local
                                } else {
                                    format!("{} as {}", local, public)
                                }
                            })
                            .collect::<Vec<_>>()
                            .join(", ");
                        edits.push(TextEdit::new(export.span, format!("export {{ {} }};", list)));
                    } else {
                        edits.push(TextEdit::remove(export.span));
                        if collect_cjs {
                            for b in bindings.iter().filter(|b| !b.type_only) {
                                cjs_exports.push((
                                    b.public_name().to_string(),
                                    self.exported_local_name(target, &b.name),
                                ));
                            }
                        }
                    }
                }
                ExportKind::Star { namespace: None, from } => {
                    let Some(target) = &from.resolved else {
                        edits.push(TextEdit::remove(export.span));
                        continue;
                    };
                    if keep_entry_exports {
                        let names = self.public_names(target);
                        if names.is_empty() {
                            warn!(
                                module = %node.path.display(),
                                specifier = %from.specifier,
                                "cannot enumerate re-exported names; dropping export *"
                            );
                            edits.push(TextEdit::remove(export.span));
                        } else {
                            let list = names
                                .iter()
                                .map(|public| {
                                    let local = self.exported_local_name(target, public);
                                    if &local == public {
                                        local
                                    } else {
                                        format!("{} as {}", local, public)
                                    }
                                })
                                .collect::<Vec<_>>()
                                .join(", ");
                            edits.push(TextEdit::new(
                                export.span,
                                format!("export {{ {} }};", list),
                            ));
                        }
                    } else {
                        edits.push(TextEdit::remove(export.span));
                        if collect_cjs {
                            for public in self.public_names(target) {
                                let local = self.exported_local_name(target, &public);
                                cjs_exports.push((public, local));
                            }
                        }
                    }
                }
                ExportKind::Star { namespace: Some(ns), from } => {
                    let Some(target) = &from.resolved else {
                        edits.push(TextEdit::remove(export.span));
                        continue;
                    };
                    let body = self.namespace_body(target);
                    let mut replacement = format!("const {} = {{ {} }};", ns, body);
                    if keep_entry_exports {
                        replacement.push_str(&format!(" export {{ {} }};", ns));
                    }
                    if collect_cjs {
                        cjs_exports.push((ns.clone(), ns.clone()));
                    }
                    edits.push(TextEdit::new(export.span, replacement));
                }
            }
        }
    }

    /// Public names a module offers, `export *` targets included.
    fn public_names(&self, path: &Path) -> Vec<String> {
        let mut names = Vec::new();
        let mut seen = HashSet::new();
        self.collect_public_names(path, &mut names, &mut seen);
        names
    }

    fn collect_public_names(
        &self,
        path: &Path,
        names: &mut Vec<String>,
        seen: &mut HashSet<PathBuf>,
    ) {
        if !seen.insert(path.to_path_buf()) {
            return;
        }
        let Some(node) = self.graph.get(path) else {
            return;
        };
        for name in node.export_names() {
            if name != "default" && !names.contains(&name) {
                names.push(name);
            }
        }
        for export in &node.exports {
            if let ExportKind::Star { namespace: None, from } = &export.kind {
                if let Some(target) = &from.resolved {
                    self.collect_public_names(target, names, seen);
                }
            }
        }
    }

    /// The top-level binding that holds `public` as exported by the module
    /// at `path`, chasing aliases and re-export chains.
    fn exported_local_name(&self, path: &Path, public: &str) -> String {
        let mut seen = HashSet::new();
        self.lookup_local(path, public, &mut seen)
            .unwrap_or_else(|| public.to_string())
    }

    fn lookup_local(
        &self,
        path: &Path,
        public: &str,
        seen: &mut HashSet<PathBuf>,
    ) -> Option<String> {
        if !seen.insert(path.to_path_buf()) {
            return None;
        }
        let node = self.graph.get(path)?;

        if public == "default" {
            return Some(self.default_binding(path));
        }

        for export in &node.exports {
            match &export.kind {
                ExportKind::Decl { names, .. } if names.iter().any(|n| n == public) => {
                    return Some(public.to_string());
                }
                ExportKind::Named { bindings, from, type_only: false } => {
                    if let Some(b) = bindings.iter().find(|b| b.public_name() == public) {
                        return match from {
                            // `export { a as b } from "./x"`: `a` lives in x.
                            Some(f) => f
                                .resolved
                                .as_ref()
                                .and_then(|t| self.lookup_local(t, &b.name, seen)),
                            None => Some(b.name.clone()),
                        };
                    }
                }
                ExportKind::Star { namespace: None, from } => {
                    if let Some(target) = &from.resolved {
                        if let Some(found) = self.lookup_local(target, public, seen) {
                            return Some(found);
                        }
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Object-literal body reconstructing a module's namespace.
    fn namespace_body(&self, path: &Path) -> String {
        let mut parts: Vec<String> = Vec::new();
        for public in self.public_names(path) {
            let local = self.exported_local_name(path, &public);
            if local == public {
                parts.push(public);
            } else {
                parts.push(format!("{}: {}", public, local));
            }
        }
        if let Some(node) = self.graph.get(path) {
            if node
                .exports
                .iter()
                .any(|e| matches!(e.kind, ExportKind::Default { .. }))
            {
                parts.push(format!("default: {}", self.default_binding(path)));
            }
        }
        parts.join(", ")
    }

    /// Synthesized binding for a module's default export. Derived from the
    /// project-relative path so bundles are reproducible across machines;
    /// the hash keeps same-stem modules apart.
    fn default_binding(&self, path: &Path) -> String {
        let rel = self.rel(path);
        let stem = Path::new(&rel)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let sanitized: String = stem
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
            .collect();

        let mut hasher = DefaultHasher::new();
        rel.hash(&mut hasher);
        format!("__{}_default_{:08x}", sanitized, hasher.finish() as u32)
    }

    fn rel(&self, path: &Path) -> String {
        path.strip_prefix(self.project_root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

/// Apply span edits to a text, earliest first. Overlapping edits keep the
/// first and drop the rest.
fn apply_edits(source: &str, mut edits: Vec<TextEdit>) -> String {
    edits.sort_by_key(|e| (e.span.start, e.span.end));

    let mut out = String::with_capacity(source.len());
    let mut pos = 0usize;
    for edit in edits {
        if edit.span.start < pos || edit.span.end > source.len() {
            continue;
        }
        out.push_str(&source[pos..edit.span.start]);
        out.push_str(&edit.replacement);
        pos = edit.span.end;
    }
    out.push_str(&source[pos..]);
    out
}

fn render_cjs_exports(exports: &[(String, String)]) -> String {
    let body = exports
        .iter()
        .map(|(public, local)| {
            if public == local {
                public.clone()
            } else {
                format!("{}: {}", public, local)
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("module.exports = {{ {} }};", body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitepack_resolve::{discover, ModuleResolver};
    use sitepack_strip::strip_types;
    use std::fs;

    fn temp_dir(name: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("sitepack_link_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("failed to create temp dir");
        dir
    }

    fn bundle_of(dir: &Path, entry: &str, format: OutputFormat) -> String {
        let resolver = ModuleResolver::new(dir);
        let graph = discover(&dir.join(entry), &resolver).unwrap();

        let mut stripped = HashMap::new();
        for path in graph.emit_order() {
            let node = graph.get(&path).unwrap();
            stripped.insert(path.clone(), strip_types(&node.source, &path).unwrap());
        }

        let root = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        link(&graph, &stripped, &HashMap::new(), format, &root)
    }

    #[test]
    fn test_two_module_bundle() {
        let dir = temp_dir("basic");
        fs::write(
            dir.join("main.ts"),
            "import { greet } from './lib';\nconsole.log(greet('world'));\n",
        )
        .unwrap();
        fs::write(
            dir.join("lib.ts"),
            "export function greet(name: string): string { return `hi ${name}`; }\n",
        )
        .unwrap();

        let bundle = bundle_of(&dir, "main.ts", OutputFormat::Esm);

        // Dependency first, entry last, banners in place.
        let lib_pos = bundle.find("function greet").unwrap();
        let main_pos = bundle.find("console.log").unwrap();
        assert!(lib_pos < main_pos);
        assert!(bundle.contains("// lib.ts"));
        assert!(bundle.contains("// main.ts"));

        // The import statement is gone, the export keyword is gone.
        assert!(!bundle.contains("import"));
        assert!(!bundle.contains("export"));
        assert!(!bundle.contains(": string"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_renamed_import_gets_alias() {
        let dir = temp_dir("rename");
        fs::write(dir.join("main.ts"), "import { greet as hello } from './lib';\nhello();\n").unwrap();
        fs::write(dir.join("lib.ts"), "export function greet() {}\n").unwrap();

        let bundle = bundle_of(&dir, "main.ts", OutputFormat::Esm);
        assert!(bundle.contains("const hello = greet;"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_export_alias_resolves_to_local() {
        let dir = temp_dir("exportalias");
        fs::write(dir.join("main.ts"), "import { api } from './lib';\napi();\n").unwrap();
        fs::write(
            dir.join("lib.ts"),
            "function internal() {}\nexport { internal as api };\n",
        )
        .unwrap();

        let bundle = bundle_of(&dir, "main.ts", OutputFormat::Esm);
        assert!(bundle.contains("const api = internal;"));
        assert!(!bundle.contains("export {"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_default_import_binds_synthesized_name() {
        let dir = temp_dir("default");
        fs::write(dir.join("main.ts"), "import widget from './widget';\nwidget();\n").unwrap();
        fs::write(dir.join("widget.ts"), "export default function () {}\n").unwrap();

        let bundle = bundle_of(&dir, "main.ts", OutputFormat::Esm);

        // The exporter's `export default` became a const, and the importer
        // aliases the same binding.
        assert!(bundle.contains("_default_"));
        assert!(bundle.contains("const widget = __widget_default_"));
        assert!(!bundle.contains("export default"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_entry_exports_survive_in_esm() {
        let dir = temp_dir("entryesm");
        fs::write(dir.join("main.ts"), "export const version = '1.0';\n").unwrap();

        let bundle = bundle_of(&dir, "main.ts", OutputFormat::Esm);
        assert!(bundle.contains("export const version = '1.0';"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_entry_exports_become_module_exports_in_cjs() {
        let dir = temp_dir("entrycjs");
        fs::write(
            dir.join("main.ts"),
            "export const version = '1.0';\nexport function run() {}\n",
        )
        .unwrap();

        let bundle = bundle_of(&dir, "main.ts", OutputFormat::Cjs);
        assert!(!bundle.contains("export const"));
        assert!(!bundle.contains("export function"));
        assert!(bundle.contains("module.exports = { version, run };"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_namespace_import_builds_object() {
        let dir = temp_dir("namespace");
        fs::write(dir.join("main.ts"), "import * as lib from './lib';\nlib.a();\n").unwrap();
        fs::write(dir.join("lib.ts"), "export const a = 1;\nexport const b = 2;\n").unwrap();

        let bundle = bundle_of(&dir, "main.ts", OutputFormat::Esm);
        assert!(bundle.contains("const lib = { a, b };"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_dynamic_import_is_neutralized() {
        let dir = temp_dir("dynamic");
        fs::write(dir.join("main.ts"), "const p = import('./side');\n").unwrap();
        fs::write(dir.join("side.ts"), "console.log('side');\n").unwrap();

        let bundle = bundle_of(&dir, "main.ts", OutputFormat::Esm);
        assert!(bundle.contains("const p = Promise.resolve();"));
        // The module itself is still bundled ahead of the entry.
        assert!(bundle.find("console.log('side')").unwrap() < bundle.find("Promise.resolve").unwrap());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_reexport_on_entry_is_rewritten() {
        let dir = temp_dir("reexport");
        fs::write(dir.join("main.ts"), "export { helper } from './helpers';\n").unwrap();
        fs::write(dir.join("helpers.ts"), "export function helper() {}\n").unwrap();

        let bundle = bundle_of(&dir, "main.ts", OutputFormat::Esm);
        assert!(bundle.contains("export { helper };"));
        assert!(!bundle.contains("from './helpers'"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_bundle_is_deterministic() {
        let dir = temp_dir("deterministic");
        fs::write(dir.join("main.ts"), "import { a } from './a';\nconsole.log(a);\n").unwrap();
        fs::write(dir.join("a.ts"), "export const a = 1;\n").unwrap();

        let first = bundle_of(&dir, "main.ts", OutputFormat::Esm);
        let second = bundle_of(&dir, "main.ts", OutputFormat::Esm);
        assert_eq!(first, second);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_side_effect_import_is_removed() {
        let dir = temp_dir("sideeffect");
        fs::write(dir.join("main.ts"), "import './setup';\nconsole.log('go');\n").unwrap();
        fs::write(dir.join("setup.ts"), "globalThis.ready = true;\n").unwrap();

        let bundle = bundle_of(&dir, "main.ts", OutputFormat::Esm);
        assert!(!bundle.contains("import"));
        assert!(bundle.find("globalThis.ready").unwrap() < bundle.find("console.log('go')").unwrap());

        let _ = fs::remove_dir_all(&dir);
    }
}
