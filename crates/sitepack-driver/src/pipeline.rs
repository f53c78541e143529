//! The build pipeline: discover → locate assets → strip → link → emit.
//!
//! Strictly sequential and one-shot. Everything before `emit` works on
//! in-memory data only, so a failing build never creates or modifies the
//! output directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sitepack_assets::locate_assets;
use sitepack_emit::{emit, link, EmitPlan};
use sitepack_graph::{OutputManifest, TextEdit};
use sitepack_resolve::{discover, ModuleResolver};
use sitepack_strip::strip_types;
use tracing::debug;

use crate::config::BuildOptions;
use crate::error::BuildError;

/// Summary of a successful build.
#[derive(Debug)]
pub struct BuildReport {
    pub bundle_path: PathBuf,
    pub bundle_bytes: usize,
    /// Modules bundled, in emission order.
    pub modules: Vec<PathBuf>,
    /// Files copied next to the bundle (assets plus static copies).
    pub copied: usize,
}

/// Run one build.
pub fn run_build(options: &BuildOptions) -> Result<BuildReport, BuildError> {
    let entry_dir = options
        .entry
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let entry_dir = entry_dir.canonicalize().unwrap_or(entry_dir);

    // Phase 1: resolve the module graph.
    let resolver = ModuleResolver::new(&entry_dir);
    let graph = discover(&options.entry, &resolver)?;
    let order = graph.emit_order();
    debug!(modules = order.len(), "module graph resolved");

    let project_root =
        ModuleResolver::find_project_root(&entry_dir).unwrap_or_else(|| entry_dir.clone());

    // Phase 2: locate assets; contributes manifest entries and URL edits.
    let mut manifest = OutputManifest::new();
    let mut edits: HashMap<PathBuf, Vec<TextEdit>> = HashMap::new();
    for path in &order {
        if let Some(node) = graph.get(path) {
            let found = locate_assets(node, &mut manifest);
            if !found.is_empty() {
                edits.insert(path.clone(), found);
            }
        }
    }
    debug!(assets = manifest.len(), "asset scan complete");

    // Phase 3: strip types. Any syntax error aborts here, before emission.
    let mut stripped: HashMap<PathBuf, String> = HashMap::new();
    for path in &order {
        if let Some(node) = graph.get(path) {
            stripped.insert(path.clone(), strip_types(&node.source, path)?);
        }
    }

    // Phase 4: link into one bundle.
    let bundle = link(&graph, &stripped, &edits, options.format, &project_root);

    // Configured copies join the manifest after the scanned assets.
    for copy in &options.static_copies {
        let src = if copy.src.is_absolute() {
            copy.src.clone()
        } else {
            entry_dir.join(&copy.src)
        };
        manifest.insert(src, copy.dest.clone());
    }

    // Phase 5: emit.
    let report = emit(&EmitPlan {
        bundle_path: &options.output_file,
        bundle_text: &bundle,
        manifest: &manifest,
    })?;

    Ok(BuildReport {
        bundle_path: report.bundle_path,
        bundle_bytes: report.bundle_bytes,
        modules: order,
        copied: report.copied,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticCopy;
    use sitepack_emit::OutputFormat;
    use sitepack_resolve::ResolveError;
    use std::fs;

    fn temp_dir(name: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("sitepack_build_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("failed to create temp dir");
        dir
    }

    fn options(dir: &Path, entry: &str) -> BuildOptions {
        BuildOptions {
            entry: dir.join(entry),
            output_file: dir.join("dist/index.js"),
            format: OutputFormat::Esm,
            static_copies: vec![],
        }
    }

    #[test]
    fn test_end_to_end_build() {
        let dir = temp_dir("e2e");
        fs::write(
            dir.join("index.ts"),
            "import { render } from './render';\nimport './theme';\nrender();\n",
        )
        .unwrap();
        fs::write(
            dir.join("render.ts"),
            "const icon: URL = new URL('./icon.svg', import.meta.url);\nexport function render(): void { console.log(icon.href); }\n",
        )
        .unwrap();
        fs::write(dir.join("theme.ts"), "document.title = 'themed';\n").unwrap();
        fs::write(dir.join("icon.svg"), "<svg/>").unwrap();
        fs::write(dir.join("index.html"), "<!doctype html>").unwrap();

        let mut opts = options(&dir, "index.ts");
        opts.static_copies.push(StaticCopy {
            src: PathBuf::from("./index.html"),
            dest: PathBuf::from("index.html"),
        });

        let report = run_build(&opts).unwrap();

        assert_eq!(report.modules.len(), 3);
        assert_eq!(report.copied, 2);

        // Bundle exists, is plain JS, and points at the emitted asset.
        let bundle = fs::read_to_string(dir.join("dist/index.js")).unwrap();
        assert!(!bundle.contains("import "));
        assert!(!bundle.contains(": URL"));
        assert!(!bundle.contains(": void"));
        assert!(bundle.contains("'./assets/icon.svg'"));

        // Exactly one copied asset at the expected relative path, plus the
        // configured static copy.
        assert_eq!(
            fs::read_to_string(dir.join("dist/assets/icon.svg")).unwrap(),
            "<svg/>"
        );
        assert_eq!(
            fs::read_to_string(dir.join("dist/index.html")).unwrap(),
            "<!doctype html>"
        );

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_unresolved_import_leaves_output_untouched() {
        let dir = temp_dir("fail_resolve");
        fs::write(dir.join("index.ts"), "import { x } from './nope';\n").unwrap();

        let err = run_build(&options(&dir, "index.ts")).unwrap_err();
        match err {
            BuildError::Resolve(ResolveError::UnresolvedModule { specifier, .. }) => {
                assert_eq!(specifier, "./nope");
            }
            other => panic!("Expected UnresolvedModule, got {:?}", other),
        }
        assert!(!dir.join("dist").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_syntax_error_aborts_before_emission() {
        let dir = temp_dir("fail_syntax");
        fs::write(dir.join("index.ts"), "import './bad';\nconsole.log(1);\n").unwrap();
        fs::write(dir.join("bad.ts"), "enum Mode { A, B }\n").unwrap();

        let err = run_build(&options(&dir, "index.ts")).unwrap_err();
        assert!(matches!(err, BuildError::Transpile(_)));
        assert!(!dir.join("dist").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_asset_does_not_abort() {
        let dir = temp_dir("missing_asset");
        fs::write(
            dir.join("index.ts"),
            "const u = new URL('./gone.png', import.meta.url);\nconsole.log(u);\n",
        )
        .unwrap();

        let report = run_build(&options(&dir, "index.ts")).unwrap();
        assert_eq!(report.copied, 0);
        assert!(dir.join("dist/index.js").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_rebuild_overwrites_deterministically() {
        let dir = temp_dir("rebuild");
        fs::write(dir.join("index.ts"), "export const v: number = 1;\n").unwrap();

        run_build(&options(&dir, "index.ts")).unwrap();
        let first = fs::read_to_string(dir.join("dist/index.js")).unwrap();

        run_build(&options(&dir, "index.ts")).unwrap();
        let second = fs::read_to_string(dir.join("dist/index.js")).unwrap();

        assert_eq!(first, second);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_cycle_builds() {
        let dir = temp_dir("cycle");
        fs::write(
            dir.join("a.ts"),
            "import { b } from './b';\nexport const a = 'a';\nconsole.log(b);\n",
        )
        .unwrap();
        fs::write(
            dir.join("b.ts"),
            "import { a } from './a';\nexport const b = 'b';\n",
        )
        .unwrap();

        let report = run_build(&options(&dir, "a.ts")).unwrap();
        assert_eq!(report.modules.len(), 2);

        let _ = fs::remove_dir_all(&dir);
    }
}
