//! Specifier-to-file resolution.

use std::path::{Path, PathBuf};

use crate::package::{exports_entry, read_manifest};

/// Extensions probed for extensionless specifiers, in priority order.
const EXTENSIONS: [&str; 5] = ["ts", "tsx", "js", "mjs", "jsx"];

/// Maps import specifiers to files on disk.
///
/// Relative and absolute specifiers are probed directly; bare specifiers
/// walk `node_modules` directories upward from the importing file, like
/// Node does, stopping at the project root. Failures return a plain detail
/// string; the discovery stage wraps it with the specifier and the
/// referencing module.
pub struct ModuleResolver {
    project_root: Option<PathBuf>,
}

impl ModuleResolver {
    /// Create a resolver anchored near `base_dir` (usually the entry
    /// module's directory).
    pub fn new(base_dir: &Path) -> Self {
        Self {
            project_root: Self::find_project_root(base_dir),
        }
    }

    /// Find the project root by searching upward for package.json.
    pub fn find_project_root(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join("package.json").exists() {
                return Some(current);
            }
            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return None,
            }
        }
    }

    /// Resolve an import specifier from the given file.
    pub fn resolve(&self, specifier: &str, from_file: &Path) -> Result<PathBuf, String> {
        if specifier.starts_with("./") || specifier.starts_with("../") {
            return self.resolve_relative(specifier, from_file);
        }

        if specifier.starts_with('/') {
            return self.try_resolve_file(Path::new(specifier));
        }

        self.resolve_package(specifier, from_file)
    }

    /// Resolve a relative import against the importing file's directory.
    fn resolve_relative(&self, specifier: &str, from_file: &Path) -> Result<PathBuf, String> {
        let from_dir = from_file.parent().ok_or_else(|| {
            format!(
                "cannot resolve relative import from file without parent: {}",
                from_file.display()
            )
        })?;

        self.try_resolve_file(&from_dir.join(specifier))
    }

    /// Probe a path as a module file: the exact path when it already names
    /// a script file, then appended extensions, then directory index files.
    fn try_resolve_file(&self, target: &Path) -> Result<PathBuf, String> {
        if target.is_file() {
            let ext = target.extension().and_then(|e| e.to_str()).unwrap_or("");
            if EXTENSIONS.contains(&ext) {
                return canonicalize(target);
            }
            return Err(format!(
                "{} exists but is not a script module",
                target.display()
            ));
        }

        for ext in &EXTENSIONS {
            let with_ext = PathBuf::from(format!("{}.{}", target.display(), ext));
            if with_ext.is_file() {
                return canonicalize(&with_ext);
            }
        }

        if target.is_dir() {
            for ext in &EXTENSIONS {
                let index = target.join(format!("index.{}", ext));
                if index.is_file() {
                    return canonicalize(&index);
                }
            }
        }

        Err(format!(
            "module not found: {} (tried extensions: {})",
            target.display(),
            EXTENSIONS.join(", ")
        ))
    }

    /// Resolve a bare specifier through node_modules directories, walking
    /// up from the importing file to the project root.
    fn resolve_package(&self, specifier: &str, from_file: &Path) -> Result<PathBuf, String> {
        let (pkg_name, subpath) = parse_package_specifier(specifier);

        let mut current = from_file
            .parent()
            .ok_or_else(|| format!("cannot resolve package from {}", from_file.display()))?
            .to_path_buf();

        loop {
            let package_dir = current.join("node_modules").join(pkg_name);
            if package_dir.is_dir() {
                return self.resolve_package_entry(&package_dir, subpath);
            }

            // Stop at project root after checking it
            if Some(current.as_path()) == self.project_root.as_deref() {
                break;
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }

        Err(format!("package '{}' not found in node_modules", pkg_name))
    }

    /// Resolve the entry file for a package directory.
    fn resolve_package_entry(
        &self,
        package_dir: &Path,
        subpath: Option<&str>,
    ) -> Result<PathBuf, String> {
        if let Some(sub) = subpath {
            return self.try_resolve_file(&package_dir.join(sub));
        }

        let manifest_path = package_dir.join("package.json");
        if manifest_path.exists() {
            let manifest = read_manifest(&manifest_path)?;

            // A bundler prefers the ESM entry over the legacy one.
            let fields = [manifest.module.as_ref(), manifest.main.as_ref()];
            for field in fields.into_iter().flatten() {
                if let Ok(resolved) = self.try_resolve_file(&package_dir.join(field)) {
                    return Ok(resolved);
                }
            }

            if let Some(exports) = &manifest.exports {
                if let Some(entry) = exports_entry(exports) {
                    if let Ok(resolved) = self.try_resolve_file(&package_dir.join(entry)) {
                        return Ok(resolved);
                    }
                }
            }
        }

        self.try_resolve_file(&package_dir.join("index"))
    }
}

/// Split a bare specifier into package name and subpath.
///
/// Examples:
/// - "lit" → ("lit", None)
/// - "lit/directives" → ("lit", Some("directives"))
/// - "@scope/pkg" → ("@scope/pkg", None)
/// - "@scope/pkg/util" → ("@scope/pkg", Some("util"))
fn parse_package_specifier(specifier: &str) -> (&str, Option<&str>) {
    let name_end = if specifier.starts_with('@') {
        // Scoped packages keep their first slash
        specifier
            .find('/')
            .and_then(|first| specifier[first + 1..].find('/').map(|i| first + 1 + i))
    } else {
        specifier.find('/')
    };

    match name_end {
        Some(pos) => (&specifier[..pos], Some(&specifier[pos + 1..])),
        None => (specifier, None),
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf, String> {
    path.canonicalize()
        .map_err(|e| format!("failed to canonicalize {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sitepack_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("failed to create temp dir");
        dir
    }

    #[test]
    fn test_parse_package_specifier() {
        assert_eq!(parse_package_specifier("lit"), ("lit", None));
        assert_eq!(parse_package_specifier("lit/directives"), ("lit", Some("directives")));
        assert_eq!(parse_package_specifier("@scope/pkg"), ("@scope/pkg", None));
        assert_eq!(
            parse_package_specifier("@scope/pkg/util"),
            ("@scope/pkg", Some("util"))
        );
    }

    #[test]
    fn test_relative_resolution_probes_extensions() {
        let dir = temp_dir("rel");
        fs::write(dir.join("widget.ts"), "export const w = 1;").unwrap();

        let resolver = ModuleResolver::new(&dir);
        let from = dir.join("main.ts");

        let resolved = resolver.resolve("./widget", &from).unwrap();
        assert!(resolved.ends_with("widget.ts"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_relative_resolution_is_module_relative() {
        // A module in a subdirectory resolves against its own location,
        // not the entry's.
        let dir = temp_dir("nested");
        fs::create_dir_all(dir.join("sub")).unwrap();
        fs::write(dir.join("sub/helper.ts"), "").unwrap();

        let resolver = ModuleResolver::new(&dir);
        let from = dir.join("sub/page.ts");

        let resolved = resolver.resolve("./helper", &from).unwrap();
        assert!(resolved.ends_with("sub/helper.ts"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_index_file_resolution() {
        let dir = temp_dir("index");
        fs::create_dir_all(dir.join("components")).unwrap();
        fs::write(dir.join("components/index.ts"), "").unwrap();

        let resolver = ModuleResolver::new(&dir);
        let from = dir.join("main.ts");

        let resolved = resolver.resolve("./components", &from).unwrap();
        assert!(resolved.ends_with("components/index.ts"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_package_resolution_via_module_field() {
        let dir = temp_dir("pkg");
        fs::write(dir.join("package.json"), r#"{"name":"app","version":"0.0.0"}"#).unwrap();
        let pkg = dir.join("node_modules/lit");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(
            pkg.join("package.json"),
            r#"{"name":"lit","version":"3.0.0","module":"index.js"}"#,
        )
        .unwrap();
        fs::write(pkg.join("index.js"), "export const html = () => {};").unwrap();

        let resolver = ModuleResolver::new(&dir);
        let from = dir.join("main.ts");

        let resolved = resolver.resolve("lit", &from).unwrap();
        assert!(resolved.ends_with("node_modules/lit/index.js"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_package_subpath_resolution() {
        let dir = temp_dir("subpath");
        fs::write(dir.join("package.json"), r#"{"name":"app","version":"0.0.0"}"#).unwrap();
        let pkg = dir.join("node_modules/lit/directives");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("repeat.js"), "").unwrap();

        let resolver = ModuleResolver::new(&dir);
        let from = dir.join("main.ts");

        let resolved = resolver.resolve("lit/directives/repeat", &from).unwrap();
        assert!(resolved.ends_with("node_modules/lit/directives/repeat.js"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_package_is_an_error() {
        let dir = temp_dir("missing");
        let resolver = ModuleResolver::new(&dir);
        let from = dir.join("main.ts");

        let err = resolver.resolve("not-installed", &from).unwrap_err();
        assert!(err.contains("not-installed"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_non_script_file_is_rejected() {
        let dir = temp_dir("nonscript");
        fs::write(dir.join("styles.css"), "body {}").unwrap();

        let resolver = ModuleResolver::new(&dir);
        let from = dir.join("main.ts");

        assert!(resolver.resolve("./styles.css", &from).is_err());

        let _ = fs::remove_dir_all(&dir);
    }
}
