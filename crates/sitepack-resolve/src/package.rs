//! package.json metadata used for bare-specifier resolution.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

/// The subset of package.json a bundler cares about.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    pub main: Option<String>,
    pub module: Option<String>,
    pub exports: Option<Value>,
}

/// Parse a package.json file.
pub fn read_manifest(path: &Path) -> Result<PackageManifest, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("failed to parse {}: {}", path.display(), e))
}

/// Extract the root entry from an `exports` field. Handles the sugar
/// string form, the `"."` key, and condition objects, preferring the
/// ESM-leaning conditions.
pub fn exports_entry(exports: &Value) -> Option<String> {
    match exports {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => {
            let root = map.get(".").unwrap_or(exports);
            match root {
                Value::String(s) => Some(s.clone()),
                Value::Object(conditions) => ["import", "module", "default"]
                    .iter()
                    .find_map(|key| conditions.get(*key))
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let manifest: PackageManifest = serde_json::from_str(
            r#"{
                "name": "lit",
                "version": "3.0.0",
                "main": "index.js",
                "module": "index.js",
                "extraField": true
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.name, "lit");
        assert_eq!(manifest.module.as_deref(), Some("index.js"));
    }

    #[test]
    fn test_exports_sugar_string() {
        let exports = serde_json::json!("./index.js");
        assert_eq!(exports_entry(&exports).as_deref(), Some("./index.js"));
    }

    #[test]
    fn test_exports_dot_conditions() {
        let exports = serde_json::json!({
            ".": { "import": "./index.mjs", "default": "./index.cjs" }
        });
        assert_eq!(exports_entry(&exports).as_deref(), Some("./index.mjs"));
    }

    #[test]
    fn test_exports_bare_conditions() {
        let exports = serde_json::json!({ "default": "./dist/main.js" });
        assert_eq!(exports_entry(&exports).as_deref(), Some("./dist/main.js"));
    }
}
