//! Build configuration: the `sitepack.config.json` file and its merge
//! with command-line flags. CLI values always win over file values.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use sitepack_emit::OutputFormat;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "sitepack.config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {}", path.display(), source)]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Invalid(String),
}

/// One configured copy into the output directory. `src` is resolved
/// against the entry module's directory, `dest` against the output
/// directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticCopy {
    pub src: PathBuf,
    pub dest: PathBuf,
}

/// The recognized configuration surface. Unknown keys are rejected so a
/// typo never silently drops an option.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ConfigFile {
    pub entry: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub output_format: Option<String>,
    #[serde(default)]
    pub static_copies: Vec<StaticCopy>,
}

impl ConfigFile {
    /// Parse a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load `sitepack.config.json` from `dir` when present.
    pub fn load_default(dir: &Path) -> Result<Option<Self>, ConfigError> {
        let path = dir.join(DEFAULT_CONFIG_FILE);
        if path.is_file() {
            Self::load(&path).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Fully resolved options for one build run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub entry: PathBuf,
    pub output_file: PathBuf,
    pub format: OutputFormat,
    pub static_copies: Vec<StaticCopy>,
}

impl BuildOptions {
    /// Merge CLI flags over config-file values.
    pub fn merge(
        cli_entry: Option<PathBuf>,
        cli_output: Option<PathBuf>,
        cli_format: Option<OutputFormat>,
        cli_copies: Vec<StaticCopy>,
        file: Option<ConfigFile>,
    ) -> Result<Self, ConfigError> {
        let file = file.unwrap_or_default();

        let entry = cli_entry
            .or(file.entry)
            .ok_or_else(|| ConfigError::Invalid("no entry module specified".to_string()))?;

        let output_file = cli_output.or(file.output_file).unwrap_or_else(|| {
            let stem = entry
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "bundle".to_string());
            PathBuf::from("dist").join(format!("{}.js", stem))
        });

        let format = match (cli_format, file.output_format) {
            (Some(f), _) => f,
            (None, Some(tag)) => tag
                .parse::<OutputFormat>()
                .map_err(ConfigError::Invalid)?,
            (None, None) => OutputFormat::default(),
        };

        let mut static_copies = file.static_copies;
        static_copies.extend(cli_copies);

        Ok(Self {
            entry,
            output_file,
            format,
            static_copies,
        })
    }
}

/// Parse a `--copy SRC:DEST` argument.
pub fn parse_copy_arg(arg: &str) -> Result<StaticCopy, ConfigError> {
    match arg.split_once(':') {
        Some((src, dest)) if !src.is_empty() && !dest.is_empty() => Ok(StaticCopy {
            src: PathBuf::from(src),
            dest: PathBuf::from(dest),
        }),
        _ => Err(ConfigError::Invalid(format!(
            "invalid --copy value '{}' (expected SRC:DEST)",
            arg
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_file() {
        let config: ConfigFile = serde_json::from_str(
            r#"{
                "entry": "./index.ts",
                "outputFile": "../dist/index.js",
                "outputFormat": "esm",
                "staticCopies": [{ "src": "./index.html", "dest": "index.html" }]
            }"#,
        )
        .unwrap();

        assert_eq!(config.entry, Some(PathBuf::from("./index.ts")));
        assert_eq!(config.output_file, Some(PathBuf::from("../dist/index.js")));
        assert_eq!(config.output_format.as_deref(), Some("esm"));
        assert_eq!(config.static_copies.len(), 1);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result = serde_json::from_str::<ConfigFile>(r#"{ "entry": "a.ts", "watch": true }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = ConfigFile {
            entry: Some(PathBuf::from("file.ts")),
            output_file: Some(PathBuf::from("file-out.js")),
            output_format: Some("cjs".to_string()),
            static_copies: vec![],
        };

        let options = BuildOptions::merge(
            Some(PathBuf::from("cli.ts")),
            None,
            Some(OutputFormat::Esm),
            vec![],
            Some(file),
        )
        .unwrap();

        assert_eq!(options.entry, PathBuf::from("cli.ts"));
        assert_eq!(options.output_file, PathBuf::from("file-out.js"));
        assert_eq!(options.format, OutputFormat::Esm);
    }

    #[test]
    fn test_missing_entry_is_an_error() {
        let err = BuildOptions::merge(None, None, None, vec![], None).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_default_output_derives_from_entry() {
        let options =
            BuildOptions::merge(Some(PathBuf::from("src/index.ts")), None, None, vec![], None)
                .unwrap();
        assert_eq!(options.output_file, PathBuf::from("dist/index.js"));
        assert_eq!(options.format, OutputFormat::Esm);
    }

    #[test]
    fn test_bad_format_tag_is_rejected() {
        let file = ConfigFile {
            entry: Some(PathBuf::from("a.ts")),
            output_format: Some("umd".to_string()),
            ..Default::default()
        };
        let err = BuildOptions::merge(None, None, None, vec![], Some(file)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_parse_copy_arg() {
        let copy = parse_copy_arg("./index.html:index.html").unwrap();
        assert_eq!(copy.src, PathBuf::from("./index.html"));
        assert_eq!(copy.dest, PathBuf::from("index.html"));

        assert!(parse_copy_arg("no-colon").is_err());
        assert!(parse_copy_arg(":dest").is_err());
    }
}
