//! Configuration loading from `.nctrc.toml`.
//!
//! The config file is optional. Every value can also be given on the command
//! line; flags win over the file, and the file wins over built-in defaults.
//!
//! # Example Configuration
//!
//! ```toml
//! [paths]
//! meta_path = "model/meta.json"
//! output_path = "model/graph.json"
//!
//! [build]
//! nct_index = 1
//!
//! [output]
//! format = "json"
//! color = false
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file name looked up in the working directory.
pub const CONFIG_FILE: &str = ".nctrc.toml";

/// Default meta description path.
pub const DEFAULT_META_PATH: &str = "../model/meta.json";

/// Default graph output path.
pub const DEFAULT_OUTPUT_PATH: &str = "../model/graph.json";

/// Default NCT entry.
pub const DEFAULT_NCT_INDEX: usize = 0;

/// Errors surfaced by [`NctConfig::load_strict`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Root configuration structure loaded from `.nctrc.toml`.
#[derive(Debug, Deserialize, Default)]
pub struct NctConfig {
    /// Input and output locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Build selection.
    #[serde(default)]
    pub build: BuildConfig,

    /// Output formatting preferences.
    #[serde(default)]
    pub output: OutputSettings,
}

#[derive(Debug, Deserialize, Default)]
pub struct PathsConfig {
    /// Path to `meta.json`.
    #[serde(default)]
    pub meta_path: Option<PathBuf>,

    /// Path the graph is written to.
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
pub struct BuildConfig {
    /// NCT entry to analyze.
    #[serde(default)]
    pub nct_index: Option<usize>,
}

/// Output formatting preferences.
///
/// Valid formats: `table`, `json`. Command-line `--format` overrides this.
#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    #[serde(default)]
    pub format: Option<String>,

    /// Force colors on or off. Unset means auto-detect.
    #[serde(default)]
    pub color: Option<bool>,
}

impl NctConfig {
    /// Load `.nctrc.toml` from `root`, falling back to defaults.
    ///
    /// Read and parse errors are logged as warnings.
    pub fn load(root: &Path) -> Self {
        match Self::load_strict(root) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Load `.nctrc.toml` from `root`. A missing file yields defaults.
    pub fn load_strict(root: &Path) -> Result<Self, ConfigError> {
        let config_path = root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: config_path,
            source,
        })
    }

    /// Resolve the meta path: flag > config > default.
    pub fn meta_path(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.paths.meta_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_META_PATH))
    }

    /// Resolve the output path: flag > config > default.
    pub fn output_path(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.paths.output_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH))
    }

    /// Resolve the NCT index: flag > config > default.
    pub fn nct_index(&self, flag: Option<usize>) -> usize {
        flag.or(self.build.nct_index).unwrap_or(DEFAULT_NCT_INDEX)
    }

    pub fn default_format(&self) -> Option<&str> {
        self.output.format.as_deref()
    }

    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = NctConfig::default();
        assert_eq!(config.meta_path(None), PathBuf::from(DEFAULT_META_PATH));
        assert_eq!(config.output_path(None), PathBuf::from(DEFAULT_OUTPUT_PATH));
        assert_eq!(config.nct_index(None), 0);
        assert!(config.default_format().is_none());
        assert!(config.use_color().is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[paths]
meta_path = "data/meta.json"
output_path = "out/graph.json"

[build]
nct_index = 3

[output]
format = "json"
color = false
"#;
        let config: NctConfig = toml::from_str(toml_content).unwrap();

        assert_eq!(config.meta_path(None), PathBuf::from("data/meta.json"));
        assert_eq!(config.output_path(None), PathBuf::from("out/graph.json"));
        assert_eq!(config.nct_index(None), 3);
        assert_eq!(config.default_format(), Some("json"));
        assert_eq!(config.use_color(), Some(false));
    }

    #[test]
    fn test_flags_override_config() {
        let config: NctConfig = toml::from_str("[build]\nnct_index = 3\n").unwrap();
        assert_eq!(config.nct_index(Some(1)), 1);
        assert_eq!(
            config.meta_path(Some(PathBuf::from("cli.json"))),
            PathBuf::from("cli.json")
        );
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = NctConfig::load_strict(dir.path()).unwrap();
        assert!(config.paths.meta_path.is_none());
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[build\nnct_index = ").unwrap();

        let err = NctConfig::load_strict(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        // Lenient load falls back to defaults
        let config = NctConfig::load(dir.path());
        assert_eq!(config.nct_index(None), DEFAULT_NCT_INDEX);
    }
}
