//! Configuration management.
//!
//! One JSON config file drives a run: where DBC files live, where
//! their meta documents live, where exports are written, and where the
//! SQLite database sits. On first run a template is written for the
//! user to edit; every later run loads it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default config location when neither `--config` nor
/// `DBCSYNC_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Directory layout for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    /// Directory holding source `.dbc` files.
    pub base: PathBuf,
    /// Directory holding `*.meta.json` schema documents.
    pub meta: PathBuf,
    /// Directory rebuilt `.dbc` files are exported to.
    pub export: PathBuf,
}

/// Database location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

/// Behavior toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    /// Skip exporting tables whose content checksum is unchanged.
    #[serde(default = "default_use_versioning")]
    pub use_versioning: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            use_versioning: true,
        }
    }
}

fn default_use_versioning() -> bool {
    true
}

/// Loaded configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub paths: Paths,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub options: Options,
}

/// Result of [`Config::load_or_init`].
#[derive(Debug)]
pub enum LoadedConfig {
    /// An existing config was loaded.
    Loaded(Config),
    /// No config existed; a template was written to this path. The
    /// caller should tell the user to edit it and re-run.
    Created(PathBuf),
}

impl Config {
    /// The template written on first run.
    #[must_use]
    pub fn template() -> Self {
        Self {
            paths: Paths {
                base: PathBuf::from("./dbc"),
                meta: PathBuf::from("./meta"),
                export: PathBuf::from("./export"),
            },
            database: DatabaseConfig {
                path: PathBuf::from("./dbcsync.db"),
            },
            options: Options::default(),
        }
    }

    /// Load a config file.
    ///
    /// # Errors
    ///
    /// Returns a config error if the file is missing, unreadable, or
    /// not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("config file {} not found: {e}", path.display()))
        })?;
        serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("invalid config {}: {e}", path.display())))
    }

    /// Load a config, writing a template if none exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing config is invalid or the
    /// template cannot be written.
    pub fn load_or_init(path: &Path) -> Result<LoadedConfig> {
        if path.exists() {
            Ok(LoadedConfig::Loaded(Self::load(path)?))
        } else {
            Self::template().write(path)?;
            Ok(LoadedConfig::Created(path.to_path_buf()))
        }
    }

    /// Write this config as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Path of a source DBC file under the base directory.
    #[must_use]
    pub fn dbc_path(&self, file: &str) -> PathBuf {
        self.paths.base.join(file)
    }

    /// Path of a table's meta document.
    #[must_use]
    pub fn meta_path(&self, name: &str) -> PathBuf {
        self.paths.meta.join(format!("{name}.meta.json"))
    }

    /// Path an exported DBC file is written to.
    #[must_use]
    pub fn export_path(&self, file: &str) -> PathBuf {
        self.paths.export.join(file)
    }
}

/// Resolve the config path: explicit flag first, then the default.
///
/// The `--config` flag also reads `DBCSYNC_CONFIG` via clap.
#[must_use]
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    explicit.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_round_trips() {
        let template = Config::template();
        let json = serde_json::to_string(&template).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.paths.base, template.paths.base);
        assert!(parsed.options.use_versioning);
    }

    #[test]
    fn test_options_default_when_absent() {
        let json = r#"{
            "paths": {"base": "b", "meta": "m", "export": "e"},
            "database": {"path": "d.db"}
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.options.use_versioning);
    }

    #[test]
    fn test_load_or_init_creates_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let first = Config::load_or_init(&path).unwrap();
        assert!(matches!(first, LoadedConfig::Created(_)));
        assert!(path.exists());

        let second = Config::load_or_init(&path).unwrap();
        assert!(matches!(second, LoadedConfig::Loaded(_)));
    }

    #[test]
    fn test_missing_config_error_mentions_not_found() {
        let err = Config::load(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(err.hint().is_some());
    }

    #[test]
    fn test_path_helpers() {
        let config = Config::template();
        assert_eq!(config.dbc_path("Spell.dbc"), PathBuf::from("./dbc/Spell.dbc"));
        assert_eq!(
            config.meta_path("Spell"),
            PathBuf::from("./meta/Spell.meta.json")
        );
        assert_eq!(
            config.export_path("Spell.dbc"),
            PathBuf::from("./export/Spell.dbc")
        );
    }
}
