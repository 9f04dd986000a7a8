//! Layered configuration: built-in defaults, overridden by a config file,
//! overridden by CLI flags (SPEC_FULL.md §6, grounded on the teacher's
//! `config/config_file.rs` file-then-defaults layering).

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_THRESHOLD: f64 = 0.8;
const DEFAULT_REFERENCE: usize = 3;
const DEFAULT_MAX_SCORE: u32 = 100;

/// Mirrors the on-disk config file's shape. Every field optional so a file
/// only needs to mention what it overrides.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    threshold: Option<f64>,
    reference: Option<usize>,
    max_score: Option<u32>,
    skip_cache: Option<bool>,
    ignored_log_levels: Option<Vec<String>>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub threshold: f64,
    pub reference: usize,
    /// Reserved for future use; parsed and carried but never read.
    pub max_score: u32,
    pub skip_cache: bool,
    pub ignored_log_levels: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            reference: DEFAULT_REFERENCE,
            max_score: DEFAULT_MAX_SCORE,
            skip_cache: false,
            ignored_log_levels: vec!["debug".to_string()],
        }
    }
}

impl Config {
    /// Resolves `APISAN_CONF` (default `apisan.yaml`), applies its values
    /// over the defaults, then applies the CLI overlay. A missing file is
    /// not an error; an unsupported extension is (SPEC_FULL.md §7 item 4).
    pub fn load(overlay: ConfigOverlay) -> Result<Self, ConfigError> {
        let path = env::var("APISAN_CONF").unwrap_or_else(|_| "apisan.yaml".to_string());
        let mut config = Self::default();
        if let Some(file) = read_config_file(Path::new(&path))? {
            config.apply_file(file);
        }
        config.apply_overlay(overlay);
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(v) = file.threshold {
            self.threshold = v;
        }
        if let Some(v) = file.reference {
            self.reference = v;
        }
        if let Some(v) = file.max_score {
            self.max_score = v;
        }
        if let Some(v) = file.skip_cache {
            self.skip_cache = v;
        }
        if let Some(v) = file.ignored_log_levels {
            self.ignored_log_levels = v;
        }
    }

    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        if let Some(v) = overlay.threshold {
            self.threshold = v;
        }
        if let Some(v) = overlay.reference {
            self.reference = v;
        }
        if let Some(v) = overlay.skip_cache {
            self.skip_cache = v;
        }
    }
}

/// CLI-supplied values that, when present, win over both the file and the
/// built-in defaults.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverlay {
    pub threshold: Option<f64>,
    pub reference: Option<usize>,
    pub skip_cache: Option<bool>,
}

fn read_config_file(path: &Path) -> Result<Option<FileConfig>, ConfigError> {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return Ok(None);
    };
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parsed = match extension {
        "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e.into(),
        })?,
        "json" => serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e.into(),
        })?,
        other => {
            return Err(ConfigError::UnsupportedExtension {
                extension: other.to_string(),
            })
        }
    };
    Ok(Some(parsed))
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(env::var("APISAN_CONF").unwrap_or_else(|_| "apisan.yaml".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = Config::default();
        assert_eq!(config.threshold, 0.8);
        assert_eq!(config.reference, 3);
        assert_eq!(config.max_score, 100);
        assert!(!config.skip_cache);
        assert_eq!(config.ignored_log_levels, vec!["debug".to_string()]);
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let result = read_config_file(Path::new("/nonexistent/apisan.yaml")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn unsupported_extension_is_fatal() {
        let dir = std::env::temp_dir().join("apisan-config-test-unsupported.toml");
        std::fs::write(&dir, "threshold = 0.5").unwrap();
        let result = read_config_file(&dir);
        std::fs::remove_file(&dir).ok();
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedExtension { .. })
        ));
    }

    #[test]
    fn cli_overlay_wins_over_file_value() {
        let mut config = Config::default();
        config.apply_file(FileConfig {
            skip_cache: Some(false),
            ..Default::default()
        });
        config.apply_overlay(ConfigOverlay {
            skip_cache: Some(true),
            ..Default::default()
        });
        assert!(config.skip_cache);
    }
}
