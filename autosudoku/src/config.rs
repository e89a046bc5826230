//! Persistent application configuration.
//!
//! Stored as JSON in a platform-appropriate config directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// On-disk configuration for the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Only every Nth frame of a stream is scanned.
    pub sample_every: u32,

    /// Where rectified grids and per-frame reports are written, if anywhere.
    pub debug_dir: Option<PathBuf>,

    /// Scanner constants.
    pub scan: scan::ScanParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_every: 10,
            debug_dir: None,
            scan: scan::ScanParams::default(),
        }
    }
}

impl Config {
    /// Path to the config file.
    pub fn path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("config_dir() unavailable")?;
        Ok(base.join("autosudoku.json"))
    }

    /// Load configuration from `path` (or the default location), falling back
    /// to defaults on any error.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let loaded = match path {
            Some(path) => Self::try_load_from(path),
            None => Self::try_load(),
        };
        match loaded {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load config; using defaults");
                Self::default()
            }
        }
    }

    /// Try to load configuration from the default location.
    pub fn try_load() -> Result<Self> {
        Self::try_load_from(&Self::path()?)
    }

    pub fn try_load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
        let cfg = serde_json::from_str(&json).with_context(|| format!("parse {:?}", path))?;
        Ok(cfg)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("serialize config")?;
        fs::write(path, json).with_context(|| format!("write {:?}", path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_survive_a_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("autosudoku.json");

        Config::default().save_to(&path).unwrap();
        assert_eq!(Config::try_load_from(&path).unwrap(), Config::default());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: Config = serde_json::from_str(r#"{"sample_every": 3, "scan": {"min_hull_area": 5000.0}}"#).unwrap();
        assert_eq!(cfg.sample_every, 3);
        assert_eq!(cfg.scan.min_hull_area, 5000.0);
        assert_eq!(cfg.scan.cell_edge, 28);
        assert_eq!(cfg.debug_dir, None);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let cfg = Config::try_load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn broken_file_is_an_error_but_load_or_default_recovers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("autosudoku.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(Config::try_load_from(&path).is_err());
        assert_eq!(Config::load_or_default(Some(&path)), Config::default());
    }

    #[test]
    fn interpolation_is_written_in_snake_case() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains(r#""interpolation":"bilinear""#), "{json}");
    }
}
