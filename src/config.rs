// SPDX-License-Identifier: GPL-3.0-only

//! Application configuration persistence

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Persisted application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera to open at startup; first enumerated camera when unset
    pub camera_id: Option<String>,
    /// Directory captured images are written to
    pub output_dir: Option<PathBuf>,
    /// Start with manual exposure controls active
    pub start_in_manual_mode: bool,
}

impl Config {
    /// Path of the configuration file, if a config directory exists
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("manual-camera").join("config.json"))
    }

    /// Load the configuration, falling back to defaults
    ///
    /// A missing file is normal; a malformed one is reported and ignored.
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(err) => {
                    warn!(path = ?path, error = %err, "Malformed config file; using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Persist the configuration
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = Self::path() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
    }

    /// Effective output directory: configured, pictures dir, or cwd
    pub fn output_dir_or_default(&self) -> PathBuf {
        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }
        dirs::picture_dir().unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert!(parsed.camera_id.is_none());
        assert!(!parsed.start_in_manual_mode);
    }

    #[test]
    fn unknown_fields_ignored() {
        let parsed: Config =
            serde_json::from_str(r#"{"camera_id":"1","someday_maybe":true}"#).unwrap();
        assert_eq!(parsed.camera_id.as_deref(), Some("1"));
    }

    #[test]
    fn configured_output_dir_wins() {
        let config = Config {
            output_dir: Some(PathBuf::from("/tmp/photos")),
            ..Config::default()
        };
        assert_eq!(config.output_dir_or_default(), PathBuf::from("/tmp/photos"));
    }
}
