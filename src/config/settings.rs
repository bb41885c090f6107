//! Application settings and configuration types.
//!
//! Settings are persisted to `~/.config/atelier/settings.json` (or the
//! platform equivalent) and loaded at startup. Missing sections and fields
//! fall back to their defaults.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ClearDefaultPolicy, DEFAULT_COUNTRY, DEFAULT_POSTAL_CODE_PATTERN};

/// Errors that can occur while loading or saving settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no configuration directory available on this platform")]
    NoConfigDir,
}

/// Top-level application settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Address validation and default-flag behavior.
    pub addresses: AddressSettings,
    /// Database location.
    pub storage: StorageSettings,
    /// Log filtering.
    pub logging: LoggingSettings,
}

impl Settings {
    /// Returns the platform settings file path.
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        project_dirs()
            .map(|dirs| dirs.config_dir().join("settings.json"))
            .ok_or(SettingsError::NoConfigDir)
    }

    /// Loads settings from `path`, returning defaults if the file is absent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Settings file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Writes settings to `path` as pretty-printed JSON, creating parent
    /// directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Address validation and default-flag configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressSettings {
    /// Regular expression every postal code must match.
    pub postal_code_pattern: String,
    /// Country used when an address leaves it out.
    pub default_country: String,
    /// How to handle clearing the flag on the current default address.
    pub clear_default_policy: ClearDefaultPolicy,
}

impl Default for AddressSettings {
    fn default() -> Self {
        Self {
            postal_code_pattern: DEFAULT_POSTAL_CODE_PATTERN.to_string(),
            default_country: DEFAULT_COUNTRY.to_string(),
            clear_default_policy: ClearDefaultPolicy::Permissive,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite database file. Relative paths resolve against the platform
    /// data directory.
    pub database_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("atelier.db"),
        }
    }
}

impl StorageSettings {
    /// Returns the absolute database path.
    pub fn resolved_database_path(&self) -> PathBuf {
        if self.database_path.is_absolute() {
            return self.database_path.clone();
        }
        match project_dirs() {
            Some(dirs) => dirs.data_dir().join(&self.database_path),
            None => self.database_path.clone(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "atelier", "atelier")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_settings_are_valid() {
        let settings = Settings::default();
        assert_eq!(settings.addresses.default_country, "India");
        assert_eq!(
            settings.addresses.clear_default_policy,
            ClearDefaultPolicy::Permissive
        );
        assert_eq!(settings.logging.filter, "info");
    }

    #[test]
    fn policy_serialization() {
        let json = serde_json::to_string(&ClearDefaultPolicy::Promote).unwrap();
        assert_eq!(json, "\"promote\"");

        let policy: ClearDefaultPolicy = serde_json::from_str("\"reject\"").unwrap();
        assert_eq!(policy, ClearDefaultPolicy::Reject);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let json = r#"{"addresses":{"default_country":"IN"}}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();

        assert_eq!(settings.addresses.default_country, "IN");
        assert_eq!(
            settings.addresses.postal_code_pattern,
            DEFAULT_POSTAL_CODE_PATTERN
        );
        assert_eq!(settings.storage, StorageSettings::default());
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.addresses.clear_default_policy = ClearDefaultPolicy::Reject;
        settings.addresses.postal_code_pattern = r"^[0-9]{5}$".to_string();
        settings.storage.database_path = dir.path().join("test.db");

        settings.save(&path).unwrap();
        let loaded = Settings::load(&path).unwrap();

        assert_eq!(loaded, settings);
    }

    #[test]
    fn load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Settings::load(&path), Err(SettingsError::Json(_))));
    }

    #[test]
    fn absolute_database_path_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageSettings {
            database_path: dir.path().join("abs.db"),
        };
        assert_eq!(storage.resolved_database_path(), dir.path().join("abs.db"));
    }
}
