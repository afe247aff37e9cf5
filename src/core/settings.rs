// src/core/settings.rs

// Loading, validation and persistence of the JSON settings document.
// The document is read once at process start and never mutated mid-run.

use crate::models::Settings;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("settings file not found at '{0}'")]
    NotFound(PathBuf),
    #[error("could not read settings file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("settings file '{path}' is not valid JSON: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("required setting '{0}' is missing or empty")]
    MissingField(&'static str),
}

/// Loads and validates the settings document.
pub fn load(path: &Path) -> Result<Settings, SettingsError> {
    if !path.exists() {
        return Err(SettingsError::NotFound(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let settings: Settings =
        serde_json::from_str(&raw).map_err(|source| SettingsError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
    validate(&settings)?;
    Ok(settings)
}

/// Checks that every required field is present and non-empty.
pub fn validate(settings: &Settings) -> Result<(), SettingsError> {
    let required: [(&'static str, &str); 5] = [
        ("host", &settings.host),
        ("username", &settings.username),
        ("password", &settings.password),
        ("token", &settings.token),
        ("postgres_host", &settings.postgres_host),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(SettingsError::MissingField(name));
        }
    }
    Ok(())
}

/// Writes the settings document as pretty-printed JSON.
pub fn save(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    let rendered = serde_json::to_string_pretty(settings).map_err(|source| {
        SettingsError::Malformed {
            path: path.to_path_buf(),
            source,
        }
    })?;
    fs::write(path, rendered + "\n").map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// A placeholder document for the interactive first-run editor.
pub fn template() -> Settings {
    Settings::default()
}
