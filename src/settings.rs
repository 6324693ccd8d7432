//! Read-only client settings
//!
//! The dashboard keeps user credentials in a persisted key-value store. This
//! crate only ever reads it, and only to decide whether the podcast
//! affordance is offered at all.

use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Key under which the ElevenLabs credential is stored by the settings page
pub const ELEVENLABS_API_KEY: &str = "elevenlabsApiKey";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("settings file {path} is not a JSON object: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Injected read-only key-value store
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// In-memory store, used when no settings file is configured and in tests
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: HashMap<String, String>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Store backed by a JSON object on disk (the dashboard's `apiKeys` blob)
///
/// Non-string values are kept in their JSON text form.
#[derive(Debug, Clone, Default)]
pub struct JsonSettings {
    values: HashMap<String, String>,
}

impl JsonSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let settings = Self::from_json(&raw).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        info!(
            "Loaded {} settings entries from {}",
            settings.values.len(),
            path.display()
        );

        Ok(settings)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)?;

        let values = object
            .into_iter()
            .filter_map(|(key, value)| match value {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some((key, s)),
                other => Some((key, other.to_string())),
            })
            .collect();

        Ok(Self { values })
    }
}

impl SettingsStore for JsonSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Whether the play affordance can be offered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Availability {
    Available,
    Unavailable { reason: String },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }

    /// Check that `required` (if any) is present and non-blank in `store`
    pub fn check(store: &dyn SettingsStore, required: Option<&str>) -> Self {
        let Some(key) = required else {
            return Availability::Available;
        };

        match store.get(key) {
            Some(value) if !value.trim().is_empty() => Availability::Available,
            _ => Availability::Unavailable {
                reason: format!("Add your {} in Settings to listen", credential_label(key)),
            },
        }
    }
}

fn credential_label(key: &str) -> &str {
    match key {
        ELEVENLABS_API_KEY => "ElevenLabs API key",
        other => other,
    }
}
