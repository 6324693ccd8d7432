use crate::podcast::{ControllerOptions, DEFAULT_VOLUME};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub backend: BackendConfig,
    pub player: PlayerConfig,
    pub settings: SettingsConfig,
    pub downloads: DownloadsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "pulse-podcast".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8090,
        }
    }
}

/// Where the synthesis endpoint lives
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub autoplay: bool,
    pub default_volume: f32,
    /// Cursor resolution of the headless renderer
    pub tick_ms: u64,
    /// Settings key that must be present before play is offered
    pub required_credential: Option<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            autoplay: true,
            default_volume: DEFAULT_VOLUME,
            tick_ms: 250,
            required_credential: None,
        }
    }
}

impl PlayerConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            autoplay: self.autoplay,
            volume: self.default_volume,
            muted: false,
            required_credential: self.required_credential.clone(),
        }
    }
}

/// Read-only client settings (JSON object on disk)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadsConfig {
    pub dir: PathBuf,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("downloads"),
        }
    }
}

impl Config {
    /// Load `path` (any format the config crate knows; the file is optional)
    /// with `PULSE__SECTION__KEY` environment overrides on top
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("PULSE").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load("does/not/exist/pulse-podcast").unwrap();
        assert_eq!(cfg.service.http.port, 8090);
        assert_eq!(cfg.backend.base_url, "http://localhost:8000");
        assert!(cfg.player.autoplay);
        assert_eq!(cfg.player.tick(), Duration::from_millis(250));
    }

    #[test]
    fn test_load_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulse.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[backend]
base_url = "http://pulse.internal:9000"

[player]
autoplay = false
default_volume = 0.5
required_credential = "elevenlabsApiKey"
"#
        )
        .unwrap();

        let cfg = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.backend.base_url, "http://pulse.internal:9000");

        let options = cfg.player.controller_options();
        assert!(!options.autoplay);
        assert_eq!(options.volume, 0.5);
        assert_eq!(options.required_credential.as_deref(), Some("elevenlabsApiKey"));
        assert_eq!(cfg.downloads.dir, PathBuf::from("downloads"));
    }

    #[test]
    fn test_environment_override_uses_double_underscore() {
        // Only the service name is overridden so parallel tests keep their defaults
        std::env::set_var("PULSE__SERVICE__NAME", "pulse-podcast-staging");
        let cfg = Config::load("does/not/exist/pulse-podcast");
        std::env::remove_var("PULSE__SERVICE__NAME");

        assert_eq!(cfg.unwrap().service.name, "pulse-podcast-staging");
    }
}
