use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::enrichment::SelfExclusion;

/// Environment variable overriding `api.base_url`.
pub const ENV_API_URL: &str = "BOOKHUB_API_URL";
/// Environment variable overriding `api.auth_token`.
pub const ENV_AUTH_TOKEN: &str = "BOOKHUB_AUTH_TOKEN";

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub tui: TuiConfig,
    pub data: DataConfig,
}

/// Remote API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every `/api/...` path is resolved against.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Value of the `token` session cookie for an already-authenticated session.
    pub auth_token: Option<String>,
}

/// TUI-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuiConfig {
    /// Tick interval in milliseconds for the event loop.
    pub tick_rate_ms: u64,
    /// Fixed catalog polling interval in seconds.
    pub catalog_refresh_secs: u64,
    /// How the catalog decides which books belong to the viewer.
    pub self_exclusion: SelfExclusion,
}

/// Data directory configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Override the default data directory.
    pub data_dir: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            request_timeout_secs: 30,
            auth_token: None,
        }
    }
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 50,
            catalog_refresh_secs: 5,
            self_exclusion: SelfExclusion::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `~/.config/bookhub/config.toml`, then apply
    /// environment overrides.
    pub fn load() -> Self {
        let mut config = Self::load_from(&Self::config_path());
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Load configuration from `path`.
    /// Returns `Default` if the file is missing or unparseable.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse config at {}: {e}, using defaults", path.display());
                    Self::default()
                }
            },
            Err(_) => {
                log::debug!("No config file at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            log::debug!("API base URL overridden by {ENV_API_URL}");
            self.api.base_url = url;
        }
        if let Some(token) = lookup(ENV_AUTH_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.api.auth_token = Some(token);
        }
    }

    /// Resolved data directory (override or XDG default).
    pub fn data_dir(&self) -> PathBuf {
        self.data.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("bookhub"))
                .unwrap_or_else(|| PathBuf::from("data"))
        })
    }

    /// Directory the rolling log files are written to.
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("bookhub").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:3000");
        assert_eq!(config.api.request_timeout_secs, 30);
        assert!(config.api.auth_token.is_none());
        assert_eq!(config.tui.tick_rate_ms, 50);
        assert_eq!(config.tui.catalog_refresh_secs, 5);
        assert_eq!(config.tui.self_exclusion, SelfExclusion::DisplayName);
        assert!(config.data.data_dir.is_none());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("missing.toml"));
        assert_eq!(config.tui.catalog_refresh_secs, 5);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[api]
base_url = "https://books.example.com"

[tui]
self_exclusion = "owner_id"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.api.base_url, "https://books.example.com");
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.tui.self_exclusion, SelfExclusion::OwnerId);
        assert_eq!(config.tui.tick_rate_ms, 50);
    }

    #[test]
    fn test_load_unparseable_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is [not toml").unwrap();
        let config = AppConfig::load_from(&path);
        assert_eq!(config.api.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_URL, "http://api.internal:8080"),
            (ENV_AUTH_TOKEN, "abc123"),
        ]);
        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.api.base_url, "http://api.internal:8080");
        assert_eq!(config.api.auth_token.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(|_| Some("   ".to_string()));
        assert_eq!(config.api.base_url, "http://localhost:3000");
        assert!(config.api.auth_token.is_none());
    }

    #[test]
    fn test_data_dir_override() {
        let mut config = AppConfig::default();
        config.data.data_dir = Some(PathBuf::from("/tmp/custom"));
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/custom"));
        assert_eq!(config.log_dir(), PathBuf::from("/tmp/custom/logs"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = AppConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.api.base_url, config.api.base_url);
        assert_eq!(deserialized.tui.self_exclusion, config.tui.self_exclusion);
    }
}
