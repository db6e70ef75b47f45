//! Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::chat::core::errors::{ChatError, ChatResult};

/// Environment variable naming an optional JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "STOXARA_CONFIG";
/// Environment variable carrying the provider credential.
pub const API_KEY_ENV: &str = "STOXARA_API_KEY";
/// Legacy credential variable, read when [`API_KEY_ENV`] is unset.
pub const LEGACY_API_KEY_ENV: &str = "API_KEY";
/// Environment variable overriding the model name.
pub const MODEL_ENV: &str = "STOXARA_MODEL";
/// Environment variable overriding the HTTP port.
pub const PORT_ENV: &str = "STOXARA_PORT";
/// Environment variable overriding the `SQLite` database path.
pub const DB_PATH_ENV: &str = "STOXARA_DB";
/// Environment variable overriding the static asset directory.
pub const STATIC_DIR_ENV: &str = "STOXARA_STATIC_DIR";

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Persistence settings.
    pub storage: StorageConfig,
    /// Generation provider settings.
    pub provider: ProviderConfig,
    /// HTTP bridge settings.
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration from `STOXARA_CONFIG` (if set) and apply environment overrides.
    ///
    /// # Errors
    /// Returns an error if the configuration file cannot be read or parsed,
    /// or if the result fails validation.
    pub fn from_env() -> ChatResult<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn from_file(path: &Path) -> ChatResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    ///
    /// # Errors
    /// Returns an error if a numeric override cannot be parsed.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ChatResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).or_else(|| lookup(LEGACY_API_KEY_ENV)) {
            self.provider.api_key = Some(key);
        }
        if let Some(model) = lookup(MODEL_ENV) {
            self.provider.model = model;
        }
        if let Some(port) = lookup(PORT_ENV) {
            self.server.port = port
                .parse()
                .map_err(|_| ChatError::InvalidConfig(format!("{PORT_ENV} is not a port: {port}")))?;
        }
        if let Some(path) = lookup(DB_PATH_ENV) {
            self.storage.sqlite_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup(STATIC_DIR_ENV) {
            self.server.static_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ChatResult<()> {
        if self.storage.sessions_key.trim().is_empty() {
            return Err(ChatError::InvalidConfig(
                "storage.sessions_key must not be empty".to_string(),
            ));
        }

        if !is_sql_identifier(&self.storage.table) {
            return Err(ChatError::InvalidConfig(format!(
                "storage.table is not a valid identifier: {}",
                self.storage.table
            )));
        }

        if self.provider.model.trim().is_empty() {
            return Err(ChatError::InvalidConfig(
                "provider.model must not be empty".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ChatError::InvalidConfig(
                "provider.temperature must be within 0.0..=2.0".to_string(),
            ));
        }

        if self.provider.request_timeout_secs == 0 || self.provider.connect_timeout_secs == 0 {
            return Err(ChatError::InvalidConfig(
                "provider timeouts must be > 0".to_string(),
            ));
        }

        Url::parse(&self.provider.base_url)?;

        Ok(())
    }
}

fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Which persistence adapter backs the session store.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process-local map; nothing survives a restart.
    Memory,
    /// Key-value slot table in a `SQLite` file.
    Sqlite,
}

/// Persistence settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Adapter selection.
    pub backend: StorageBackend,
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
    /// Slot table name.
    pub table: String,
    /// Key of the slot holding the session list.
    pub sessions_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            sqlite_path: PathBuf::from("stoxara.sqlite"),
            table: "kv_slots".to_string(),
            sessions_key: "stoxara_sessions".to_string(),
        }
    }
}

/// Generation provider settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Gemini model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// API base URL (up to and including the version segment).
    pub base_url: String,
    /// API credential; supplied out of band and never serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: "gemini-3-pro-preview".to_string(),
            temperature: 0.7,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: None,
            connect_timeout_secs: 5,
            request_timeout_secs: 120,
        }
    }
}

/// HTTP bridge settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,
    /// Directory of static frontend assets.
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            static_dir: PathBuf::from("static"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.sessions_key, "stoxara_sessions");
        assert_eq!(config.provider.model, "gemini-3-pro-preview");
        assert!((config.provider.temperature - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        let applied = config.apply_env_overrides(lookup_from(&[
            (LEGACY_API_KEY_ENV, "legacy"),
            (MODEL_ENV, "gemini-2.5-flash"),
            (PORT_ENV, "8080"),
        ]));
        assert!(applied.is_ok());
        assert_eq!(config.provider.api_key.as_deref(), Some("legacy"));
        assert_eq!(config.provider.model, "gemini-2.5-flash");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_primary_key_wins_over_legacy() {
        let mut config = AppConfig::default();
        let applied = config.apply_env_overrides(lookup_from(&[
            (API_KEY_ENV, "primary"),
            (LEGACY_API_KEY_ENV, "legacy"),
        ]));
        assert!(applied.is_ok());
        assert_eq!(config.provider.api_key.as_deref(), Some("primary"));
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let mut config = AppConfig::default();
        let applied = config.apply_env_overrides(lookup_from(&[(PORT_ENV, "eighty")]));
        assert!(matches!(applied, Err(ChatError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.storage.table = "slots; DROP TABLE x".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.provider.base_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ChatError::Url(_))));

        let mut config = AppConfig::default();
        config.provider.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("secret".to_string());
        let json = serde_json::to_string(&config).unwrap_or_default();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: Result<AppConfig, _> =
            serde_json::from_str(r#"{"server": {"port": 9000}, "storage": {"backend": "memory"}}"#);
        assert!(parsed.is_ok());
        let config = parsed.unwrap_or_default();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.table, "kv_slots");
    }
}
