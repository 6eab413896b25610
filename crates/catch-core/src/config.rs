//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/catch/config.toml)
//! 3. Environment variables (CATCH_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ValidationError;
use crate::format::Locale;
use crate::remote::relay::DEFAULT_RELAY_BIND;
use crate::remote::DEFAULT_COLLECTION;

/// Environment variable prefix
const ENV_PREFIX: &str = "CATCH";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for local data (order database, local realtime tree)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Relay server URL, e.g. ws://127.0.0.1:3030
    #[serde(default)]
    pub sync_url: Option<String>,

    /// Whether to use the relay instead of the local tree
    #[serde(default)]
    pub sync_enabled: bool,

    /// Collection under each store holding its fish
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Locale tag for prices
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Address `catch relay` binds to
    #[serde(default = "default_relay_bind")]
    pub relay_bind: String,

    /// TUI debug log file (defaults to {data_dir}/debug.log)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Store opened most recently, offered first by the picker
    #[serde(default)]
    pub last_store: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            sync_url: None,
            sync_enabled: false,
            collection: default_collection(),
            locale: default_locale(),
            relay_bind: default_relay_bind(),
            log_file: None,
            last_store: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (CATCH_DATA_DIR, CATCH_SYNC_URL, CATCH_SYNC_ENABLED, CATCH_LOCALE)
    /// 2. Config file (~/.config/catch/config.toml or CATCH_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from `--config` if given, otherwise the default location
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = Self::load_file_only(path)?;
        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load only what the file at `path` says, without environment overrides
    ///
    /// Use this before saving, so `CATCH_*` values never end up in the file.
    pub fn load_file_only(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Edit the file at `path` in place, leaving the environment out of it
    pub fn update_file(path: &Path, edit: impl FnOnce(&mut Config) -> Result<()>) -> Result<()> {
        let mut config = Self::load_file_only(path)?;
        edit(&mut config)?;
        config.save_to_path(path)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // CATCH_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // CATCH_SYNC_URL
        if let Ok(val) = std::env::var(format!("{}_SYNC_URL", ENV_PREFIX)) {
            self.sync_url = if val.is_empty() { None } else { Some(val) };
        }

        // CATCH_SYNC_ENABLED
        if let Ok(val) = std::env::var(format!("{}_SYNC_ENABLED", ENV_PREFIX)) {
            self.sync_enabled = val.eq_ignore_ascii_case("true") || val == "1";
        }

        // CATCH_LOCALE
        if let Ok(val) = std::env::var(format!("{}_LOCALE", ENV_PREFIX)) {
            if !val.is_empty() {
                self.locale = val;
            }
        }
    }

    /// Ensure data directory exists
    pub fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Parsed price locale
    pub fn locale(&self) -> Result<Locale, ValidationError> {
        self.locale.parse()
    }

    /// Relay URL when sync is switched on and configured
    pub fn relay_url(&self) -> Option<&str> {
        if self.sync_enabled {
            self.sync_url.as_deref().filter(|url| !url.is_empty())
        } else {
            None
        }
    }

    /// Save configuration to `path`, creating parent directories
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// `--config` if given, otherwise the default location
    pub fn file_path(cli_path: Option<&PathBuf>) -> PathBuf {
        cli_path.cloned().unwrap_or_else(Self::config_file_path)
    }

    /// Get the config file path
    ///
    /// Can be overridden with CATCH_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("catch")
            .join("config.toml")
    }

    /// Get the path to the SQLite database holding orders
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("catch.db")
    }

    /// Get the path to the local realtime tree (used when sync is off)
    pub fn tree_path(&self) -> PathBuf {
        self.data_dir.join("tree.json")
    }

    /// Get the TUI debug log path
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("debug.log"))
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("catch")
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_locale() -> String {
    Locale::default().tag().to_string()
}

fn default_relay_bind() -> String {
    DEFAULT_RELAY_BIND.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            // Clear all the vars
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "CATCH_DATA_DIR",
        "CATCH_SYNC_URL",
        "CATCH_SYNC_ENABLED",
        "CATCH_LOCALE",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.sync_enabled);
        assert!(config.sync_url.is_none());
        assert!(config.data_dir.ends_with("catch"));
        assert_eq!(config.collection, "fishes");
        assert_eq!(config.locale().unwrap(), Locale::EnUs);
        assert_eq!(config.relay_bind, "127.0.0.1:3030");
    }

    #[test]
    fn test_file_paths() {
        let config = Config::default();

        assert!(config.sqlite_path().ends_with("catch.db"));
        assert!(config.tree_path().ends_with("tree.json"));
        assert!(config.log_path().ends_with("debug.log"));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("CATCH_DATA_DIR", "/tmp/catch-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/catch-test"));
    }

    #[test]
    fn test_env_override_sync_enabled() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        assert!(!config.sync_enabled);

        env::set_var("CATCH_SYNC_ENABLED", "true");
        config.apply_env_overrides();
        assert!(config.sync_enabled);

        env::set_var("CATCH_SYNC_ENABLED", "1");
        config.sync_enabled = false;
        config.apply_env_overrides();
        assert!(config.sync_enabled);

        env::set_var("CATCH_SYNC_ENABLED", "false");
        config.apply_env_overrides();
        assert!(!config.sync_enabled);
    }

    #[test]
    fn test_env_override_sync_url() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        assert!(config.sync_url.is_none());

        env::set_var("CATCH_SYNC_URL", "ws://localhost:3030");
        config.apply_env_overrides();
        assert_eq!(config.sync_url, Some("ws://localhost:3030".to_string()));

        // Empty string clears it
        env::set_var("CATCH_SYNC_URL", "");
        config.apply_env_overrides();
        assert!(config.sync_url.is_none());
    }

    #[test]
    fn test_env_override_locale() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("CATCH_LOCALE", "de_DE");
        config.apply_env_overrides();

        assert_eq!(config.locale().unwrap(), Locale::DeDe);
    }

    #[test]
    fn test_relay_url_requires_enabled() {
        let mut config = Config {
            sync_url: Some("ws://localhost:3030".to_string()),
            ..Config::default()
        };
        assert!(config.relay_url().is_none());

        config.sync_enabled = true;
        assert_eq!(config.relay_url(), Some("ws://localhost:3030"));
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            sync_url = "ws://example.com"
            sync_enabled = true
            locale = "en-GB"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.sync_url, Some("ws://example.com".to_string()));
        assert!(config.sync_enabled);
        assert_eq!(config.locale().unwrap(), Locale::EnGb);
        // Unset fields keep their defaults
        assert_eq!(config.collection, "fishes");
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("conf").join("config.toml");

        let config = Config {
            data_dir: temp_dir.path().join("data"),
            last_store: Some("blue-whale-7".to_string()),
            ..Config::default()
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.data_dir, config.data_dir);
        assert_eq!(loaded.last_store.as_deref(), Some("blue-whale-7"));
        assert!(loaded.data_dir.exists());
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        env::set_var("CATCH_DATA_DIR", temp_dir.path().join("data"));

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        // Should return defaults when file doesn't exist
        assert!(!config.sync_enabled);
        assert!(config.sync_url.is_none());
    }

    #[test]
    fn test_update_file_ignores_env() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "locale = \"en-US\"\n").unwrap();

        env::set_var("CATCH_LOCALE", "de-DE");
        env::set_var("CATCH_SYNC_URL", "ws://temporary:1");

        Config::update_file(&path, |config| {
            config.last_store = Some("blue-whale-7".to_string());
            Ok(())
        })
        .unwrap();

        let saved = Config::load_file_only(&path).unwrap();
        assert_eq!(saved.locale, "en-US");
        assert!(saved.sync_url.is_none());
        assert_eq!(saved.last_store.as_deref(), Some("blue-whale-7"));

        // Loading for use still applies the override
        let effective = Config::load_from_str("locale = \"en-US\"").unwrap();
        assert_eq!(effective.locale, "de-DE");
    }
}
