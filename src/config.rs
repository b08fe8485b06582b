use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the configured API base URL
pub const API_URL_ENV: &str = "SEMA_API_URL";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sema-Data API settings
    pub api: ApiConfig,

    /// UI preferences
    pub ui: UiConfig,

    /// Sema home directory (~/.sema), not persisted
    #[serde(skip)]
    pub sema_home: PathBuf,
}

/// Connection settings for the answer service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub chat_path: String,
    pub health_path: String,
    /// Send prior turns in the `history` field instead of an empty array
    pub send_history: bool,
    /// Request timeout; unset means wait indefinitely
    pub timeout_secs: Option<u64>,
}

/// UI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub show_timestamps: bool,
    /// Start with source detail cards expanded
    pub show_source_details: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            chat_path: "/api/v1/chat".to_string(),
            health_path: "/health".to_string(),
            send_history: false,
            timeout_secs: None,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_timestamps: true,
            show_source_details: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
        Config {
            api: ApiConfig::default(),
            ui: UiConfig::default(),
            sema_home: home.join(".sema"),
        }
    }
}

impl Config {
    /// Load configuration from ~/.sema/config.toml, then apply env overrides
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let sema_home = home.join(".sema");

        fs::create_dir_all(&sema_home).context("Failed to create .sema directory")?;

        let mut config = Self::load_from(&sema_home.join("config.toml"))?;
        config.sema_home = sema_home;
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from an explicit file; missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        if let Some(parent) = path.parent() {
            config.sema_home = parent.to_path_buf();
        }
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.sema_home).context("Failed to create .sema directory")?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(self.config_path(), content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn config_path(&self) -> PathBuf {
        self.sema_home.join("config.toml")
    }

    /// File the TUI writes its diagnostics to
    pub fn log_path(&self) -> PathBuf {
        self.sema_home.join("sema.log")
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.set_base_url(url);
            }
        }
    }

    /// Override the API base URL (trailing slashes are dropped)
    pub fn set_base_url(&mut self, url: impl Into<String>) {
        self.api.base_url = url.into().trim_end_matches('/').to_string();
    }

    pub fn chat_url(&self) -> String {
        join_url(&self.api.base_url, &self.api.chat_path)
    }

    pub fn health_url(&self) -> String {
        join_url(&self.api.base_url, &self.api.health_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_local_service() {
        let config = Config::default();
        assert_eq!(config.chat_url(), "http://localhost:8000/api/v1/chat");
        assert_eq!(config.health_url(), "http://localhost:8000/health");
        assert!(!config.api.send_history);
        assert!(config.api.timeout_secs.is_none());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.api, ApiConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[api]\nbase_url = \"https://sema.example.org/\"\nsend_history = true\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api.base_url, "https://sema.example.org/");
        assert!(config.api.send_history);
        assert_eq!(config.api.chat_path, "/api/v1/chat");
        assert_eq!(config.chat_url(), "https://sema.example.org/api/v1/chat");
        assert_eq!(config.ui, UiConfig::default());
        assert_eq!(config.sema_home, dir.path());
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.sema_home = dir.path().to_path_buf();
        config.api.timeout_secs = Some(30);
        config.ui.show_source_details = true;
        config.save().unwrap();

        let loaded = Config::load_from(&config.config_path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api = 3").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn base_url_override_strips_trailing_slash() {
        let mut config = Config::default();
        config.set_base_url("http://10.0.0.5:9000/");
        assert_eq!(config.chat_url(), "http://10.0.0.5:9000/api/v1/chat");
    }
}
