//! Configuration management.
//!
//! Configuration is read from a TOML file and `PUBMED_BOARDS_*` environment
//! variables (double underscore separates sections, e.g.
//! `PUBMED_BOARDS_API__API_KEY`).
//!
//! ```toml
//! [api]
//! base_url = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils"
//! timeout_secs = 30
//! tool = "pubmed-boards"
//! email = "me@example.org"
//!
//! [storage]
//! favorites_path = "~/.local/share/pubmed-boards/favorites.json"
//! boards_dir = "~/.local/share/pubmed-boards/boards"
//! user_id = "local"
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! # Boards seeded for a user with no saved list (defaults if omitted)
//! [[boards]]
//! id = "dengue"
//! label = "Dengue"
//! query = "dengue[tiab]"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::{default_boards, Board};
use crate::sources::PUBMED_EUTILS_URL;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "PUBMED_BOARDS";

/// Config file name looked up in the working and config directories
pub const CONFIG_FILE_NAME: &str = "pubmed-boards.toml";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Remote API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Local persistence settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Boards a new user starts with
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub boards: Vec<Board>,
}

/// E-utilities endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL containing `esearch.fcgi` and `esummary.fcgi`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// NCBI `tool` parameter
    #[serde(default)]
    pub tool: Option<String>,

    /// NCBI `email` parameter
    #[serde(default)]
    pub email: Option<String>,

    /// NCBI API key (raises the rate ceiling)
    #[serde(default = "default_api_key")]
    pub api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            tool: None,
            email: None,
            api_key: default_api_key(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

fn default_base_url() -> String {
    PUBMED_EUTILS_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    crate::utils::default_user_agent().to_string()
}

fn default_api_key() -> Option<String> {
    std::env::var("NCBI_API_KEY").ok().filter(|k| !k.is_empty())
}

/// Where favorites and boards are persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding the favorite id set
    #[serde(default = "default_favorites_path")]
    pub favorites_path: PathBuf,

    /// Directory holding one board document per user
    #[serde(default = "default_boards_dir")]
    pub boards_dir: PathBuf,

    /// Identity the board document is keyed by
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            favorites_path: default_favorites_path(),
            boards_dir: default_boards_dir(),
            user_id: default_user_id(),
        }
    }
}

/// Platform data directory for this application
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pubmed-boards")
}

fn default_favorites_path() -> PathBuf {
    default_data_dir().join("favorites.json")
}

fn default_boards_dir() -> PathBuf {
    default_data_dir().join("boards")
}

fn default_user_id() -> String {
    "local".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "json" for structured output, anything else for plain text
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.as_deref() == Some("json")
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Configured seed boards, or the built-in defaults
    pub fn seed_boards(&self) -> Vec<Board> {
        if self.boards.is_empty() {
            default_boards()
        } else {
            self.boards.clone()
        }
    }

    /// Write the configuration as TOML
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Get the configuration from environment overrides and defaults only
pub fn get_config() -> Result<Config, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Default location for a user-level config file
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pubmed-boards")
        .join(CONFIG_FILE_NAME)
}

/// Look for a config file in the working directory, then the config directory
pub fn find_config_file() -> Option<PathBuf> {
    [PathBuf::from(CONFIG_FILE_NAME), default_config_path()]
        .into_iter()
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, PUBMED_EUTILS_URL);
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
        assert_eq!(config.storage.user_id, "local");
        assert!(!config.logging.is_json());
        assert_eq!(config.seed_boards().len(), 4);
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pubmed-boards.toml");
        std::fs::write(
            &path,
            r#"
[api]
base_url = "http://localhost:8080/eutils"
timeout_secs = 5
email = "me@example.org"

[storage]
user_id = "alice"

[logging]
level = "debug"
format = "json"

[[boards]]
id = "dengue"
label = "Dengue"
query = "dengue[tiab]"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8080/eutils");
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.api.email.as_deref(), Some("me@example.org"));
        assert_eq!(config.storage.user_id, "alice");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.is_json());
        assert_eq!(
            config.seed_boards(),
            vec![Board::new("dengue", "Dengue", "dengue[tiab]")]
        );
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.api.tool = Some("pubmed-boards".to_string());
        config.storage.user_id = "bob".to_string();
        config.save(&path).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.api.tool.as_deref(), Some("pubmed-boards"));
        assert_eq!(loaded.storage.user_id, "bob");
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config(Path::new("/nonexistent/pubmed-boards.toml"));
        assert!(result.is_err());
    }
}
