use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use tabvault_core::schema::RefreshPolicy;

use crate::normalize::DEFAULT_BLACKLIST;

/// Remote site prefix joined to every tab key.
pub const DEFAULT_BASE_URL: &str = "https://tabs.ultimate-guitar.com/tab/";

/// Keys accepted by `tabvault config get/set`.
pub const CONFIG_KEYS: &[&str] = &[
    "database_path",
    "base_url",
    "request_timeout_secs",
    "requests_per_second",
    "user_agent",
    "refresh_policy",
];

/// Configuration for tabvault.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (TABVAULT_* prefix)
/// 3. Config file (~/.config/tabvault/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite cache.
    ///
    /// Default: ~/.local/share/tabvault/tabvault.db
    pub database_path: PathBuf,

    /// Prefix of every remote tab page; stripped from sibling URLs.
    pub base_url: String,

    /// Upper bound on a single page fetch.
    pub request_timeout_secs: u64,

    /// Outbound request rate; 0 disables limiting.
    pub requests_per_second: u32,

    pub user_agent: String,

    /// Remote content types that are not plain tablature.
    pub blacklist: Vec<String>,

    /// Whether a refetch overwrites the cached version and rating.
    pub refresh_policy: RefreshPolicy,

    pub logging: LoggingConfig,
}

/// Logger settings applied by the CLI at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error.
    pub level: String,
    pub coloured: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            coloured: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 30,
            requests_per_second: 2,
            user_agent: format!(
                "tabvault/{} (https://github.com/oxur/tabvault)",
                env!("CARGO_PKG_VERSION")
            ),
            blacklist: DEFAULT_BLACKLIST.iter().map(|t| (*t).to_string()).collect(),
            refresh_policy: RefreshPolicy::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("tabvault");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;

        Ok(config)
    }

    /// Load configuration, overriding the database path (the --db flag).
    pub fn load_with_db_path(db_path: PathBuf) -> Result<Self> {
        let mut config = Self::load()?;
        config.database_path = db_path;
        Ok(config)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Render a single setting for `config get`.
    pub fn get_value(&self, key: &str) -> Option<String> {
        let value = match key {
            "database_path" => self.database_path.display().to_string(),
            "base_url" => self.base_url.clone(),
            "request_timeout_secs" => self.request_timeout_secs.to_string(),
            "requests_per_second" => self.requests_per_second.to_string(),
            "user_agent" => self.user_agent.clone(),
            "refresh_policy" => match self.refresh_policy {
                RefreshPolicy::PreserveObserved => "preserve_observed".to_string(),
                RefreshPolicy::OverwriteAll => "overwrite_all".to_string(),
            },
            _ => return None,
        };
        Some(value)
    }
}

/// Returns: ~/.local/share/tabvault/tabvault.db (or platform equivalent)
fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tabvault")
        .join("tabvault.db")
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/tabvault/config.toml
/// - macOS: ~/Library/Application Support/tabvault/config.toml
/// - Windows: %APPDATA%\tabvault\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tabvault")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Tabvault Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (TABVAULT_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Path to the SQLite tab cache
#
# Can also be set via:
# - CLI: tabvault --db /custom/path.db get artist/song-chords-123
# - Environment: TABVAULT_DATABASE_PATH=/custom/path.db
#
# Default: Platform-specific data directory
#database_path = "/path/to/custom/tabvault.db"

# Remote tab page prefix
base_url = "https://tabs.ultimate-guitar.com/tab/"

# Give up on a page fetch after this many seconds
request_timeout_secs = 30

# Outbound requests per second (0 = unlimited)
requests_per_second = 2

# Content types that cannot be shown as plain tablature
blacklist = ["Pro", "Power", "Official", "Video"]

# What a refetch does with the cached version number and rating:
# - "preserve_observed": keep the values seen on first fetch
# - "overwrite_all": replace them with the fresh values
refresh_policy = "preserve_observed"

[logging]
level = "info"
coloured = true
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}
