use anyhow::{anyhow, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "dashboard.toml";
const ENV_PREFIX: &str = "DICEBOT";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub storage: StorageConfig,
    pub display: DisplayConfig,
}

impl DashboardConfig {
    /// Defaults, then the optional TOML file, then `DICEBOT__SECTION__KEY`
    /// environment variables (a `.env` file is honoured).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let (file, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let settings = Config::builder()
            .add_source(File::from(file.as_path()).required(required))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: DashboardConfig = settings.try_deserialize()?;
        loaded
            .validate()
            .map_err(|errors| anyhow!("invalid configuration: {}", errors.join(", ")))?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            errors.push("api.base_url must start with http:// or https://".to_string());
        }
        if self.api.request_timeout_ms == 0 {
            errors.push("api.request_timeout_ms must be > 0".to_string());
        }

        if self.polling.stats_interval_ms == 0 {
            errors.push("polling.stats_interval_ms must be > 0".to_string());
        }
        if self.polling.status_interval_ms == 0 {
            errors.push("polling.status_interval_ms must be > 0".to_string());
        }
        if self.polling.log_window == 0 {
            errors.push("polling.log_window must be > 0".to_string());
        }
        if self.polling.log_history < self.polling.log_window {
            errors.push("polling.log_history must be >= polling.log_window".to_string());
        }

        if self.storage.path.as_os_str().is_empty() {
            errors.push("storage.path must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5556".to_string(),
            request_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Full snapshot refresh.
    pub stats_interval_ms: u64,
    /// Status re-inference while the bot runs.
    pub status_interval_ms: u64,
    pub log_window: usize,
    pub log_history: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            stats_interval_ms: 1000,
            status_interval_ms: 500,
            log_window: crate::engine::LOG_WINDOW,
            log_history: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Durable store: run mode and preferences.
    pub path: PathBuf,
    /// Wallet credential store, scoped to the login session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn session_dir(&self) -> PathBuf {
        self.session_path
            .clone()
            .unwrap_or_else(crate::storage::default_session_dir)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".dicebot"),
            session_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub recent_games: usize,
    pub log_lines: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            recent_games: 10,
            log_lines: 12,
        }
    }
}
