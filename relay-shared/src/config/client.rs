use std::{env, fs, path::PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use url::Url;

/// Errors raised while loading or persisting the client configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("no platform configuration directory available")]
    NoConfigDir,
}

/// Client configuration for the RelayCRM sync engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the RelayCRM server.
    pub server_url: Url,

    /// Bearer credential for the API and the push channel. Absent means the
    /// session is unauthenticated: REST calls fail and the push channel
    /// stays disconnected without erroring.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// History page size; fixed per conversation for its session lifetime.
    pub page_size: i64,

    /// Base delay for the exponential reconnect backoff, in milliseconds.
    pub reconnect_base_delay_ms: u64,

    /// Automatic reconnect attempts before settling disconnected.
    pub max_reconnect_attempts: u32,

    /// Logging level filter (e.g. "info", "engine=debug").
    pub log_level: String,
}

impl Config {
    /// Generates a default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            server_url: Url::parse("http://localhost:8080").expect("static URL parses"),
            api_token: None,
            page_size: 20,
            reconnect_base_delay_ms: 1000,
            max_reconnect_attempts: 5,
            log_level: "info".to_string(),
        }
    }

    /// Default configuration file location for this platform.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        ProjectDirs::from("com", "RelayCRM", "relay")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Loads the configuration from a file, environment variables, or defaults.
    ///
    /// File values override the built-in defaults, and `RELAY_*` environment
    /// variables override both. A missing file at the default location is not
    /// an error; an explicitly provided path must exist.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(&path)?,
            None => {
                let path = Self::default_path()?;
                if path.is_file() {
                    Self::from_file(&path)?
                } else {
                    Self::with_defaults()
                }
            }
        };

        config.apply_env()?;
        Ok(config)
    }

    fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(server_url) = env::var("RELAY_SERVER_URL") {
            self.server_url =
                Url::parse(&server_url).map_err(|_| ConfigError::InvalidValue {
                    name: "RELAY_SERVER_URL",
                    value: server_url,
                })?;
        }
        if let Ok(token) = env::var("RELAY_API_TOKEN") {
            if !token.is_empty() {
                self.api_token = Some(token);
            }
        }
        if let Ok(page_size) = env::var("RELAY_PAGE_SIZE") {
            self.page_size = page_size
                .parse()
                .ok()
                .filter(|size| *size > 0)
                .ok_or(ConfigError::InvalidValue {
                    name: "RELAY_PAGE_SIZE",
                    value: page_size,
                })?;
        }
        if let Ok(log_level) = env::var("RELAY_LOG_LEVEL") {
            self.log_level = log_level;
        }
        Ok(())
    }
}
