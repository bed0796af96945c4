//! Configuration management for Logscope

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Log file configuration
    #[serde(default)]
    pub log: LogFileConfig,

    /// Upload authorization configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Query limits
    #[serde(default)]
    pub query: QueryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            log: LogFileConfig::default(),
            auth: AuthConfig::default(),
            query: QueryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file plus `LOGSCOPE_*`
    /// environment variables (environment wins).
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(config::File::with_name(path));
            }
            None => {
                builder = builder.add_source(config::File::with_name("logscope").required(false));
            }
        }

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix("LOGSCOPE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| Error::config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| Error::config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot safely run with.
    ///
    /// The log file path deliberately has no default: a service silently
    /// scanning the wrong file reports plausible-looking zeros.
    pub fn validate(&self) -> Result<()> {
        if self.log.path.trim().is_empty() {
            return Err(Error::config("log.path must be set"));
        }
        if self.query.max_window_minutes == 0 {
            return Err(Error::config("query.max_window_minutes must be positive"));
        }
        if self.query.max_limit == 0 {
            return Err(Error::config("query.max_limit must be positive"));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// HTTP API port
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 8002,
        }
    }
}

/// Log file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogFileConfig {
    /// Path to the append-only JSONL log file
    pub path: String,
}

impl Default for LogFileConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
        }
    }
}

/// Upload authorization configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared token gating the upload endpoint; uploads are refused
    /// while unset
    pub upload_token: Option<String>,
}

/// Query limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Hard ceiling on the query window, in minutes
    pub max_window_minutes: u32,
    /// Hard ceiling on result list sizes
    pub max_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            // 14 days
            max_window_minutes: 60 * 24 * 14,
            max_limit: 200,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
