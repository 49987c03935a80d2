//! API configuration module.
//!
//! Layered with the `config` crate, later sources winning:
//!
//! ```text
//! built-in defaults  →  backoffice.toml (optional)  →  SALON_* environment
//! ```
//!
//! `SALON_DATABASE_PATH=/data/salon.db` overrides `database_path`, and so on.

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

/// Back office API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Address to bind
    pub http_host: String,

    /// HTTP port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub database_max_connections: u32,

    /// Secret key for signing tokens
    pub jwt_secret: String,

    /// Token lifetime in seconds
    pub jwt_lifetime_secs: i64,

    /// Allowed CORS origins; empty allows any
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl ApiConfig {
    /// Loads `backoffice.toml` from the working directory if present.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("backoffice.toml")
    }

    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("http_host", "0.0.0.0")?
            .set_default("http_port", 8080)?
            .set_default("database_path", "./backoffice.db")?
            .set_default("database_max_connections", 5)?
            // Development only; production MUST set SALON_JWT_SECRET
            .set_default("jwt_secret", "salon-dev-secret-change-in-production")?
            .set_default("jwt_lifetime_secs", 3600)?
            .add_source(
                File::with_name(path)
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("SALON")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_origins"),
            )
            .build()?;

        let config: ApiConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt_secret".to_string()));
        }
        if self.http_port == 0 {
            return Err(ConfigError::InvalidValue("http_port".to_string()));
        }
        if self.jwt_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("jwt_lifetime_secs".to_string()));
        }
        if self.database_max_connections == 0 {
            return Err(ConfigError::InvalidValue("database_max_connections".to_string()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}
