//! Configuration management
//!
//! Strongly-typed configuration loaded from layered files and
//! `ADMISSION__`-prefixed environment variables. Every section carries
//! production-sane defaults so a bare deployment starts with sensible
//! admission behavior.

use serde::{Deserialize, Serialize};

pub mod validation;

pub use validation::{Validate, ValidationError};

/// Top-level configuration for the admission layer
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub origin: OriginConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Runtime mode of the deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Production deployment; origin checks are enforced
    Production,
    /// Development mode; every origin is treated as safe
    #[default]
    Development,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Deployment topology relative to the reverse proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerLocation {
    /// Co-located reverse proxy; localhost and private addresses are trusted
    #[default]
    Local,
    /// Remote/edge proxy; only the public allow-set is trusted
    Remote,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Runtime mode (production vs development)
    pub environment: Environment,
    /// Serving port, used when building origin variants with an explicit port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            port: 3000,
        }
    }
}

/// Origin safety configuration
///
/// Drives the allow-set of origins trusted to carry session cookies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Public IP the deployment is reachable at
    pub public_ip: String,
    /// Local (co-located proxy) vs remote topology
    pub location: ServerLocation,
    /// Comma-separated virtual host list (e.g. "example.com,www.example.com")
    pub virtual_hosts: String,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            public_ip: "127.0.0.1".to_string(),
            location: ServerLocation::Local,
            virtual_hosts: String::new(),
        }
    }
}

/// Per-scope bucket ceilings for HTTP requests
///
/// Each ceiling is the bucket capacity; the bucket refills completely over
/// one `window_seconds` period.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpBudgetConfig {
    /// Capacity of each per-operation API credential bucket
    pub max_api: u32,
    /// Capacity of each per-address bucket
    pub max_ip: u32,
    /// Capacity of each per-user bucket
    pub max_user: u32,
    /// Refill window in seconds shared by all three scopes
    pub window_seconds: u64,
}

impl Default for HttpBudgetConfig {
    fn default() -> Self {
        Self {
            max_api: 120,
            max_ip: 600,
            max_user: 300,
            window_seconds: 60,
        }
    }
}

/// Per-scope bucket ceilings for realtime socket connections
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketBudgetConfig {
    /// Capacity of each per-address bucket
    pub max_ip: u32,
    /// Capacity of each per-connection user bucket
    pub max_user: u32,
    /// Refill window in seconds
    pub window_seconds: u64,
}

impl Default for SocketBudgetConfig {
    fn default() -> Self {
        Self {
            max_ip: 240,
            max_user: 120,
            window_seconds: 60,
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enforced at all
    pub enabled: bool,
    /// URL of the shared script store (Dragonfly/Redis). `None` means no
    /// store is configured and every check passes without I/O.
    pub store_url: Option<String>,
    /// Prefix applied to every bucket key in the store
    pub key_prefix: String,
    /// HTTP request budgets
    pub http: HttpBudgetConfig,
    /// Socket connection budgets
    pub socket: SocketBudgetConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            store_url: None,
            key_prefix: "admission".to_string(),
            http: HttpBudgetConfig::default(),
            socket: SocketBudgetConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level when RUST_LOG is unset
    pub level: String,
    /// Output format: "json" or "text"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.origin.validate()?;
        self.rate_limit.validate()?;
        Ok(())
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigLoadError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        // Add environment-specific config if ENV is set
        if let Ok(env) = std::env::var("ENV") {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{}", env)).required(false));
        }

        // Add local config and environment variables last (highest priority)
        builder = builder
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("ADMISSION").separator("__"));

        let config: Config = builder.build()?.try_deserialize()?;

        // Validate the loaded configuration
        config.validate()?;

        Ok(config)
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Configuration file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_environment_is_development() {
        let config = Config::default();
        assert!(!config.server.environment.is_production());
    }

    #[test]
    fn zero_window_is_rejected() {
        let mut config = Config::default();
        config.rate_limit.http.window_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn disabled_rate_limiting_skips_budget_checks() {
        let mut config = Config::default();
        config.rate_limit.enabled = false;
        config.rate_limit.http.max_ip = 0;
        assert!(config.validate().is_ok());
    }
}
