//! Configuration validation module

use crate::config::{OriginConfig, RateLimitConfig, ServerConfig};

/// Trait for validating configuration sections
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Server configuration error: {message}")]
    Server { message: String },

    #[error("Origin configuration error: {message}")]
    Origin { message: String },

    #[error("Rate limit configuration error: {message}")]
    RateLimit { message: String },
}

impl ValidationError {
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    pub fn origin(message: impl Into<String>) -> Self {
        Self::Origin {
            message: message.into(),
        }
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit {
            message: message.into(),
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::server(format!(
                "Port must be in range 1-65535, got {}",
                self.port
            )));
        }

        Ok(())
    }
}

impl Validate for OriginConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.public_ip.trim().is_empty() {
            return Err(ValidationError::origin(
                "Public IP cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Validate for RateLimitConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !self.enabled {
            return Ok(());
        }

        if self.key_prefix.is_empty() {
            return Err(ValidationError::rate_limit(
                "Key prefix cannot be empty".to_string(),
            ));
        }

        if self.http.window_seconds == 0 || self.socket.window_seconds == 0 {
            return Err(ValidationError::rate_limit(
                "Refill window must be greater than 0 seconds".to_string(),
            ));
        }

        if self.http.max_api == 0 || self.http.max_ip == 0 || self.http.max_user == 0 {
            return Err(ValidationError::rate_limit(
                "HTTP bucket ceilings must be greater than 0".to_string(),
            ));
        }

        if self.socket.max_ip == 0 || self.socket.max_user == 0 {
            return Err(ValidationError::rate_limit(
                "Socket bucket ceilings must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
