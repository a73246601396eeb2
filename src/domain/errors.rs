//! Admission error surface
//!
//! Every refusal admission control can make is a distinct, named error so
//! the route layer can map to status codes and log fields without string
//! matching. Backing-store transport failures are a separate variant and
//! are never coerced into a rate-limit decision.

use http::StatusCode;
use thiserror::Error;

/// Which bucket family a rate-limit denial came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitScope {
    /// Per-operation API credential bucket
    Api,
    /// Per-address bucket
    Ip,
    /// Per-user bucket
    User,
}

impl RateLimitScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitScope::Api => "api",
            RateLimitScope::Ip => "ip",
            RateLimitScope::User => "user",
        }
    }
}

impl std::fmt::Display for RateLimitScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Admission-control errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("Rate limit exceeded for {scope} bucket")]
    RateLimitExceeded { scope: RateLimitScope },

    #[error("Request must present an API token")]
    MustUseApiToken,

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Not logged in as an official user")]
    NotLoggedInOfficial,

    #[error("Rate limit store unavailable: {message}")]
    Store { message: String },
}

impl AdmissionError {
    /// Stable machine-readable code for response bodies and log fields
    pub fn code(&self) -> &'static str {
        match self {
            AdmissionError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            AdmissionError::MustUseApiToken => "MUST_USE_API_TOKEN",
            AdmissionError::NotLoggedIn => "NOT_LOGGED_IN",
            AdmissionError::NotLoggedInOfficial => "NOT_LOGGED_IN_OFFICIAL",
            AdmissionError::Store { .. } => "STORE_UNAVAILABLE",
        }
    }

    /// The transport status this error maps to at the route layer
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdmissionError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AdmissionError::MustUseApiToken => StatusCode::FORBIDDEN,
            AdmissionError::NotLoggedIn | AdmissionError::NotLoggedInOfficial => {
                StatusCode::UNAUTHORIZED
            }
            AdmissionError::Store { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Whether the caller can expect the same request to succeed after
    /// backing off. Policy and authentication failures require the client
    /// to change how it authenticates.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AdmissionError::RateLimitExceeded { .. } | AdmissionError::Store { .. }
        )
    }
}
