//! Rate limiter types and key derivation

use std::net::IpAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::domain::errors::RateLimitScope;

/// Key identifying one bucket
///
/// Key derivation is pure: the same request or socket shape always yields
/// the same key, on every process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RateLimitKey {
    /// Per-operation bucket for API-credentialed callers
    Api(String),
    /// Per-address bucket for HTTP requests
    Ip(IpAddr),
    /// Per-user bucket for HTTP requests
    User(Uuid),
    /// Per-address bucket for socket connections
    SocketIp(IpAddr),
    /// Per-user bucket scoped to one socket connection
    SocketUser { socket_id: String, user_id: Uuid },
}

impl RateLimitKey {
    /// Render the store key string under the configured prefix.
    pub fn storage_key(&self, prefix: &str) -> String {
        match self {
            RateLimitKey::Api(operation) => format!("{prefix}:api:{operation}"),
            RateLimitKey::Ip(ip) => format!("{prefix}:ip:{ip}"),
            RateLimitKey::User(id) => format!("{prefix}:user:{id}"),
            RateLimitKey::SocketIp(ip) => format!("{prefix}:socket-ip:{ip}"),
            RateLimitKey::SocketUser { socket_id, user_id } => {
                format!("{prefix}:socket-user:{socket_id}:{user_id}")
            }
        }
    }

    /// The scope family reported when this bucket denies.
    pub fn scope(&self) -> RateLimitScope {
        match self {
            RateLimitKey::Api(_) => RateLimitScope::Api,
            RateLimitKey::Ip(_) | RateLimitKey::SocketIp(_) => RateLimitScope::Ip,
            RateLimitKey::User(_) | RateLimitKey::SocketUser { .. } => RateLimitScope::User,
        }
    }
}

/// Per-check bucket parameters, supplied by the caller and never persisted
#[derive(Debug, Clone)]
pub struct BucketCheck {
    pub key: RateLimitKey,
    /// Bucket capacity; the balance is clamped here after refill
    pub max_tokens: f64,
    /// Tokens added per second, may be fractional
    pub refill_per_second: f64,
}

impl BucketCheck {
    /// Build a check whose bucket refills completely over `window_seconds`.
    pub fn new(key: RateLimitKey, max_tokens: u32, window_seconds: u64) -> Self {
        let max = f64::from(max_tokens);
        Self {
            key,
            max_tokens: max,
            refill_per_second: max / window_seconds as f64,
        }
    }
}

/// Persisted bucket state for a single key
///
/// A missing record is equivalent to a full bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketRecord {
    /// Current token balance
    pub tokens: f64,
    /// Last refill timestamp (Unix milliseconds)
    pub last_refill: u64,
}

/// Get current time in milliseconds since Unix epoch
pub fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}
