//! Infrastructure Layer - store-backed rate limiting, origin policy, header utilities

pub mod headers;
pub mod origin;
pub mod rate_limiter;

pub use origin::OriginSafetyClassifier;
pub use rate_limiter::RateLimitCoordinator;
