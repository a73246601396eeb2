//! Rate Limiting Infrastructure
//!
//! This module provides the distributed admission limiter:
//! - Token bucket algorithm with fractional refill rates
//! - One atomic multi-bucket check per request (all-or-nothing consumption)
//! - Dragonfly/Redis script store for cross-process enforcement
//! - Key selection by how the caller is authenticated (credential, IP, user)

pub mod service;
pub mod storage;
pub mod token_bucket;
pub mod types;

pub use service::RateLimitCoordinator;
pub use token_bucket::TokenBucketLimiter;
pub use types::{BucketCheck, BucketRecord, RateLimitKey};
