//! Admission Core - request trust and distributed rate limiting
//!
//! This crate is the admission-control layer of the platform's request
//! pipeline. It decides, for every HTTP request and realtime socket, whether
//! the caller may proceed:
//!
//! # Modules
//!
//! - [`config`] — Strongly-typed configuration with file and environment variable support
//! - [`domain`] — Session context, trust tiers, and the admission error surface
//! - [`application`] — The request trust resolver
//! - [`infrastructure`] — Store-backed token bucket limiter, origin safety policy, header utilities
//! - [`logging`] — Structured logging with tracing
//!
//! # Architecture
//!
//! ```text
//! admission-core/
//! ├── domain/           # SessionContext, AuthTier, AdmissionError
//! ├── application/      # RequestTrustResolver
//! ├── infrastructure/
//! │   ├── rate_limiter/ # atomic multi-bucket checks against Dragonfly/Redis
//! │   ├── origin        # safe-origin classification from deployment config
//! │   └── headers       # device info and Accept-Language parsing
//! └── config/           # Configuration management
//! ```
//!
//! Rate-limit decisions are made in a single atomic script execution against
//! the shared store, so concurrent requests across server processes can never
//! overdraw a bucket between refills. Trust decisions compose session state
//! into one of four tiers and fail closed with a named error.
//!
//! # Configuration
//!
//! Environment variables use the `ADMISSION__` prefix with double underscore
//! separators:
//!
//! ```bash
//! ADMISSION__SERVER__PORT=3000
//! ADMISSION__RATE_LIMIT__STORE_URL=redis://127.0.0.1:6379
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;

pub use config::Config;
pub use logging::init_tracing;
