//! Structured logging bootstrap

use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Initialize the global tracing subscriber.
///
/// The filter honors `RUST_LOG` when set and falls back to the configured
/// level otherwise. Format is `json` for production log shipping or
/// human-readable `text`.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), SetGlobalDefaultError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.format == "json" {
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
        tracing::subscriber::set_global_default(subscriber)
    }
}
