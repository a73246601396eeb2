//! Rate Limit Coordinator
//!
//! The orchestration entry point used by the route layer. Picks the bucket
//! set a caller is accountable to — API credential, client address,
//! authenticated user — and dispatches one atomic check for all of them.

use std::sync::Arc;

use tracing::{info, warn};

use super::storage::{RedisScriptStore, ScriptStore, StoreError};
use super::token_bucket::TokenBucketLimiter;
use super::types::{BucketCheck, RateLimitKey};
use crate::config::RateLimitConfig;
use crate::domain::errors::AdmissionError;
use crate::domain::session::{RequestContext, SocketContext};

/// Coordinates key selection and bucket checks for requests and sockets
pub struct RateLimitCoordinator {
    limiter: TokenBucketLimiter,
    config: RateLimitConfig,
}

impl RateLimitCoordinator {
    /// Connect to the configured script store. With no `store_url`, checks
    /// run storeless and always allow.
    pub async fn connect(config: RateLimitConfig) -> Result<Self, StoreError> {
        let store: Option<Arc<dyn ScriptStore>> = match &config.store_url {
            Some(url) => {
                let store = RedisScriptStore::connect(url).await?;
                info!(url = %url, "rate limiter using shared script store");
                Some(Arc::new(store))
            }
            None => {
                info!("no rate limit store configured; admission checks will allow");
                None
            }
        };

        let limiter = TokenBucketLimiter::new(store, &config.key_prefix);
        Ok(Self { limiter, config })
    }

    /// Create with a custom store backend (for testing)
    pub fn with_store(store: Arc<dyn ScriptStore>, config: RateLimitConfig) -> Self {
        let limiter = TokenBucketLimiter::new(Some(store), &config.key_prefix);
        Self { limiter, config }
    }

    /// Create without any store; every check allows.
    pub fn storeless(config: RateLimitConfig) -> Self {
        let limiter = TokenBucketLimiter::new(None, &config.key_prefix);
        Self { limiter, config }
    }

    /// Admit or refuse an HTTP request.
    ///
    /// An API-credentialed caller is charged against its per-operation and
    /// per-address buckets; the credential, not any logged-in identity, is
    /// the accountable principal. A safe-origin caller is charged by
    /// address, plus by user when a login is attached. An anonymous caller
    /// from an unsafe origin cannot be fairly limited by address alone and
    /// is refused before any store I/O.
    pub async fn rate_limit(&self, request: &RequestContext) -> Result<(), AdmissionError> {
        if !self.config.enabled {
            return Ok(());
        }

        let budget = &self.config.http;
        let window = budget.window_seconds;
        let session = &request.session;

        let checks = if session.has_api_token() {
            vec![
                BucketCheck::new(
                    RateLimitKey::Api(request.api_selector()),
                    budget.max_api,
                    window,
                ),
                BucketCheck::new(RateLimitKey::Ip(request.ip), budget.max_ip, window),
            ]
        } else if session.from_safe_origin {
            let mut checks = vec![BucketCheck::new(
                RateLimitKey::Ip(request.ip),
                budget.max_ip,
                window,
            )];
            if session.is_logged_in {
                if let Some(user) = session.primary_user() {
                    checks.push(BucketCheck::new(
                        RateLimitKey::User(user.id),
                        budget.max_user,
                        window,
                    ));
                }
            }
            checks
        } else {
            warn!(ip = %request.ip, "anonymous caller from unsafe origin refused");
            return Err(AdmissionError::MustUseApiToken);
        };

        self.limiter.check(&checks).await
    }

    /// Admit or refuse a realtime socket connection.
    ///
    /// Sockets carry no API credentials; they are charged by address and,
    /// when a login is attached, by user scoped to this connection. The
    /// socket transport surfaces errors as emitted events, so a denial is
    /// returned as a message rather than an error; store transport
    /// failures still propagate as errors.
    pub async fn rate_limit_socket(
        &self,
        socket: &SocketContext,
    ) -> Result<Option<String>, AdmissionError> {
        if !self.config.enabled {
            return Ok(None);
        }

        let budget = &self.config.socket;
        let window = budget.window_seconds;
        let session = &socket.session;

        let mut checks = vec![BucketCheck::new(
            RateLimitKey::SocketIp(socket.ip),
            budget.max_ip,
            window,
        )];
        if session.is_logged_in {
            if let Some(user) = session.primary_user() {
                checks.push(BucketCheck::new(
                    RateLimitKey::SocketUser {
                        socket_id: socket.id.clone(),
                        user_id: user.id,
                    },
                    budget.max_user,
                    window,
                ));
            }
        }

        match self.limiter.check(&checks).await {
            Ok(()) => Ok(None),
            Err(AdmissionError::RateLimitExceeded { scope }) => Ok(Some(format!(
                "Rate limit exceeded for {scope} bucket; slow down and retry."
            ))),
            Err(error) => Err(error),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}
