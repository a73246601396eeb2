//! Atomic multi-bucket token consumption
//!
//! One check covers every bucket that applies to a request and executes as
//! a single server-side script, so concurrent requests sharing a key are
//! strictly serialized by the store. The process holds no lock of its own;
//! the only client-side state is the cached script identifier.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::storage::{ScriptStore, StoreError};
use super::types::{BucketCheck, current_time_millis};
use crate::domain::errors::AdmissionError;

/// Check-and-consume script executed by the store.
///
/// KEYS holds one bucket key per check; ARGV holds a matching
/// `(max_tokens, refill_per_second, now_ms)` triple per key. Each bucket
/// is read, refilled against elapsed time, clamped at capacity, and
/// tentatively charged one token. Updates are committed only when every
/// bucket allows; otherwise nothing is written. Returns one 0/1 bit per
/// key. Persisted layout per key K: `K:tokens` and `K:lastRefill`.
pub const TOKEN_BUCKET_SCRIPT: &str = r#"
local bits = {}
local balances = {}
local all_allowed = true

for i = 1, #KEYS do
  local base = (i - 1) * 3
  local max_tokens = tonumber(ARGV[base + 1])
  local refill_rate = tonumber(ARGV[base + 2])
  local now = tonumber(ARGV[base + 3])

  local tokens = tonumber(redis.call('GET', KEYS[i] .. ':tokens'))
  local last_refill = tonumber(redis.call('GET', KEYS[i] .. ':lastRefill'))
  if tokens == nil then tokens = max_tokens end
  if last_refill == nil then last_refill = now end

  local elapsed = now - last_refill
  if elapsed < 0 then elapsed = 0 end

  local refilled = tokens + (elapsed / 1000) * refill_rate
  if refilled > max_tokens then refilled = max_tokens end

  if refilled < 1 then
    bits[i] = 0
    all_allowed = false
  else
    bits[i] = 1
    balances[i] = refilled - 1
  end
end

if all_allowed then
  for i = 1, #KEYS do
    local now = tonumber(ARGV[(i - 1) * 3 + 3])
    redis.call('SET', KEYS[i] .. ':tokens', balances[i])
    redis.call('SET', KEYS[i] .. ':lastRefill', now)
  end
end

return bits
"#;

/// Token bucket limiter over an optional shared script store
pub struct TokenBucketLimiter {
    store: Option<Arc<dyn ScriptStore>>,
    key_prefix: String,
    /// Store-assigned identifier of the loaded script; refreshed whenever
    /// the store reports the identifier unknown.
    script_sha: RwLock<Option<String>>,
}

impl TokenBucketLimiter {
    pub fn new(store: Option<Arc<dyn ScriptStore>>, key_prefix: &str) -> Self {
        Self {
            store,
            key_prefix: key_prefix.to_string(),
            script_sha: RwLock::new(None),
        }
    }

    /// Atomically test and charge one token from each bucket.
    ///
    /// With no store configured every check passes without I/O; that is
    /// the documented development fallback, not an error path. A
    /// configured store that cannot be reached fails the check with a
    /// `Store` error instead of silently allowing.
    pub async fn check(&self, checks: &[BucketCheck]) -> Result<(), AdmissionError> {
        let Some(store) = &self.store else {
            debug!(buckets = checks.len(), "no script store configured, allowing");
            return Ok(());
        };

        if checks.is_empty() {
            return Ok(());
        }

        let keys: Vec<String> = checks
            .iter()
            .map(|check| check.key.storage_key(&self.key_prefix))
            .collect();

        let now = current_time_millis() as f64;
        let mut argv = Vec::with_capacity(checks.len() * 3);
        for check in checks {
            argv.push(check.max_tokens);
            argv.push(check.refill_per_second);
            argv.push(now);
        }

        let sha = self.cached_sha(store.as_ref()).await?;
        let bits = match store.eval_bucket_script(&sha, &keys, &argv).await {
            Ok(bits) => bits,
            Err(StoreError::NoScript) => {
                // The store-side cache was flushed; reload and retry the
                // same call exactly once.
                let sha = self.reload_script(store.as_ref()).await?;
                store.eval_bucket_script(&sha, &keys, &argv).await?
            }
            Err(error) => return Err(error.into()),
        };

        if let Some(denied) = bits.iter().position(|bit| *bit == 0) {
            let scope = checks[denied].key.scope();
            warn!(
                key = %keys[denied],
                scope = %scope,
                "rate limit exceeded"
            );
            return Err(AdmissionError::RateLimitExceeded { scope });
        }

        debug!(buckets = checks.len(), "rate limit check passed");
        Ok(())
    }

    async fn cached_sha(&self, store: &dyn ScriptStore) -> Result<String, StoreError> {
        if let Some(sha) = self.script_sha.read().await.clone() {
            return Ok(sha);
        }
        self.reload_script(store).await
    }

    async fn reload_script(&self, store: &dyn ScriptStore) -> Result<String, StoreError> {
        let sha = store.load_bucket_script(TOKEN_BUCKET_SCRIPT).await?;
        debug!(sha = %sha, "registered bucket script with store");
        *self.script_sha.write().await = Some(sha.clone());
        Ok(sha)
    }
}
