//! Script store backends
//!
//! The limiter talks to the store only through server-side script
//! execution, so every backend must run the bucket script atomically:
//! - Dragonfly/Redis for distributed, production use
//! - In-memory for tests and single-instance development

use std::collections::{HashMap, HashSet};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::types::BucketRecord;
use crate::domain::errors::AdmissionError;

/// Backing-store failures, kept distinct from rate-limit decisions
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store no longer knows the script identifier (e.g. after an
    /// administrative flush); the caller reloads and retries once.
    #[error("bucket script not loaded in store")]
    NoScript,

    #[error("store transport error: {message}")]
    Transport { message: String },
}

impl StoreError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

impl From<StoreError> for AdmissionError {
    fn from(error: StoreError) -> Self {
        AdmissionError::Store {
            message: error.to_string(),
        }
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(error: redis::RedisError) -> Self {
        if error.kind() == redis::ErrorKind::NoScriptError {
            StoreError::NoScript
        } else {
            StoreError::Transport {
                message: error.to_string(),
            }
        }
    }
}

/// Trait for stores that execute the bucket script server-side
///
/// `argv` carries one `(max_tokens, refill_per_second, now_ms)` triple per
/// key. The returned vector holds one allow(1)/deny(0) bit per key.
#[async_trait]
pub trait ScriptStore: Send + Sync {
    /// Execute the previously loaded script by identifier.
    async fn eval_bucket_script(
        &self,
        sha: &str,
        keys: &[String],
        argv: &[f64],
    ) -> Result<Vec<i64>, StoreError>;

    /// Register the script and return its store-assigned identifier.
    async fn load_bucket_script(&self, source: &str) -> Result<String, StoreError>;
}

/// Dragonfly/Redis script store
pub struct RedisScriptStore {
    connection_manager: Arc<ConnectionManager>,
}

impl RedisScriptStore {
    /// Connect and verify the store responds before serving checks.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(|e| {
            warn!("Failed to create script store client: {}", e);
            StoreError::transport(format!("failed to create client: {e}"))
        })?;

        let connection_manager = ConnectionManager::new(client).await.map_err(|e| {
            warn!("Failed to create script store connection manager: {}", e);
            StoreError::transport(format!("failed to create connection manager: {e}"))
        })?;

        let mut conn = connection_manager.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| {
                warn!("Failed to ping script store: {}", e);
                StoreError::transport(format!("failed to ping store: {e}"))
            })?;

        debug!("Successfully connected to rate limit script store");

        Ok(Self {
            connection_manager: Arc::new(connection_manager),
        })
    }
}

#[async_trait]
impl ScriptStore for RedisScriptStore {
    async fn eval_bucket_script(
        &self,
        sha: &str,
        keys: &[String],
        argv: &[f64],
    ) -> Result<Vec<i64>, StoreError> {
        let mut conn = (*self.connection_manager).clone();

        let mut cmd = redis::cmd("EVALSHA");
        cmd.arg(sha).arg(keys.len());
        for key in keys {
            cmd.arg(key);
        }
        for value in argv {
            cmd.arg(*value);
        }

        let bits: Vec<i64> = cmd.query_async(&mut conn).await.map_err(StoreError::from)?;
        Ok(bits)
    }

    async fn load_bucket_script(&self, source: &str) -> Result<String, StoreError> {
        let mut conn = (*self.connection_manager).clone();

        let sha: String = redis::cmd("SCRIPT")
            .arg("LOAD")
            .arg(source)
            .query_async(&mut conn)
            .await
            .map_err(StoreError::from)?;

        Ok(sha)
    }
}

/// In-memory script store for tests and single-instance development
///
/// Executes the bucket semantics natively under one write lock per call,
/// which matches the atomicity the remote script guarantees. Loaded script
/// identifiers are tracked so the reload-on-miss path is exercisable.
pub struct InMemoryScriptStore {
    records: RwLock<HashMap<String, BucketRecord>>,
    loaded: RwLock<HashSet<String>>,
}

impl InMemoryScriptStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            loaded: RwLock::new(HashSet::new()),
        }
    }

    /// Read a bucket record, as a remote inspector would.
    pub async fn record(&self, key: &str) -> Option<BucketRecord> {
        self.records.read().await.get(key).copied()
    }

    /// Number of bucket records currently persisted.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }

    /// Seed a bucket record, bypassing the script.
    pub async fn seed_record(&self, key: &str, tokens: f64, last_refill: u64) {
        self.records.write().await.insert(
            key.to_string(),
            BucketRecord {
                tokens,
                last_refill,
            },
        );
    }

    /// Forget every loaded script, as an administrative `SCRIPT FLUSH`
    /// would. Subsequent evaluations fail with `NoScript` until reload.
    pub async fn flush_scripts(&self) {
        self.loaded.write().await.clear();
    }

    /// Number of scripts currently registered.
    pub async fn loaded_scripts(&self) -> usize {
        self.loaded.read().await.len()
    }
}

impl Default for InMemoryScriptStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScriptStore for InMemoryScriptStore {
    async fn eval_bucket_script(
        &self,
        sha: &str,
        keys: &[String],
        argv: &[f64],
    ) -> Result<Vec<i64>, StoreError> {
        if !self.loaded.read().await.contains(sha) {
            return Err(StoreError::NoScript);
        }

        if argv.len() != keys.len() * 3 {
            return Err(StoreError::transport("malformed bucket script arguments"));
        }

        let mut records = self.records.write().await;
        let mut bits = vec![1i64; keys.len()];
        let mut pending: Vec<(String, BucketRecord)> = Vec::with_capacity(keys.len());
        let mut all_allowed = true;

        for (i, key) in keys.iter().enumerate() {
            let max_tokens = argv[i * 3];
            let refill_per_second = argv[i * 3 + 1];
            let now = argv[i * 3 + 2] as u64;

            let record = records.get(key).copied().unwrap_or(BucketRecord {
                tokens: max_tokens,
                last_refill: now,
            });

            let elapsed_seconds = now.saturating_sub(record.last_refill) as f64 / 1000.0;
            let refilled = (record.tokens + elapsed_seconds * refill_per_second).min(max_tokens);

            if refilled < 1.0 {
                bits[i] = 0;
                all_allowed = false;
            } else {
                pending.push((
                    key.clone(),
                    BucketRecord {
                        tokens: refilled - 1.0,
                        last_refill: now,
                    },
                ));
            }
        }

        // All-or-nothing: a denied request must not drain sibling buckets.
        if all_allowed {
            for (key, record) in pending {
                records.insert(key, record);
            }
        }

        Ok(bits)
    }

    async fn load_bucket_script(&self, source: &str) -> Result<String, StoreError> {
        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);
        let sha = format!("{:040x}", hasher.finish());

        self.loaded.write().await.insert(sha.clone());
        Ok(sha)
    }
}
