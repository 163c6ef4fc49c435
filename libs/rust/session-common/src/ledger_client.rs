//! TTL-bounded key/value ledger client.
//!
//! Every call is namespaced, bounded by a per-call deadline, and routed
//! through a [`CircuitBreaker`] so a failing store sheds load instead of
//! adding its full latency to every caller.

use crate::{CircuitBreaker, CircuitBreakerConfig, CircuitState, PlatformError};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Storage backend behind a [`LedgerClient`].
///
/// Implementations must provide atomic per-key writes with TTL semantics.
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), PlatformError>;

    /// Store `value` only if `key` is absent. Returns `true` if written.
    async fn put_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<bool, PlatformError>;

    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PlatformError>;

    /// Check whether `key` is present and not expired.
    async fn exists(&self, key: &str) -> Result<bool, PlatformError>;
}

/// Ledger client configuration.
#[derive(Debug, Clone)]
pub struct LedgerClientConfig {
    /// Namespace for key isolation
    pub namespace: String,
    /// Deadline applied to every backend call
    pub op_timeout: Duration,
    /// Circuit breaker configuration
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for LedgerClientConfig {
    fn default() -> Self {
        Self {
            namespace: "session".to_string(),
            op_timeout: Duration::from_millis(250),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl LedgerClientConfig {
    /// Create config with custom namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Create config with custom per-call deadline.
    #[must_use]
    pub const fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    /// Create config with custom circuit breaker settings.
    #[must_use]
    pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = config;
        self
    }
}

/// Ledger client guarding a backend with deadlines and a circuit breaker.
pub struct LedgerClient {
    config: LedgerClientConfig,
    backend: Arc<dyn LedgerBackend>,
    circuit_breaker: CircuitBreaker,
}

impl LedgerClient {
    /// Create a new ledger client over `backend`.
    #[must_use]
    pub fn new(config: LedgerClientConfig, backend: Arc<dyn LedgerBackend>) -> Self {
        let circuit_breaker = CircuitBreaker::new(
            format!("ledger:{}", config.namespace),
            config.circuit_breaker.clone(),
        );
        Self {
            config,
            backend,
            circuit_breaker,
        }
    }

    /// Create a client backed by a process-local map.
    #[must_use]
    pub fn in_memory(config: LedgerClientConfig) -> Self {
        Self::new(config, Arc::new(InMemoryBackend::default()))
    }

    /// Connect to Redis at `url` and create a client over it.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the first connection fails.
    pub async fn connect_redis(config: LedgerClientConfig, url: &str) -> Result<Self, PlatformError> {
        let backend = RedisBackend::connect(url).await?;
        Ok(Self::new(config, Arc::new(backend)))
    }

    /// Store a value with a TTL.
    ///
    /// # Errors
    ///
    /// Returns an error if the circuit is open, the deadline passes, or the
    /// backend fails.
    pub async fn put(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), PlatformError> {
        let key = self.namespaced_key(key)?;
        self.guarded("put", self.backend.put(&key, value, ttl)).await
    }

    /// Store a value only if the key is absent.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`LedgerClient::put`].
    pub async fn put_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<bool, PlatformError> {
        let key = self.namespaced_key(key)?;
        self.guarded("put_if_absent", self.backend.put_if_absent(&key, value, ttl))
            .await
    }

    /// Get a value.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`LedgerClient::put`].
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PlatformError> {
        let key = self.namespaced_key(key)?;
        self.guarded("get", self.backend.get(&key)).await
    }

    /// Check if a key exists.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`LedgerClient::put`]. An error never means
    /// "absent".
    pub async fn exists(&self, key: &str) -> Result<bool, PlatformError> {
        let key = self.namespaced_key(key)?;
        self.guarded("exists", self.backend.exists(&key)).await
    }

    /// Get the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    /// Current state of the guarding circuit.
    pub async fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state().await
    }

    /// Circuit breaker guarding the backend.
    #[must_use]
    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    async fn guarded<T>(
        &self,
        op: &'static str,
        call: impl Future<Output = Result<T, PlatformError>>,
    ) -> Result<T, PlatformError> {
        let deadline = self.config.op_timeout;
        let result = self
            .circuit_breaker
            .call(async move {
                match tokio::time::timeout(deadline, call).await {
                    Ok(result) => result,
                    Err(_) => Err(PlatformError::timeout(format!(
                        "ledger {op} exceeded {}ms",
                        deadline.as_millis()
                    ))),
                }
            })
            .await;

        if let Err(ref err) = result {
            debug!(op = op, namespace = %self.config.namespace, error = %err, "Ledger call failed");
        }
        result
    }

    fn namespaced_key(&self, key: &str) -> Result<String, PlatformError> {
        if key.is_empty() {
            return Err(PlatformError::invalid_input("ledger key must not be empty"));
        }
        Ok(format!("{}:{}", self.config.namespace, key))
    }
}

/// Local ledger entry.
struct LocalEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Process-local backend, used for tests and single-node development.
#[derive(Default)]
pub struct InMemoryBackend {
    entries: RwLock<HashMap<String, LocalEntry>>,
}

impl InMemoryBackend {
    /// Number of stored entries, expired ones included until evicted.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the backend holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn evict_expired(entries: &mut HashMap<String, LocalEntry>) {
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
    }
}

#[async_trait]
impl LedgerBackend for InMemoryBackend {
    async fn put(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), PlatformError> {
        let mut entries = self.entries.write().await;
        Self::evict_expired(&mut entries);
        entries.insert(
            key.to_string(),
            LocalEntry {
                value: value.to_vec(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn put_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<bool, PlatformError> {
        let mut entries = self.entries.write().await;
        Self::evict_expired(&mut entries);
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            LocalEntry {
                value: value.to_vec(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PlatformError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone()))
    }

    async fn exists(&self, key: &str) -> Result<bool, PlatformError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .is_some_and(|entry| entry.expires_at > Instant::now()))
    }
}

/// Redis backend.
///
/// `ConnectionManager` is cheap to clone and multiplexes, so each call works
/// on its own handle instead of serializing behind a lock.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    /// Connect to Redis at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or Redis is unreachable.
    pub async fn connect(url: &str) -> Result<Self, PlatformError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// Redis expiries have second granularity; never send zero.
    fn ttl_secs(ttl: Duration) -> u64 {
        ttl.as_secs().max(1)
    }
}

#[async_trait]
impl LedgerBackend for RedisBackend {
    async fn put(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), PlatformError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, Self::ttl_secs(ttl))
            .await?;
        Ok(())
    }

    async fn put_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<bool, PlatformError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(Self::ttl_secs(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PlatformError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn exists(&self, key: &str) -> Result<bool, PlatformError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }
}
