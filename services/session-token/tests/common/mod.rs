//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use session_common::{
    CircuitBreakerConfig, InMemoryBackend, LedgerBackend, LedgerClient, LedgerClientConfig,
    PlatformError,
};
use session_token::{TokenLifecycleService, TokenServiceConfig};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub const SIGNING_KEY: &str = "integration-test-signing-key";

/// In-memory backend that can be taken down, either entirely or for writes
/// of revoked markers only.
#[derive(Default)]
pub struct FlakyBackend {
    inner: InMemoryBackend,
    down: AtomicBool,
    reject_revocations: AtomicBool,
}

impl FlakyBackend {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn set_reject_revocations(&self, reject: bool) {
        self.reject_revocations.store(reject, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), PlatformError> {
        if self.down.load(Ordering::SeqCst) {
            Err(PlatformError::unavailable("connection refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LedgerBackend for FlakyBackend {
    async fn put(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), PlatformError> {
        self.check()?;
        if self.reject_revocations.load(Ordering::SeqCst) && key.contains(":revoked:") {
            return Err(PlatformError::unavailable("write rejected"));
        }
        self.inner.put(key, value, ttl).await
    }

    async fn put_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<bool, PlatformError> {
        self.check()?;
        self.inner.put_if_absent(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PlatformError> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, PlatformError> {
        self.check()?;
        self.inner.exists(key).await
    }
}

/// Backend whose calls never complete.
pub struct StalledBackend;

#[async_trait]
impl LedgerBackend for StalledBackend {
    async fn put(&self, _: &str, _: &[u8], _: Duration) -> Result<(), PlatformError> {
        std::future::pending().await
    }

    async fn put_if_absent(&self, _: &str, _: &[u8], _: Duration) -> Result<bool, PlatformError> {
        std::future::pending().await
    }

    async fn get(&self, _: &str) -> Result<Option<Vec<u8>>, PlatformError> {
        std::future::pending().await
    }

    async fn exists(&self, _: &str) -> Result<bool, PlatformError> {
        std::future::pending().await
    }
}

pub fn ledger_config() -> LedgerClientConfig {
    LedgerClientConfig::default()
        .with_op_timeout(Duration::from_millis(50))
        .with_circuit_breaker(
            CircuitBreakerConfig::default()
                .with_failure_threshold(3)
                .with_timeout(Duration::from_secs(60)),
        )
}

pub fn service_over(backend: Arc<dyn LedgerBackend>) -> TokenLifecycleService {
    let client = LedgerClient::new(ledger_config(), backend);
    TokenLifecycleService::builder(TokenServiceConfig::new(SIGNING_KEY))
        .ledger(Arc::new(client))
        .build()
        .unwrap()
}

pub fn in_memory_service() -> TokenLifecycleService {
    service_over(Arc::new(InMemoryBackend::default()))
}

pub fn flaky_service() -> (TokenLifecycleService, Arc<FlakyBackend>) {
    let backend = Arc::new(FlakyBackend::default());
    (service_over(backend.clone()), backend)
}
