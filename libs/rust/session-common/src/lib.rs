//! Shared library for cross-cutting concerns in session services.
//!
//! This crate provides centralized implementations for:
//! - Error types with retryability classification
//! - Circuit breaker pattern for resilience
//! - TTL-bounded ledger client with pluggable backends (Redis, in-memory)
//! - Tracing subscriber setup

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod circuit_breaker;
pub mod error;
pub mod ledger_client;
pub mod tracing_config;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use error::PlatformError;
pub use ledger_client::{
    InMemoryBackend, LedgerBackend, LedgerClient, LedgerClientConfig, RedisBackend,
};
pub use tracing_config::{TracingConfig, init_tracing};
