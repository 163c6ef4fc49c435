//! Centralized error types for the platform libraries.
//!
//! Every ledger or resilience failure is expressed as a [`PlatformError`],
//! classified as retryable or not so callers can decide how to react.

use thiserror::Error;

/// Common error type for platform operations.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Circuit breaker is open for the specified service
    #[error("Circuit breaker open for {service}")]
    CircuitOpen {
        /// The service name that has an open circuit
        service: String,
    },

    /// Backing store could not be reached or answered with an error
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Operation did not finish before its deadline
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlatformError {
    /// Check if this error is retryable.
    ///
    /// Retryable errors are transient failures that may succeed on retry.
    /// An open circuit is not retryable: the breaker already decided to
    /// shed load until its cooldown elapses.
    ///
    /// # Examples
    ///
    /// ```
    /// use session_common::PlatformError;
    ///
    /// let err = PlatformError::Timeout("ledger get".to_string());
    /// assert!(err.is_retryable());
    ///
    /// let err = PlatformError::circuit_open("ledger");
    /// assert!(!err.is_retryable());
    /// ```
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }

    /// Create a circuit open error for the given service.
    #[must_use]
    pub fn circuit_open(service: impl Into<String>) -> Self {
        Self::CircuitOpen {
            service: service.into(),
        }
    }

    /// Create an unavailable error with the given message.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a timeout error with the given message.
    #[must_use]
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an invalid input error with the given message.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<redis::RedisError> for PlatformError {
    fn from(err: redis::RedisError) -> Self {
        Self::Unavailable(format!("redis: {err}"))
    }
}
