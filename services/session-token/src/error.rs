//! Token lifecycle errors.

use session_common::PlatformError;
use thiserror::Error;

/// Failure kinds of the token lifecycle.
///
/// The set is closed: callers branch on variants, never on messages.
#[derive(Error, Debug)]
pub enum TokenError {
    /// Invalid or missing configuration; fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bad encoding, signature, algorithm, issuer, kind or claims.
    #[error("Token malformed or forged: {0}")]
    MalformedOrForged(String),

    /// Past `exp` plus leeway.
    #[error("Token expired")]
    Expired,

    /// The refresh token's jti carries a revoked marker.
    #[error("Token revoked")]
    Revoked,

    /// The revocation ledger failed, timed out or is short-circuited.
    #[error("Revocation store unavailable: {0}")]
    StoreUnavailable(String),

    /// Claims could not be serialized for signing.
    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl TokenError {
    /// Build a [`TokenError::Config`].
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`TokenError::MalformedOrForged`].
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedOrForged(msg.into())
    }

    /// Wrap a ledger failure. Every ledger error, including an open circuit
    /// or a missed deadline, is reported as the store being unavailable.
    pub fn store_unavailable(err: &PlatformError) -> Self {
        Self::StoreUnavailable(err.to_string())
    }

    /// Malformed, forged and expired tokens are all "invalid" to callers.
    #[must_use]
    pub const fn is_validation_failure(&self) -> bool {
        matches!(self, Self::MalformedOrForged(_) | Self::Expired)
    }

    /// Stable code for logs and metrics.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => TOKEN_CONFIG_INVALID,
            Self::MalformedOrForged(_) => TOKEN_MALFORMED,
            Self::Expired => TOKEN_EXPIRED,
            Self::Revoked => TOKEN_REVOKED,
            Self::StoreUnavailable(_) => TOKEN_STORE_UNAVAILABLE,
            Self::Signing(_) => TOKEN_SIGNING_FAILED,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::MalformedOrForged(err.to_string()),
        }
    }
}

/// Code for [`TokenError::Config`].
pub const TOKEN_CONFIG_INVALID: &str = "TOKEN_CONFIG_INVALID";
/// Code for [`TokenError::MalformedOrForged`].
pub const TOKEN_MALFORMED: &str = "TOKEN_MALFORMED";
/// Code for [`TokenError::Expired`].
pub const TOKEN_EXPIRED: &str = "TOKEN_EXPIRED";
/// Code for [`TokenError::Revoked`].
pub const TOKEN_REVOKED: &str = "TOKEN_REVOKED";
/// Code for [`TokenError::StoreUnavailable`].
pub const TOKEN_STORE_UNAVAILABLE: &str = "TOKEN_STORE_UNAVAILABLE";
/// Code for [`TokenError::Signing`].
pub const TOKEN_SIGNING_FAILED: &str = "TOKEN_SIGNING_FAILED";

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::{Error as JwtError, ErrorKind};

    #[test]
    fn test_expired_signature_maps_to_expired() {
        let err: TokenError = JwtError::from(ErrorKind::ExpiredSignature).into();
        assert!(matches!(err, TokenError::Expired));
    }

    #[test]
    fn test_other_jwt_errors_map_to_malformed() {
        for kind in [
            ErrorKind::InvalidSignature,
            ErrorKind::InvalidAlgorithm,
            ErrorKind::InvalidIssuer,
            ErrorKind::ImmatureSignature,
            ErrorKind::InvalidToken,
        ] {
            let err: TokenError = JwtError::from(kind).into();
            assert!(matches!(err, TokenError::MalformedOrForged(_)));
        }
    }

    #[test]
    fn test_validation_failure_grouping() {
        assert!(TokenError::Expired.is_validation_failure());
        assert!(TokenError::malformed("bad").is_validation_failure());
        assert!(!TokenError::Revoked.is_validation_failure());
        assert!(!TokenError::StoreUnavailable("down".into()).is_validation_failure());
    }

    #[test]
    fn test_store_unavailable_wraps_platform_error() {
        let err = TokenError::store_unavailable(&PlatformError::circuit_open("ledger:session"));
        assert_eq!(err.code(), TOKEN_STORE_UNAVAILABLE);
        assert!(err.to_string().contains("Circuit breaker open"));
    }
}
