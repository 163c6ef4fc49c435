//! Access and refresh claim sets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the two token kinds a claim set belongs to.
///
/// The kind travels in the JWS `typ` header so one kind can never be
/// verified as the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Short-lived bearer credential.
    Access,
    /// Long-lived credential exchanged for new pairs.
    Refresh,
}

impl TokenKind {
    /// Value of the JWS `typ` header for this kind.
    #[must_use]
    pub const fn typ(self) -> &'static str {
        match self {
            Self::Access => "at+jwt",
            Self::Refresh => "rt+jwt",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access => f.write_str("access"),
            Self::Refresh => f.write_str("refresh"),
        }
    }
}

/// A claim set bound to one token kind.
pub trait TokenClaims {
    /// Kind every token carrying these claims is signed as.
    const KIND: TokenKind;
}

/// Claims carried by a short-lived access token.
///
/// `email` and `role` are display attributes for downstream services that
/// trust the signature; they are omitted from the payload when absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    /// Subject (user id)
    pub sub: String,
    /// Token identifier, shared with the refresh token of the same pair
    pub jti: String,
    /// Issuer
    pub iss: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Not before (unix seconds)
    pub nbf: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
    /// User email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// User role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Claims carried by a long-lived refresh token. Deliberately minimal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshClaims {
    /// Subject (user id)
    pub sub: String,
    /// Token identifier; the revocation ledger key
    pub jti: String,
    /// Issuer
    pub iss: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Not before (unix seconds)
    pub nbf: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

impl TokenClaims for AccessClaims {
    const KIND: TokenKind = TokenKind::Access;
}

impl TokenClaims for RefreshClaims {
    const KIND: TokenKind = TokenKind::Refresh;
}

impl AccessClaims {
    /// Whether the token is expired at `timestamp`, ignoring leeway.
    #[must_use]
    pub fn is_expired_at(&self, timestamp: i64) -> bool {
        self.exp <= timestamp
    }

    /// Seconds left before expiry, floored at zero.
    #[must_use]
    pub fn remaining_secs(&self, timestamp: i64) -> i64 {
        (self.exp - timestamp).max(0)
    }
}

impl RefreshClaims {
    /// Whether the token is expired at `timestamp`, ignoring leeway.
    #[must_use]
    pub fn is_expired_at(&self, timestamp: i64) -> bool {
        self.exp <= timestamp
    }

    /// Seconds left before expiry, floored at zero.
    #[must_use]
    pub fn remaining_secs(&self, timestamp: i64) -> i64 {
        (self.exp - timestamp).max(0)
    }
}
