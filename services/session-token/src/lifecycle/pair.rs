//! Token pair wire format.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scheme label carried by every pair.
pub const TOKEN_TYPE: &str = "Bearer";

/// An access/refresh token pair as returned to clients.
///
/// `expires_in` is the access token's expiry as a unix timestamp, not a
/// duration; the field name is kept for wire compatibility.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Signed access token
    pub access_token: String,
    /// Signed refresh token
    pub refresh_token: String,
    /// Access token expiry (unix seconds)
    pub expires_in: i64,
    /// Always [`TOKEN_TYPE`]
    pub token_type: String,
}

impl TokenPair {
    /// Assemble a pair with the `Bearer` scheme label.
    #[must_use]
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        TokenPair {
            access_token,
            refresh_token,
            expires_in,
            token_type: TOKEN_TYPE.to_string(),
        }
    }
}

// Token strings are credentials; keep them out of debug output.
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}
