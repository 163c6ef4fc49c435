//! Bearer authentication of incoming requests.

use crate::lifecycle::TokenLifecycleService;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

const BEARER: &str = "bearer";
const LOGGED_PREFIX_LEN: usize = 8;

/// The only failure a request ever sees. Causes are logged, not returned.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unauthorized")]
pub struct Unauthorized;

/// Identity extracted from a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Subject of the access token
    pub user_id: String,
    /// Email claim, if present
    pub email: Option<String>,
    /// Role claim, if present
    pub role: Option<String>,
    /// Token identifier, usable for logout
    pub jti: String,
}

/// Turns an `Authorization` header value into an authenticated user.
pub struct RequestAuthenticator {
    tokens: Arc<TokenLifecycleService>,
}

impl RequestAuthenticator {
    /// Create an authenticator over `tokens`.
    #[must_use]
    pub fn new(tokens: Arc<TokenLifecycleService>) -> Self {
        RequestAuthenticator { tokens }
    }

    /// Authenticate a request from its `Authorization` header.
    ///
    /// Expects `Bearer <token>` with the scheme matched case-insensitively.
    /// Only the access token signature and claims are checked; refresh tokens
    /// are refused.
    pub fn authenticate(&self, header: Option<&str>) -> Result<AuthenticatedUser, Unauthorized> {
        let Some(header) = header else {
            debug!("Missing authorization header");
            return Err(Unauthorized);
        };

        let token = bearer_token(header).ok_or_else(|| {
            debug!("Authorization header is not a bearer credential");
            Unauthorized
        })?;

        let claims = self.tokens.verify_access(token).map_err(|e| {
            debug!(
                code = e.code(),
                token_prefix = %token_prefix(token),
                "Bearer token rejected"
            );
            Unauthorized
        })?;

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            jti: claims.jti,
        })
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(BEARER) {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn token_prefix(token: &str) -> String {
    token.chars().take(LOGGED_PREFIX_LEN).collect()
}
