//! Claim construction for a token pair.

use crate::jwt::claims::{AccessClaims, RefreshClaims};
use std::time::Duration;

/// Builds access and refresh claims for one issuance.
///
/// Both claim sets built from the same builder share the JTI and the
/// issued-at instant. `nbf` equals `iat`; `exp` is `iat + ttl`.
#[derive(Debug, Clone)]
pub struct ClaimsBuilder {
    issuer: String,
    subject: String,
    email: Option<String>,
    role: Option<String>,
    jti: String,
    issued_at: i64,
}

impl ClaimsBuilder {
    /// Start a builder with a fresh JTI and the current time.
    pub fn new(issuer: impl Into<String>, subject: impl Into<String>) -> Self {
        ClaimsBuilder {
            issuer: issuer.into(),
            subject: subject.into(),
            email: None,
            role: None,
            jti: uuid::Uuid::new_v4().to_string(),
            issued_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Empty strings are treated as absent.
    pub fn email(mut self, email: Option<&str>) -> Self {
        self.email = non_empty(email);
        self
    }

    /// Empty strings are treated as absent.
    pub fn role(mut self, role: Option<&str>) -> Self {
        self.role = non_empty(role);
        self
    }

    /// Override the generated JTI.
    pub fn jti(mut self, jti: impl Into<String>) -> Self {
        self.jti = jti.into();
        self
    }

    /// Override the issued-at instant (unix seconds).
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.issued_at = timestamp;
        self
    }

    /// JTI both claim sets will carry.
    #[must_use]
    pub fn jti_value(&self) -> &str {
        &self.jti
    }

    /// Access claims expiring `ttl` after issuance.
    #[must_use]
    pub fn build_access(&self, ttl: Duration) -> AccessClaims {
        AccessClaims {
            sub: self.subject.clone(),
            jti: self.jti.clone(),
            iss: self.issuer.clone(),
            iat: self.issued_at,
            nbf: self.issued_at,
            exp: self.expiry(ttl),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }

    /// Refresh claims expiring `ttl` after issuance.
    #[must_use]
    pub fn build_refresh(&self, ttl: Duration) -> RefreshClaims {
        RefreshClaims {
            sub: self.subject.clone(),
            jti: self.jti.clone(),
            iss: self.issuer.clone(),
            iat: self.issued_at,
            nbf: self.issued_at,
            exp: self.expiry(ttl),
        }
    }

    fn expiry(&self, ttl: Duration) -> i64 {
        let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        self.issued_at.saturating_add(secs)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}
