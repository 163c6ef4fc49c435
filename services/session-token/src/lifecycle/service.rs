//! The token lifecycle service.

use crate::config::TokenServiceConfig;
use crate::error::TokenError;
use crate::jwt::{AccessClaims, ClaimsBuilder, RefreshClaims, TokenCodec};
use crate::lifecycle::pair::TokenPair;
use crate::metrics;
use crate::storage::{RevocationLedger, WriteOutcome, WritePolicy};
use secrecy::ExposeSecret;
use session_common::{CircuitState, LedgerClient};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Issues, verifies, revokes and rotates session tokens.
///
/// Access tokens are checked by signature and claims alone. Refresh tokens
/// are additionally checked against the revocation ledger, and a ledger that
/// cannot answer rejects the token. The service holds no mutable state of
/// its own and is shared across tasks behind an `Arc`.
pub struct TokenLifecycleService {
    codec: TokenCodec,
    ledger: RevocationLedger,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

/// Builder for [`TokenLifecycleService`].
pub struct TokenLifecycleServiceBuilder {
    config: TokenServiceConfig,
    ledger: Option<Arc<LedgerClient>>,
}

impl TokenLifecycleServiceBuilder {
    /// Ledger client the service records markers in. Required.
    #[must_use]
    pub fn ledger(mut self, client: Arc<LedgerClient>) -> Self {
        self.ledger = Some(client);
        self
    }

    /// Validate the configuration and build the service.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Config`] if the configuration is invalid or no
    /// ledger was supplied.
    pub fn build(self) -> Result<TokenLifecycleService, TokenError> {
        self.config.validate()?;
        let client = self
            .ledger
            .ok_or_else(|| TokenError::config("revocation ledger is required"))?;

        let config = self.config;
        let codec = TokenCodec::new(
            config.signing_key.expose_secret().as_bytes(),
            &config.issuer,
            config.leeway,
        );
        let ledger = RevocationLedger::new(
            client,
            config.refresh_token_ttl,
            config.revocation_retention,
        );

        info!(
            issuer = %config.issuer,
            access_ttl_secs = config.access_token_ttl.as_secs(),
            refresh_ttl_secs = config.refresh_token_ttl.as_secs(),
            "Token lifecycle service ready"
        );

        Ok(TokenLifecycleService {
            codec,
            ledger,
            issuer: config.issuer,
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
        })
    }
}

impl TokenLifecycleService {
    /// Start building a service from `config`.
    #[must_use]
    pub fn builder(config: TokenServiceConfig) -> TokenLifecycleServiceBuilder {
        TokenLifecycleServiceBuilder {
            config,
            ledger: None,
        }
    }

    /// Issue a new pair for `subject`.
    ///
    /// Both tokens share one `jti`. The issued marker must be recorded; if the
    /// ledger rejects the write the pair is discarded.
    #[instrument(skip(self, email, role), fields(user_id = %subject))]
    pub async fn issue(
        &self,
        subject: &str,
        email: Option<&str>,
        role: Option<&str>,
    ) -> Result<TokenPair, TokenError> {
        let start = Instant::now();
        let result = self.issue_pair(subject, email, role).await;
        metrics::record_pair_issued(outcome(&result));
        metrics::record_latency("issue", start.elapsed().as_secs_f64());
        result
    }

    /// Verify an access token. Never touches the ledger.
    ///
    /// A refresh token is rejected here even though it is validly signed.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let result = self.codec.verify::<AccessClaims>(token);
        if let Err(e) = &result {
            debug!(code = e.code(), "Access token rejected");
        }
        metrics::record_verification("access", outcome(&result));
        result
    }

    /// Verify a refresh token: signature and claims first, then the ledger.
    #[instrument(skip_all)]
    pub async fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let start = Instant::now();
        let result = self.check_refresh(token).await;
        metrics::record_verification("refresh", outcome(&result));
        metrics::record_latency("verify_refresh", start.elapsed().as_secs_f64());
        result
    }

    /// Revoke `jti`. Revoking an already revoked identifier succeeds.
    #[instrument(skip(self))]
    pub async fn revoke(&self, jti: &str) -> Result<(), TokenError> {
        if jti.is_empty() {
            return Err(TokenError::malformed("empty jti"));
        }
        self.ledger.record_revoked(jti, WritePolicy::MustSucceed).await?;
        metrics::record_revocation("logout");
        info!(jti = %jti, "Refresh token revoked");
        Ok(())
    }

    /// Exchange a valid refresh token for a new pair.
    ///
    /// The old token is revoked on a best-effort basis: if the ledger write
    /// fails the rotation still succeeds and the old token stays usable until
    /// it expires. `subject` must match the token's subject.
    #[instrument(skip(self, refresh_token, email, role), fields(user_id = %subject))]
    pub async fn rotate(
        &self,
        refresh_token: &str,
        subject: &str,
        email: Option<&str>,
        role: Option<&str>,
    ) -> Result<TokenPair, TokenError> {
        let start = Instant::now();
        let result = self.rotate_pair(refresh_token, subject, email, role).await;
        if let Err(e) = &result {
            metrics::record_rotation(e.code());
        }
        metrics::record_latency("rotate", start.elapsed().as_secs_f64());
        result
    }

    /// Subject recorded when `jti` was issued, while that marker is live.
    ///
    /// Diagnostic only; validation never consults the issued marker.
    pub async fn issued_owner(&self, jti: &str) -> Result<Option<String>, TokenError> {
        self.ledger.issued_subject(jti).await
    }

    /// Whether `jti` carries a revoked marker.
    pub async fn is_revoked(&self, jti: &str) -> Result<bool, TokenError> {
        self.ledger.is_revoked(jti).await
    }

    /// State of the ledger circuit breaker.
    pub async fn ledger_circuit_state(&self) -> CircuitState {
        self.ledger.client().circuit_state().await
    }

    /// Issuer stamped into and required of every token.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    async fn issue_pair(
        &self,
        subject: &str,
        email: Option<&str>,
        role: Option<&str>,
    ) -> Result<TokenPair, TokenError> {
        let builder = ClaimsBuilder::new(self.issuer.as_str(), subject)
            .email(email)
            .role(role);
        let access = builder.build_access(self.access_ttl);
        let refresh = builder.build_refresh(self.refresh_ttl);

        let access_token = self.codec.sign(&access)?;
        let refresh_token = self.codec.sign(&refresh)?;

        self.ledger
            .record_issued(&refresh.jti, subject, WritePolicy::MustSucceed)
            .await?;

        info!(jti = %refresh.jti, "Issued token pair");
        Ok(TokenPair::new(access_token, refresh_token, access.exp))
    }

    async fn check_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let claims = self.codec.verify::<RefreshClaims>(token).inspect_err(|e| {
            debug!(code = e.code(), "Refresh token rejected");
        })?;

        if self.ledger.is_revoked(&claims.jti).await? {
            info!(jti = %claims.jti, user_id = %claims.sub, "Revoked refresh token presented");
            return Err(TokenError::Revoked);
        }

        Ok(claims)
    }

    async fn rotate_pair(
        &self,
        refresh_token: &str,
        subject: &str,
        email: Option<&str>,
        role: Option<&str>,
    ) -> Result<TokenPair, TokenError> {
        let claims = self.verify_refresh(refresh_token).await?;
        if claims.sub != subject {
            warn!(jti = %claims.jti, "Refresh token subject mismatch");
            return Err(TokenError::malformed("subject mismatch"));
        }

        let revoked = self
            .ledger
            .record_revoked(&claims.jti, WritePolicy::BestEffort)
            .await?;
        if revoked == WriteOutcome::Written {
            metrics::record_revocation("rotation");
        }

        let pair = self.issue(subject, email, role).await?;
        metrics::record_rotation(match revoked {
            WriteOutcome::Written => "ok",
            WriteOutcome::Skipped => "ok_unrevoked",
        });
        info!(old_jti = %claims.jti, "Rotated refresh token");
        Ok(pair)
    }
}

fn outcome<T>(result: &Result<T, TokenError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(e) => e.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use session_common::LedgerClientConfig;

    fn service() -> TokenLifecycleService {
        let client = Arc::new(LedgerClient::in_memory(LedgerClientConfig::default()));
        TokenLifecycleService::builder(TokenServiceConfig::new("unit-test-signing-key"))
            .ledger(client)
            .build()
            .unwrap()
    }

    fn jti_of(service: &TokenLifecycleService, access: &str) -> String {
        service.verify_access(access).unwrap().jti
    }

    #[test]
    fn test_build_requires_ledger() {
        let result = TokenLifecycleService::builder(TokenServiceConfig::new("key")).build();
        assert!(matches!(result, Err(TokenError::Config(_))));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let client = Arc::new(LedgerClient::in_memory(LedgerClientConfig::default()));
        let result = TokenLifecycleService::builder(TokenServiceConfig::new(""))
            .ledger(client)
            .build();
        assert!(matches!(result, Err(TokenError::Config(_))));
    }

    #[tokio::test]
    async fn test_issue_and_verify() {
        let service = service();
        let pair = service
            .issue("user-1", Some("u@example.com"), Some("admin"))
            .await
            .unwrap();

        let access = service.verify_access(&pair.access_token).unwrap();
        let refresh = service.verify_refresh(&pair.refresh_token).await.unwrap();

        assert_eq!(access.sub, "user-1");
        assert_eq!(access.email.as_deref(), Some("u@example.com"));
        assert_eq!(access.role.as_deref(), Some("admin"));
        assert_eq!(access.jti, refresh.jti);
        assert_eq!(pair.expires_in, access.exp);
        assert_eq!(pair.token_type, "Bearer");
    }

    #[tokio::test]
    async fn test_issue_records_owner() {
        let service = service();
        let pair = service.issue("user-1", None, None).await.unwrap();
        let jti = jti_of(&service, &pair.access_token);

        assert_eq!(service.issued_owner(&jti).await.unwrap().as_deref(), Some("user-1"));
        assert!(!service.is_revoked(&jti).await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_rejects_refresh_only() {
        let service = service();
        let pair = service.issue("user-1", None, None).await.unwrap();
        let jti = jti_of(&service, &pair.access_token);

        service.revoke(&jti).await.unwrap();

        let result = service.verify_refresh(&pair.refresh_token).await;
        assert!(matches!(result, Err(TokenError::Revoked)));
        assert!(service.verify_access(&pair.access_token).is_ok());
    }

    #[tokio::test]
    async fn test_revoked_refresh_token_is_not_an_access_token() {
        let service = service();
        let pair = service.issue("user-1", None, None).await.unwrap();
        let jti = jti_of(&service, &pair.access_token);

        assert!(matches!(
            service.verify_access(&pair.refresh_token),
            Err(TokenError::MalformedOrForged(_))
        ));
        service.revoke(&jti).await.unwrap();
        assert!(matches!(
            service.verify_access(&pair.refresh_token),
            Err(TokenError::MalformedOrForged(_))
        ));
    }

    #[tokio::test]
    async fn test_access_token_is_not_a_refresh_token() {
        let service = service();
        let pair = service.issue("user-1", None, None).await.unwrap();

        let result = service.verify_refresh(&pair.access_token).await;
        assert!(matches!(result, Err(TokenError::MalformedOrForged(_))));
    }

    #[tokio::test]
    async fn test_revoke_empty_jti() {
        let result = service().revoke("").await;
        assert!(matches!(result, Err(TokenError::MalformedOrForged(_))));
    }

    #[tokio::test]
    async fn test_rotate_is_single_use() {
        let service = service();
        let pair = service.issue("user-1", None, Some("user")).await.unwrap();

        let rotated = service
            .rotate(&pair.refresh_token, "user-1", None, Some("user"))
            .await
            .unwrap();
        assert_ne!(rotated.refresh_token, pair.refresh_token);
        assert!(service.verify_refresh(&rotated.refresh_token).await.is_ok());

        let again = service.rotate(&pair.refresh_token, "user-1", None, Some("user")).await;
        assert!(matches!(again, Err(TokenError::Revoked)));
    }

    #[tokio::test]
    async fn test_rotate_rejects_other_subject() {
        let service = service();
        let pair = service.issue("user-1", None, None).await.unwrap();

        let result = service.rotate(&pair.refresh_token, "user-2", None, None).await;
        assert!(matches!(result, Err(TokenError::MalformedOrForged(_))));
        // Rejected before anything was revoked
        assert!(service.verify_refresh(&pair.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_forged_refresh_never_reaches_ledger() {
        let service = service();
        let result = service.verify_refresh("not.a.token").await;
        assert!(matches!(result, Err(TokenError::MalformedOrForged(_))));
    }
}
