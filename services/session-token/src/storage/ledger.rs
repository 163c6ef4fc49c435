//! Issued and revoked markers over the ledger client.

use crate::error::TokenError;
use crate::metrics;
use session_common::{LedgerClient, PlatformError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const ISSUED_PREFIX: &str = "jti:";
const REVOKED_PREFIX: &str = "revoked:";
const REVOKED_SENTINEL: &[u8] = b"1";

/// How a failed ledger write is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// The write is part of the operation; failure aborts it.
    MustSucceed,
    /// The write is attempted and a failure is logged and swallowed.
    BestEffort,
}

impl WritePolicy {
    const fn label(self) -> &'static str {
        match self {
            Self::MustSucceed => "must_succeed",
            Self::BestEffort => "best_effort",
        }
    }
}

/// Result of a ledger write that did not fail the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The marker was stored.
    Written,
    /// A best-effort write failed and was skipped.
    Skipped,
}

/// Issued and revoked markers keyed by token identifier.
///
/// An issued marker (`jti:<id>`) maps a refresh token to its subject for the
/// refresh lifetime. A revoked marker (`revoked:<id>`) is kept for the
/// revocation retention window so that it outlives every token it covers.
/// Only revoked markers take part in validation.
pub struct RevocationLedger {
    client: Arc<LedgerClient>,
    refresh_ttl: Duration,
    retention: Duration,
}

impl RevocationLedger {
    /// Create a ledger whose issued markers live for `refresh_ttl` and
    /// revoked markers for `retention`.
    #[must_use]
    pub fn new(client: Arc<LedgerClient>, refresh_ttl: Duration, retention: Duration) -> Self {
        RevocationLedger {
            client,
            refresh_ttl,
            retention,
        }
    }

    /// Record that `jti` was issued to `subject`.
    pub async fn record_issued(
        &self,
        jti: &str,
        subject: &str,
        policy: WritePolicy,
    ) -> Result<WriteOutcome, TokenError> {
        let result = self
            .client
            .put(&issued_key(jti), subject.as_bytes(), self.refresh_ttl)
            .await;
        self.settle("issued", jti, policy, result)
    }

    /// Record that `jti` is revoked. Writing an existing marker again is a
    /// no-op apart from refreshing its retention.
    pub async fn record_revoked(
        &self,
        jti: &str,
        policy: WritePolicy,
    ) -> Result<WriteOutcome, TokenError> {
        let result = self
            .client
            .put(&revoked_key(jti), REVOKED_SENTINEL, self.retention)
            .await;
        self.settle("revoked", jti, policy, result)
    }

    /// Whether `jti` carries a revoked marker.
    ///
    /// A ledger that cannot answer is an error, never "not revoked".
    pub async fn is_revoked(&self, jti: &str) -> Result<bool, TokenError> {
        self.client
            .exists(&revoked_key(jti))
            .await
            .map_err(|e| TokenError::store_unavailable(&e))
    }

    /// Subject recorded when `jti` was issued, if the marker is still live.
    pub async fn issued_subject(&self, jti: &str) -> Result<Option<String>, TokenError> {
        let value = self
            .client
            .get(&issued_key(jti))
            .await
            .map_err(|e| TokenError::store_unavailable(&e))?;
        Ok(value.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Shared client, for health reporting.
    pub fn client(&self) -> &LedgerClient {
        &self.client
    }

    fn settle(
        &self,
        marker: &'static str,
        jti: &str,
        policy: WritePolicy,
        result: Result<(), PlatformError>,
    ) -> Result<WriteOutcome, TokenError> {
        match result {
            Ok(()) => {
                metrics::record_ledger_write(marker, policy.label(), "ok");
                debug!(marker, jti = %jti, "Ledger marker written");
                Ok(WriteOutcome::Written)
            }
            Err(e) => match policy {
                WritePolicy::MustSucceed => {
                    metrics::record_ledger_write(marker, policy.label(), "failed");
                    warn!(marker, jti = %jti, error = %e, "Ledger write failed");
                    Err(TokenError::store_unavailable(&e))
                }
                WritePolicy::BestEffort => {
                    metrics::record_ledger_write(marker, policy.label(), "skipped");
                    warn!(marker, jti = %jti, error = %e, "Best-effort ledger write skipped");
                    Ok(WriteOutcome::Skipped)
                }
            },
        }
    }
}

fn issued_key(jti: &str) -> String {
    format!("{ISSUED_PREFIX}{jti}")
}

fn revoked_key(jti: &str) -> String {
    format!("{REVOKED_PREFIX}{jti}")
}
