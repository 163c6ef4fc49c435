//! Centralized configuration for the session token service.
//!
//! All configuration is loaded from environment variables and validated
//! at startup. A configuration that fails validation is fatal.

use crate::error::TokenError;
use secrecy::{ExposeSecret, SecretString};
use session_common::{CircuitBreakerConfig, LedgerClientConfig, TracingConfig};
use std::env;
use std::time::Duration;

/// Default issuer claim.
pub const DEFAULT_ISSUER: &str = "auth-service";

/// Token lifecycle settings.
#[derive(Debug)]
pub struct TokenServiceConfig {
    /// HMAC signing key
    pub signing_key: SecretString,
    /// JWT issuer claim
    pub issuer: String,
    /// Access token TTL
    pub access_token_ttl: Duration,
    /// Refresh token TTL
    pub refresh_token_ttl: Duration,
    /// How long a revoked marker is retained; must cover the refresh TTL
    pub revocation_retention: Duration,
    /// Clock skew tolerated on `exp` and `nbf`
    pub leeway: Duration,
}

impl TokenServiceConfig {
    /// Create a config with the given signing key and default lifetimes.
    #[must_use]
    pub fn new(signing_key: impl Into<String>) -> Self {
        Self {
            signing_key: SecretString::from(signing_key.into()),
            issuer: DEFAULT_ISSUER.to_string(),
            access_token_ttl: Duration::from_secs(900),
            refresh_token_ttl: Duration::from_secs(7 * 24 * 3600),
            revocation_retention: Duration::from_secs(30 * 24 * 3600),
            leeway: Duration::from_secs(5),
        }
    }

    /// Set the issuer claim.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Set the access token TTL.
    #[must_use]
    pub const fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    /// Set the refresh token TTL.
    #[must_use]
    pub const fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    /// Set the revoked-marker retention window.
    #[must_use]
    pub const fn with_revocation_retention(mut self, retention: Duration) -> Self {
        self.revocation_retention = retention;
        self
    }

    /// Set the clock-skew leeway.
    #[must_use]
    pub const fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Check the settings the service cannot start without.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Config`] for an empty signing key or issuer, a
    /// TTL below one second, or a retention window shorter than the refresh
    /// TTL (a revoked token could outlive its marker).
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.signing_key.expose_secret().is_empty() {
            return Err(TokenError::config("signing key is required"));
        }
        if self.issuer.trim().is_empty() {
            return Err(TokenError::config("issuer must not be empty"));
        }
        if self.access_token_ttl.as_secs() == 0 || self.refresh_token_ttl.as_secs() == 0 {
            return Err(TokenError::config("token TTLs must be positive"));
        }
        if self.revocation_retention < self.refresh_token_ttl {
            return Err(TokenError::config(format!(
                "revocation retention ({}s) must cover refresh TTL ({}s)",
                self.revocation_retention.as_secs(),
                self.refresh_token_ttl.as_secs()
            )));
        }
        Ok(())
    }
}

/// Process configuration.
#[derive(Debug)]
pub struct Config {
    /// Token lifecycle settings
    pub token: TokenServiceConfig,
    /// Redis URL of the revocation ledger
    pub redis_url: String,
    /// Ledger client configuration
    pub ledger: LedgerClientConfig,
    /// Tracing configuration
    pub tracing: TracingConfig,
}

impl Config {
    /// Load configuration from environment variables (and `.env`).
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, TokenError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TokenError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let signing_key = lookup("JWT_SIGNING_KEY")
            .ok_or_else(|| TokenError::config("JWT_SIGNING_KEY is required"))?;

        let token = TokenServiceConfig::new(signing_key)
            .with_issuer(lookup("JWT_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.to_string()))
            .with_access_token_ttl(Duration::from_secs(parse_var(&lookup, "ACCESS_TOKEN_TTL", 900)?))
            .with_refresh_token_ttl(Duration::from_secs(parse_var(
                &lookup,
                "REFRESH_TOKEN_TTL",
                604_800,
            )?))
            .with_revocation_retention(Duration::from_secs(parse_var(
                &lookup,
                "REVOCATION_RETENTION",
                2_592_000,
            )?))
            .with_leeway(Duration::from_secs(parse_var(&lookup, "JWT_LEEWAY", 5)?));
        token.validate()?;

        let redis_url =
            lookup("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".to_string());

        let circuit_breaker = CircuitBreakerConfig::default()
            .with_failure_threshold(parse_var(&lookup, "CB_FAILURE_THRESHOLD", 5)?)
            .with_failure_window(Duration::from_secs(parse_var(&lookup, "CB_FAILURE_WINDOW", 60)?))
            .with_timeout(Duration::from_secs(parse_var(&lookup, "CB_TIMEOUT", 30)?));

        let ledger = LedgerClientConfig::default()
            .with_namespace(lookup("LEDGER_NAMESPACE").unwrap_or_else(|| "session".to_string()))
            .with_op_timeout(Duration::from_millis(parse_var(
                &lookup,
                "LEDGER_OP_TIMEOUT_MS",
                250,
            )?))
            .with_circuit_breaker(circuit_breaker);

        let mut tracing = TracingConfig::default()
            .with_service_name("session-token")
            .with_log_level(lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()));
        if parse_var(&lookup, "LOG_JSON", false)? {
            tracing = tracing.with_json_output();
        }

        Ok(Self {
            token,
            redis_url,
            ledger,
            tracing,
        })
    }
}

/// Parse a variable with a default value.
fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, TokenError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(val) => val
            .parse()
            .map_err(|e| TokenError::config(format!("Invalid {name}: {e}"))),
        None => Ok(default),
    }
}
