//! Login, refresh and logout flows.

use crate::auth::directory::{DirectoryError, PasswordVerifier, UserDirectory};
use crate::error::TokenError;
use crate::lifecycle::{TokenLifecycleService, TokenPair};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Failure of a session flow.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Unknown email or wrong password; the two are not distinguished.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The subject of a valid refresh token no longer exists.
    #[error("User not found")]
    UserNotFound,

    /// The user directory failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The token lifecycle failed.
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Login, refresh and logout over a user directory.
pub struct SessionService<U, P> {
    tokens: Arc<TokenLifecycleService>,
    users: U,
    passwords: P,
}

impl<U: UserDirectory, P: PasswordVerifier> SessionService<U, P> {
    /// Create a session service.
    pub fn new(tokens: Arc<TokenLifecycleService>, users: U, passwords: P) -> Self {
        SessionService {
            tokens,
            users,
            passwords,
        }
    }

    /// Check credentials and issue a pair.
    ///
    /// # Errors
    ///
    /// Unknown email and wrong password both yield
    /// [`SessionError::InvalidCredentials`].
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, SessionError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            info!("Login for unknown email");
            return Err(SessionError::InvalidCredentials);
        };

        if !self.passwords.verify(password, &user.password_hash) {
            info!(user_id = %user.id, "Login with wrong password");
            return Err(SessionError::InvalidCredentials);
        }

        let pair = self
            .tokens
            .issue(&user.id, Some(&user.email), user.role.as_deref())
            .await?;
        info!(user_id = %user.id, "User logged in");
        Ok(pair)
    }

    /// Rotate a refresh token, reloading the user so the new access token
    /// carries their current email and role.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        let claims = self.tokens.verify_refresh(refresh_token).await?;

        let Some(user) = self.users.find_by_id(&claims.sub).await? else {
            warn!(user_id = %claims.sub, jti = %claims.jti, "Refresh for deleted user");
            return Err(SessionError::UserNotFound);
        };

        let pair = self
            .tokens
            .rotate(refresh_token, &user.id, Some(&user.email), user.role.as_deref())
            .await?;
        Ok(pair)
    }

    /// Revoke the refresh token identified by `jti`.
    ///
    /// # Errors
    ///
    /// Fails if the revocation cannot be recorded.
    pub async fn logout(&self, jti: &str) -> Result<(), SessionError> {
        self.tokens.revoke(jti).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::directory::{InMemoryUserDirectory, UserRecord};
    use crate::config::TokenServiceConfig;
    use session_common::{LedgerClient, LedgerClientConfig};

    struct PlainVerifier;

    impl PasswordVerifier for PlainVerifier {
        fn verify(&self, password: &str, password_hash: &str) -> bool {
            password == password_hash
        }
    }

    async fn session() -> SessionService<InMemoryUserDirectory, PlainVerifier> {
        let client = Arc::new(LedgerClient::in_memory(LedgerClientConfig::default()));
        let tokens = TokenLifecycleService::builder(TokenServiceConfig::new("session-test-key"))
            .ledger(client)
            .build()
            .unwrap();

        let users = InMemoryUserDirectory::new();
        users
            .insert(UserRecord {
                id: "user-1".into(),
                email: "alice@example.com".into(),
                role: Some("user".into()),
                password_hash: "correct horse".into(),
            })
            .await;

        SessionService::new(Arc::new(tokens), users, PlainVerifier)
    }

    #[tokio::test]
    async fn test_login_issues_pair() {
        let session = session().await;
        let pair = session.login("alice@example.com", "correct horse").await.unwrap();

        let claims = session.tokens.verify_access(&pair.access_token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email.as_deref(), Some("alice@example.com"));
        assert_eq!(claims.role.as_deref(), Some("user"));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let session = session().await;

        let wrong_password = session.login("alice@example.com", "nope").await;
        let unknown_user = session.login("bob@example.com", "correct horse").await;

        assert!(matches!(wrong_password, Err(SessionError::InvalidCredentials)));
        assert!(matches!(unknown_user, Err(SessionError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_refresh_picks_up_role_change() {
        let session = session().await;
        let pair = session.login("alice@example.com", "correct horse").await.unwrap();

        session
            .users
            .insert(UserRecord {
                id: "user-1".into(),
                email: "alice@example.com".into(),
                role: Some("admin".into()),
                password_hash: "correct horse".into(),
            })
            .await;

        let rotated = session.refresh(&pair.refresh_token).await.unwrap();
        let claims = session.tokens.verify_access(&rotated.access_token).unwrap();
        assert_eq!(claims.role.as_deref(), Some("admin"));

        let replay = session.refresh(&pair.refresh_token).await;
        assert!(matches!(replay, Err(SessionError::Token(TokenError::Revoked))));
    }

    #[tokio::test]
    async fn test_refresh_for_deleted_user() {
        let session = session().await;
        let pair = session.login("alice@example.com", "correct horse").await.unwrap();
        session.users.remove("user-1").await;

        let result = session.refresh(&pair.refresh_token).await;
        assert!(matches!(result, Err(SessionError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_logout_revokes_refresh() {
        let session = session().await;
        let pair = session.login("alice@example.com", "correct horse").await.unwrap();
        let jti = session.tokens.verify_access(&pair.access_token).unwrap().jti;

        session.logout(&jti).await.unwrap();

        let result = session.refresh(&pair.refresh_token).await;
        assert!(matches!(result, Err(SessionError::Token(TokenError::Revoked))));
    }
}
