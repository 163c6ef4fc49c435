//! User directory and password verification seams.
//!
//! Identity storage and password hashing live outside this crate; the
//! session flows consume them through these traits.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// A user as the directory stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Stable user id, used as the token subject
    pub id: String,
    /// Login email
    pub email: String,
    /// Role carried into access tokens
    pub role: Option<String>,
    /// Stored password hash, opaque to this crate
    pub password_hash: String,
}

/// Failure of the directory itself, as opposed to a missing user.
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// The backing store could not be reached.
    #[error("User directory unavailable: {0}")]
    Unavailable(String),
}

/// Lookup of user records.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look a user up by login email.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DirectoryError>;

    /// Look a user up by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, DirectoryError>;
}

/// Checks a presented password against a stored hash.
pub trait PasswordVerifier: Send + Sync {
    /// Whether `password` matches `password_hash`.
    fn verify(&self, password: &str, password_hash: &str) -> bool;
}

/// Directory backed by a map, keyed by user id.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user.
    pub async fn insert(&self, user: UserRecord) {
        self.users.write().await.insert(user.id.clone(), user);
    }

    /// Remove a user by id, returning it if present.
    pub async fn remove(&self, id: &str) -> Option<UserRecord> {
        self.users.write().await.remove(id)
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DirectoryError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, DirectoryError> {
        Ok(self.users.read().await.get(id).cloned())
    }
}
