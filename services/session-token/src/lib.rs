//! Session token service library.
//!
//! Issues HS256-signed access/refresh token pairs, verifies them, and keeps
//! refresh tokens revocable through a TTL-bounded ledger in Redis.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod lifecycle;
pub mod metrics;
pub mod storage;

pub use auth::{RequestAuthenticator, SessionError, SessionService};
pub use config::{Config, TokenServiceConfig};
pub use error::TokenError;
pub use lifecycle::{TokenLifecycleService, TokenPair};
