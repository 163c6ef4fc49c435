//! Request authentication and user session flows built on the token
//! lifecycle.

pub mod authenticator;
pub mod directory;
pub mod session;

pub use authenticator::{AuthenticatedUser, RequestAuthenticator, Unauthorized};
pub use directory::{DirectoryError, InMemoryUserDirectory, PasswordVerifier, UserDirectory, UserRecord};
pub use session::{SessionError, SessionService};
