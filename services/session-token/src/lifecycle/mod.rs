//! Token lifecycle: issuance, verification, revocation and rotation.

pub mod pair;
pub mod service;

pub use pair::{TOKEN_TYPE, TokenPair};
pub use service::{TokenLifecycleService, TokenLifecycleServiceBuilder};
