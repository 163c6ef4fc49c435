//! JWT claims, claim construction and the HS256 codec.

pub mod builder;
pub mod claims;
pub mod codec;

pub use builder::ClaimsBuilder;
pub use claims::{AccessClaims, RefreshClaims, TokenClaims, TokenKind};
pub use codec::TokenCodec;
