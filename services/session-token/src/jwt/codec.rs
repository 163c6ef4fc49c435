//! HS256 signing and verification.

use crate::error::TokenError;
use crate::jwt::claims::TokenClaims;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// The only algorithm tokens are signed with or accepted under.
pub const ALGORITHM: Algorithm = Algorithm::HS256;

/// Signs claims into compact JWS strings and verifies them back.
///
/// Verification pins the algorithm, checks signature and issuer, and applies
/// the same leeway to `exp` and `nbf`. The `typ` header names the token kind
/// and must match the claim set being verified. Expired tokens map to
/// [`TokenError::Expired`]; every other rejection is
/// [`TokenError::MalformedOrForged`].
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Create a codec for `secret` that accepts only tokens from `issuer`.
    pub fn new(secret: &[u8], issuer: &str, leeway: Duration) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = leeway.as_secs();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);

        TokenCodec {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign `claims` with the `typ` header of their token kind.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if the claims cannot be serialized.
    pub fn sign<C: TokenClaims + Serialize>(&self, claims: &C) -> Result<String, TokenError> {
        let mut header = Header::new(ALGORITHM);
        header.typ = Some(C::KIND.typ().to_string());
        encode(&header, claims, &self.encoding_key).map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify `token` and decode it as `C`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Expired`] past expiry plus leeway, otherwise
    /// [`TokenError::MalformedOrForged`] for any rejection, including a token
    /// of the other kind.
    pub fn verify<C: TokenClaims + DeserializeOwned>(&self, token: &str) -> Result<C, TokenError> {
        if token.is_empty() {
            return Err(TokenError::malformed("empty token"));
        }
        let token_data = decode::<C>(token, &self.decoding_key, &self.validation)?;
        if token_data.header.typ.as_deref() != Some(C::KIND.typ()) {
            return Err(TokenError::malformed(format!("not a {} token", C::KIND)));
        }
        Ok(token_data.claims)
    }
}
