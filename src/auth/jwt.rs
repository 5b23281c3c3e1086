/// Signed Token Codec
///
/// Encodes and decodes compact HMAC-signed JWTs carrying a session
/// identifier and a role. Pure functions of (claims, key) and (token, key).

use std::collections::HashSet;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::Value;

use crate::auth::claims::SessionClaims;
use crate::error::AuthError;

/// Algorithms accepted for signing: the symmetric HMAC family only
pub fn is_hmac(algorithm: Algorithm) -> bool {
    matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

/// Claims decoded from an authentic token plus its built-in validity
#[derive(Debug, Clone)]
pub struct ParsedToken<C> {
    pub claims: C,
    /// `false` once the token's `exp` has passed
    pub valid: bool,
}

/// Signs and verifies tokens with one shared secret and one algorithm
#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Build a codec for `secret`
    ///
    /// # Errors
    /// Returns error if `algorithm` is not an HMAC algorithm
    pub fn new(secret: &str, algorithm: Algorithm) -> Result<Self, AuthError> {
        if !is_hmac(algorithm) {
            return Err(AuthError::Signing(format!(
                "{:?} is not a symmetric HMAC algorithm",
                algorithm
            )));
        }

        // Only the header algorithm and the signature are checked by the
        // library; claim presence and expiry are checked below.
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Sign `claims` into a compact token
    ///
    /// # Errors
    /// Returns error if serialization or signing fails
    pub fn generate<C: SessionClaims>(&self, claims: &C) -> Result<String, AuthError> {
        encode(&Header::new(self.algorithm), claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify `token` and decode it as claims of class `C`
    ///
    /// # Errors
    /// - `InvalidSignature` if the advertised algorithm is not ours or the
    ///   signature does not verify
    /// - `Malformed` if the token does not decode to the expected structure
    /// - `ClaimMissing` if the class claim, `role` or `exp` is absent
    pub fn parse<C: SessionClaims>(&self, token: &str) -> Result<ParsedToken<C>, AuthError> {
        let payload = decode::<Value>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName => AuthError::InvalidSignature,
                _ => {
                    tracing::debug!("Token failed to decode: {}", e);
                    AuthError::Malformed
                }
            })?
            .claims;

        for claim in [C::KIND.session_claim(), "role", "exp"] {
            if payload.get(claim).map_or(true, Value::is_null) {
                return Err(AuthError::ClaimMissing(claim));
            }
        }

        let claims: C = serde_json::from_value(payload).map_err(|e| {
            tracing::debug!("Token claims have unexpected types: {}", e);
            AuthError::Malformed
        })?;
        let valid = claims.expires_at() > chrono::Utc::now().timestamp();

        Ok(ParsedToken { claims, valid })
    }
}
