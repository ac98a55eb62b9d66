//! Mock token signer.
//!
//! A deterministic fake: "signing" is base64-encoding the claims with a
//! recognizable prefix. No real cryptography, but the same verify
//! contract as the JWT implementation, including expiry mapping.

use crate::error::{AuthError, Result};
use crate::providers::{AccessClaims, TokenSigner};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;

const PREFIX: &str = "mock.";

/// Deterministic fake signer.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockTokenSigner;

impl MockTokenSigner {
    /// Create a mock signer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TokenSigner for MockTokenSigner {
    fn sign(&self, claims: &AccessClaims) -> Result<String> {
        let json = serde_json::to_vec(claims)
            .map_err(|e| AuthError::SerializationError(e.to_string()))?;
        Ok(format!("{PREFIX}{}", URL_SAFE_NO_PAD.encode(json)))
    }

    fn verify(&self, token: &str) -> Result<AccessClaims> {
        let encoded = token.strip_prefix(PREFIX).ok_or(AuthError::TokenInvalid)?;
        let json = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| AuthError::TokenInvalid)?;
        let claims: AccessClaims =
            serde_json::from_slice(&json).map_err(|_| AuthError::TokenInvalid)?;

        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(exp_offset_secs: i64) -> AccessClaims {
        let now = Utc::now().timestamp();
        AccessClaims {
            sub: "user".to_string(),
            sid: "session".to_string(),
            email: "user@test.com".to_string(),
            iss: "iss".to_string(),
            aud: "aud".to_string(),
            iat: now,
            exp: now + exp_offset_secs,
        }
    }

    #[test]
    fn test_roundtrip() {
        let signer = MockTokenSigner::new();
        let claims = claims(600);
        let token = signer.sign(&claims).unwrap();
        assert_eq!(signer.verify(&token).unwrap(), claims);
    }

    #[test]
    fn test_expiry_and_garbage() {
        let signer = MockTokenSigner::new();
        let token = signer.sign(&claims(-10)).unwrap();
        assert_eq!(signer.verify(&token), Err(AuthError::TokenExpired));
        assert_eq!(signer.verify("garbage"), Err(AuthError::TokenInvalid));
    }
}
