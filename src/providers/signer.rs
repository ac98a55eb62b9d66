//! Token signer trait and JWT implementation.

use crate::error::{AuthError, Result};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by the application's access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User ID.
    pub sub: String,

    /// Session ID, so revocation can be checked.
    pub sid: String,

    /// User email.
    pub email: String,

    /// Token issuer.
    pub iss: String,

    /// Token audience.
    pub aud: String,

    /// Issued-at, seconds since the epoch.
    pub iat: i64,

    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Signs and verifies the application's own session tokens.
///
/// Verification is purely local (signature + expiry + issuer/audience);
/// the revocation check on top of it belongs to the token issuer.
pub trait TokenSigner: Send + Sync {
    /// Sign claims into a compact token.
    ///
    /// # Errors
    ///
    /// Returns error if signing fails.
    fn sign(&self, claims: &AccessClaims) -> Result<String>;

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// - [`AuthError::TokenExpired`] if the signature is valid but `exp`
    ///   has passed
    /// - [`AuthError::TokenInvalid`] for bad signatures, malformed tokens,
    ///   or issuer/audience mismatches
    fn verify(&self, token: &str) -> Result<AccessClaims>;
}

/// HS256 JWT signer.
pub struct JwtSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtSigner {
    /// Create a signer for the given secret, issuer, and audience.
    #[must_use]
    pub fn new(secret: &str, issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl TokenSigner for JwtSigner {
    fn sign(&self, claims: &AccessClaims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::InternalError(format!("Failed to sign token: {e}")))
    }

    fn verify(&self, token: &str) -> Result<AccessClaims> {
        decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::Utc;

    fn claims(exp_offset_secs: i64) -> AccessClaims {
        let now = Utc::now().timestamp();
        AccessClaims {
            sub: "2a3e4be5-9f30-4f82-9dd1-8f5dd428a4c1".to_string(),
            sid: "0c52b05c-8eb6-4345-b6ba-75ce62f23e3a".to_string(),
            email: "user@test.com".to_string(),
            iss: "https://app.example.com".to_string(),
            aud: "authgate".to_string(),
            iat: now,
            exp: now + exp_offset_secs,
        }
    }

    fn signer() -> JwtSigner {
        JwtSigner::new("test-secret", "https://app.example.com", "authgate")
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let signer = signer();
        let claims = claims(600);

        let token = signer.sign(&claims).unwrap();
        let verified = signer.verify(&token).unwrap();

        assert_eq!(verified, claims);
    }

    #[test]
    fn test_expired_token() {
        let signer = signer();
        let token = signer.sign(&claims(-60)).unwrap();

        assert_eq!(signer.verify(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = signer().sign(&claims(600)).unwrap();
        let other = JwtSigner::new("other-secret", "https://app.example.com", "authgate");

        assert_eq!(other.verify(&token), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let token = signer().sign(&claims(600)).unwrap();
        let other = JwtSigner::new("test-secret", "https://app.example.com", "other-app");

        assert_eq!(other.verify(&token), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn test_garbage_rejected() {
        assert_eq!(
            signer().verify("not.a.token"),
            Err(AuthError::TokenInvalid)
        );
    }
}
