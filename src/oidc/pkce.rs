//! PKCE and per-request randomness.
//!
//! RFC 7636 verifier/challenge generation plus the `state` and `nonce`
//! values bound into each authorization request.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generate a cryptographically random PKCE code verifier.
///
/// Returns a 64-character URL-safe string (RFC 7636 allows 43-128 chars).
#[must_use]
pub fn generate_code_verifier() -> String {
    let mut bytes = [0u8; 48];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compute the S256 code challenge for a verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`
#[must_use]
pub fn code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate a random `state` parameter (CSRF defense on the callback).
#[must_use]
pub fn generate_state() -> String {
    random_urlsafe_32()
}

/// Generate a random `nonce` (replay/substitution defense on the ID token).
#[must_use]
pub fn generate_nonce() -> String {
    random_urlsafe_32()
}

/// 256 bits of randomness, base64url-encoded (43 chars).
fn random_urlsafe_32() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_verifier_length() {
        assert_eq!(generate_code_verifier().len(), 64);
    }

    #[test]
    fn test_code_verifier_url_safe() {
        let verifier = generate_code_verifier();
        assert!(
            verifier
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "verifier should be URL-safe: {verifier}"
        );
    }

    #[test]
    fn test_code_verifier_uniqueness() {
        assert_ne!(generate_code_verifier(), generate_code_verifier());
    }

    #[test]
    fn test_code_challenge_deterministic() {
        let verifier = "test_verifier_string";
        assert_eq!(code_challenge(verifier), code_challenge(verifier));
    }

    #[test]
    fn test_code_challenge_known_value() {
        // RFC 7636 appendix B test vector.
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            code_challenge(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_state_and_nonce_distinct() {
        assert_ne!(generate_state(), generate_nonce());
        assert_eq!(generate_state().len(), 43);
    }
}
