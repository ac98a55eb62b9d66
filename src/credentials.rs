//! Local credential verification.
//!
//! Verifies an email/password pair against a stored Argon2 hash. Unknown
//! users and wrong passwords are indistinguishable to the caller, and both
//! paths perform a hash verification so their timing matches.

use crate::error::{AuthError, Result};
use crate::state::{Credential, Identity};
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

/// Credential verifier.
///
/// Stateless apart from a dummy hash used to equalize the timing of the
/// "no such user" path.
pub struct CredentialVerifier {
    dummy_hash: String,
}

impl CredentialVerifier {
    /// Create a verifier.
    ///
    /// # Errors
    ///
    /// Returns error if the dummy hash cannot be computed.
    pub fn new() -> Result<Self> {
        Ok(Self {
            dummy_hash: Self::hash_password("dummy-timing-equalizer")?,
        })
    }

    /// Hash a password for storage (PHC string format).
    ///
    /// The write-side counterpart of [`CredentialVerifier::verify`]; used
    /// by account provisioning and tests.
    ///
    /// # Errors
    ///
    /// Returns error if hashing fails.
    pub fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::InternalError(format!("Password hashing failed: {e}")))
    }

    /// Verify a password against an optionally-found credential.
    ///
    /// Takes `Option<&Credential>` so the missing-user path still runs a
    /// full hash verification (against the dummy hash) before rejecting.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for both unknown users
    /// and wrong passwords, never distinguishing the two.
    pub fn verify(&self, credential: Option<&Credential>, password: &str) -> Result<Identity> {
        let stored_hash = credential.map_or(self.dummy_hash.as_str(), |c| c.password_hash.as_str());

        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| AuthError::InternalError(format!("Stored hash unreadable: {e}")))?;

        let password_matches = Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok();

        match credential {
            Some(credential) if password_matches => Ok(Identity {
                user_id: credential.user_id,
                email: credential.email.clone(),
                name: None,
            }),
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}

/// Normalize an email for lookup: trim whitespace, lowercase.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::state::UserId;

    fn credential(password: &str) -> Credential {
        Credential {
            user_id: UserId::new(),
            email: "user@test.com".to_string(),
            password_hash: CredentialVerifier::hash_password(password).unwrap(),
            totp_enabled: false,
        }
    }

    #[test]
    fn test_correct_password_returns_identity() {
        let verifier = CredentialVerifier::new().unwrap();
        let credential = credential("hunter2good");

        let identity = verifier.verify(Some(&credential), "hunter2good").unwrap();
        assert_eq!(identity.user_id, credential.user_id);
        assert_eq!(identity.email, "user@test.com");
    }

    #[test]
    fn test_wrong_password_rejected() {
        let verifier = CredentialVerifier::new().unwrap();
        let credential = credential("hunter2good");

        assert_eq!(
            verifier.verify(Some(&credential), "wrong"),
            Err(AuthError::InvalidCredentials)
        );
    }

    #[test]
    fn test_unknown_user_same_error_as_wrong_password() {
        let verifier = CredentialVerifier::new().unwrap();
        let credential = credential("hunter2good");

        let missing = verifier.verify(None, "hunter2good").unwrap_err();
        let wrong = verifier.verify(Some(&credential), "wrong").unwrap_err();
        assert_eq!(missing, wrong);
    }

    #[test]
    fn test_hashes_are_salted() {
        let h1 = CredentialVerifier::hash_password("same-password").unwrap();
        let h2 = CredentialVerifier::hash_password("same-password").unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  User@Test.COM "), "user@test.com");
        assert_eq!(normalize_email("plain@test.com"), "plain@test.com");
    }
}
