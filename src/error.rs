//! Error types for authentication operations.

use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Error taxonomy for the authentication core.
///
/// Every failure in this crate is per-attempt and recoverable: nothing here
/// should ever be treated as fatal to the hosting process. Errors are split
/// into user-facing rejections (safe to display), per-attempt protocol
/// failures, and system errors (storage, serialization).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Credential / Challenge Errors
    // ═══════════════════════════════════════════════════════════

    /// Invalid email or password.
    ///
    /// Deliberately covers both "no such user" and "wrong password" so the
    /// caller cannot enumerate accounts.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Submitted TOTP code did not verify, or was replayed.
    #[error("Invalid two-factor code")]
    InvalidTwoFactorCode,

    // ═══════════════════════════════════════════════════════════
    // OIDC Flow Errors
    // ═══════════════════════════════════════════════════════════

    /// State or nonce mismatch, or a consumed/unknown authorization request.
    ///
    /// Fatal to the current attempt only; the caller should restart the flow.
    #[error("Validation failed: {reason}")]
    ValidationError {
        /// What failed to validate.
        reason: String,
    },

    /// Provider token validation failed (bad signature, wrong issuer or
    /// audience, expired ID token, or the provider rejected the grant).
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// OIDC is not configured, or the provider is unreachable.
    ///
    /// Non-fatal: callers should treat the OIDC login path as disabled.
    #[error("OIDC provider unavailable: {0}")]
    OidcUnavailable(String),

    // ═══════════════════════════════════════════════════════════
    // Session Token Errors
    // ═══════════════════════════════════════════════════════════

    /// Token signature verified but the token has expired.
    #[error("Token has expired")]
    TokenExpired,

    /// Token is malformed, has a bad signature, or belongs to a revoked
    /// session.
    #[error("Invalid token")]
    TokenInvalid,

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Session or request-state storage failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Serialization of a stored value failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error (not exposed to users in detail).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// Returns `true` if this error is safe to display to the end user.
    ///
    /// # Examples
    ///
    /// ```
    /// # use authgate::AuthError;
    /// assert!(AuthError::InvalidCredentials.is_user_error());
    /// assert!(!AuthError::StorageError("down".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::InvalidTwoFactorCode
                | Self::ValidationError { .. }
                | Self::TokenExpired
                | Self::TokenInvalid
        )
    }

    /// Returns `true` if this error indicates a possible attack.
    ///
    /// State/nonce mismatches and refresh-token reuse are the signals worth
    /// alerting on; plain expired tokens are not.
    #[must_use]
    pub const fn is_security_issue(&self) -> bool {
        matches!(self, Self::ValidationError { .. })
    }

    /// Build a [`AuthError::ValidationError`] from anything stringy.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::ValidationError {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors() {
        assert!(AuthError::InvalidCredentials.is_user_error());
        assert!(AuthError::InvalidTwoFactorCode.is_user_error());
        assert!(AuthError::validation("state mismatch").is_user_error());
        assert!(AuthError::TokenExpired.is_user_error());
        assert!(!AuthError::OidcUnavailable("timeout".into()).is_user_error());
        assert!(!AuthError::InternalError("oops".into()).is_user_error());
    }

    #[test]
    fn test_security_issues() {
        assert!(AuthError::validation("nonce mismatch").is_security_issue());
        assert!(!AuthError::TokenExpired.is_security_issue());
    }

    #[test]
    fn test_display_leaks_no_detail() {
        // User-displayable variants must not embed account information.
        assert_eq!(AuthError::InvalidCredentials.to_string(), "Invalid credentials");
        assert_eq!(AuthError::TokenInvalid.to_string(), "Invalid token");
    }
}
