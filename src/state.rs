//! Core state types for the authentication system.
//!
//! All types are `Clone` and serializable so they can round-trip through
//! durable stores (Redis) and signed tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════
// ID Types
// ═══════════════════════════════════════════════════════════════════════

/// Unique identifier for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub uuid::Uuid);

impl UserId {
    /// Generate a new random `UserId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Parse a `UserId` from its string form.
    ///
    /// # Errors
    ///
    /// Returns error if the string is not a valid UUID.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(uuid::Uuid::parse_str(s)?))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub uuid::Uuid);

impl SessionId {
    /// Generate a new random `SessionId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Parse a `SessionId` from its string form.
    ///
    /// # Errors
    ///
    /// Returns error if the string is not a valid UUID.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(uuid::Uuid::parse_str(s)?))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Identity
// ═══════════════════════════════════════════════════════════════════════

/// A verified identity.
///
/// Produced by the credential verifier or the OIDC adapter once the user
/// has proven who they are; consumed by the token issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// User ID.
    pub user_id: UserId,

    /// Email address (normalized lowercase).
    pub email: String,

    /// Display name, when known.
    pub name: Option<String>,
}

/// A stored local credential.
///
/// Never serialized outward; the password hash stays inside the crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Owning user.
    pub user_id: UserId,

    /// Email address (normalized lowercase).
    pub email: String,

    /// Argon2 password hash in PHC string format.
    pub password_hash: String,

    /// Whether the user has a confirmed TOTP enrollment.
    pub totp_enabled: bool,
}

/// A stored TOTP secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotpSecret {
    /// Owning user.
    pub user_id: UserId,

    /// Base32-encoded shared secret.
    pub secret_base32: String,

    /// `false` until the user confirms enrollment with a first valid code.
    pub enabled: bool,
}

// ═══════════════════════════════════════════════════════════════════════
// Sessions and Tokens
// ═══════════════════════════════════════════════════════════════════════

/// User session.
///
/// Created at successful authentication, destroyed on logout or
/// token-family revocation. Stored durably so revocation survives process
/// restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub session_id: SessionId,

    /// User this session belongs to.
    pub user_id: UserId,

    /// User's email (cached for token claims).
    pub email: String,

    /// Session creation timestamp.
    pub issued_at: DateTime<Utc>,

    /// Session expiration timestamp.
    pub expires_at: DateTime<Utc>,

    /// Revoked sessions must be rejected even before `expires_at`.
    pub revoked: bool,
}

/// Access/refresh token pair minted by the session issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived signed access token (JWT).
    pub access_token: String,

    /// Opaque refresh token; rotated on every use.
    pub refresh_token: String,

    /// Access token expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

/// Tokens returned by the OIDC provider's token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSet {
    /// Provider access token.
    pub access_token: String,

    /// Provider ID token (JWT), when issued.
    pub id_token: Option<String>,

    /// Provider refresh token. Preserved across refreshes when the provider
    /// does not rotate it.
    pub refresh_token: Option<String>,

    /// Access token expiration, when the provider reported one.
    pub expires_at: Option<DateTime<Utc>>,

    /// Granted scope, when the provider reported one.
    pub scope: Option<String>,
}

/// Server-side record backing a refresh token.
///
/// Only a SHA-256 hash of the opaque token is persisted; presentation of
/// the raw token is matched against the hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRecord {
    /// Base64url-encoded SHA-256 digest of the opaque refresh token.
    pub token_hash: String,

    /// Session family this token belongs to.
    pub session_id: SessionId,

    /// Owning user.
    pub user_id: UserId,

    /// When this token was minted.
    pub issued_at: DateTime<Utc>,

    /// When this token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════
// OIDC Authorization Request State
// ═══════════════════════════════════════════════════════════════════════

/// Ephemeral state for one OIDC authorization-code flow.
///
/// Created when a login begins, consumed exactly once on callback. Expired
/// or already-consumed requests fail closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequestState {
    /// Opaque handle the caller echoes back on callback.
    pub request_id: String,

    /// CSRF `state` parameter sent to the provider.
    pub state: String,

    /// Nonce bound into the ID token.
    pub nonce: String,

    /// PKCE code verifier (its S256 challenge went to the provider).
    pub code_verifier: String,

    /// When the flow was initiated.
    pub created_at: DateTime<Utc>,

    /// When this request stops being consumable.
    pub expires_at: DateTime<Utc>,
}

impl AuthRequestState {
    /// Returns `true` if the request has passed its TTL.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::Duration;

    #[test]
    fn test_user_id_generation() {
        let id1 = UserId::new();
        let id2 = UserId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_session_id_roundtrip() {
        let id = SessionId::new();
        let parsed = SessionId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_request_state_expiry() {
        let now = Utc::now();
        let request = AuthRequestState {
            request_id: "req".into(),
            state: "state".into(),
            nonce: "nonce".into(),
            code_verifier: "verifier".into(),
            created_at: now,
            expires_at: now + Duration::minutes(5),
        };

        assert!(!request.is_expired(now));
        assert!(!request.is_expired(now + Duration::minutes(5)));
        assert!(request.is_expired(now + Duration::minutes(6)));
    }
}
