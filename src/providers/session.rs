//! Session and revocation storage trait.

use crate::error::Result;
use crate::state::{RefreshRecord, Session, SessionId, UserId};
use chrono::Duration;

/// Session, revocation, and refresh-token storage.
///
/// This is the only state shared across concurrent authentication
/// attempts, so it lives in durable storage (Redis in production). The
/// refresh-token operations must be atomic: exactly one of two concurrent
/// [`SessionStore::consume_refresh`] calls for the same token may win.
pub trait SessionStore: Send + Sync {
    /// Persist a new session.
    ///
    /// # Errors
    ///
    /// Returns error if the storage backend fails.
    fn create_session(
        &self,
        session: &Session,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Fetch a session by ID.
    ///
    /// # Errors
    ///
    /// Returns error if the storage backend fails. A missing or expired
    /// session is `Ok(None)`.
    fn get_session(
        &self,
        session_id: SessionId,
    ) -> impl std::future::Future<Output = Result<Option<Session>>> + Send;

    /// Revoke a session and its refresh-token family.
    ///
    /// Idempotent: revoking an already-revoked or unknown session is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns error if the storage backend fails.
    fn revoke_session(
        &self,
        session_id: SessionId,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Check whether a session has been revoked.
    ///
    /// # Errors
    ///
    /// Returns error if the storage backend fails.
    fn is_revoked(
        &self,
        session_id: SessionId,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Store a refresh-token record, keyed by its hash.
    ///
    /// # Errors
    ///
    /// Returns error if the storage backend fails.
    fn store_refresh(
        &self,
        record: &RefreshRecord,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Atomically consume a refresh-token record.
    ///
    /// The record is removed in the same operation that reads it and a
    /// tombstone is left behind for reuse detection. Exactly one of two
    /// concurrent calls for the same hash gets `Some`.
    ///
    /// # Errors
    ///
    /// Returns error if the storage backend fails.
    fn consume_refresh(
        &self,
        token_hash: &str,
    ) -> impl std::future::Future<Output = Result<Option<RefreshRecord>>> + Send;

    /// Check whether a refresh token was already consumed.
    ///
    /// Returns the session family the consumed token belonged to, so the
    /// caller can revoke it. Reuse of a rotated refresh token is treated
    /// as a compromise signal.
    ///
    /// # Errors
    ///
    /// Returns error if the storage backend fails.
    fn find_consumed_refresh(
        &self,
        token_hash: &str,
    ) -> impl std::future::Future<Output = Result<Option<SessionId>>> + Send;

    /// Record acceptance of a TOTP timestep for a user.
    ///
    /// Returns `true` if the timestep was fresh, `false` if a code for this
    /// timestep was already accepted (replay). The marker expires on its
    /// own after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns error if the storage backend fails.
    fn mark_totp_step(
        &self,
        user_id: UserId,
        timestep: u64,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;
}
