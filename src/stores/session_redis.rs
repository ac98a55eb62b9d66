//! Redis-based session and refresh-token store.
//!
//! # Architecture
//!
//! - `session:{id}` → bincode-serialized [`Session`], TTL = session life
//! - `session_revoked:{id}` → marker with a long TTL
//! - `refresh:{hash}` → bincode-serialized [`RefreshRecord`], TTL
//! - `refresh_used:{hash}` → owning session ID, for reuse detection
//! - `totp_step:{user}:{step}` → SET NX marker for code anti-replay
//!
//! Refresh consumption uses GETDEL (get + delete in one operation), so
//! two concurrent rotations of the same token cannot both win. The
//! reuse tombstone is written after the GETDEL; only the winner writes
//! it, so the ordering is safe.

use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use crate::state::{RefreshRecord, Session, SessionId, UserId};
use chrono::Duration;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// How long revocation and reuse markers outlive their session.
///
/// Must exceed the longest refresh TTL the application configures.
const MARKER_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;

/// Redis-backed [`SessionStore`].
pub struct RedisSessionStore {
    conn_manager: ConnectionManager,
}

impl RedisSessionStore {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns error if the connection cannot be established.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| AuthError::StorageError(format!("Failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            AuthError::StorageError(format!("Failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self { conn_manager })
    }

    fn session_key(session_id: SessionId) -> String {
        format!("session:{session_id}")
    }

    fn revoked_key(session_id: SessionId) -> String {
        format!("session_revoked:{session_id}")
    }

    fn refresh_key(token_hash: &str) -> String {
        format!("refresh:{token_hash}")
    }

    fn refresh_used_key(token_hash: &str) -> String {
        format!("refresh_used:{token_hash}")
    }

    fn totp_step_key(user_id: UserId, timestep: u64) -> String {
        format!("totp_step:{user_id}:{timestep}")
    }

    #[allow(clippy::cast_sign_loss)]
    fn ttl_seconds(ttl: Duration) -> u64 {
        ttl.num_seconds().max(1) as u64
    }
}

impl Clone for RedisSessionStore {
    fn clone(&self) -> Self {
        Self {
            conn_manager: self.conn_manager.clone(),
        }
    }
}

impl SessionStore for RedisSessionStore {
    async fn create_session(&self, session: &Session, ttl: Duration) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let bytes = bincode::serialize(session)
            .map_err(|e| AuthError::SerializationError(e.to_string()))?;

        let _: () = conn
            .set_ex(Self::session_key(session.session_id), bytes, Self::ttl_seconds(ttl))
            .await
            .map_err(|e| AuthError::StorageError(format!("Failed to store session: {e}")))?;

        tracing::debug!(session_id = %session.session_id, "Stored session in Redis");
        Ok(())
    }

    async fn get_session(&self, session_id: SessionId) -> Result<Option<Session>> {
        let mut conn = self.conn_manager.clone();
        let bytes: Option<Vec<u8>> = conn
            .get(Self::session_key(session_id))
            .await
            .map_err(|e| AuthError::StorageError(format!("Failed to fetch session: {e}")))?;

        match bytes {
            Some(bytes) => {
                let session = bincode::deserialize(&bytes)
                    .map_err(|e| AuthError::SerializationError(e.to_string()))?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn revoke_session(&self, session_id: SessionId) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let _: () = conn
            .set_ex(Self::revoked_key(session_id), 1u8, MARKER_TTL_SECONDS)
            .await
            .map_err(|e| AuthError::StorageError(format!("Failed to revoke session: {e}")))?;

        let _: () = conn
            .del(Self::session_key(session_id))
            .await
            .map_err(|e| AuthError::StorageError(format!("Failed to delete session: {e}")))?;

        Ok(())
    }

    async fn is_revoked(&self, session_id: SessionId) -> Result<bool> {
        let mut conn = self.conn_manager.clone();
        conn.exists(Self::revoked_key(session_id))
            .await
            .map_err(|e| AuthError::StorageError(format!("Failed to check revocation: {e}")))
    }

    async fn store_refresh(&self, record: &RefreshRecord, ttl: Duration) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let bytes = bincode::serialize(record)
            .map_err(|e| AuthError::SerializationError(e.to_string()))?;

        let _: () = conn
            .set_ex(Self::refresh_key(&record.token_hash), bytes, Self::ttl_seconds(ttl))
            .await
            .map_err(|e| AuthError::StorageError(format!("Failed to store refresh record: {e}")))?;

        Ok(())
    }

    async fn consume_refresh(&self, token_hash: &str) -> Result<Option<RefreshRecord>> {
        let mut conn = self.conn_manager.clone();

        // GETDEL is atomic: exactly one concurrent caller receives the
        // record.
        let bytes: Option<Vec<u8>> = conn
            .get_del(Self::refresh_key(token_hash))
            .await
            .map_err(|e| AuthError::StorageError(format!("Failed to consume refresh record: {e}")))?;

        let Some(bytes) = bytes else {
            return Ok(None);
        };

        let record: RefreshRecord = bincode::deserialize(&bytes)
            .map_err(|e| AuthError::SerializationError(e.to_string()))?;

        let _: () = conn
            .set_ex(
                Self::refresh_used_key(token_hash),
                record.session_id.to_string(),
                MARKER_TTL_SECONDS,
            )
            .await
            .map_err(|e| AuthError::StorageError(format!("Failed to record refresh use: {e}")))?;

        Ok(Some(record))
    }

    async fn find_consumed_refresh(&self, token_hash: &str) -> Result<Option<SessionId>> {
        let mut conn = self.conn_manager.clone();
        let session_id: Option<String> = conn
            .get(Self::refresh_used_key(token_hash))
            .await
            .map_err(|e| AuthError::StorageError(format!("Failed to check refresh reuse: {e}")))?;

        match session_id {
            Some(raw) => {
                let session_id = SessionId::parse(&raw)
                    .map_err(|e| AuthError::SerializationError(e.to_string()))?;
                Ok(Some(session_id))
            }
            None => Ok(None),
        }
    }

    async fn mark_totp_step(&self, user_id: UserId, timestep: u64, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn_manager.clone();

        // SET NX EX: the first acceptance of this timestep wins, later
        // ones see the marker.
        let set: Option<String> = redis::cmd("SET")
            .arg(Self::totp_step_key(user_id, timestep))
            .arg(1u8)
            .arg("NX")
            .arg("EX")
            .arg(Self::ttl_seconds(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::StorageError(format!("Failed to mark TOTP step: {e}")))?;

        Ok(set.is_some())
    }
}
