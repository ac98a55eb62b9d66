//! Redis-based pending authorization request store.
//!
//! Requests are keyed by their opaque request ID, expire with the
//! configured TTL, and are consumed with GETDEL so a returning
//! callback can only be honored once.

use crate::error::{AuthError, Result};
use crate::providers::AuthRequestStore;
use crate::state::AuthRequestState;
use chrono::Duration;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Redis-backed [`AuthRequestStore`].
pub struct RedisAuthRequestStore {
    conn_manager: ConnectionManager,
}

impl RedisAuthRequestStore {
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

    fn request_key(request_id: &str) -> String {
        format!("auth_request:{request_id}")
    }
}

impl Clone for RedisAuthRequestStore {
    fn clone(&self) -> Self {
        Self {
            conn_manager: self.conn_manager.clone(),
        }
    }
}

impl AuthRequestStore for RedisAuthRequestStore {
    async fn store_request(&self, request: &AuthRequestState, ttl: Duration) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let bytes = bincode::serialize(request)
            .map_err(|e| AuthError::SerializationError(e.to_string()))?;

        #[allow(clippy::cast_sign_loss)]
        let ttl_seconds = ttl.num_seconds().max(1) as u64;

        let _: () = conn
            .set_ex(Self::request_key(&request.request_id), bytes, ttl_seconds)
            .await
            .map_err(|e| AuthError::StorageError(format!("Failed to store auth request: {e}")))?;

        tracing::debug!(request_id = %request.request_id, "Stored pending authorization request");
        Ok(())
    }

    async fn consume_request(&self, request_id: &str) -> Result<Option<AuthRequestState>> {
        let mut conn = self.conn_manager.clone();

        // Single use: GETDEL removes the request as it is read.
        let bytes: Option<Vec<u8>> = conn
            .get_del(Self::request_key(request_id))
            .await
            .map_err(|e| AuthError::StorageError(format!("Failed to consume auth request: {e}")))?;

        match bytes {
            Some(bytes) => {
                let request = bincode::deserialize(&bytes)
                    .map_err(|e| AuthError::SerializationError(e.to_string()))?;
                Ok(Some(request))
            }
            None => Ok(None),
        }
    }
}
