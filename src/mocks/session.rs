//! Mock session and refresh-token storage.

use crate::error::Result;
use crate::providers::SessionStore;
use crate::state::{RefreshRecord, Session, SessionId, UserId};
use chrono::Duration;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<SessionId, Session>,
    revoked: HashSet<SessionId>,
    refresh: HashMap<String, RefreshRecord>,
    consumed_refresh: HashMap<String, SessionId>,
    totp_steps: HashSet<(UserId, u64)>,
}

/// In-memory session store.
///
/// All mutation happens under one mutex, which gives the same atomic
/// consume semantics the Redis implementation gets from GETDEL: exactly
/// one of two concurrent [`SessionStore::consume_refresh`] calls wins.
#[derive(Debug, Default)]
pub struct MockSessionStore {
    inner: Mutex<Inner>,
}

impl MockSessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions, for assertions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }
}

impl SessionStore for MockSessionStore {
    async fn create_session(&self, session: &Session, _ttl: Duration) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .insert(session.session_id, session.clone());
        Ok(())
    }

    async fn get_session(&self, session_id: SessionId) -> Result<Option<Session>> {
        Ok(self.inner.lock().unwrap().sessions.get(&session_id).cloned())
    }

    async fn revoke_session(&self, session_id: SessionId) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.revoked.insert(session_id);
        if let Some(session) = inner.sessions.get_mut(&session_id) {
            session.revoked = true;
        }
        inner.refresh.retain(|_, record| record.session_id != session_id);
        Ok(())
    }

    async fn is_revoked(&self, session_id: SessionId) -> Result<bool> {
        Ok(self.inner.lock().unwrap().revoked.contains(&session_id))
    }

    async fn store_refresh(&self, record: &RefreshRecord, _ttl: Duration) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .refresh
            .insert(record.token_hash.clone(), record.clone());
        Ok(())
    }

    async fn consume_refresh(&self, token_hash: &str) -> Result<Option<RefreshRecord>> {
        let mut inner = self.inner.lock().unwrap();

        // Check-and-remove under the mutex: single-use guarantee.
        let Some(record) = inner.refresh.remove(token_hash) else {
            return Ok(None);
        };

        inner
            .consumed_refresh
            .insert(token_hash.to_string(), record.session_id);

        Ok(Some(record))
    }

    async fn find_consumed_refresh(&self, token_hash: &str) -> Result<Option<SessionId>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .consumed_refresh
            .get(token_hash)
            .copied())
    }

    async fn mark_totp_step(&self, user_id: UserId, timestep: u64, _ttl: Duration) -> Result<bool> {
        Ok(self.inner.lock().unwrap().totp_steps.insert((user_id, timestep)))
    }
}
