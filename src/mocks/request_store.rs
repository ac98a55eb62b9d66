//! Mock authorization-request storage.

use crate::error::Result;
use crate::providers::AuthRequestStore;
use crate::state::AuthRequestState;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory single-use request store.
#[derive(Debug, Default)]
pub struct MockAuthRequestStore {
    requests: Mutex<HashMap<String, AuthRequestState>>,
}

impl MockAuthRequestStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending requests, for assertions.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl AuthRequestStore for MockAuthRequestStore {
    async fn store_request(&self, request: &AuthRequestState, _ttl: Duration) -> Result<()> {
        self.requests
            .lock()
            .unwrap()
            .insert(request.request_id.clone(), request.clone());
        Ok(())
    }

    async fn consume_request(&self, request_id: &str) -> Result<Option<AuthRequestState>> {
        let mut requests = self.requests.lock().unwrap();

        // Remove-then-check: an expired request is gone either way, and
        // removal under the mutex is what makes consumption single-use.
        let Some(request) = requests.remove(request_id) else {
            return Ok(None);
        };

        if request.is_expired(Utc::now()) {
            return Ok(None);
        }

        Ok(Some(request))
    }
}
