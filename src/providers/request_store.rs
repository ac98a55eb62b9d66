//! Single-use authorization-request storage trait.

use crate::error::Result;
use crate::state::AuthRequestState;
use chrono::Duration;

/// Storage for pending OIDC authorization requests.
///
/// Requests are strictly single-use: consumption removes the record in the
/// same operation that reads it, so a replayed callback (or two concurrent
/// callbacks for the same request) cannot both succeed. Abandoned requests
/// expire via TTL; no active cleanup is needed.
pub trait AuthRequestStore: Send + Sync {
    /// Persist a pending authorization request.
    ///
    /// # Errors
    ///
    /// Returns error if the storage backend fails.
    fn store_request(
        &self,
        request: &AuthRequestState,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Atomically consume a pending request by its ID.
    ///
    /// Returns `None` for unknown, expired, or already-consumed requests;
    /// the three cases are indistinguishable to the caller by design.
    ///
    /// # Errors
    ///
    /// Returns error if the storage backend fails.
    fn consume_request(
        &self,
        request_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<AuthRequestState>>> + Send;
}
