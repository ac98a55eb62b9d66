//! Durable store implementations.
//!
//! Redis-backed implementations of the storage traits. Sessions,
//! revocations, refresh records, and pending authorization requests all
//! live here so that horizontal scaling and process restarts do not break
//! in-flight flows.

pub mod request_redis;
pub mod session_redis;

pub use request_redis::RedisAuthRequestStore;
pub use session_redis::RedisSessionStore;
