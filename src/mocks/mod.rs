//! Mock provider implementations for testing.
//!
//! In-memory implementations of every provider trait. No network, no
//! Redis, no monkey-patching: tests wire these into the
//! [`Authenticator`](crate::orchestrator::Authenticator) exactly the way
//! production wires the real implementations.
#![allow(clippy::unwrap_used)]

pub mod clock;
pub mod http;
pub mod request_store;
pub mod session;
pub mod signer;
pub mod user;

pub use clock::MockClock;
pub use http::MockHttpTransport;
pub use request_store::MockAuthRequestStore;
pub use session::MockSessionStore;
pub use signer::MockTokenSigner;
pub use user::MockUserRepository;
