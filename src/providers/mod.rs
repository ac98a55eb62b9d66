//! Provider traits.
//!
//! This module defines traits for every external dependency of the
//! authentication core. The orchestrator and token issuer depend only on
//! these traits; the application wires in concrete implementations
//! (Redis stores, a reqwest transport, the JWT signer) and tests wire in
//! the in-memory fakes from [`crate::mocks`].
//!
//! This is what makes the core testable without monkey-patching: the HTTP
//! transport, the token signer, and the TOTP clock are all seams.

use serde::{Deserialize, Serialize};

pub mod clock;
pub mod http;
pub mod request_store;
pub mod session;
pub mod signer;
pub mod user;

pub use clock::{Clock, SystemClock};
pub use http::{HttpResponse, HttpTransport, ReqwestTransport};
pub use request_store::AuthRequestStore;
pub use session::SessionStore;
pub use signer::{AccessClaims, JwtSigner, TokenSigner};
pub use user::UserRepository;

/// Normalized profile returned by the OIDC provider's userinfo endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcUserInfo {
    /// Provider-scoped subject identifier.
    pub subject: String,

    /// Email address.
    pub email: String,

    /// Whether the provider has verified the email.
    pub email_verified: bool,

    /// Display name, when the provider supplies one.
    pub name: Option<String>,
}
