//! # Authgate
//!
//! Authentication core for a web application: local credential login with
//! optional TOTP two-factor, federated login over OIDC authorization-code
//! flow with PKCE, and the application's own session tokens (signed access
//! token + rotated refresh token).
//!
//! ## Architecture
//!
//! Every external dependency (identity storage, session storage, the HTTP
//! transport to the OIDC provider, the token signer, the clock) is a
//! trait in [`providers`]. The [`Authenticator`] orchestrates them:
//!
//! ```text
//! login ─► CredentialVerifier ─► TotpHandler? ─► TokenIssuer ─► session
//! begin_oidc_login ─► OidcAdapter (redirect out)
//! complete_oidc_login ─► OidcAdapter (state/nonce/PKCE) ─► TokenIssuer
//! ```
//!
//! ## Example: local login
//!
//! ```rust,ignore
//! use authgate::*;
//!
//! let outcome = authenticator.login("user@test.com", "password", None).await?;
//! match outcome {
//!     LoginOutcome::Authenticated(auth) => { /* set session cookies */ }
//!     LoginOutcome::TwoFactorRequired => { /* prompt for a code */ }
//! }
//! ```
//!
//! Failures are per-attempt and structured (see [`AuthError`]); nothing in
//! this crate is fatal to the hosting process.

// Public modules
pub mod config;
pub mod credentials;
pub mod error;
pub mod oidc;
pub mod orchestrator;
pub mod providers;
pub mod state;
pub mod stores;
pub mod tokens;
pub mod totp;
pub mod utils;

#[cfg(feature = "test-utils")]
pub mod mocks;

// Re-export main types for convenience
pub use config::{AuthConfig, OidcConfig, TokenConfig, TotpConfig};
pub use error::{AuthError, Result};
pub use oidc::OidcAdapter;
pub use orchestrator::{AuthenticatedSession, Authenticator, BeginOidcLogin, LoginOutcome};
pub use state::{Identity, Session, SessionId, TokenPair, TokenSet, UserId};
pub use tokens::TokenIssuer;
pub use totp::{TotpEnrollment, TotpHandler};
