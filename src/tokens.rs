//! Session and token issuance.
//!
//! Mints the application's own tokens once an identity is established:
//! a short-lived signed access token and an opaque, rotated refresh token.
//! Access-token verification is signature + claims plus a revocation check
//! against the session store, so a revoked session's tokens die before
//! their expiry. Refresh tokens are single-use; presenting a rotated-out
//! token revokes the entire session family.

use crate::config::TokenConfig;
use crate::error::{AuthError, Result};
use crate::providers::{AccessClaims, Clock, SessionStore, TokenSigner};
use crate::state::{Identity, RefreshRecord, Session, SessionId, TokenPair, UserId};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Compute the storage key for a refresh token.
///
/// Only this digest is persisted; a leaked store never yields usable
/// refresh tokens.
#[must_use]
pub fn hash_refresh_token(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}

/// Session/token issuer.
pub struct TokenIssuer<S, G, C>
where
    S: SessionStore,
    G: TokenSigner,
    C: Clock,
{
    config: TokenConfig,
    sessions: Arc<S>,
    signer: G,
    clock: Arc<C>,
}

impl<S, G, C> TokenIssuer<S, G, C>
where
    S: SessionStore,
    G: TokenSigner,
    C: Clock,
{
    /// Create an issuer.
    #[must_use]
    pub fn new(config: TokenConfig, sessions: Arc<S>, signer: G, clock: Arc<C>) -> Self {
        Self {
            config,
            sessions,
            signer,
            clock,
        }
    }

    /// Create a session for a verified identity and mint its first token
    /// pair.
    ///
    /// # Errors
    ///
    /// Returns error if signing or session storage fails.
    pub async fn issue(&self, identity: &Identity) -> Result<(Session, TokenPair)> {
        let now = self.clock.now();
        let session = Session {
            session_id: SessionId::new(),
            user_id: identity.user_id,
            email: identity.email.clone(),
            issued_at: now,
            expires_at: now + self.config.refresh_ttl,
            revoked: false,
        };

        self.sessions
            .create_session(&session, self.config.refresh_ttl)
            .await?;

        let pair = self.mint_pair(&session).await?;

        tracing::info!(
            session_id = %session.session_id,
            user_id = %session.user_id,
            "Session created"
        );

        Ok((session, pair))
    }

    /// Verify an access token and return the identity it carries.
    ///
    /// # Errors
    ///
    /// - [`AuthError::TokenExpired`] when the signature is valid but the
    ///   token is past its expiry
    /// - [`AuthError::TokenInvalid`] for bad signatures, malformed claims,
    ///   or a revoked session
    pub async fn verify(&self, access_token: &str) -> Result<Identity> {
        let claims = self.signer.verify(access_token)?;

        let session_id = SessionId::parse(&claims.sid).map_err(|_| AuthError::TokenInvalid)?;
        let user_id = UserId::parse(&claims.sub).map_err(|_| AuthError::TokenInvalid)?;

        if self.sessions.is_revoked(session_id).await? {
            tracing::debug!(session_id = %session_id, "Rejected token for revoked session");
            return Err(AuthError::TokenInvalid);
        }

        Ok(Identity {
            user_id,
            email: claims.email,
            name: None,
        })
    }

    /// Rotate a refresh token: consume it atomically and mint a new pair
    /// for the same session family.
    ///
    /// Reuse of an already-consumed token is treated as compromise: the
    /// whole family is revoked and the call fails.
    ///
    /// # Errors
    ///
    /// - [`AuthError::TokenExpired`] for a known-but-expired token
    /// - [`AuthError::TokenInvalid`] for unknown, reused, or revoked tokens
    pub async fn refresh(&self, refresh_token: &str) -> Result<(Session, TokenPair)> {
        let token_hash = hash_refresh_token(refresh_token);

        let Some(record) = self.sessions.consume_refresh(&token_hash).await? else {
            if let Some(family) = self.sessions.find_consumed_refresh(&token_hash).await? {
                tracing::warn!(
                    session_id = %family,
                    "Refresh token reuse detected, revoking session family"
                );
                self.sessions.revoke_session(family).await?;
            }
            return Err(AuthError::TokenInvalid);
        };

        let now = self.clock.now();
        if now > record.expires_at {
            return Err(AuthError::TokenExpired);
        }

        if self.sessions.is_revoked(record.session_id).await? {
            return Err(AuthError::TokenInvalid);
        }

        let session = self
            .sessions
            .get_session(record.session_id)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        let pair = self.mint_pair(&session).await?;

        tracing::info!(session_id = %session.session_id, "Refresh token rotated");

        Ok((session, pair))
    }

    /// Revoke a session. Its access tokens and refresh tokens all stop
    /// verifying immediately.
    ///
    /// # Errors
    ///
    /// Returns error if the session store fails.
    pub async fn revoke(&self, session_id: SessionId) -> Result<()> {
        self.sessions.revoke_session(session_id).await?;
        tracing::info!(session_id = %session_id, "Session revoked");
        Ok(())
    }

    /// Mint an access/refresh pair bound to a session.
    ///
    /// The refresh record's lifetime is capped at the session family's
    /// fixed expiry; rotation does not extend the session.
    async fn mint_pair(&self, session: &Session) -> Result<TokenPair> {
        let now = self.clock.now();
        let access_expires_at = now + self.config.access_ttl;

        let claims = AccessClaims {
            sub: session.user_id.to_string(),
            sid: session.session_id.to_string(),
            email: session.email.clone(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: now.timestamp(),
            exp: access_expires_at.timestamp(),
        };
        let access_token = self.signer.sign(&claims)?;

        let mut token_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut token_bytes);
        let refresh_token = URL_SAFE_NO_PAD.encode(token_bytes);

        let refresh_ttl = session.expires_at - now;
        let record = RefreshRecord {
            token_hash: hash_refresh_token(&refresh_token),
            session_id: session.session_id,
            user_id: session.user_id,
            issued_at: now,
            expires_at: session.expires_at,
        };
        self.sessions.store_refresh(&record, refresh_ttl).await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_at: access_expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_hash_stable_and_opaque() {
        let token = "some-refresh-token";
        assert_eq!(hash_refresh_token(token), hash_refresh_token(token));
        assert_ne!(hash_refresh_token(token), token);
        assert_ne!(hash_refresh_token(token), hash_refresh_token("other"));
    }
}
