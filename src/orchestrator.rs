//! Authentication orchestrator.
//!
//! Sequences the credential verifier, TOTP handler, OIDC adapter, and
//! token issuer into the two login paths:
//!
//! ```text
//! local:  credentials → (2FA pending | authenticated) → session
//! oidc:   begin (redirect out) → callback (state/nonce/code) → session
//! ```
//!
//! Each attempt is an independent request-scoped operation; the only state
//! shared between attempts lives in the injected stores. The orchestrator
//! is constructed explicitly with its collaborators (no globals), so
//! isolated instances can coexist (tests, multi-tenant).

use crate::config::AuthConfig;
use crate::credentials::{normalize_email, CredentialVerifier};
use crate::error::{AuthError, Result};
use crate::oidc::OidcAdapter;
use crate::providers::{
    AuthRequestStore, Clock, HttpTransport, SessionStore, TokenSigner, UserRepository,
};
use crate::state::{Identity, Session, SessionId, TokenPair, TotpSecret, UserId};
use crate::tokens::TokenIssuer;
use crate::totp::{TotpEnrollment, TotpHandler};
use crate::utils::is_valid_email;
use chrono::Duration;
use std::sync::Arc;

/// A successfully authenticated session with its token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSession {
    /// The persisted session.
    pub session: Session,

    /// Access/refresh tokens for the caller to hand to the client.
    pub tokens: TokenPair,
}

/// Outcome of a local login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Identity fully established; session created.
    Authenticated(AuthenticatedSession),

    /// Credentials were correct but the account requires a TOTP code.
    /// No session has been created; the caller should re-submit with a
    /// code.
    TwoFactorRequired,
}

/// A begun OIDC login: where to redirect the user, and the handle to echo
/// back on callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeginOidcLogin {
    /// Provider authorization URL.
    pub redirect_url: String,

    /// Handle identifying the pending authorization request.
    pub request_id: String,
}

/// The authentication orchestrator.
///
/// Generic over every external dependency; see [`crate::providers`] for
/// the seams and [`crate::mocks`] for their test doubles.
pub struct Authenticator<U, S, R, H, G, C>
where
    U: UserRepository,
    S: SessionStore,
    R: AuthRequestStore,
    H: HttpTransport,
    G: TokenSigner,
    C: Clock,
{
    config: AuthConfig,
    users: U,
    sessions: Arc<S>,
    requests: R,
    oidc: OidcAdapter<H>,
    verifier: CredentialVerifier,
    totp: TotpHandler<C>,
    issuer: TokenIssuer<S, G, C>,
    clock: Arc<C>,
}

impl<U, S, R, H, G, C> Authenticator<U, S, R, H, G, C>
where
    U: UserRepository,
    S: SessionStore,
    R: AuthRequestStore,
    H: HttpTransport,
    G: TokenSigner,
    C: Clock,
{
    /// Wire up an authenticator from its configuration and collaborators.
    ///
    /// The OIDC adapter is built here from `config.oidc`: a `None`
    /// configuration (or a failed discovery) leaves the federated login
    /// path disabled, never broken.
    ///
    /// # Errors
    ///
    /// Returns error if the credential verifier cannot be constructed.
    pub async fn initialize(
        config: AuthConfig,
        users: U,
        sessions: Arc<S>,
        requests: R,
        transport: H,
        signer: G,
        clock: Arc<C>,
    ) -> Result<Self> {
        let oidc = OidcAdapter::initialize(config.oidc.clone(), transport).await;
        let issuer = TokenIssuer::new(
            config.tokens.clone(),
            Arc::clone(&sessions),
            signer,
            Arc::clone(&clock),
        );
        let totp = TotpHandler::new(&config.totp, Arc::clone(&clock));

        Ok(Self {
            config,
            users,
            sessions,
            requests,
            oidc,
            verifier: CredentialVerifier::new()?,
            totp,
            issuer,
            clock,
        })
    }

    // ═══════════════════════════════════════════════════════════
    // Local path
    // ═══════════════════════════════════════════════════════════

    /// Attempt a local login.
    ///
    /// Credentials gate 2FA, 2FA gates issuance; the steps are strictly
    /// sequential.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidCredentials`]: unknown user or wrong
    ///   password, indistinguishable by design
    /// - [`AuthError::InvalidTwoFactorCode`]: wrong, drifted, or replayed
    ///   TOTP code
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        totp_code: Option<&str>,
    ) -> Result<LoginOutcome> {
        let email = normalize_email(email);

        // Malformed emails take the same verification path as unknown
        // users so the rejection timing stays uniform.
        let credential = if is_valid_email(&email) {
            self.users.find_credential_by_email(&email).await?
        } else {
            None
        };

        let identity = self.verifier.verify(credential.as_ref(), password)?;
        let totp_enabled = credential.as_ref().is_some_and(|c| c.totp_enabled);

        if totp_enabled {
            let Some(code) = totp_code else {
                tracing::info!(user_id = %identity.user_id, "Two-factor code required");
                return Ok(LoginOutcome::TwoFactorRequired);
            };
            self.check_totp(identity.user_id, code).await?;
        }

        let (session, tokens) = self.issuer.issue(&identity).await?;
        Ok(LoginOutcome::Authenticated(AuthenticatedSession {
            session,
            tokens,
        }))
    }

    /// Validate a TOTP code for a user, including step anti-replay.
    async fn check_totp(&self, user_id: UserId, code: &str) -> Result<()> {
        let secret = self
            .users
            .find_totp_secret(user_id)
            .await?
            .filter(|s| s.enabled)
            .ok_or_else(|| {
                AuthError::InternalError("Account requires 2FA but has no enrolled secret".into())
            })?;

        let Some(step) = self.totp.matched_timestep(&secret.secret_base32, code) else {
            tracing::info!(user_id = %user_id, "Two-factor code rejected");
            return Err(AuthError::InvalidTwoFactorCode);
        };

        // A marker outliving the acceptance window is enough; after that
        // the code can no longer verify anyway.
        let window = i64::from(self.config.totp.window_steps);
        let marker_ttl = Duration::seconds((2 * window + 2) * 30);

        if !self.sessions.mark_totp_step(user_id, step, marker_ttl).await? {
            tracing::warn!(user_id = %user_id, "Two-factor code replay detected");
            return Err(AuthError::InvalidTwoFactorCode);
        }

        Ok(())
    }

    // ═══════════════════════════════════════════════════════════
    // OIDC path
    // ═══════════════════════════════════════════════════════════

    /// Whether the federated login path is available at all.
    #[must_use]
    pub const fn oidc_available(&self) -> bool {
        self.oidc.is_available()
    }

    /// Access the OIDC adapter (for logout-URL construction).
    #[must_use]
    pub const fn oidc(&self) -> &OidcAdapter<H> {
        &self.oidc
    }

    /// Begin a federated login: persist the authorization request and
    /// return the provider redirect.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::OidcUnavailable`] when OIDC is not configured
    /// or discovery failed; the caller should hide the option, not crash.
    pub async fn begin_oidc_login(&self) -> Result<BeginOidcLogin> {
        let authorization = self
            .oidc
            .begin_authorization(self.clock.now(), self.config.request_ttl)?;

        self.requests
            .store_request(&authorization.request, self.config.request_ttl)
            .await?;

        tracing::info!(
            request_id = %authorization.request.request_id,
            "OIDC authorization request stored"
        );

        Ok(BeginOidcLogin {
            redirect_url: authorization.redirect_url,
            request_id: authorization.request.request_id,
        })
    }

    /// Complete a federated login from the provider callback.
    ///
    /// The pending request is consumed exactly once: a replayed callback
    /// with the same `request_id` fails even if the first one succeeded.
    ///
    /// # Errors
    ///
    /// - [`AuthError::ValidationError`]: unknown/expired/consumed
    ///   request, state mismatch, or nonce mismatch
    /// - [`AuthError::AuthenticationError`]: provider rejected the code
    ///   or the ID token failed validation
    pub async fn complete_oidc_login(
        &self,
        code: &str,
        request_id: &str,
        received_state: &str,
    ) -> Result<AuthenticatedSession> {
        let request = self
            .requests
            .consume_request(request_id)
            .await?
            .ok_or_else(|| {
                AuthError::validation("unknown, expired, or already-used authorization request")
            })?;

        if request.is_expired(self.clock.now()) {
            return Err(AuthError::validation("authorization request expired"));
        }

        let (token_set, id_subject) = self
            .oidc
            .exchange_code(code, &request, received_state, self.clock.now())
            .await?;

        let info = self.oidc.fetch_user_info(&token_set.access_token).await?;
        if info.subject != id_subject {
            return Err(AuthError::AuthenticationError(
                "Userinfo subject does not match ID token".into(),
            ));
        }

        let identity = match self.users.find_by_oidc_subject(&info.subject).await? {
            Some(identity) => identity,
            None => self.users.link_oidc_identity(&info).await?,
        };

        tracing::info!(user_id = %identity.user_id, "OIDC login complete");

        let (session, tokens) = self.issuer.issue(&identity).await?;
        Ok(AuthenticatedSession { session, tokens })
    }

    // ═══════════════════════════════════════════════════════════
    // Sessions
    // ═══════════════════════════════════════════════════════════

    /// Verify an access token (request-authorization path).
    ///
    /// # Errors
    ///
    /// See [`TokenIssuer::verify`].
    pub async fn verify_access(&self, access_token: &str) -> Result<Identity> {
        self.issuer.verify(access_token).await
    }

    /// Rotate a refresh token into a fresh token pair.
    ///
    /// # Errors
    ///
    /// See [`TokenIssuer::refresh`].
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthenticatedSession> {
        let (session, tokens) = self.issuer.refresh(refresh_token).await?;
        Ok(AuthenticatedSession { session, tokens })
    }

    /// Log out: revoke the session and its token family.
    ///
    /// # Errors
    ///
    /// Returns error if the session store fails.
    pub async fn logout(&self, session_id: SessionId) -> Result<()> {
        self.issuer.revoke(session_id).await
    }

    // ═══════════════════════════════════════════════════════════
    // Two-factor enrollment
    // ═══════════════════════════════════════════════════════════

    /// Begin TOTP enrollment for a user.
    ///
    /// Stores a pending (unconfirmed) secret and returns the provisioning
    /// material. 2FA is not required at login until the enrollment is
    /// confirmed.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ValidationError`] for an unknown user.
    pub async fn setup_two_factor(&self, user_id: UserId) -> Result<TotpEnrollment> {
        let identity = self
            .users
            .find_identity(user_id)
            .await?
            .ok_or_else(|| AuthError::validation("unknown user"))?;

        let enrollment = self.totp.generate_secret(&identity.email)?;

        self.users
            .store_totp_secret(&TotpSecret {
                user_id,
                secret_base32: enrollment.secret_base32.clone(),
                enabled: false,
            })
            .await?;

        tracing::info!(user_id = %user_id, "TOTP enrollment started");

        Ok(enrollment)
    }

    /// Confirm TOTP enrollment with a first valid code.
    ///
    /// # Errors
    ///
    /// - [`AuthError::ValidationError`]: no pending enrollment
    /// - [`AuthError::InvalidTwoFactorCode`]: the code did not verify
    pub async fn verify_two_factor_setup(&self, user_id: UserId, code: &str) -> Result<()> {
        let secret = self
            .users
            .find_totp_secret(user_id)
            .await?
            .ok_or_else(|| AuthError::validation("no pending two-factor enrollment"))?;

        if !self.totp.verify_code(&secret.secret_base32, code) {
            return Err(AuthError::InvalidTwoFactorCode);
        }

        self.users.enable_totp(user_id).await?;
        tracing::info!(user_id = %user_id, "TOTP enrollment confirmed");
        Ok(())
    }
}
