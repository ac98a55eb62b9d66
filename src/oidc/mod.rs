//! OIDC client adapter.
//!
//! Implements one authorization-code flow with PKCE against a single
//! configured provider: discovery, authorization URL construction, code
//! exchange with ID-token validation, userinfo, token refresh, and
//! end-session URL construction.
//!
//! Discovery (provider metadata + JWKS) happens once at construction and
//! is cached; it is never repeated per request. A missing configuration or
//! a failed discovery leaves the adapter *unavailable*, which disables the
//! federated login path without being an error.
//!
//! All network traffic goes through the injected
//! [`HttpTransport`](crate::providers::HttpTransport).

pub mod pkce;

use crate::config::OidcConfig;
use crate::error::{AuthError, Result};
use crate::providers::{HttpTransport, OidcUserInfo};
use crate::state::{AuthRequestState, TokenSet};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

/// Provider metadata from `/.well-known/openid-configuration`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderMetadata {
    /// Issuer identifier; must match the configured issuer URL.
    pub issuer: String,

    /// Authorization endpoint.
    pub authorization_endpoint: String,

    /// Token endpoint.
    pub token_endpoint: String,

    /// Userinfo endpoint.
    pub userinfo_endpoint: String,

    /// JWKS document location.
    pub jwks_uri: String,

    /// End-session (logout) endpoint, when the provider has one.
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
}

/// Claims validated out of a provider ID token.
#[derive(Debug, Clone, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    nonce: Option<String>,
}

/// Cached result of a successful discovery.
struct Discovered {
    config: OidcConfig,
    metadata: ProviderMetadata,
    jwks: JwkSet,
}

/// A begun authorization request: where to send the user, and the state
/// to persist until the callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Provider authorization URL to redirect the user to.
    pub redirect_url: String,

    /// Ephemeral request state; persist with a short TTL, consume once.
    pub request: AuthRequestState,
}

/// OIDC client adapter.
///
/// Constructed once at startup via [`OidcAdapter::initialize`]; generic
/// over the HTTP transport so tests run against canned responses.
pub struct OidcAdapter<H: HttpTransport> {
    transport: H,
    inner: Option<Discovered>,
    unavailable_reason: String,
}

impl<H: HttpTransport> OidcAdapter<H> {
    /// Discover the provider and build the adapter.
    ///
    /// Never fails: a missing configuration or an unreachable provider
    /// produces an unavailable adapter, and every operation on it returns
    /// [`AuthError::OidcUnavailable`]. The orchestrator treats that as
    /// "OIDC login path disabled".
    pub async fn initialize(config: Option<OidcConfig>, transport: H) -> Self {
        let Some(config) = config else {
            return Self {
                transport,
                inner: None,
                unavailable_reason: "OIDC is not configured".to_string(),
            };
        };

        match Self::discover(&config, &transport).await {
            Ok((metadata, jwks)) => {
                tracing::info!(issuer = %metadata.issuer, "OIDC discovery complete");
                Self {
                    transport,
                    inner: Some(Discovered {
                        config,
                        metadata,
                        jwks,
                    }),
                    unavailable_reason: String::new(),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "OIDC discovery failed, disabling federated login");
                Self {
                    transport,
                    inner: None,
                    unavailable_reason: e.to_string(),
                }
            }
        }
    }

    async fn discover(
        config: &OidcConfig,
        transport: &H,
    ) -> Result<(ProviderMetadata, JwkSet)> {
        let discovery_url = format!(
            "{}/.well-known/openid-configuration",
            config.issuer_url.trim_end_matches('/')
        );

        let response = transport.get_json(&discovery_url, None).await?;
        if !response.is_success() {
            return Err(AuthError::OidcUnavailable(format!(
                "Discovery returned HTTP {}",
                response.status
            )));
        }

        let metadata: ProviderMetadata = serde_json::from_value(response.body)
            .map_err(|e| AuthError::OidcUnavailable(format!("Malformed discovery document: {e}")))?;

        if metadata.issuer.trim_end_matches('/') != config.issuer_url.trim_end_matches('/') {
            return Err(AuthError::OidcUnavailable(format!(
                "Discovery issuer {} does not match configured issuer",
                metadata.issuer
            )));
        }

        let response = transport.get_json(&metadata.jwks_uri, None).await?;
        if !response.is_success() {
            return Err(AuthError::OidcUnavailable(format!(
                "JWKS fetch returned HTTP {}",
                response.status
            )));
        }

        let jwks: JwkSet = serde_json::from_value(response.body)
            .map_err(|e| AuthError::OidcUnavailable(format!("Malformed JWKS document: {e}")))?;

        Ok((metadata, jwks))
    }

    /// Whether the provider is configured and discovery succeeded.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.inner.is_some()
    }

    fn discovered(&self) -> Result<&Discovered> {
        self.inner
            .as_ref()
            .ok_or_else(|| AuthError::OidcUnavailable(self.unavailable_reason.clone()))
    }

    /// Build an authorization URL and the request state to persist.
    ///
    /// Fresh `state`, `nonce`, and PKCE verifier per call; the S256
    /// challenge goes into the URL, the verifier stays server-side in the
    /// returned [`AuthRequestState`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::OidcUnavailable`] if the adapter is not
    /// available.
    pub fn begin_authorization(
        &self,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<AuthorizationRequest> {
        let discovered = self.discovered()?;

        let state = pkce::generate_state();
        let nonce = pkce::generate_nonce();
        let code_verifier = pkce::generate_code_verifier();
        let challenge = pkce::code_challenge(&code_verifier);
        let scope = discovered.config.scopes.join(" ");

        let params = [
            ("client_id", discovered.config.client_id.as_str()),
            ("redirect_uri", discovered.config.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("state", state.as_str()),
            ("nonce", nonce.as_str()),
            ("code_challenge", challenge.as_str()),
            ("code_challenge_method", "S256"),
        ];

        let query = serde_urlencoded::to_string(params)
            .map_err(|e| AuthError::InternalError(format!("Failed to build URL: {e}")))?;

        let request = AuthRequestState {
            request_id: uuid::Uuid::new_v4().to_string(),
            state,
            nonce,
            code_verifier,
            created_at: now,
            expires_at: now + ttl,
        };

        Ok(AuthorizationRequest {
            redirect_url: format!("{}?{query}", discovered.metadata.authorization_endpoint),
            request,
        })
    }

    /// Exchange an authorization code for tokens.
    ///
    /// The received `state` is compared against the persisted request
    /// first; only then is the code sent to the token endpoint along with
    /// the PKCE verifier. The returned ID token's signature, issuer,
    /// audience, expiry, and nonce are all validated before the token set
    /// is handed back.
    ///
    /// # Errors
    ///
    /// - [`AuthError::ValidationError`] on state or nonce mismatch
    /// - [`AuthError::AuthenticationError`] if the provider rejects the
    ///   grant or the ID token fails validation
    /// - [`AuthError::OidcUnavailable`] if the provider is unreachable
    pub async fn exchange_code(
        &self,
        code: &str,
        request: &AuthRequestState,
        received_state: &str,
        now: DateTime<Utc>,
    ) -> Result<(TokenSet, String)> {
        let discovered = self.discovered()?;

        if !constant_time_eq::constant_time_eq(
            received_state.as_bytes(),
            request.state.as_bytes(),
        ) {
            tracing::warn!("OIDC callback state mismatch");
            return Err(AuthError::validation("state mismatch on OIDC callback"));
        }

        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", discovered.config.redirect_uri.as_str()),
            ("client_id", discovered.config.client_id.as_str()),
            ("client_secret", discovered.config.client_secret.as_str()),
            ("code_verifier", request.code_verifier.as_str()),
        ];

        let response = self
            .transport
            .post_form(&discovered.metadata.token_endpoint, &form)
            .await?;

        if !response.is_success() {
            return Err(AuthError::AuthenticationError(provider_error(&response.body)));
        }

        let token_set = parse_token_response(&response.body, now)?;
        let id_token = token_set
            .id_token
            .as_deref()
            .ok_or_else(|| AuthError::AuthenticationError("Provider returned no ID token".into()))?;

        let subject = self.validate_id_token(discovered, id_token, &request.nonce)?;

        Ok((token_set, subject))
    }

    /// Validate an ID token against the cached JWKS and the request nonce.
    ///
    /// Returns the token's subject.
    fn validate_id_token(
        &self,
        discovered: &Discovered,
        id_token: &str,
        expected_nonce: &str,
    ) -> Result<String> {
        let header = decode_header(id_token)
            .map_err(|e| AuthError::AuthenticationError(format!("Malformed ID token: {e}")))?;

        let jwk = match header.kid.as_deref() {
            Some(kid) => discovered.jwks.find(kid),
            // No `kid`: unambiguous only when the provider has one key.
            None if discovered.jwks.keys.len() == 1 => discovered.jwks.keys.first(),
            None => None,
        }
        .ok_or_else(|| {
            AuthError::AuthenticationError("No JWKS key matches ID token header".into())
        })?;

        let decoding_key = DecodingKey::from_jwk(jwk)
            .map_err(|e| AuthError::AuthenticationError(format!("Unusable JWKS key: {e}")))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[discovered.metadata.issuer.as_str()]);
        validation.set_audience(&[discovered.config.client_id.as_str()]);

        let claims = decode::<IdTokenClaims>(id_token, &decoding_key, &validation)
            .map_err(|e| AuthError::AuthenticationError(format!("ID token rejected: {e}")))?
            .claims;

        let nonce_matches = claims.nonce.as_deref().is_some_and(|nonce| {
            constant_time_eq::constant_time_eq(nonce.as_bytes(), expected_nonce.as_bytes())
        });
        if !nonce_matches {
            tracing::warn!("ID token nonce mismatch");
            return Err(AuthError::validation("nonce mismatch in ID token"));
        }

        Ok(claims.sub)
    }

    /// Fetch and normalize the provider's userinfo document.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AuthenticationError`] if the provider rejects
    /// the access token or omits required fields.
    pub async fn fetch_user_info(&self, access_token: &str) -> Result<OidcUserInfo> {
        let discovered = self.discovered()?;

        let response = self
            .transport
            .get_json(&discovered.metadata.userinfo_endpoint, Some(access_token))
            .await?;

        if !response.is_success() {
            return Err(AuthError::AuthenticationError(provider_error(&response.body)));
        }

        let body = response.body;
        let subject = required_str(&body, "sub")?;
        let email = required_str(&body, "email")?;

        Ok(OidcUserInfo {
            subject,
            email,
            email_verified: body
                .get("email_verified")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false),
            name: body
                .get("name")
                .and_then(serde_json::Value::as_str)
                .map(ToString::to_string),
        })
    }

    /// Exchange a refresh token for a new token set.
    ///
    /// If the provider does not rotate the refresh token, the inbound one
    /// is preserved in the returned set rather than discarded.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AuthenticationError`] if the provider rejects
    /// the refresh token.
    pub async fn refresh_tokens(&self, refresh_token: &str, now: DateTime<Utc>) -> Result<TokenSet> {
        let discovered = self.discovered()?;

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", discovered.config.client_id.as_str()),
            ("client_secret", discovered.config.client_secret.as_str()),
        ];

        let response = self
            .transport
            .post_form(&discovered.metadata.token_endpoint, &form)
            .await?;

        if !response.is_success() {
            return Err(AuthError::AuthenticationError(provider_error(&response.body)));
        }

        let mut token_set = parse_token_response(&response.body, now)?;
        if token_set.refresh_token.is_none() {
            token_set.refresh_token = Some(refresh_token.to_string());
        }

        Ok(token_set)
    }

    /// Build the provider's end-session URL.
    ///
    /// With no arguments this is the bare logout URL; hints are appended
    /// as query parameters when present.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::OidcUnavailable`] if the adapter is not
    /// available or the provider advertises no end-session endpoint.
    pub fn logout_url(
        &self,
        id_token_hint: Option<&str>,
        post_logout_redirect_uri: Option<&str>,
    ) -> Result<String> {
        let discovered = self.discovered()?;

        let endpoint = discovered.metadata.end_session_endpoint.as_deref().ok_or_else(|| {
            AuthError::OidcUnavailable("Provider advertises no end_session_endpoint".into())
        })?;

        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(hint) = id_token_hint {
            params.push(("id_token_hint", hint));
        }
        if let Some(uri) = post_logout_redirect_uri {
            params.push(("post_logout_redirect_uri", uri));
        }

        if params.is_empty() {
            return Ok(endpoint.to_string());
        }

        let query = serde_urlencoded::to_string(&params)
            .map_err(|e| AuthError::InternalError(format!("Failed to build URL: {e}")))?;

        Ok(format!("{endpoint}?{query}"))
    }
}

/// Extract the provider's error description from an error response body.
fn provider_error(body: &serde_json::Value) -> String {
    let code = body
        .get("error")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown_error");
    match body.get("error_description").and_then(serde_json::Value::as_str) {
        Some(description) => format!("{code}: {description}"),
        None => code.to_string(),
    }
}

fn required_str(body: &serde_json::Value, field: &str) -> Result<String> {
    body.get(field)
        .and_then(serde_json::Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| {
            AuthError::AuthenticationError(format!("Provider response missing `{field}`"))
        })
}

fn parse_token_response(body: &serde_json::Value, now: DateTime<Utc>) -> Result<TokenSet> {
    let access_token = required_str(body, "access_token")?;

    let expires_at = body
        .get("expires_in")
        .and_then(serde_json::Value::as_i64)
        .map(|secs| now + Duration::seconds(secs));

    Ok(TokenSet {
        access_token,
        id_token: body
            .get("id_token")
            .and_then(serde_json::Value::as_str)
            .map(ToString::to_string),
        refresh_token: body
            .get("refresh_token")
            .and_then(serde_json::Value::as_str)
            .map(ToString::to_string),
        expires_at,
        scope: body
            .get("scope")
            .and_then(serde_json::Value::as_str)
            .map(ToString::to_string),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_provider_error_formats() {
        let with_description = serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Code expired"
        });
        assert_eq!(provider_error(&with_description), "invalid_grant: Code expired");

        let bare = serde_json::json!({"error": "invalid_client"});
        assert_eq!(provider_error(&bare), "invalid_client");

        let empty = serde_json::json!({});
        assert_eq!(provider_error(&empty), "unknown_error");
    }

    #[test]
    fn test_parse_token_response_full() {
        let body = serde_json::json!({
            "access_token": "at-123",
            "id_token": "idt-456",
            "refresh_token": "rt-789",
            "expires_in": 3600,
            "scope": "openid email",
            "token_type": "Bearer"
        });

        let now = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
        let tokens = parse_token_response(&body, now).unwrap();
        assert_eq!(tokens.access_token, "at-123");
        assert_eq!(tokens.id_token.as_deref(), Some("idt-456"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt-789"));
        assert_eq!(tokens.scope.as_deref(), Some("openid email"));
        // Expiry is computed from the caller's clock, not a fresh time
        // read.
        assert_eq!(tokens.expires_at, Some(now + Duration::seconds(3600)));
    }

    #[test]
    fn test_parse_token_response_minimal() {
        let body = serde_json::json!({"access_token": "at-123"});
        let tokens = parse_token_response(&body, Utc::now()).unwrap();
        assert!(tokens.id_token.is_none());
        assert!(tokens.refresh_token.is_none());
        assert!(tokens.expires_at.is_none());
    }

    #[test]
    fn test_parse_token_response_missing_access_token() {
        let body = serde_json::json!({"token_type": "Bearer"});
        assert!(matches!(
            parse_token_response(&body, Utc::now()),
            Err(AuthError::AuthenticationError(_))
        ));
    }
}
