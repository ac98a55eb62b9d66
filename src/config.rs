//! Authentication configuration.
//!
//! Configuration is an explicitly constructed object passed into the
//! [`Authenticator`](crate::orchestrator::Authenticator); there is no
//! ambient global, so multiple isolated instances (tests, multi-tenant)
//! can coexist.

use chrono::Duration;

/// Top-level authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Session token settings.
    pub tokens: TokenConfig,

    /// TOTP settings.
    pub totp: TotpConfig,

    /// OIDC settings; `None` disables the federated login path.
    pub oidc: Option<OidcConfig>,

    /// TTL of a pending OIDC authorization request.
    ///
    /// Default: 5 minutes
    pub request_ttl: Duration,
}

impl AuthConfig {
    /// Create configuration with the given token signing settings and all
    /// other values at their defaults.
    #[must_use]
    pub fn new(tokens: TokenConfig) -> Self {
        Self {
            tokens,
            totp: TotpConfig::default(),
            oidc: None,
            request_ttl: Duration::minutes(5),
        }
    }

    /// Set TOTP settings.
    #[must_use]
    pub fn with_totp(mut self, totp: TotpConfig) -> Self {
        self.totp = totp;
        self
    }

    /// Enable the OIDC login path.
    #[must_use]
    pub fn with_oidc(mut self, oidc: OidcConfig) -> Self {
        self.oidc = Some(oidc);
        self
    }

    /// Set the authorization-request TTL.
    #[must_use]
    pub const fn with_request_ttl(mut self, ttl: Duration) -> Self {
        self.request_ttl = ttl;
        self
    }
}

/// Session token configuration.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// HMAC secret for signing the application's own tokens.
    pub signing_secret: String,

    /// `iss` claim stamped into and required from access tokens.
    pub issuer: String,

    /// `aud` claim stamped into and required from access tokens.
    pub audience: String,

    /// Access token lifetime.
    ///
    /// Default: 15 minutes
    pub access_ttl: Duration,

    /// Refresh token (and session) lifetime.
    ///
    /// Default: 24 hours
    pub refresh_ttl: Duration,
}

impl TokenConfig {
    /// Create token configuration.
    ///
    /// # Arguments
    ///
    /// * `signing_secret` - HMAC key material for the application's tokens
    /// * `issuer` - value for the `iss` claim (e.g., "<https://app.example.com>")
    /// * `audience` - value for the `aud` claim
    #[must_use]
    pub fn new(signing_secret: String, issuer: String, audience: String) -> Self {
        Self {
            signing_secret,
            issuer,
            audience,
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::hours(24),
        }
    }

    /// Set access token lifetime.
    #[must_use]
    pub const fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    /// Set refresh token lifetime.
    #[must_use]
    pub const fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }
}

/// TOTP configuration.
#[derive(Debug, Clone)]
pub struct TotpConfig {
    /// Issuer label shown in authenticator apps and provisioning URIs.
    pub issuer_label: String,

    /// Accepted clock drift in 30-second steps on either side.
    ///
    /// Default: 1 (±30 seconds)
    pub window_steps: u8,
}

impl TotpConfig {
    /// Create TOTP configuration with the given issuer label.
    #[must_use]
    pub const fn new(issuer_label: String) -> Self {
        Self {
            issuer_label,
            window_steps: 1,
        }
    }

    /// Set the drift window in steps.
    #[must_use]
    pub const fn with_window_steps(mut self, steps: u8) -> Self {
        self.window_steps = steps;
        self
    }
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            issuer_label: "Authgate".to_string(),
            window_steps: 1,
        }
    }
}

/// OIDC provider configuration.
#[derive(Debug, Clone)]
pub struct OidcConfig {
    /// Provider issuer URL; discovery is fetched from
    /// `{issuer_url}/.well-known/openid-configuration`.
    pub issuer_url: String,

    /// OAuth2 client ID.
    pub client_id: String,

    /// OAuth2 client secret.
    pub client_secret: String,

    /// Redirect URI registered with the provider.
    pub redirect_uri: String,

    /// Scopes to request.
    ///
    /// Default: `openid email profile`
    pub scopes: Vec<String>,

    /// Timeout applied to every provider HTTP call.
    ///
    /// Default: 5 seconds
    pub http_timeout: std::time::Duration,
}

impl OidcConfig {
    /// Create OIDC configuration.
    #[must_use]
    pub fn new(
        issuer_url: String,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> Self {
        Self {
            issuer_url,
            client_id,
            client_secret,
            redirect_uri,
            scopes: vec![
                "openid".to_string(),
                "email".to_string(),
                "profile".to_string(),
            ],
            http_timeout: std::time::Duration::from_secs(5),
        }
    }

    /// Assemble configuration from optional values.
    ///
    /// Returns `None` when any required value is absent, so a partially
    /// configured deployment disables the OIDC path instead of failing.
    #[must_use]
    pub fn from_optional(
        issuer_url: Option<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
        redirect_uri: Option<String>,
    ) -> Option<Self> {
        Some(Self::new(
            issuer_url?,
            client_id?,
            client_secret?,
            redirect_uri?,
        ))
    }

    /// Set custom scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Set the per-request HTTP timeout.
    #[must_use]
    pub const fn with_http_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_config() -> TokenConfig {
        TokenConfig::new(
            "secret".to_string(),
            "https://app.example.com".to_string(),
            "authgate".to_string(),
        )
    }

    #[test]
    fn test_token_config_builder() {
        let config = token_config()
            .with_access_ttl(Duration::minutes(5))
            .with_refresh_ttl(Duration::hours(48));

        assert_eq!(config.access_ttl, Duration::minutes(5));
        assert_eq!(config.refresh_ttl, Duration::hours(48));
    }

    #[test]
    fn test_auth_config_defaults() {
        let config = AuthConfig::new(token_config());

        assert!(config.oidc.is_none());
        assert_eq!(config.request_ttl, Duration::minutes(5));
        assert_eq!(config.totp.window_steps, 1);
        assert_eq!(config.tokens.access_ttl, Duration::minutes(15));
    }

    #[test]
    fn test_oidc_config_from_optional() {
        let complete = OidcConfig::from_optional(
            Some("https://issuer.example.com".into()),
            Some("client".into()),
            Some("secret".into()),
            Some("https://app.example.com/callback".into()),
        );
        assert!(complete.is_some());

        let incomplete = OidcConfig::from_optional(
            Some("https://issuer.example.com".into()),
            None,
            Some("secret".into()),
            Some("https://app.example.com/callback".into()),
        );
        assert!(incomplete.is_none());
    }

    #[test]
    fn test_oidc_default_scopes() {
        let config = OidcConfig::new(
            "https://issuer.example.com".into(),
            "client".into(),
            "secret".into(),
            "https://app.example.com/callback".into(),
        );
        assert_eq!(config.scopes, vec!["openid", "email", "profile"]);
    }
}
