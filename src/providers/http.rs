//! HTTP transport trait and reqwest implementation.
//!
//! The OIDC adapter never talks to a concrete HTTP client. It issues
//! requests through [`HttpTransport`], which tests replace with a
//! canned-response fake. No network, no interception tricks.

use crate::error::{AuthError, Result};
use reqwest::Client;

/// An HTTP response as the OIDC adapter sees it.
///
/// Transport-level failures (DNS, connect, timeout) surface as errors;
/// HTTP error statuses do not; the adapter decides what a 400 from the
/// token endpoint means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,

    /// Response body parsed as JSON.
    pub body: serde_json::Value,
}

impl HttpResponse {
    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Abstract "issue HTTP request" capability.
///
/// Both operations the OIDC protocol needs: JSON GET (discovery, JWKS,
/// userinfo) and form-encoded POST (token endpoint).
pub trait HttpTransport: Send + Sync {
    /// GET a JSON document, optionally with a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::OidcUnavailable`] if the request cannot be
    /// delivered or the body is not JSON.
    fn get_json(
        &self,
        url: &str,
        bearer: Option<&str>,
    ) -> impl std::future::Future<Output = Result<HttpResponse>> + Send;

    /// POST a form-encoded body and read a JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::OidcUnavailable`] if the request cannot be
    /// delivered or the body is not JSON.
    fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> impl std::future::Future<Output = Result<HttpResponse>> + Send;
}

impl<H: HttpTransport> HttpTransport for std::sync::Arc<H> {
    async fn get_json(&self, url: &str, bearer: Option<&str>) -> Result<HttpResponse> {
        (**self).get_json(url, bearer).await
    }

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpResponse> {
        (**self).post_form(url, form).await
    }
}

/// Production transport backed by [`reqwest`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with the given per-request timeout.
    ///
    /// A slow or unreachable provider must not hang a login attempt, so
    /// the timeout applies to every call.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying client cannot be built.
    pub fn new(timeout: std::time::Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::InternalError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    async fn read_json(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| AuthError::OidcUnavailable(format!("Non-JSON provider response: {e}")))?;

        Ok(HttpResponse { status, body })
    }
}

impl HttpTransport for ReqwestTransport {
    async fn get_json(&self, url: &str, bearer: Option<&str>) -> Result<HttpResponse> {
        let mut request = self.client.get(url);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AuthError::OidcUnavailable(format!("GET {url} failed: {e}")))?;

        Self::read_json(response).await
    }

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpResponse> {
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| AuthError::OidcUnavailable(format!("POST {url} failed: {e}")))?;

        Self::read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_statuses() {
        let ok = HttpResponse {
            status: 200,
            body: serde_json::json!({}),
        };
        let bad_request = HttpResponse {
            status: 400,
            body: serde_json::json!({"error": "invalid_grant"}),
        };

        assert!(ok.is_success());
        assert!(!bad_request.is_success());
    }
}
