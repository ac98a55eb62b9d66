//! Mock HTTP transport with canned responses.

use crate::error::{AuthError, Result};
use crate::providers::{HttpResponse, HttpTransport};
use std::collections::HashMap;
use std::sync::Mutex;

/// A recorded outbound request, for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// HTTP method ("GET" or "POST").
    pub method: String,

    /// Request URL.
    pub url: String,

    /// Form fields for POSTs, empty for GETs.
    pub form: Vec<(String, String)>,

    /// Bearer token, when one was attached.
    pub bearer: Option<String>,
}

/// Canned-response HTTP transport.
///
/// Responses are keyed by URL; a request for an unknown URL fails the way
/// an unreachable provider would. Every request is recorded.
#[derive(Debug, Default)]
pub struct MockHttpTransport {
    responses: Mutex<HashMap<String, (u16, serde_json::Value)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockHttpTransport {
    /// Create an empty transport (every request fails).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Can a response for a URL.
    pub fn respond(&self, url: &str, status: u16, body: serde_json::Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body));
    }

    /// All requests issued so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn lookup(&self, url: &str) -> Result<HttpResponse> {
        self.responses
            .lock()
            .unwrap()
            .get(url)
            .map(|(status, body)| HttpResponse {
                status: *status,
                body: body.clone(),
            })
            .ok_or_else(|| AuthError::OidcUnavailable(format!("No canned response for {url}")))
    }
}

impl HttpTransport for MockHttpTransport {
    async fn get_json(&self, url: &str, bearer: Option<&str>) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: "GET".to_string(),
            url: url.to_string(),
            form: Vec::new(),
            bearer: bearer.map(ToString::to_string),
        });

        self.lookup(url)
    }

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: "POST".to_string(),
            url: url.to_string(),
            form: form
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            bearer: None,
        });

        self.lookup(url)
    }
}
