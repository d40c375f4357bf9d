//! HTTP transport seam shared by the upstream connectors.
//!
//! Connectors talk to [`HttpTransport`] rather than to `reqwest` directly, so
//! the same connector code runs against the live APIs or canned fixtures.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::ConnectorError;

/// Raw upstream response; status interpretation is left to the connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issues a GET for `url` with `query` appended as URL parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Upstream`] when the request could not be
    /// completed at all (DNS, connect, timeout, body read).
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<HttpResponse, ConnectorError>;
}

/// Live transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a client with the given request timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Configuration`] if the TLS backend cannot be
    /// initialised.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, ConnectorError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ConnectorError::Configuration(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<HttpResponse, ConnectorError> {
        let mut request = self.client.get(url).query(query);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request
            .send()
            .await
            .map_err(|e| ConnectorError::Upstream(format!("request to {url} failed: {e}")))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ConnectorError::Upstream(format!("reading body from {url} failed: {e}")))?;
        Ok(HttpResponse { status, body })
    }
}

type Query = Vec<(String, String)>;

/// Canned-response transport for offline runs and tests.
///
/// Responses are keyed by URL, optionally narrowed by query parameters that
/// must all be present. The most recently registered matching route wins, and
/// a URL-only route is the fallback. Unknown URLs fail as a transport error.
/// Every request is counted and its query recorded.
#[derive(Debug, Default)]
pub struct FixtureTransport {
    responses: Mutex<HashMap<String, HttpResponse>>,
    narrowed: Mutex<Vec<(String, Query, HttpResponse)>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, Query)>>,
}

impl FixtureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the response served for `url`.
    pub fn respond(&self, url: impl Into<String>, response: HttpResponse) -> &Self {
        let mut responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        responses.insert(url.into(), response);
        self
    }

    /// Registers a response served for `url` only when every pair in `query`
    /// appears in the request.
    pub fn respond_when(&self, url: impl Into<String>, query: &[(&str, &str)], response: HttpResponse) -> &Self {
        let query = query
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let mut narrowed = self.narrowed.lock().unwrap_or_else(|e| e.into_inner());
        narrowed.push((url.into(), query, response));
        self
    }

    /// Number of requests issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request issued so far, as `(url, query)` pairs.
    pub fn requests(&self) -> Vec<(String, Query)> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl HttpTransport for FixtureTransport {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        _headers: &[(String, String)],
    ) -> Result<HttpResponse, ConnectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((url.to_string(), query.to_vec()));

        let narrowed = self.narrowed.lock().unwrap_or_else(|e| e.into_inner());
        let specific = narrowed
            .iter()
            .rev()
            .find(|(u, required, _)| u == url && required.iter().all(|pair| query.contains(pair)))
            .map(|(_, _, resp)| resp.clone());
        if let Some(resp) = specific {
            return Ok(resp);
        }
        drop(narrowed);

        let responses = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        responses
            .get(url)
            .cloned()
            .ok_or_else(|| ConnectorError::Upstream(format!("connection refused: {url}")))
    }
}

/// Renders a query for logs with credential values masked.
pub fn redacted_query(query: &[(String, String)]) -> String {
    query
        .iter()
        .map(|(k, v)| {
            if k == "api_key" {
                format!("{k}=***")
            } else {
                format!("{k}={v}")
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}
