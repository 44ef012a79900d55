//! HTTP transport seam.
//!
//! Every remote call is described as an [`ApiRequest`] and executed by a
//! [`Transport`]. The production transport wraps `reqwest`; tests plug in
//! a scripted transport so the engine runs without a server.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

/// Pre-built authentication headers.
///
/// Computed once per run and shared read-only by every worker; cloning
/// only bumps a reference count.
#[derive(Clone, Default)]
pub struct AuthHeaders(Arc<Vec<(String, String)>>);

impl AuthHeaders {
    /// No credentials (anonymous access).
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// `Authorization: Bearer <token>`.
    #[must_use]
    pub fn bearer(token: &str) -> Self {
        Self(Arc::new(vec![(
            "Authorization".to_string(),
            format!("Bearer {token}"),
        )]))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for AuthHeaders {
    // Header values are credentials; only the names are printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter().map(|(k, _)| k)).finish()
    }
}

/// One HTTP operation against the record API.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: AuthHeaders,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: AuthHeaders::anonymous(),
            query: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn headers(mut self, headers: AuthHeaders) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Look up a query parameter by name.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response: status plus body text, interpreted by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Status below 400.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status < 400
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns `Json` if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Executes a single HTTP operation, without retries.
///
/// Implementations return any status code as a response; only
/// connection-level failures are errors. Retry policy lives above this
/// trait, in [`super::RemoteClient::send`].
pub trait Transport: Send + Sync {
    fn execute(&self, request: &ApiRequest) -> impl Future<Output = Result<ApiResponse>> + Send;
}

/// `reqwest`-backed transport.
///
/// `reqwest::Client` keeps its connection pool behind internal
/// synchronization, so workers share it without any state of ours.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `Request` if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pbsync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_headers_debug_hides_token() {
        let headers = AuthHeaders::bearer("secret-token");
        let printed = format!("{headers:?}");
        assert!(printed.contains("Authorization"));
        assert!(!printed.contains("secret-token"));
    }

    #[test]
    fn test_request_builder() {
        let req = ApiRequest::new(Method::GET, "http://pb.local/api/collections")
            .query("page", 1)
            .query("perPage", 200);
        assert_eq!(req.query_value("perPage"), Some("200"));
        assert_eq!(req.query_value("filter"), None);
        assert!(req.body.is_none());
    }

    #[test]
    fn test_response_success_boundary() {
        assert!(ApiResponse::new(204, "").is_success());
        assert!(ApiResponse::new(399, "").is_success());
        assert!(!ApiResponse::new(400, "").is_success());
    }
}
