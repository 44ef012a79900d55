//! Remote record store client.
//!
//! This module talks to the PocketBase HTTP API:
//!
//! - **Transport**: one HTTP operation, swappable for tests
//! - **Retry**: bounded exponential backoff on 429 / 503
//! - **Auth**: admin password login producing a bearer header
//! - **Catalog**: paginated listing of all collections
//! - **Resolver**: natural-key lookup of an existing record
//! - **Records**: create, update and page through records
//!
//! # Architecture
//!
//! [`RemoteClient`] owns a [`Transport`], the base URL, the shared auth
//! headers and the [`RetryPolicy`]. All calls go through
//! [`RemoteClient::send`], the single place where retries happen.

mod auth;
mod catalog;
mod records;
mod resolver;
mod retry;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{CollectionCatalog, CATALOG_PAGE_SIZE};
pub use resolver::{build_filter, filter_literal};
pub use retry::{Backoff, RetryPolicy};
pub use transport::{ApiRequest, ApiResponse, AuthHeaders, HttpTransport, Transport};

use reqwest::Method;

use crate::config::normalize_base_url;

/// Client for one PocketBase instance.
#[derive(Debug)]
pub struct RemoteClient<T> {
    transport: T,
    base_url: String,
    headers: AuthHeaders,
    retry: RetryPolicy,
}

impl<T: Transport> RemoteClient<T> {
    /// Create an anonymous client with the default retry policy.
    pub fn new(transport: T, base_url: &str) -> Self {
        Self {
            transport,
            base_url: normalize_base_url(base_url),
            headers: AuthHeaders::anonymous(),
            retry: RetryPolicy::default(),
        }
    }

    /// Attach authentication headers sent with every request.
    #[must_use]
    pub fn with_headers(mut self, headers: AuthHeaders) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn headers(&self) -> &AuthHeaders {
        &self.headers
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Start a request for `path` (which begins with `/api/`).
    pub(crate) fn request(&self, method: Method, path: &str) -> ApiRequest {
        ApiRequest::new(method, format!("{}{path}", self.base_url)).headers(self.headers.clone())
    }
}

/// Path of the records endpoint of a collection.
pub(crate) fn records_path(collection: &str) -> String {
    format!("/api/collections/{collection}/records")
}
