//! In-memory transport for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use reqwest::Method;

use super::transport::{ApiRequest, ApiResponse, Transport};
use crate::error::Result;

type Handler = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse> + Send + Sync>;

/// Transport that answers from a closure and records every request.
pub(crate) struct MockTransport {
    handler: Handler,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub(crate) fn new(
        handler: impl Fn(&ApiRequest) -> Result<ApiResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer with `responses` in order, regardless of the request.
    pub(crate) fn scripted(responses: Vec<ApiResponse>) -> Self {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::new(move |_| {
            Ok(queue
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted transport ran out of responses"))
        })
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, method: &Method) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == *method)
            .count()
    }
}

impl Transport for MockTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}
