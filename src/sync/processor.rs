//! Per-record processing.
//!
//! Decides, for one record, between updating an existing remote record
//! (found by its natural key) and creating a new one, then performs the
//! write. Processing never fails: every error becomes a failed [`Outcome`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use crate::error::Result;
use crate::model::{record_id, Record};
use crate::remote::{filter_literal, RemoteClient, Transport};
use crate::sync::sanitize::sanitize;
use crate::sync::types::Outcome;

/// Something that turns one record into an [`Outcome`].
///
/// The batch scheduler is written against this trait so it can be
/// exercised without a remote store.
pub trait RecordHandler: Send + Sync {
    fn handle(
        &self,
        collection: &str,
        record: Record,
        upsert_field: Option<&str>,
    ) -> impl Future<Output = Outcome> + Send;
}

/// Writes records to the remote store.
pub struct RecordProcessor<'a, T> {
    client: &'a RemoteClient<T>,
    dry_run: bool,
    key_locks: KeyLocks,
}

impl<'a, T: Transport> RecordProcessor<'a, T> {
    #[must_use]
    pub fn new(client: &'a RemoteClient<T>, dry_run: bool) -> Self {
        Self {
            client,
            dry_run,
            key_locks: KeyLocks::default(),
        }
    }

    /// Process one record.
    ///
    /// 1. Sanitize it.
    /// 2. In dry-run mode, succeed without touching the network.
    /// 3. With an upsert field present on the record, look up a match and
    ///    `PATCH` it if it has an id.
    /// 4. Otherwise (or if the match has no id) `POST` a new record; only
    ///    200 and 201 count as success.
    pub async fn process(
        &self,
        collection: &str,
        record: Record,
        upsert_field: Option<&str>,
    ) -> Outcome {
        let data = sanitize(&record);
        if self.dry_run {
            return Outcome::success();
        }

        match self.write(collection, &record, &data, upsert_field).await {
            Ok(outcome) => outcome,
            Err(e) => Outcome::failure(e.diagnostic()),
        }
    }

    async fn write(
        &self,
        collection: &str,
        record: &Record,
        data: &Record,
        upsert_field: Option<&str>,
    ) -> Result<Outcome> {
        if let Some((field, value)) = upsert_field.and_then(|f| record.get(f).map(|v| (f, v))) {
            // Held across lookup and write so equal keys cannot both miss.
            let _guard = self.key_locks.lock(collection, field, value).await;
            return self.upsert(collection, field, value, data).await;
        }
        self.create(collection, data).await
    }

    async fn upsert(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
        data: &Record,
    ) -> Result<Outcome> {
        if let Some(existing) = self.client.find_existing(collection, field, value).await? {
            if let Some(id) = record_id(&existing) {
                let response = self.client.update_record(collection, id, data).await?;
                return Ok(if response.is_success() {
                    Outcome::success()
                } else {
                    Outcome::failure(format!("HTTP {}: update not applied", response.status))
                });
            }
            debug!(collection, field, "Matched record has no id, creating instead");
        }
        self.create(collection, data).await
    }

    async fn create(&self, collection: &str, data: &Record) -> Result<Outcome> {
        let response = self.client.create_record(collection, data).await?;
        Ok(if matches!(response.status, 200 | 201) {
            Outcome::success()
        } else {
            Outcome::failure(format!("HTTP {}: unexpected status for create", response.status))
        })
    }
}

impl<T: Transport> RecordHandler for RecordProcessor<'_, T> {
    async fn handle(
        &self,
        collection: &str,
        record: Record,
        upsert_field: Option<&str>,
    ) -> Outcome {
        self.process(collection, record, upsert_field).await
    }
}

// ── Per-key serialization ─────────────────────────────────────

/// Async locks keyed by (collection, field, value).
///
/// Entries are removed once no worker holds or waits for them, so the
/// map only ever contains keys of records currently in flight.
#[derive(Default)]
struct KeyLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyLocks {
    async fn lock(&self, collection: &str, field: &str, value: &Value) -> KeyGuard<'_> {
        let key = format!("{collection}\u{0}{field}\u{0}{}", filter_literal(value));
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        let guard = Arc::clone(&lock).lock_owned().await;
        KeyGuard {
            owner: self,
            key,
            lock,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

struct KeyGuard<'a> {
    owner: &'a KeyLocks,
    key: String,
    lock: Arc<tokio::sync::Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.owner.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here: nobody else is waiting.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::remote::testing::MockTransport;
    use crate::remote::{ApiRequest, ApiResponse, RetryPolicy};
    use reqwest::Method;
    use serde_json::json;
    use std::time::Duration;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn client(transport: MockTransport) -> RemoteClient<MockTransport> {
        RemoteClient::new(transport, "http://pb.local").with_retry(RetryPolicy {
            initial_backoff: Duration::ZERO,
            ..RetryPolicy::default()
        })
    }

    /// Store where `sku = "A1"` exists as `r1`.
    fn widget_store(req: &ApiRequest) -> Result<ApiResponse> {
        Ok(match req.method {
            Method::GET if req.query_value("filter") == Some(r#"sku = "A1""#) => {
                ApiResponse::new(200, r#"{"items":[{"id":"r1","sku":"A1","price":5}]}"#)
            }
            Method::GET => ApiResponse::new(200, r#"{"items":[]}"#),
            Method::PATCH => ApiResponse::new(200, "{}"),
            Method::POST => ApiResponse::new(200, "{}"),
            _ => ApiResponse::new(405, ""),
        })
    }

    #[tokio::test]
    async fn test_upsert_match_updates_existing() {
        let client = client(MockTransport::new(widget_store));
        let processor = RecordProcessor::new(&client, false);

        let outcome = processor
            .process("widgets", record(json!({"sku": "A1", "price": 9})), Some("sku"))
            .await;

        assert_eq!(outcome, Outcome::success());
        let transport = client.transport();
        assert_eq!(transport.count(&Method::PATCH), 1);
        assert_eq!(transport.count(&Method::POST), 0);
        let patch = transport
            .requests()
            .into_iter()
            .find(|r| r.method == Method::PATCH)
            .unwrap();
        assert_eq!(patch.url, "http://pb.local/api/collections/widgets/records/r1");
        assert_eq!(patch.body, Some(json!({"sku": "A1", "price": 9})));
    }

    #[tokio::test]
    async fn test_upsert_miss_creates() {
        let client = client(MockTransport::new(widget_store));
        let processor = RecordProcessor::new(&client, false);

        let outcome = processor
            .process("widgets", record(json!({"id": "old", "sku": "B2"})), Some("sku"))
            .await;

        assert!(outcome.success);
        let transport = client.transport();
        assert_eq!(transport.count(&Method::GET), 1);
        assert_eq!(transport.count(&Method::PATCH), 0);
        assert_eq!(transport.count(&Method::POST), 1);
        let post = transport.requests().pop().unwrap();
        assert_eq!(post.body, Some(json!({"sku": "B2"})));
    }

    #[tokio::test]
    async fn test_match_without_id_falls_back_to_create() {
        let transport = MockTransport::new(|req| {
            Ok(match req.method {
                Method::GET => ApiResponse::new(200, r#"{"items":[{"sku":"A1"}]}"#),
                _ => ApiResponse::new(201, "{}"),
            })
        });
        let client = client(transport);
        let processor = RecordProcessor::new(&client, false);

        let outcome = processor
            .process("widgets", record(json!({"sku": "A1"})), Some("sku"))
            .await;

        assert!(outcome.success);
        assert_eq!(client.transport().count(&Method::POST), 1);
        assert_eq!(client.transport().count(&Method::PATCH), 0);
    }

    #[tokio::test]
    async fn test_record_without_upsert_field_is_created() {
        let client = client(MockTransport::new(widget_store));
        let processor = RecordProcessor::new(&client, false);

        let outcome = processor
            .process("widgets", record(json!({"name": "no sku"})), Some("sku"))
            .await;

        assert!(outcome.success);
        assert_eq!(client.transport().count(&Method::GET), 0);
        assert_eq!(client.transport().count(&Method::POST), 1);
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_calls() {
        let client = client(MockTransport::new(widget_store));
        let processor = RecordProcessor::new(&client, true);

        for sku in ["A1", "B2"] {
            let outcome = processor
                .process("widgets", record(json!({"sku": sku})), Some("sku"))
                .await;
            assert!(outcome.success);
        }

        assert!(client.transport().requests().is_empty());
    }

    #[tokio::test]
    async fn test_http_error_becomes_truncated_diagnostic() {
        let body = format!(r#"{{"message":"{}"}}"#, "x".repeat(400));
        let transport = MockTransport::new(move |_| Ok(ApiResponse::new(400, body.clone())));
        let client = client(transport);
        let processor = RecordProcessor::new(&client, false);

        let outcome = processor.process("widgets", record(json!({"a": 1})), None).await;

        assert!(!outcome.success);
        let message = outcome.error.unwrap();
        assert!(message.starts_with("HTTP 400: {\"message\""));
        assert_eq!(message.len(), "HTTP 400: ".len() + 200);
    }

    #[tokio::test]
    async fn test_resolver_failure_is_record_failure() {
        let transport = MockTransport::new(|req| {
            Ok(match req.method {
                Method::GET => ApiResponse::new(503, "down"),
                _ => ApiResponse::new(200, "{}"),
            })
        });
        let client = client(transport);
        let processor = RecordProcessor::new(&client, false);

        let outcome = processor
            .process("widgets", record(json!({"sku": "A1"})), Some("sku"))
            .await;

        assert_eq!(outcome, Outcome::failure("HTTP 503: down"));
        assert_eq!(client.transport().count(&Method::GET), 3);
        assert_eq!(client.transport().count(&Method::POST), 0);
    }

    #[tokio::test]
    async fn test_transport_error_message_is_kept() {
        let transport = MockTransport::new(|_| Err(Error::Other("connection reset".into())));
        let client = client(transport);
        let processor = RecordProcessor::new(&client, false);

        let outcome = processor.process("widgets", record(json!({"a": 1})), None).await;

        assert_eq!(outcome, Outcome::failure("connection reset"));
    }

    #[tokio::test]
    async fn test_create_with_unexpected_status_fails() {
        let client = client(MockTransport::scripted(vec![ApiResponse::new(204, "")]));
        let processor = RecordProcessor::new(&client, false);

        let outcome = processor.process("widgets", record(json!({"a": 1})), None).await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().starts_with("HTTP 204"));
    }

    #[tokio::test]
    async fn test_key_locks_are_released() {
        let locks = KeyLocks::default();
        {
            let _a = locks.lock("widgets", "sku", &json!("A1")).await;
            let _b = locks.lock("widgets", "sku", &json!("B2")).await;
            assert_eq!(locks.len(), 2);
        }
        assert_eq!(locks.len(), 0);
    }
}
