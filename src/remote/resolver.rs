//! Existing-record resolver.
//!
//! Finds at most one record whose natural-key field equals a given value.
//! Used by the record processor to choose between update and create.

use reqwest::Method;
use serde_json::Value;
use tracing::trace;

use super::transport::Transport;
use super::{records_path, RemoteClient};
use crate::error::Result;
use crate::model::{ListPage, Record};

/// Render `value` as a literal of the PocketBase filter syntax.
///
/// `null`, `true` / `false` and numbers are bare; strings (and any other
/// value, via its JSON text) are double-quoted with `\` and `"` escaped.
#[must_use]
pub fn filter_literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        other => quote(&other.to_string()),
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// `field = literal` filter expression.
#[must_use]
pub fn build_filter(field: &str, value: &Value) -> String {
    format!("{field} = {}", filter_literal(value))
}

impl<T: Transport> RemoteClient<T> {
    /// Look up the first record of `collection` where `field` equals `value`.
    ///
    /// Requests a single item and skips the total count.
    ///
    /// # Errors
    ///
    /// Returns the transport error once retries are exhausted.
    pub async fn find_existing(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<Record>> {
        let filter = build_filter(field, value);
        trace!(collection, filter = %filter, "Resolving existing record");

        let request = self
            .request(Method::GET, &records_path(collection))
            .query("page", 1)
            .query("perPage", 1)
            .query("filter", &filter)
            .query("skipTotal", 1);

        let page: ListPage<Record> = self.send(&request).await?.json()?;
        Ok(page.items.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::testing::MockTransport;
    use crate::remote::ApiResponse;
    use serde_json::json;

    #[test]
    fn test_filter_literals() {
        assert_eq!(build_filter("sku", &Value::Null), "sku = null");
        assert_eq!(build_filter("active", &json!(true)), "active = true");
        assert_eq!(build_filter("qty", &json!(42)), "qty = 42");
        assert_eq!(build_filter("price", &json!(9.5)), "price = 9.5");
        assert_eq!(build_filter("sku", &json!("A1")), r#"sku = "A1""#);
    }

    #[test]
    fn test_filter_escapes_quotes_and_backslashes() {
        assert_eq!(
            build_filter("title", &json!(r#"say "hi" \o/"#)),
            r#"title = "say \"hi\" \\o/""#
        );
    }

    #[tokio::test]
    async fn test_find_existing_queries_single_item() {
        let transport = MockTransport::scripted(vec![ApiResponse::new(
            200,
            r#"{"page":1,"perPage":1,"items":[{"id":"r1","sku":"A1"}]}"#,
        )]);
        let client = RemoteClient::new(transport, "http://pb.local");

        let found = client
            .find_existing("widgets", "sku", &json!("A1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found["id"], "r1");

        let sent = &client.transport().requests()[0];
        assert_eq!(sent.url, "http://pb.local/api/collections/widgets/records");
        assert_eq!(sent.query_value("perPage"), Some("1"));
        assert_eq!(sent.query_value("skipTotal"), Some("1"));
        assert_eq!(sent.query_value("filter"), Some(r#"sku = "A1""#));
    }

    #[tokio::test]
    async fn test_find_existing_none() {
        let transport = MockTransport::scripted(vec![ApiResponse::new(200, r#"{"items":[]}"#)]);
        let client = RemoteClient::new(transport, "http://pb.local");

        let found = client.find_existing("widgets", "sku", &json!("zz")).await.unwrap();
        assert!(found.is_none());
    }
}
