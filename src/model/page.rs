//! Paginated listing envelope.

use serde::Deserialize;

/// One page of a `GET` listing (`/api/collections` or `.../records`).
#[derive(Debug, Clone, Deserialize)]
pub struct ListPage<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,

    /// `-1` (or absent) when the request passed `skipTotal`.
    #[serde(rename = "totalItems", default)]
    pub total_items: Option<i64>,
}

impl<T> ListPage<T> {
    /// The reported total, if the server counted it.
    #[must_use]
    pub fn total(&self) -> Option<u64> {
        self.total_items.and_then(|t| u64::try_from(t).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_skipped_total_is_unknown() {
        let page: ListPage<Value> =
            serde_json::from_str(r#"{"page":1,"perPage":1,"totalItems":-1,"items":[{}]}"#).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total(), None);
    }

    #[test]
    fn test_missing_items_default_to_empty() {
        let page: ListPage<Value> = serde_json::from_str(r#"{"totalItems":7}"#).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total(), Some(7));
    }
}
