//! Record model.
//!
//! A record is kept as an ordered JSON object rather than a typed struct:
//! collections are user-defined, so the tool never knows their schema.

use serde_json::{Map, Value};

/// One row of a collection, field order preserved.
pub type Record = Map<String, Value>;

/// Primary identity field assigned by the server.
pub const ID_FIELD: &str = "id";

/// Export-only metadata naming the collection a record came from.
pub const COLLECTION_NAME_FIELD: &str = "@collectionName";

/// The record's server identity, if it carries a non-empty string `id`.
#[must_use]
pub fn record_id(record: &Record) -> Option<&str> {
    record
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

/// The collection name stamped on an exported record, if any.
#[must_use]
pub fn declared_collection(record: &Record) -> Option<&str> {
    record
        .get(COLLECTION_NAME_FIELD)
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
}
