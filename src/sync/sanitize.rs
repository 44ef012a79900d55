//! Record sanitization.
//!
//! Strips server-managed and export-only fields so that a create or
//! update never tries to set state the server controls.

use crate::model::Record;

/// Keys removed before a record is written back.
///
/// Identity, server timestamps, and the metadata an export stamps on
/// each record (`@collectionId`, `@collectionName`, `@expand`).
pub const DROP_KEYS: [&str; 6] = [
    "id",
    "created",
    "updated",
    "@collectionId",
    "@collectionName",
    "@expand",
];

/// Return a copy of `record` without the [`DROP_KEYS`].
///
/// The input is left untouched and the remaining keys keep their order.
#[must_use]
pub fn sanitize(record: &Record) -> Record {
    record
        .iter()
        .filter(|(key, _)| !DROP_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
