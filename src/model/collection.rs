//! Collection catalog entry.

use serde::{Deserialize, Serialize};

/// A collection as listed by `GET /api/collections`.
///
/// Only the fields the tool reads are modelled; everything else the
/// server sends (schema, rules, options) is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Unique collection name. Entries without one are dropped by the catalog.
    #[serde(default)]
    pub name: String,

    /// Collection type (`base`, `auth`, `view`).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// System collections are managed by the server itself.
    #[serde(default)]
    pub system: bool,

    /// Last-modified marker as reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

impl CollectionDescriptor {
    /// Create a user collection descriptor with just a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
