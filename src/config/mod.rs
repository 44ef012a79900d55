//! Configuration management.
//!
//! This module normalizes the values the sync engine consumes:
//!
//! - **Base URL**: trailing slashes stripped once, up front
//! - **Upsert mapping**: `collection=field` pairs, `*` as the default
//! - **Collection filter**: include / exclude name sets
//! - **Tuning**: batch size and concurrency clamped to at least 1,
//!   throttle validated as a non-negative number of seconds
//!
//! Defaults can also come from a JSON config file, see [`file`].

pub mod file;

pub use file::{default_config_path, load_config, FileConfig};

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::error::{Error, Result};

/// Records per import batch when nothing else is configured.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Concurrent workers per import batch when nothing else is configured.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Records per listing request on export.
pub const DEFAULT_PAGE_SIZE: usize = 200;

/// Per-request timeout for every remote call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Key in the upsert mapping that applies to every collection.
pub const UPSERT_WILDCARD: &str = "*";

/// Strip trailing slashes so paths can be appended with `format!`.
#[must_use]
pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Clamp a batch size or worker count to its lower bound of 1.
#[must_use]
pub fn at_least_one(value: usize) -> usize {
    value.max(1)
}

/// Convert a `--throttle` value in seconds into a pause duration.
///
/// # Errors
///
/// Returns `InvalidArgument` for negative, non-finite or out-of-range values.
pub fn throttle_duration(seconds: f64) -> Result<Duration> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(Error::InvalidArgument(format!(
            "throttle must be a non-negative number of seconds, got {seconds}"
        )));
    }
    Duration::try_from_secs_f64(seconds).map_err(|_| {
        Error::InvalidArgument(format!("throttle of {seconds} seconds is too large"))
    })
}

/// Split a comma-separated list of collection names.
///
/// Names are trimmed and empty entries dropped.
#[must_use]
pub fn parse_name_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

// ── Upsert mapping ────────────────────────────────────────────

/// Natural-key field per collection, used to find an existing record
/// before deciding between update and create.
///
/// Built once from configuration and read-only for the rest of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertMap {
    fields: BTreeMap<String, String>,
}

impl UpsertMap {
    /// Parse `collection=field` entries (`*=field` sets the default).
    ///
    /// Later entries for the same collection win.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if an entry has no `=` or an empty side.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self> {
        let mut fields = BTreeMap::new();
        for entry in entries {
            let entry = entry.as_ref();
            let Some((collection, field)) = entry.split_once('=') else {
                return Err(Error::InvalidArgument(format!(
                    "invalid upsert mapping '{entry}': use collection=field or *=field"
                )));
            };
            let (collection, field) = (collection.trim(), field.trim());
            if collection.is_empty() || field.is_empty() {
                return Err(Error::InvalidArgument(format!(
                    "invalid upsert mapping '{entry}': collection and field must be non-empty"
                )));
            }
            fields.insert(collection.to_string(), field.to_string());
        }
        Ok(Self { fields })
    }

    /// The key field for `collection`, falling back to the `*` default.
    #[must_use]
    pub fn field_for(&self, collection: &str) -> Option<&str> {
        self.fields
            .get(collection)
            .or_else(|| self.fields.get(UPSERT_WILDCARD))
            .map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ── Collection filter ─────────────────────────────────────────

/// Why a collection was filtered out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterRejection {
    /// An include list was given and the collection is not on it.
    NotIncluded,
    /// The collection is on the exclude list.
    Excluded,
}

impl std::fmt::Display for FilterRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotIncluded => write!(f, "not in --collections"),
            Self::Excluded => write!(f, "excluded"),
        }
    }
}

/// Include / exclude sets applied to collection names.
///
/// An empty include set means "everything". Include is checked first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionFilter {
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
}

impl CollectionFilter {
    #[must_use]
    pub fn new(include: BTreeSet<String>, exclude: BTreeSet<String>) -> Self {
        Self { include, exclude }
    }

    /// Build from the raw comma-separated `--collections` / `--exclude` values.
    #[must_use]
    pub fn from_lists(include: Option<&str>, exclude: Option<&str>) -> Self {
        Self::new(
            include.map(parse_name_list).unwrap_or_default(),
            exclude.map(parse_name_list).unwrap_or_default(),
        )
    }

    /// `None` if `name` passes, otherwise the reason it does not.
    #[must_use]
    pub fn check(&self, name: &str) -> Option<FilterRejection> {
        if !self.include.is_empty() && !self.include.contains(name) {
            return Some(FilterRejection::NotIncluded);
        }
        if self.exclude.contains(name) {
            return Some(FilterRejection::Excluded);
        }
        None
    }

    #[must_use]
    pub fn allows(&self, name: &str) -> bool {
        self.check(name).is_none()
    }
}
