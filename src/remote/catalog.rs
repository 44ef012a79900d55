//! Collection catalog.
//!
//! Fetched once per run and then consulted read-only: the importer checks
//! that a target collection exists, the exporter picks what to dump.

use std::collections::BTreeMap;

use reqwest::Method;
use tracing::debug;

use super::transport::Transport;
use super::RemoteClient;
use crate::config::CollectionFilter;
use crate::error::Result;
use crate::model::{CollectionDescriptor, ListPage};

/// Page size used when listing collections.
pub const CATALOG_PAGE_SIZE: usize = 200;

/// All collections of the remote store, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct CollectionCatalog {
    collections: BTreeMap<String, CollectionDescriptor>,
}

impl CollectionCatalog {
    /// Build a catalog from descriptors; nameless entries are dropped.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = CollectionDescriptor>) -> Self {
        let collections = descriptors
            .into_iter()
            .filter(|d| !d.name.is_empty())
            .map(|d| (d.name.clone(), d))
            .collect();
        Self { collections }
    }

    /// Page through `GET /api/collections` until the reported total is
    /// covered or a page comes back empty. Without a total, a short page
    /// ends the listing.
    ///
    /// # Errors
    ///
    /// Returns the transport error once retries are exhausted, or `Json`
    /// if a page cannot be decoded.
    pub async fn fetch<T: Transport>(client: &RemoteClient<T>) -> Result<Self> {
        let mut collections = BTreeMap::new();
        let mut page = 1;

        loop {
            let request = client
                .request(Method::GET, "/api/collections")
                .query("page", page)
                .query("perPage", CATALOG_PAGE_SIZE);
            let listing: ListPage<CollectionDescriptor> = client.send(&request).await?.json()?;

            let received = listing.items.len();
            let reported = listing.total();
            for descriptor in listing.items {
                if !descriptor.name.is_empty() {
                    collections.insert(descriptor.name.clone(), descriptor);
                }
            }

            let done = match reported {
                Some(total) => {
                    let total = usize::try_from(total).unwrap_or(usize::MAX);
                    page * CATALOG_PAGE_SIZE >= total
                }
                None => received < CATALOG_PAGE_SIZE,
            };
            if received == 0 || done {
                break;
            }
            page += 1;
        }

        debug!(count = collections.len(), pages = page, "Fetched collection catalog");
        Ok(Self { collections })
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CollectionDescriptor> {
        self.collections.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Descriptors in name order.
    pub fn iter(&self) -> impl Iterator<Item = &CollectionDescriptor> {
        self.collections.values()
    }

    /// Collections passing `filter`, system ones only if `include_system`,
    /// sorted by name.
    #[must_use]
    pub fn select(
        &self,
        filter: &CollectionFilter,
        include_system: bool,
    ) -> Vec<&CollectionDescriptor> {
        self.iter()
            .filter(|d| include_system || !d.system)
            .filter(|d| filter.allows(&d.name))
            .collect()
    }
}
