//! Data models for pbsync.
//!
//! This module contains the wire-level domain models:
//! - Record (one row of a collection)
//! - CollectionDescriptor (one entry of the collection catalog)
//! - ListPage (paginated listing envelope)

pub mod collection;
pub mod page;
pub mod record;

pub use collection::CollectionDescriptor;
pub use page::ListPage;
pub use record::{declared_collection, record_id, Record};
