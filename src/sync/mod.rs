//! Import and export of collection records.
//!
//! This module moves records between files and a PocketBase instance:
//!
//! - **Source**: input discovery and record streams (`.json`, `.ndjson`)
//! - **Sanitize**: strips server-managed fields before a write
//! - **Processor**: upsert-or-create for a single record
//! - **Batch**: bounded fan-out of records, batch by batch
//! - **Import**: per-file orchestration and reporting
//! - **Export**: paginated dump of collections to files
//!
//! # Architecture
//!
//! Import flows one way:
//! 1. The catalog is fetched once per run
//! 2. Each file becomes a [`RecordSource`]; its collection is inferred
//! 3. The [`BatchScheduler`] fans each batch out to the [`RecordProcessor`]
//! 4. Workers return [`Outcome`]s; only the coordinator aggregates them
//!
//! # Example
//!
//! ```ignore
//! use pbsync::sync::{discover_input_files, ImportOptions, Importer, SilentReporter};
//!
//! let catalog = CollectionCatalog::fetch(&client).await?;
//! let files = discover_input_files(Path::new("pocketbase_export"))?;
//! let importer = Importer::new(&client, &catalog, ImportOptions::default());
//! let report = importer.import_files(&files, &SilentReporter).await?;
//! ```

mod batch;
mod export;
mod file;
mod import;
mod processor;
mod sanitize;
mod source;
mod types;

// Re-export main types and functions
pub use batch::{BatchScheduler, Batches};
pub use export::{ExportOptions, ExportReporter, Exporter};
pub use file::{atomic_write, write_manifest, AtomicFile, MANIFEST_FILE};
pub use import::{ImportOptions, ImportReporter, Importer, SilentReporter};
pub use processor::{RecordHandler, RecordProcessor};
pub use sanitize::{sanitize, DROP_KEYS};
pub use source::{discover_input_files, RecordIter, RecordSource, SourceFormat, MANIFEST_STEM};
pub use types::{
    ExportReport, ExportedCollection, FileReport, FileStats, ImportReport, Outcome, SkipReason,
    SkippedFile, MAX_FAILURE_SAMPLES,
};
