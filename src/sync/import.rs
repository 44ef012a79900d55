//! Import orchestration.
//!
//! For each input file the importer:
//!
//! 1. Opens a [`RecordSource`] and peeks at the first record
//! 2. Skips empty files
//! 3. Infers the target collection and applies the include / exclude filter
//! 4. Checks the collection exists remotely (skip or abort)
//! 5. Streams the records through the [`BatchScheduler`]
//!
//! A fatal error aborts the remaining files. Files already finished keep
//! their reported results; nothing is rolled back.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::config::{CollectionFilter, UpsertMap, DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENCY};
use crate::error::{Error, Result};
use crate::remote::{CollectionCatalog, RemoteClient, Transport};
use crate::sync::batch::BatchScheduler;
use crate::sync::processor::RecordProcessor;
use crate::sync::source::RecordSource;
use crate::sync::types::{FileReport, ImportReport, SkipReason, SkippedFile};

/// Receives per-file progress while an import runs.
///
/// Every method defaults to doing nothing.
pub trait ImportReporter {
    /// A file was passed over.
    fn skipped(&self, _skipped: &SkippedFile) {}

    /// Records of `file` are about to be sent to `collection`.
    fn started(&self, _file: &Path, _collection: &str) {}

    /// A file was fully processed.
    fn finished(&self, _report: &FileReport) {}
}

/// Reporter that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

impl ImportReporter for SilentReporter {}

/// Settings for one import run. Read-only once the run starts.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub upsert: UpsertMap,
    pub filter: CollectionFilter,
    pub batch_size: usize,
    pub concurrency: usize,
    /// Pause between batches.
    pub throttle: Duration,
    /// Parse and count records without writing anything.
    pub dry_run: bool,
    /// Skip files whose collection does not exist instead of aborting.
    pub skip_missing: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            upsert: UpsertMap::default(),
            filter: CollectionFilter::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            throttle: Duration::ZERO,
            dry_run: false,
            skip_missing: false,
        }
    }
}

/// What to do with one file.
enum FilePlan {
    Import(String),
    Skip(SkipReason),
}

/// Imports record files into a remote store.
pub struct Importer<'a, T> {
    client: &'a RemoteClient<T>,
    catalog: &'a CollectionCatalog,
    options: ImportOptions,
}

impl<'a, T: Transport> Importer<'a, T> {
    /// `catalog` must have been fetched from the same store as `client`.
    #[must_use]
    pub fn new(
        client: &'a RemoteClient<T>,
        catalog: &'a CollectionCatalog,
        options: ImportOptions,
    ) -> Self {
        Self {
            client,
            catalog,
            options,
        }
    }

    #[must_use]
    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Import `files` in order.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: an unreadable or malformed file, or a
    /// missing collection without `skip_missing`. Record failures are
    /// counted in the report instead.
    pub async fn import_files<R: ImportReporter>(
        &self,
        files: &[PathBuf],
        reporter: &R,
    ) -> Result<ImportReport> {
        let processor = RecordProcessor::new(self.client, self.options.dry_run);
        let scheduler = BatchScheduler::new(
            self.options.batch_size,
            self.options.concurrency,
            self.options.throttle,
        );
        let mut report = ImportReport::default();

        for path in files {
            let mut source = RecordSource::open(path)?;

            let collection = match self.plan(&mut source)? {
                FilePlan::Import(collection) => collection,
                FilePlan::Skip(reason) => {
                    let skipped = SkippedFile {
                        file: path.clone(),
                        reason,
                    };
                    reporter.skipped(&skipped);
                    report.skipped.push(skipped);
                    continue;
                }
            };

            reporter.started(path, &collection);
            let upsert_field = self.options.upsert.field_for(&collection);
            let stats = scheduler
                .run(&processor, &collection, upsert_field, source)
                .await?;

            info!(
                file = %path.display(),
                collection = %collection,
                total = stats.total,
                success = stats.success,
                "File imported"
            );
            let file_report = FileReport {
                file: path.clone(),
                collection,
                stats,
            };
            reporter.finished(&file_report);
            report.files.push(file_report);
        }

        Ok(report)
    }

    /// Decide whether and where a file is imported.
    fn plan(&self, source: &mut RecordSource) -> Result<FilePlan> {
        let path = source.path().display().to_string();

        if source.peek_first()?.is_none() {
            warn!(file = %path, "No records found, skipping");
            return Ok(FilePlan::Skip(SkipReason::Empty));
        }

        let collection = source.infer_collection()?;

        if let Some(rejection) = self.options.filter.check(&collection) {
            info!(file = %path, collection = %collection, %rejection, "Skipping file");
            return Ok(FilePlan::Skip(SkipReason::Filtered {
                collection,
                rejection,
            }));
        }

        if !self.catalog.contains(&collection) {
            if self.options.skip_missing {
                warn!(file = %path, collection = %collection, "Collection not found, skipping");
                return Ok(FilePlan::Skip(SkipReason::MissingCollection(collection)));
            }
            return Err(Error::CollectionNotFound { name: collection });
        }

        Ok(FilePlan::Import(collection))
    }
}
