//! Sync types for import/export.
//!
//! Per-record outcomes, per-file statistics and the run reports handed
//! back to the command layer.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::FilterRejection;

/// Number of failure diagnostics shown per file.
pub const MAX_FAILURE_SAMPLES: usize = 3;

/// Result of processing one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub success: bool,
    /// Diagnostic for a failed record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Outcome {
    #[must_use]
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}

/// Running totals for one input file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileStats {
    /// Records processed.
    pub total: usize,
    /// Records that succeeded.
    pub success: usize,
    /// Every failure diagnostic, in completion order.
    pub failures: Vec<String>,
    /// Batches dispatched.
    pub batches: usize,
}

impl FileStats {
    /// Fold one outcome into the totals.
    pub fn record(&mut self, outcome: Outcome) {
        self.total += 1;
        if outcome.success {
            self.success += 1;
        } else if let Some(message) = outcome.error {
            self.failures.push(message);
        }
    }

    /// Records that did not succeed, with or without a diagnostic.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.total - self.success
    }

    /// The first few failure diagnostics, for display.
    #[must_use]
    pub fn failure_samples(&self) -> &[String] {
        &self.failures[..self.failures.len().min(MAX_FAILURE_SAMPLES)]
    }
}

/// Statistics for one imported file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: PathBuf,
    pub collection: String,
    #[serde(flatten)]
    pub stats: FileStats,
}

/// Why an input file was not imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The file holds no records.
    Empty,
    /// The collection was filtered out by `--collections` / `--exclude`.
    Filtered {
        collection: String,
        rejection: FilterRejection,
    },
    /// The collection does not exist remotely and `--skip-missing` is set.
    MissingCollection(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "no records"),
            Self::Filtered {
                collection,
                rejection,
            } => write!(f, "collection '{collection}' {rejection}"),
            Self::MissingCollection(name) => write!(f, "collection '{name}' not found"),
        }
    }
}

/// A file the importer passed over.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub file: PathBuf,
    pub reason: SkipReason,
}

/// Statistics for a whole import run.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub files: Vec<FileReport>,
    pub skipped: Vec<SkippedFile>,
}

impl ImportReport {
    /// Records processed across all files.
    #[must_use]
    pub fn total(&self) -> usize {
        self.files.iter().map(|f| f.stats.total).sum()
    }

    /// Records that succeeded across all files.
    #[must_use]
    pub fn success(&self) -> usize {
        self.files.iter().map(|f| f.stats.success).sum()
    }

    /// Records that failed across all files.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.total() - self.success()
    }
}

/// One exported collection.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedCollection {
    pub collection: String,
    pub records: usize,
    #[serde(skip)]
    pub path: PathBuf,
}

/// Statistics for an export run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    pub output_dir: PathBuf,
    pub collections: Vec<ExportedCollection>,
}

impl ExportReport {
    /// Total records written.
    #[must_use]
    pub fn total(&self) -> usize {
        self.collections.iter().map(|c| c.records).sum()
    }
}
