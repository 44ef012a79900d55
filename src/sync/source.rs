//! Record sources.
//!
//! Reads records from exported files in two layouts:
//!
//! - **Line-delimited** (`.ndjson`, `.jsonl`): one JSON object per line,
//!   read lazily so large files are never held in memory
//! - **Aggregated** (`.json`): either an array of records or an object
//!   `{"collection": "...", "items": [...]}`
//!
//! A [`RecordSource`] can show its first record without consuming it, so
//! the importer can infer the target collection and still process every
//! record exactly once, in order.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Lines};
use std::iter::Peekable;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{declared_collection, Record};

/// File stem that marks an export manifest rather than data.
pub const MANIFEST_STEM: &str = "manifest";

/// On-disk layout of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// One document holding every record.
    Aggregated,
    /// One record per line.
    LineDelimited,
}

impl SourceFormat {
    /// Format implied by the file extension (case-insensitive).
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Aggregated),
            "ndjson" | "jsonl" => Some(Self::LineDelimited),
            _ => None,
        }
    }

    /// File extension used when writing this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Aggregated => "json",
            Self::LineDelimited => "ndjson",
        }
    }
}

fn is_manifest(path: &Path) -> bool {
    path.file_stem().and_then(|s| s.to_str()) == Some(MANIFEST_STEM)
}

/// List the files to import from `input`.
///
/// A file is returned as-is. A directory yields its `.json`, `.ndjson` and
/// `.jsonl` files sorted by path. Manifests are never returned.
///
/// # Errors
///
/// Returns `InputNotFound` if `input` does not exist and `NoInputFiles`
/// if nothing importable is found.
pub fn discover_input_files(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.exists() {
        return Err(Error::InputNotFound {
            path: input.to_path_buf(),
        });
    }

    let mut files = if input.is_file() {
        vec![input.to_path_buf()]
    } else {
        let mut files = Vec::new();
        for entry in fs::read_dir(input)? {
            let path = entry?.path();
            if path.is_file() && SourceFormat::from_path(&path).is_some() {
                files.push(path);
            }
        }
        files.sort();
        files
    };
    files.retain(|path| !is_manifest(path));

    if files.is_empty() {
        return Err(Error::NoInputFiles {
            path: input.to_path_buf(),
        });
    }
    Ok(files)
}

/// Boxed record iterator, so both layouts share one source type.
pub type RecordIter = Box<dyn Iterator<Item = Result<Record>> + Send>;

/// Records of one input file, with a non-consuming look at the first one.
pub struct RecordSource {
    path: PathBuf,
    declared_collection: Option<String>,
    records: Peekable<RecordIter>,
}

impl std::fmt::Debug for RecordSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordSource")
            .field("path", &self.path)
            .field("declared_collection", &self.declared_collection)
            .finish_non_exhaustive()
    }
}

impl RecordSource {
    /// Open `path`, picking the layout from its extension.
    ///
    /// Unknown extensions are read as an aggregated document.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be opened. Aggregated documents are
    /// parsed here and fail with `InvalidRecord` or `UnsupportedStructure`;
    /// line-delimited parse errors surface while iterating.
    pub fn open(path: &Path) -> Result<Self> {
        match SourceFormat::from_path(path).unwrap_or(SourceFormat::Aggregated) {
            SourceFormat::LineDelimited => Self::open_line_delimited(path),
            SourceFormat::Aggregated => Self::open_aggregated(path),
        }
    }

    fn open_line_delimited(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let records = LineRecords {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line: 0,
            done: false,
        };
        Ok(Self::new(path, None, Box::new(records)))
    }

    fn open_aggregated(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let document: Value = serde_json::from_str(&content).map_err(|e| Error::InvalidRecord {
            path: path.to_path_buf(),
            location: "document".to_string(),
            message: e.to_string(),
        })?;
        let (items, declared) = split_document(path, document)?;
        let records = items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| {
                let location = format!("item {}", idx + 1);
                into_record(item).map_err(|message| Error::InvalidRecord {
                    path: path.to_path_buf(),
                    location,
                    message,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_records(path, declared, records))
    }

    /// Wrap already-decoded records.
    pub fn from_records(
        path: &Path,
        declared_collection: Option<String>,
        records: Vec<Record>,
    ) -> Self {
        Self::new(path, declared_collection, Box::new(records.into_iter().map(Ok)))
    }

    fn new(path: &Path, declared_collection: Option<String>, records: RecordIter) -> Self {
        Self {
            path: path.to_path_buf(),
            declared_collection,
            records: records.peekable(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Collection named by the document itself (aggregated layout only).
    pub fn declared_collection(&self) -> Option<&str> {
        self.declared_collection.as_deref()
    }

    /// Look at the first remaining record without consuming it.
    ///
    /// # Errors
    ///
    /// Returns the parse error if the first record is invalid; that record
    /// is consumed.
    pub fn peek_first(&mut self) -> Result<Option<&Record>> {
        if matches!(self.records.peek(), Some(Err(_))) {
            if let Some(Err(e)) = self.records.next() {
                return Err(e);
            }
        }
        Ok(self.records.peek().and_then(|r| r.as_ref().ok()))
    }

    /// Target collection: the document's declared name, else the first
    /// record's `@collectionName`, else the file stem.
    ///
    /// # Errors
    ///
    /// Returns the parse error of an invalid first record.
    pub fn infer_collection(&mut self) -> Result<String> {
        if let Some(name) = self.declared_collection.clone() {
            return Ok(name);
        }
        if let Some(name) = self.peek_first()?.and_then(declared_collection) {
            return Ok(name.to_string());
        }
        Ok(self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default())
    }
}

impl Iterator for RecordSource {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next()
    }
}

/// Split an aggregated document into its items and declared collection.
fn split_document(path: &Path, document: Value) -> Result<(Vec<Value>, Option<String>)> {
    let unsupported = || Error::UnsupportedStructure {
        path: path.to_path_buf(),
    };
    match document {
        Value::Array(items) => Ok((items, None)),
        Value::Object(mut object) => {
            let declared = match object.remove("collection") {
                None | Some(Value::Null) => None,
                Some(Value::String(name)) => Some(name).filter(|n| !n.is_empty()),
                Some(_) => return Err(unsupported()),
            };
            let items = match object.remove("items") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items,
                Some(_) => return Err(unsupported()),
            };
            Ok((items, declared))
        }
        _ => Err(unsupported()),
    }
}

fn into_record(value: Value) -> std::result::Result<Record, String> {
    match value {
        Value::Object(record) => Ok(record),
        other => Err(format!("expected a JSON object, found {}", json_kind(&other))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Lazy reader for line-delimited files.
struct LineRecords {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line: usize,
    done: bool,
}

impl Iterator for LineRecords {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            };
            self.line += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let parsed = serde_json::from_str::<Value>(trimmed)
                .map_err(|e| e.to_string())
                .and_then(into_record);
            return Some(parsed.map_err(|message| Error::InvalidRecord {
                path: self.path.clone(),
                location: format!("line {}", self.line),
                message,
            }));
        }
    }
}
