//! Atomic file output for exports.
//!
//! This module provides safe file operations that never leave a half-written
//! export behind:
//! - Atomic writes: write to a temp file, sync to disk, then rename
//! - [`AtomicFile`]: the same guarantee for output streamed page by page
//! - The export manifest, written the same way

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::sync::types::ExportedCollection;

/// File name of the export manifest.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Temp file next to `path`: `name.ext` becomes `name.ext.tmp`.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write content to a file atomically.
///
/// This function:
/// 1. Writes content to a temporary file next to `path`
/// 2. Calls `fsync` to ensure data is on disk
/// 3. Atomically renames the temp file to the target path
///
/// If any step fails, the original file (if any) remains untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let mut file = AtomicFile::create(path)?;
    file.write_all(content.as_bytes())?;
    file.commit()
}

/// A file written through a temp file and renamed into place on
/// [`commit`](Self::commit).
///
/// Dropping it without committing removes the temp file and leaves the
/// target untouched.
pub struct AtomicFile {
    path: PathBuf,
    temp_path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl AtomicFile {
    /// Open the temp file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or temp file cannot be created.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = temp_path(path);
        let writer = BufWriter::new(File::create(&temp_path)?);
        Ok(Self {
            path: path.to_path_buf(),
            temp_path,
            writer: Some(writer),
        })
    }

    /// Flush, `fsync` and rename over the target path.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing, syncing or renaming fails.
    pub fn commit(mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&self.temp_path, &self.path)?;
        Ok(())
    }

    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::other("atomic file already committed"))
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer()?.flush()
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        if self.writer.take().is_some() {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

/// Write `manifest.json` listing every exported collection and its count.
///
/// Nothing is written for an empty list.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_manifest(dir: &Path, collections: &[ExportedCollection]) -> Result<Option<PathBuf>> {
    if collections.is_empty() {
        return Ok(None);
    }
    let path = dir.join(MANIFEST_FILE);
    let mut content = serde_json::to_string_pretty(collections)?;
    content.push('\n');
    atomic_write(&path, &content)?;
    Ok(Some(path))
}
