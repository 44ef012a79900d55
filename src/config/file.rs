//! Config file loading.
//!
//! Reads defaults from `~/.pbsync/config.json`. Every key is optional and
//! command-line flags (or their environment variables) always win.
//! Credentials other than the email are never read from this file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Defaults loaded from the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub email: Option<String>,
    pub batch_size: Option<usize>,
    pub concurrency: Option<usize>,
    /// Seconds to pause between import batches.
    pub throttle: Option<f64>,
    pub page_size: Option<usize>,
    /// `collection=field` entries, same syntax as `--upsert`.
    #[serde(default)]
    pub upsert: Vec<String>,
}

/// Get the default config file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".pbsync").join("config.json"))
}

/// Load the config file.
///
/// With an explicit `path` the file must exist. Without one, the default
/// location is used and a missing file yields empty defaults.
///
/// # Errors
///
/// Returns `Config` if the file cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<FileConfig> {
    let (path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => match default_config_path() {
            Some(p) => (p, false),
            None => return Ok(FileConfig::default()),
        },
    };

    if !path.exists() {
        if required {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return Ok(FileConfig::default());
    }

    let content = fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_explicit_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"base_url":"http://pb.local/","batch_size":50,"upsert":["*=slug"]}"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://pb.local/"));
        assert_eq!(config.batch_size, Some(50));
        assert_eq!(config.upsert, vec!["*=slug".to_string()]);
        assert_eq!(config.concurrency, None);
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let dir = TempDir::new().unwrap();
        let err = load_config(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unknown_key_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"password":"hunter2"}"#).unwrap();
        assert!(matches!(load_config(Some(&path)), Err(Error::Config(_))));
    }
}
