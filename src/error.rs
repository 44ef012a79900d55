//! Error types for pbsync.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (3=not_found, 4=validation, 5=remote, etc.)
//! - Retryability flags for transient remote failures
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pbsync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Maximum number of characters of a response body kept in a diagnostic.
pub const DIAGNOSTIC_BODY_LIMIT: usize = 200;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts can match on either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Not Found (exit 3)
    InputNotFound,
    NoInputFiles,
    CollectionNotFound,

    // Validation (exit 4)
    InvalidArgument,

    // Remote (exit 5)
    AuthFailed,
    HttpError,
    RemoteUnavailable,
    NetworkError,

    // Sync (exit 6)
    UnsupportedStructure,
    InvalidRecord,
    NothingToExport,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::InputNotFound => "INPUT_NOT_FOUND",
            Self::NoInputFiles => "NO_INPUT_FILES",
            Self::CollectionNotFound => "COLLECTION_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::AuthFailed => "AUTH_FAILED",
            Self::HttpError => "HTTP_ERROR",
            Self::RemoteUnavailable => "REMOTE_UNAVAILABLE",
            Self::NetworkError => "NETWORK_ERROR",
            Self::UnsupportedStructure => "UNSUPPORTED_STRUCTURE",
            Self::InvalidRecord => "INVALID_RECORD",
            Self::NothingToExport => "NOTHING_TO_EXPORT",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::InputNotFound | Self::NoInputFiles | Self::CollectionNotFound => 3,
            Self::InvalidArgument => 4,
            Self::AuthFailed | Self::HttpError | Self::RemoteUnavailable | Self::NetworkError => 5,
            Self::UnsupportedStructure | Self::InvalidRecord | Self::NothingToExport => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether re-running the same command later may succeed unchanged.
    ///
    /// True for rate limiting, temporary unavailability and connection
    /// failures. False for everything that needs different input.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteUnavailable | Self::NetworkError)
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in pbsync operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Input path {} does not exist", path.display())]
    InputNotFound { path: PathBuf },

    #[error("No data files found in {}", path.display())]
    NoInputFiles { path: PathBuf },

    #[error("Collection '{name}' not found in PocketBase")]
    CollectionNotFound { name: String },

    #[error("Unsupported JSON structure in {}", path.display())]
    UnsupportedStructure { path: PathBuf },

    #[error("Invalid record in {} ({location}): {message}", path.display())]
    InvalidRecord {
        path: PathBuf,
        /// Where in the file, e.g. `line 12` or `item 3`.
        location: String,
        message: String,
    },

    #[error("No collections selected for export")]
    NothingToExport,

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::InputNotFound { .. } => ErrorCode::InputNotFound,
            Self::NoInputFiles { .. } => ErrorCode::NoInputFiles,
            Self::CollectionNotFound { .. } => ErrorCode::CollectionNotFound,
            Self::UnsupportedStructure { .. } => ErrorCode::UnsupportedStructure,
            Self::InvalidRecord { .. } => ErrorCode::InvalidRecord,
            Self::NothingToExport => ErrorCode::NothingToExport,
            Self::AuthFailed(_) => ErrorCode::AuthFailed,
            Self::Http { status, .. } => {
                if is_transient_status(*status) {
                    ErrorCode::RemoteUnavailable
                } else {
                    ErrorCode::HttpError
                }
            }
            Self::Request(_) => ErrorCode::NetworkError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Short single-line diagnostic used in per-record failure samples.
    ///
    /// HTTP failures keep the status and at most
    /// [`DIAGNOSTIC_BODY_LIMIT`] characters of the response body.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Http { status, body } => {
                format!("HTTP {status}: {}", truncate_chars(body, DIAGNOSTIC_BODY_LIMIT))
            }
            other => other.to_string(),
        }
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::InputNotFound { .. } => {
                Some("Pass a file or a directory produced by `pbsync export`.".to_string())
            }

            Self::NoInputFiles { .. } => Some(
                "Only .json, .ndjson and .jsonl files are imported (manifest.json is ignored)."
                    .to_string(),
            ),

            Self::CollectionNotFound { name } => Some(format!(
                "Create '{name}' first, exclude it with `--exclude {name}`, \
                 or pass `--skip-missing` to skip files without a target collection."
            )),

            Self::UnsupportedStructure { .. } => Some(
                "Expected an array of records or an object with `collection` and `items`."
                    .to_string(),
            ),

            Self::AuthFailed(_) => {
                Some("Check --email / --password (or PB_EMAIL / PB_PASSWORD).".to_string())
            }

            Self::Http { status: 401 | 403, .. } => Some(
                "The request was rejected. Authenticate with an admin account via --email."
                    .to_string(),
            ),

            Self::Http { status, .. } if is_transient_status(*status) => Some(
                "The server is busy. Retry later or lower --concurrency / raise --throttle."
                    .to_string(),
            ),

            Self::NothingToExport => Some(
                "Check --collections / --exclude, or pass --include-system.".to_string(),
            ),

            Self::InvalidArgument(msg) if msg.contains("upsert") => Some(
                "Use --upsert collection=field, or --upsert '*=field' for every collection."
                    .to_string(),
            ),

            Self::InvalidRecord { .. }
            | Self::Http { .. }
            | Self::Request(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::InvalidArgument(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

/// Statuses that signal "try again later": 429 rate limited, 503 unavailable.
#[must_use]
pub const fn is_transient_status(status: u16) -> bool {
    matches!(status, 429 | 503)
}

/// Truncate to at most `max` characters without splitting a code point.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
