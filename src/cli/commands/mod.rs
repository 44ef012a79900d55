//! Command implementations.
//!
//! Shared plumbing for the remote commands: the async runtime, the
//! authenticated client, and console output that switches between
//! human-readable lines and one JSON object per line.

pub mod collections;
pub mod completions;
pub mod export;
pub mod import;
pub mod version;

use tokio::runtime::Runtime;
use tracing::debug;

use crate::cli::Cli;
use crate::config::{FileConfig, REQUEST_TIMEOUT};
use crate::error::{Error, Result};
use crate::remote::{HttpTransport, RemoteClient};

/// Create the runtime a remote command runs on.
pub(crate) fn runtime() -> Result<Runtime> {
    Runtime::new().map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))
}

/// Build a client for the configured instance and log in if credentials
/// were given.
///
/// The URL comes from `--url` / `PB_URL`, else the config file. The email
/// falls back to the config file too; the password never does.
pub(crate) async fn connect(cli: &Cli, config: &FileConfig) -> Result<RemoteClient<HttpTransport>> {
    let base_url = cli
        .url
        .as_deref()
        .or(config.base_url.as_deref())
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| {
            Error::InvalidArgument("PocketBase URL is required (--url or PB_URL)".to_string())
        })?;

    let client = RemoteClient::new(HttpTransport::new(REQUEST_TIMEOUT)?, base_url);

    match (cli.email.as_deref().or(config.email.as_deref()), cli.password.as_deref()) {
        (Some(email), Some(password)) => {
            let headers = client.authenticate(email, password).await?;
            Ok(client.with_headers(headers))
        }
        (Some(_), None) => Err(Error::InvalidArgument(
            "--password (or PB_PASSWORD) is required with --email".to_string(),
        )),
        (None, _) => {
            debug!(url = client.base_url(), "No credentials given, using anonymous access");
            Ok(client)
        }
    }
}

/// Where command output goes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Console {
    pub json: bool,
    pub quiet: bool,
}

impl Console {
    pub(crate) fn new(json: bool, quiet: bool) -> Self {
        Self { json, quiet }
    }

    /// Print a human-readable line unless in JSON or quiet mode.
    pub(crate) fn line(&self, text: impl std::fmt::Display) {
        if !self.json && !self.quiet {
            println!("{text}");
        }
    }

    /// Print one JSON object per line in JSON mode.
    pub(crate) fn event(&self, value: &serde_json::Value) {
        if self.json {
            println!("{value}");
        }
    }
}
