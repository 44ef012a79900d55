//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::sync::SourceFormat;

pub mod commands;

/// pbsync - bulk import and export for PocketBase collections
#[derive(Parser, Debug)]
#[command(name = "pbsync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// PocketBase base URL, e.g. http://127.0.0.1:8090
    #[arg(long, global = true, env = "PB_URL")]
    pub url: Option<String>,

    /// Admin email for authentication
    #[arg(long, global = true, env = "PB_EMAIL")]
    pub email: Option<String>,

    /// Admin password (required with --email)
    #[arg(long, global = true, env = "PB_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Config file (default: ~/.pbsync/config.json)
    #[arg(long, global = true, env = "PBSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON (one object per line)
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import records from exported files
    Import(ImportArgs),

    /// Export collections to files
    Export(ExportArgs),

    /// List the collections of the instance
    Collections {
        /// Include system collections
        #[arg(long)]
        include_system: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print version information
    Version,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// File or directory of .json / .ndjson / .jsonl files
    pub input: PathBuf,

    /// Comma-separated collections to import (default: all)
    #[arg(long)]
    pub collections: Option<String>,

    /// Comma-separated collections to skip
    #[arg(long)]
    pub exclude: Option<String>,

    /// Upsert key as collection=field, or *=field for every collection (repeatable)
    #[arg(long, value_name = "COLLECTION=FIELD")]
    pub upsert: Vec<String>,

    /// Records per batch [default: 100]
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Concurrent requests per batch [default: 4]
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Seconds to pause between batches [default: 0]
    #[arg(long, allow_negative_numbers = true)]
    pub throttle: Option<f64>,

    /// Parse and count records without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip files whose collection does not exist instead of failing
    #[arg(long)]
    pub skip_missing: bool,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Directory to write exported files
    #[arg(default_value = "pocketbase_export")]
    pub output_dir: PathBuf,

    /// Comma-separated collections to export (default: all)
    #[arg(long)]
    pub collections: Option<String>,

    /// Comma-separated collections to skip
    #[arg(long)]
    pub exclude: Option<String>,

    /// Include system collections
    #[arg(long)]
    pub include_system: bool,

    /// Records per listing request [default: 200]
    #[arg(long)]
    pub page_size: Option<usize>,

    /// File format per collection
    #[arg(long, value_enum, default_value_t)]
    pub format: ExportFormat,
}

/// File format for `export`.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    /// One pretty JSON document per collection (default)
    #[default]
    Json,
    /// One record per line
    Ndjson,
}

impl From<ExportFormat> for SourceFormat {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Json => Self::Aggregated,
            ExportFormat::Ndjson => Self::LineDelimited,
        }
    }
}
