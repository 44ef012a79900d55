//! Export command implementation.

use std::fs;

use colored::Colorize;
use serde_json::json;

use super::{connect, runtime, Console};
use crate::cli::{Cli, ExportArgs};
use crate::config::{load_config, CollectionFilter, DEFAULT_PAGE_SIZE};
use crate::error::Result;
use crate::remote::CollectionCatalog;
use crate::sync::{ExportOptions, ExportReporter, ExportedCollection, Exporter};

/// Execute the export command.
///
/// # Errors
///
/// Returns an error if authentication fails, nothing is selected, or a
/// collection cannot be listed or written.
pub fn execute(cli: &Cli, args: &ExportArgs, json: bool) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let options = ExportOptions {
        filter: CollectionFilter::from_lists(args.collections.as_deref(), args.exclude.as_deref()),
        include_system: args.include_system,
        page_size: args.page_size.or(config.page_size).unwrap_or(DEFAULT_PAGE_SIZE),
        format: args.format.into(),
    };
    let console = Console::new(json, cli.quiet);

    runtime()?.block_on(async {
        let client = connect(cli, &config).await?;
        let catalog = CollectionCatalog::fetch(&client).await?;
        let exporter = Exporter::new(&client, args.output_dir.clone(), options);

        let report = exporter.export(&catalog, &ConsoleReporter { console }).await?;

        let output_dir = fs::canonicalize(exporter.output_dir())
            .unwrap_or_else(|_| exporter.output_dir().to_path_buf());
        console.line(format!(
            "{} {}",
            "Completed export to".bold(),
            output_dir.display()
        ));
        console.event(&json!({
            "event": "summary",
            "success": true,
            "output_dir": output_dir,
            "collections": report.collections,
            "total": report.total(),
        }));
        Ok(())
    })
}

struct ConsoleReporter {
    console: Console,
}

impl ExportReporter for ConsoleReporter {
    fn exported(&self, collection: &ExportedCollection) {
        self.console.line(format!(
            "Exported {}: {} records",
            collection.collection.cyan(),
            collection.records
        ));
        self.console.event(&json!({
            "event": "exported",
            "collection": collection.collection,
            "records": collection.records,
            "file": collection.path,
        }));
    }
}
