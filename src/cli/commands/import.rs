//! Import command implementation.

use std::path::Path;

use colored::Colorize;
use serde_json::json;
use tracing::info;

use super::{connect, runtime, Console};
use crate::cli::{Cli, ImportArgs};
use crate::config::{
    load_config, throttle_duration, CollectionFilter, FileConfig, UpsertMap, DEFAULT_BATCH_SIZE,
    DEFAULT_CONCURRENCY,
};
use crate::error::Result;
use crate::remote::CollectionCatalog;
use crate::sync::{
    discover_input_files, FileReport, FileStats, ImportOptions, ImportReport, ImportReporter,
    Importer, SkippedFile, MAX_FAILURE_SAMPLES,
};

/// Execute the import command.
///
/// Local input is validated before any network call: the upsert mapping,
/// the throttle value and the input path.
///
/// # Errors
///
/// Returns an error on invalid arguments, unreadable input, failed
/// authentication, or any fatal import condition.
pub fn execute(cli: &Cli, args: &ImportArgs, json: bool) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let options = build_options(args, &config)?;
    let files = discover_input_files(&args.input)?;
    info!(files = files.len(), input = %args.input.display(), "Discovered input files");

    let console = Console::new(json, cli.quiet);
    let dry_run = options.dry_run;

    runtime()?.block_on(async {
        let client = connect(cli, &config).await?;
        let catalog = CollectionCatalog::fetch(&client).await?;
        info!(collections = catalog.len(), "Fetched collection catalog");

        let reporter = ConsoleReporter { console };
        let report = Importer::new(&client, &catalog, options)
            .import_files(&files, &reporter)
            .await?;

        print_summary(console, &report, dry_run);
        Ok(())
    })
}

/// Merge flags over config file values over defaults.
fn build_options(args: &ImportArgs, config: &FileConfig) -> Result<ImportOptions> {
    // Flags come last so they override file entries for the same collection.
    let entries: Vec<&str> = config
        .upsert
        .iter()
        .chain(&args.upsert)
        .map(String::as_str)
        .collect();

    Ok(ImportOptions {
        upsert: UpsertMap::parse(&entries)?,
        filter: CollectionFilter::from_lists(args.collections.as_deref(), args.exclude.as_deref()),
        batch_size: args.batch_size.or(config.batch_size).unwrap_or(DEFAULT_BATCH_SIZE),
        concurrency: args.concurrency.or(config.concurrency).unwrap_or(DEFAULT_CONCURRENCY),
        throttle: throttle_duration(args.throttle.or(config.throttle).unwrap_or(0.0))?,
        dry_run: args.dry_run,
        skip_missing: args.skip_missing,
    })
}

struct ConsoleReporter {
    console: Console,
}

impl ImportReporter for ConsoleReporter {
    fn skipped(&self, skipped: &SkippedFile) {
        self.console.line(format!(
            "{} {}: {}",
            "Skipping".yellow(),
            skipped.file.display(),
            skipped.reason
        ));
        self.console.event(&json!({
            "event": "skipped",
            "file": skipped.file,
            "reason": skipped.reason.to_string(),
        }));
    }

    fn started(&self, file: &Path, collection: &str) {
        self.console.line(format!(
            "Importing {} -> {}",
            file.display(),
            collection.cyan()
        ));
        self.console.event(&json!({
            "event": "started",
            "file": file,
            "collection": collection,
        }));
    }

    fn finished(&self, report: &FileReport) {
        let stats = &report.stats;
        let counts = format!("{}/{}", stats.success, stats.total);
        let counts = if stats.failed() == 0 { counts.green() } else { counts.red() };
        self.console.line(format!("  {counts} records processed"));
        for line in failure_lines(stats) {
            self.console.line(line);
        }
        self.console.event(&json!({
            "event": "finished",
            "file": report.file,
            "collection": report.collection,
            "total": stats.total,
            "success": stats.success,
            "failed": stats.failed(),
            "batches": stats.batches,
            "failures": stats.failure_samples(),
        }));
    }
}

/// Failure count followed by the retained samples; empty when all succeeded.
fn failure_lines(stats: &FileStats) -> Vec<String> {
    let failed = stats.failed();
    if failed == 0 {
        return Vec::new();
    }
    let mut lines = vec![format!(
        "  {} (showing up to {MAX_FAILURE_SAMPLES}):",
        format!("{failed} failures").red()
    )];
    lines.extend(
        stats
            .failure_samples()
            .iter()
            .map(|failure| format!("    {} {failure}", "-".red())),
    );
    lines
}

fn print_summary(console: Console, report: &ImportReport, dry_run: bool) {
    if console.json {
        console.event(&json!({
            "event": "summary",
            "success": true,
            "dry_run": dry_run,
            "files": report.files.len(),
            "skipped": report.skipped.len(),
            "total": report.total(),
            "succeeded": report.success(),
            "failed": report.failed(),
        }));
        return;
    }

    console.line("");
    console.line(format!(
        "{} {}/{} records across {} file(s)",
        "Import complete:".bold(),
        report.success(),
        report.total(),
        report.files.len()
    ));
    if report.failed() > 0 {
        console.line(format!("  {} records failed", report.failed().to_string().red()));
    }
    if dry_run {
        console.line("  Dry run: nothing was written.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Commands;
    use crate::sync::Outcome;
    use clap::Parser;
    use std::time::Duration;

    fn import_args(extra: &[&str]) -> ImportArgs {
        let mut argv = vec!["pbsync", "import", "dump"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Import(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_flags_override_config_file() {
        let config = FileConfig {
            batch_size: Some(10),
            concurrency: Some(8),
            throttle: Some(1.5),
            upsert: vec!["widgets=code".into(), "*=slug".into()],
            ..FileConfig::default()
        };
        let args = import_args(&["--batch-size", "25", "--upsert", "widgets=sku"]);

        let options = build_options(&args, &config).unwrap();

        assert_eq!(options.batch_size, 25);
        assert_eq!(options.concurrency, 8);
        assert_eq!(options.throttle, Duration::from_millis(1500));
        assert_eq!(options.upsert.field_for("widgets"), Some("sku"));
        assert_eq!(options.upsert.field_for("posts"), Some("slug"));
    }

    #[test]
    fn test_defaults_without_config() {
        let options = build_options(&import_args(&[]), &FileConfig::default()).unwrap();

        assert_eq!(options.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(options.concurrency, DEFAULT_CONCURRENCY);
        assert!(options.throttle.is_zero());
        assert!(options.upsert.is_empty());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let config = FileConfig::default();
        assert!(build_options(&import_args(&["--upsert", "widgets"]), &config).is_err());
        assert!(build_options(&import_args(&["--throttle", "-1"]), &config).is_err());
        assert!(build_options(&import_args(&["--throttle", "1e20"]), &config).is_err());
    }

    #[test]
    fn test_failure_lines_report_count_before_samples() {
        let mut stats = FileStats::default();
        for i in 0..5 {
            stats.record(Outcome::failure(format!("HTTP 400: bad {i}")));
        }
        stats.record(Outcome::success());

        let lines = failure_lines(&stats);

        assert_eq!(lines.len(), 1 + MAX_FAILURE_SAMPLES);
        assert!(lines[0].contains("5 failures"));
        assert!(lines[0].contains("showing up to 3"));
        assert!(lines[1].contains("HTTP 400: bad 0"));
    }

    #[test]
    fn test_no_failure_lines_when_all_succeeded() {
        let mut stats = FileStats::default();
        stats.record(Outcome::success());

        assert!(failure_lines(&stats).is_empty());
    }
}
