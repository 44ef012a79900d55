//! Collections command implementation.

use colored::Colorize;

use super::{connect, runtime};
use crate::cli::Cli;
use crate::config::load_config;
use crate::error::Result;
use crate::model::CollectionDescriptor;
use crate::remote::CollectionCatalog;

/// List the collections of the instance, sorted by name.
///
/// # Errors
///
/// Returns an error if authentication or the catalog listing fails.
pub fn execute(cli: &Cli, include_system: bool, json: bool) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    let catalog = runtime()?.block_on(async {
        let client = connect(cli, &config).await?;
        CollectionCatalog::fetch(&client).await
    })?;

    let collections: Vec<&CollectionDescriptor> = catalog
        .iter()
        .filter(|c| include_system || !c.system)
        .collect();

    if json {
        println!("{}", serde_json::to_string(&collections)?);
        return Ok(());
    }

    if cli.quiet {
        return Ok(());
    }

    if collections.is_empty() {
        println!("No collections found.");
        return Ok(());
    }

    let width = collections.iter().map(|c| c.name.len()).max().unwrap_or(0);
    for collection in &collections {
        let kind = collection.kind.as_deref().unwrap_or("base");
        let system = if collection.system {
            " (system)".dimmed().to_string()
        } else {
            String::new()
        };
        println!("{:<width$}  {}{system}", collection.name.cyan(), kind);
    }
    println!();
    println!("{} collection(s)", collections.len());
    Ok(())
}
