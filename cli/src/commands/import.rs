use std::path::Path;

use anyhow::{Context, Result};

use tally_core::service::Tracker;

use super::helpers::{date_arg, json_error};

pub fn cmd_import(
    tracker: &Tracker,
    path: &Path,
    since: Option<String>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let since = since.map(Some).map(date_arg).transpose()?;

    let summary = tracker.import_metrics_csv(&data, since.as_deref(), dry_run)?;

    if summary.rows_parsed == 0 {
        if json {
            println!("{}", json_error("No rows found in CSV file"));
        } else {
            eprintln!("No rows found in CSV file.");
        }
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if dry_run {
        println!("Dry run — no changes made.\n");
        println!("  Rows parsed:      {}", summary.rows_parsed);
        println!("  Rows skipped:     {}", summary.rows_skipped);
        println!("  Days to create:   {}", summary.days_created);
        println!("  Days to update:   {}", summary.days_updated);
        println!("  Entries to log:   {}", summary.entries_created);
    } else {
        println!("Import complete.\n");
        println!("  Rows parsed:      {}", summary.rows_parsed);
        println!("  Rows skipped:     {}", summary.rows_skipped);
        println!("  Days created:     {}", summary.days_created);
        println!("  Days updated:     {}", summary.days_updated);
        println!("  Entries logged:   {}", summary.entries_created);
        println!("  Targets updated:  {}", summary.targets_recalculated);
    }

    Ok(())
}
