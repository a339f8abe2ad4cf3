use std::io::Write;

use anyhow::{Context, Result, anyhow};
use clap::Subcommand;
use serde_json::{Value, json};
use sheetstore::record::{record_from_json, record_to_json, records_from_json};
use sheetstore::{Filter, SheetStore};
use tracing::info;

use crate::args::TargetArgs;

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print records matching a filter, one json object per line.
    Select {
        #[command(flatten)]
        target: TargetArgs,
        /// Filter as a json object, e.g. '{"status__not": "done"}'.
        #[arg(short = 'w', long = "where")]
        filter: Option<String>,
    },
    /// Add records after the last row.
    Append {
        #[command(flatten)]
        target: TargetArgs,
        /// A json object or array of objects.
        #[arg(short, long)]
        records: String,
    },
    /// Add records into blank rows, appending when there are none.
    Insert {
        #[command(flatten)]
        target: TargetArgs,
        /// A json object or array of objects.
        #[arg(short, long)]
        records: String,
    },
    /// Add records into blank rows, or beneath the header when there are
    /// none.
    Prepend {
        #[command(flatten)]
        target: TargetArgs,
        /// A json object or array of objects.
        #[arg(short, long)]
        records: String,
    },
    /// Overwrite fields of matching rows.
    Update {
        #[command(flatten)]
        target: TargetArgs,
        #[arg(short = 'w', long = "where")]
        filter: String,
        /// Replacement cells as a json object.
        #[arg(short, long)]
        fields: String,
    },
    /// Blank out matching rows.
    Delete {
        #[command(flatten)]
        target: TargetArgs,
        #[arg(short = 'w', long = "where")]
        filter: String,
    },
}

impl Commands {
    pub async fn run<W: Write>(self, store: &SheetStore, out: &mut W) -> Result<()> {
        match self {
            Commands::Select { target, filter } => {
                let filter = match filter {
                    Some(filter) => Some(Filter::from_json(&parse_json_arg(&filter)?)?),
                    None => None,
                };
                let records = store
                    .select(&target.spreadsheet_id, &target.range, filter.as_ref())
                    .await?;
                for record in &records {
                    writeln!(out, "{}", record_to_json(record))?;
                }
            }
            Commands::Append { target, records } => {
                let records = records_from_json(&parse_json_arg(&records)?)?;
                store
                    .append(&target.spreadsheet_id, &target.range, &records)
                    .await?;
                info!(count = records.len(), "appended records");
            }
            Commands::Insert { target, records } => {
                let records = records_from_json(&parse_json_arg(&records)?)?;
                store
                    .insert(&target.spreadsheet_id, &target.range, &records)
                    .await?;
                info!(count = records.len(), "inserted records");
            }
            Commands::Prepend { target, records } => {
                let records = records_from_json(&parse_json_arg(&records)?)?;
                store
                    .prepend(&target.spreadsheet_id, &target.range, &records)
                    .await?;
                info!(count = records.len(), "prepended records");
            }
            Commands::Update {
                target,
                filter,
                fields,
            } => {
                let filter = Filter::from_json(&parse_json_arg(&filter)?)?;
                let fields = record_from_json(&parse_json_arg(&fields)?)?;
                let updated = store
                    .update(&target.spreadsheet_id, &target.range, &filter, &fields)
                    .await?;
                writeln!(out, "{}", json!({ "updated": updated }))?;
            }
            Commands::Delete { target, filter } => {
                let filter = Filter::from_json(&parse_json_arg(&filter)?)?;
                let deleted = store
                    .delete(&target.spreadsheet_id, &target.range, &filter)
                    .await?;
                writeln!(out, "{}", json!({ "deleted": deleted }))?;
            }
        }
        Ok(())
    }
}

/// Parse a json argument. `@path` reads the json from a file.
pub fn parse_json_arg(arg: &str) -> Result<Value> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read json from '{path}'"))?,
        None => arg.to_string(),
    };
    if text.trim().is_empty() {
        return Err(anyhow!("expected json, got an empty argument"));
    }
    serde_json::from_str(&text).context("invalid json argument")
}
