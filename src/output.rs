use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::scrape::Record;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

/// Write the result set to `path` in the requested format.
pub fn save_output(items: &[Record], path: &Path, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => to_json(items)?,
        OutputFormat::Csv => to_csv(items)?,
    };
    std::fs::write(path, rendered)
        .with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("Saved {} items to {}", items.len(), path.display());
    Ok(())
}

/// Pretty-printed JSON array of record objects.
pub fn to_json(items: &[Record]) -> Result<String> {
    Ok(serde_json::to_string_pretty(items)?)
}

/// CSV with a header row taken from the first record's keys, one row per
/// record. Missing values become empty cells. An empty result set renders
/// as an empty document (the CLI short-circuits before writing one).
pub fn to_csv(items: &[Record]) -> Result<String> {
    let Some(first) = items.first() else {
        return Ok(String::new());
    };

    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(first.keys())?;
    for record in items {
        writer.write_record(record.values().map(|value| value.unwrap_or_default()))?;
    }

    Ok(String::from_utf8(writer.into_inner()?)?)
}
