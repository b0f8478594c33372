//! CSV archive of batch results.
//!
//! Writes one row per batch in append-only mode, so rows from earlier runs
//! survive a crash. Columns: timestamp, source files, then every result key
//! in schema order. Undetected fields are empty cells.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::extract::{ResultKey, ResultMap};

/// Header row: `timestamp,sources,mission-name,...,p3-revived`.
pub fn csv_header() -> String {
    let mut columns = vec!["timestamp".to_string(), "sources".to_string()];
    columns.extend(ResultKey::all().iter().map(ResultKey::to_string));
    columns.join(",")
}

/// Initializes CSV file with header if it doesn't exist or is empty.
///
/// If the file exists and has content, this does nothing (preserves existing data).
pub fn init_csv(path: &Path) -> Result<()> {
    if path.exists() {
        let file = File::open(path).context("Failed to open existing CSV")?;
        let reader = BufReader::new(file);
        if reader.lines().next().is_some() {
            return Ok(());
        }
    }

    let mut file = File::create(path).context("Failed to create CSV file")?;
    writeln!(file, "{}", csv_header()).context("Failed to write CSV header")?;
    Ok(())
}

/// Quotes a cell containing a comma, quote or line break.
fn escape_cell(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn format_row(timestamp: DateTime<Local>, sources: &[String], results: &ResultMap) -> String {
    let mut cells = vec![
        timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
        escape_cell(&sources.join(";")).into_owned(),
    ];
    cells.extend(ResultKey::all().into_iter().map(|key| {
        results
            .get(key)
            .map(|value| escape_cell(&value.to_string()).into_owned())
            .unwrap_or_default()
    }));
    cells.join(",")
}

/// Appends one batch row, writing the header first if the file is new.
pub fn append_results(
    path: &Path,
    timestamp: DateTime<Local>,
    sources: &[String],
    results: &ResultMap,
) -> Result<()> {
    init_csv(path)?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open CSV for append")?;

    writeln!(file, "{}", format_row(timestamp, sources, results)).context("Failed to write CSV row")?;
    Ok(())
}
