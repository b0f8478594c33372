//! OCR debug report.
//!
//! A plain-text dump of what a batch detected next to the raw OCR text, with
//! the stat lines that usually need checking pulled out.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, SecondsFormat};
use regex::Regex;
use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::info;

use super::BatchOutcome;

static LINE_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\r\n]+").expect("valid regex"));
static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

/// Keywords whose lines are listed in the analysis section.
const ANALYSIS_KEYWORDS: &[&str] = &["KILL", "INCAP", "DAMAGE"];

/// Builds the report text.
pub fn render_report(outcome: &BatchOutcome, generated_at: DateTime<Local>) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_sections(&mut out, outcome, generated_at);
    out
}

fn write_sections(out: &mut String, outcome: &BatchOutcome, generated_at: DateTime<Local>) -> fmt::Result {
    writeln!(out, "=== OCR DEBUG EXPORT ===")?;
    writeln!(out, "Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(out, "Timestamp: {}", generated_at.to_rfc3339_opts(SecondsFormat::Millis, false))?;
    writeln!(out, "Sources: {}\n", outcome.sources.join(", "))?;

    writeln!(out, "=== OCR PASSES ===")?;
    for pass in &outcome.passes {
        writeln!(out, "{} {} ({} chars)", pass.region.marker(), pass.engine, pass.text.chars().count())?;
    }
    writeln!(out, "Fallback key used: {}\n", if outcome.used_fallback { "yes" } else { "no" })?;

    writeln!(out, "=== DETECTED VALUES ===")?;
    if outcome.results.is_empty() {
        writeln!(out, "(none)")?;
    }
    for (key, value) in outcome.results.iter() {
        writeln!(out, "{}: {}", key, value)?;
    }

    writeln!(out, "\n=== RAW OCR TEXT ===")?;
    writeln!(out, "{}\n", outcome.raw_text)?;

    writeln!(out, "=== ANALYSIS ===")?;
    let lines: Vec<&str> = LINE_BREAK_RE.split(&outcome.raw_text).collect();
    for (n, keyword) in ANALYSIS_KEYWORDS.iter().enumerate() {
        if n > 0 {
            writeln!(out)?;
        }
        writeln!(out, "Lines containing '{}' (case-insensitive):", keyword)?;
        for (i, line) in lines.iter().enumerate() {
            if !line.to_uppercase().contains(keyword) {
                continue;
            }
            let numbers: Vec<&str> = NUMBER_RE.find_iter(line).map(|m| m.as_str()).collect();
            writeln!(out, "  Line {}: {}", i, line)?;
            if numbers.is_empty() {
                writeln!(out, "    Numbers found: NONE")?;
            } else {
                writeln!(out, "    Numbers found: {}", numbers.join(", "))?;
            }
        }
    }
    Ok(())
}

/// Writes `ocr_debug_<unix-millis>.txt` into `dir` and returns its path.
pub fn write_report(dir: &Path, outcome: &BatchOutcome) -> Result<PathBuf> {
    let now = Local::now();
    let path = dir.join(format!("ocr_debug_{}.txt", now.timestamp_millis()));

    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    fs::write(&path, render_report(outcome, now))
        .with_context(|| format!("Failed to write debug report {}", path.display()))?;

    info!("Debug report saved to {}", path.display());
    Ok(path)
}
