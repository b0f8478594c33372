//! OCR text cleanup.
//!
//! Removes glyphs and badges that confuse the field heuristics and builds the
//! views the extractors search.

use regex::Regex;
use std::sync::LazyLock;

static STARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[★☆✦✧⭐]").expect("valid regex"));
static SYMBOLS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[|©®™]").expect("valid regex"));
static XP_BADGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)xp\s*\d+").expect("valid regex"));
// OCR reads the XP badge as "XB" often enough to strip it too
static XB_BADGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)xb\s*\d+").expect("valid regex"));
static SEVEN_K_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)7k\b").expect("valid regex"));
static SINGLE_QUOTES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[‘’‚‛`´]").expect("valid regex"));
static DOUBLE_QUOTES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[“”„‟]").expect("valid regex"));
static LINE_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\r\n]+").expect("valid regex"));
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Views over one batch of OCR text.
#[derive(Debug, Clone)]
pub struct NormalizedText {
    /// Cleaned text upper-cased, line breaks kept
    pub upper: String,
    /// Trimmed, non-empty lines of the cleaned text, original case
    pub lines: Vec<String>,
    /// `upper` on one line with whitespace collapsed
    pub flat: String,
    /// Upper-cased flattened input before any cleanup (badges intact)
    pub raw_flat: String,
}

impl NormalizedText {
    pub fn new(raw: &str) -> Self {
        let text = clean_text(raw);
        let upper = text.to_uppercase();
        let lines = LINE_BREAK_RE
            .split(&text)
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            flat: flatten(&upper),
            raw_flat: flatten(&raw.to_uppercase()),
            upper,
            lines,
        }
    }
}

/// Strips decoration glyphs, symbols and badges, and canonicalizes quotes.
pub fn clean_text(raw: &str) -> String {
    let text = STARS_RE.replace_all(raw, "");
    let text = SYMBOLS_RE.replace_all(&text, " ");
    let text = strip_badges(&text);
    let text = SINGLE_QUOTES_RE.replace_all(&text, "'");
    let text = DOUBLE_QUOTES_RE.replace_all(&text, "\"");
    text.into_owned()
}

/// Removes badges until none are left, since one removal can join the
/// neighbours into a new badge ("XPXP 5 5").
fn strip_badges(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = XP_BADGE_RE.replace_all(&current, " ");
        let next = XB_BADGE_RE.replace_all(&next, " ");
        let next = SEVEN_K_RE.replace_all(&next, "");
        if next == current {
            return current;
        }
        current = next.into_owned();
    }
}

fn flatten(text: &str) -> String {
    let single = LINE_BREAK_RE.replace_all(text, " ");
    WHITESPACE_RE.replace_all(&single, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_symbols_and_badges() {
        let cleaned = clean_text("★ Gene-Seed Found XP 10 | Kills © 7k");
        assert!(!cleaned.contains('★'));
        assert!(!cleaned.contains('|'));
        assert!(!cleaned.contains("XP"));
        assert!(!cleaned.contains("7k"));
        assert!(cleaned.contains("Gene-Seed Found"));
    }

    #[test]
    fn test_normalizes_quotes() {
        assert_eq!(clean_text("‘Brother’ “Titus”"), "'Brother' \"Titus\"");
    }

    #[test]
    fn test_clean_is_idempotent() {
        let raw = "[LEFT]\n★ MISSION: INFERNO | xb 25\r\n\r\n  Kills 7k 12 “3”  \n";
        let once = clean_text(raw);
        assert_eq!(clean_text(&once), once);

        for raw in ["XPXP 5 5", "xb xp 3 4", "77kk", "XP7k 2"] {
            let once = clean_text(raw);
            assert_eq!(clean_text(&once), once, "input {raw:?}");
        }
        assert_eq!(clean_text("XPXP 5 5").trim(), "");
    }

    #[test]
    fn test_views() {
        let normalized = NormalizedText::new("Gene-Seed XP 10\r\n\r\n  Kills  1 2 3  \n");
        assert_eq!(normalized.lines, vec!["Gene-Seed", "Kills  1 2 3"]);
        assert_eq!(normalized.flat, "GENE-SEED KILLS 1 2 3 ");
        assert!(normalized.raw_flat.starts_with("GENE-SEED XP 10 KILLS"));
    }
}
