//! Player-name recovery from a single OCR line.

use regex::Regex;
use std::sync::LazyLock;

/// Words from the result screen UI that look like names but never are.
const GAME_TERMS: &[&str] = &[
    "Kills", "Special", "Melee", "Ranged", "Damage", "Items", "Total", "Score", "Next", "Status",
    "Mission", "Rewards", "Character", "Progress", "Primary", "Secondary", "Objectives", "Found",
    "Taken", "Revived", "Incap", "Success", "Assault", "Vanguard", "Bulwark", "Tactical", "Sniper",
    "Heavy", "TRUER", "SYREN",
];

// Name inside a tag bracket, e.g. "[jr Titus q" or "[Brocco]"
static BRACKET_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[(?:jr\s+)?([A-ZÄÖÜ][a-zäöüßà-ÿ0-9]+(?:\s+[A-Za-zäöüßà-ÿ0-9]+)*)\s*[qQ\]®]")
        .expect("valid regex")
});
static BRACKET_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(Kills|Special|Heavy|Assault|Bulwark|Vanguard|Tactical|Sniper)")
        .expect("valid regex")
});
static TRAILING_LETTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+[a-zA-Z]$").expect("valid regex"));
static REGION_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\[?(LEFT|RIGHT)\]?$").expect("valid regex"));
static BRACKETED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[.*?\]").expect("valid regex"));
static PROPER_CASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-ZÄÖÜ][a-zäöüßà-ÿ0-9]{2,}(?:\s+[A-ZÄÖÜ]?[a-zäöüßà-ÿ0-9]{2,})*)\b")
        .expect("valid regex")
});
static MIXED_CASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-ZÄÖÜ][A-Za-zäöüßÀ-ÿ0-9]{3,})\b").expect("valid regex"));
static TRAILING_NOISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+[a-z]{1,2}$").expect("valid regex"));
static TRAILING_SHORT_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\S{1,2}$").expect("valid regex"));

/// Pulls a plausible player name out of one line, if any.
///
/// A name inside a tag bracket wins. Otherwise brackets are removed and the
/// line is searched for a proper-case run of words, then for a single
/// mixed-case token.
pub fn extract_player_name(line: &str) -> Option<String> {
    if let Some(caps) = BRACKET_NAME_RE.captures(line) {
        let inner = &caps[1];
        if inner.chars().count() >= 3 {
            let extracted = TRAILING_LETTER_RE.replace(inner.trim(), "").trim().to_string();
            if extracted.eq_ignore_ascii_case("LEFT") || extracted.eq_ignore_ascii_case("RIGHT") {
                return None;
            }
            if !BRACKET_PREFIX_RE.is_match(&extracted) {
                return Some(extracted);
            }
        }
    }

    let clean_line = BRACKETED_RE.replace_all(line, "");
    let clean_line = clean_line.trim();
    if REGION_MARKER_RE.is_match(clean_line) {
        return None;
    }

    if let Some(caps) = PROPER_CASE_RE.captures(clean_line) {
        let candidate = &caps[1];
        if is_valid_name(candidate) {
            let cleaned = TRAILING_NOISE_RE.replace(candidate, "");
            let cleaned = TRAILING_SHORT_TOKEN_RE.replace(cleaned.trim(), "");
            return Some(cleaned.trim().to_string());
        }
    }

    if let Some(caps) = MIXED_CASE_RE.captures(clean_line) {
        let candidate = &caps[1];
        if is_valid_name(candidate) {
            return Some(candidate.to_string());
        }
    }

    None
}

/// Plausibility filter for name candidates.
pub fn is_valid_name(name: &str) -> bool {
    let chars: Vec<char> = name.chars().collect();
    let len = chars.len();
    if len < 3 {
        return false;
    }

    if GAME_TERMS.iter().any(|term| term.eq_ignore_ascii_case(name)) {
        return false;
    }

    // "EEE", "lll"
    let first = chars[0].to_lowercase().to_string();
    if chars[1..].iter().all(|c| c.to_lowercase().to_string() == first) {
        return false;
    }

    let interior_capitals = chars[1..len - 1].iter().filter(|c| c.is_ascii_uppercase()).count();
    if len <= 5 && interior_capitals > 1 {
        return false;
    }

    if name == name.to_uppercase() && len < 4 {
        return false;
    }

    // Gamer tags may carry digits, but mostly letters
    let letters = chars.iter().filter(|c| is_name_letter(**c)).count();
    if (letters as f64) < len as f64 * 0.4 {
        return false;
    }

    true
}

fn is_name_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, 'ä' | 'ö' | 'ü' | 'Ä' | 'Ö' | 'Ü' | 'ß' | 'À'..='ÿ')
}
