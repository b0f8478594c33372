//! Mission-level fields: name, difficulty, objective, gene-seed and waves.

use regex::Regex;
use std::sync::LazyLock;

use super::normalize::NormalizedText;
use super::results::{ResultKey, ResultMap};

pub const KNOWN_MISSIONS: &[&str] = &[
    "RECLAMATION",
    "INFERNO",
    "BALLISTIC",
    "DECAPITATION",
    "SERVO",
    "SKULL",
    "VANGUARD",
    "VOIDSONG",
    "RELIQUARY",
    "TERMINATION",
    "EXTRACTION",
    "ATHENA",
];

/// Difficulty tiers, easiest first.
pub const DIFFICULTIES: &[&str] = &["MINIMAL", "AVERAGE", "SUBSTANTIAL", "RUTHLESS", "LETHAL", "ABSOLUTE"];

static MISSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"MISSION\s*[:\-=]?\s*([A-Z][A-Z\s\-']{2,30})").expect("valid regex")
});
static STATUS_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*STATUS.*$").expect("valid regex"));
static OBJECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)STATUS\s*[:\-=]?\s*SUCCESS|\bVICTORY\b").expect("valid regex")
});
static GENESEED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)GENE.?SEED").expect("valid regex"));
static FOUND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)FOUND|RETRIEVED").expect("valid regex"));
static SECONDARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)SECONDARY\s*OBJECTIVES").expect("valid regex"));
static GENESEED_XP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)GENE.?SEED.*?XP\s*\d+").expect("valid regex"));
static WAVES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)STATUS\s*[:\-=]?\s*WAVE\s+(\d+)").expect("valid regex"));

/// "INFERNO" -> "Inferno"
fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    }
}

pub fn extract_mission_name(text: &NormalizedText, results: &mut ResultMap) {
    if let Some(caps) = MISSION_RE.captures(&text.flat) {
        let name = STATUS_SUFFIX_RE.replace(caps[1].trim(), "");
        let name = name.trim();
        if name.chars().count() > 2 {
            results.insert_if_absent(ResultKey::MissionName, title_case(name));
        }
    }

    if !results.contains(ResultKey::MissionName) {
        if let Some(mission) = KNOWN_MISSIONS.iter().find(|m| text.upper.contains(*m)) {
            results.insert_if_absent(ResultKey::MissionName, title_case(mission));
        }
    }
}

pub fn extract_difficulty(text: &NormalizedText, results: &mut ResultMap) {
    if let Some(difficulty) = DIFFICULTIES.iter().find(|d| text.upper.contains(*d)) {
        results.insert_if_absent(ResultKey::MissionDifficulty, title_case(difficulty));
    }
}

pub fn extract_objective(text: &NormalizedText, results: &mut ResultMap) {
    if OBJECTIVE_RE.is_match(&text.upper) {
        results.insert_if_absent(ResultKey::Objective, "1");
    }
}

/// Sets the gene-seed flag when a mention is confirmed.
///
/// The XP badge check uses the raw flattened text since badges are stripped
/// from the normalized views.
pub fn extract_geneseed(text: &NormalizedText, results: &mut ResultMap) {
    if !GENESEED_RE.is_match(&text.upper) {
        return;
    }

    let confirmed = FOUND_RE.is_match(&text.upper)
        || GENESEED_XP_RE.is_match(&text.raw_flat)
        || SECONDARY_RE.is_match(&text.upper);
    if confirmed {
        results.insert_if_absent(ResultKey::Geneseed, "1");
    }
}

/// "0" when gene-seed is never mentioned. A mention without confirmation
/// stays unset.
pub fn apply_geneseed_default(text: &NormalizedText, results: &mut ResultMap) {
    if !results.contains(ResultKey::Geneseed) && !GENESEED_RE.is_match(&text.upper) {
        results.insert_if_absent(ResultKey::Geneseed, "0");
    }
}

/// Siege mode: `STATUS: WAVE 12`.
pub fn extract_waves(text: &NormalizedText, results: &mut ResultMap) {
    if let Some(caps) = WAVES_RE.captures(&text.flat) {
        results.insert_if_absent(ResultKey::Waves, &caps[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::results::FieldValue;

    fn run(raw: &str, extract: fn(&NormalizedText, &mut ResultMap)) -> ResultMap {
        let mut results = ResultMap::new();
        extract(&NormalizedText::new(raw), &mut results);
        results
    }

    fn text(results: &ResultMap, key: ResultKey) -> Option<String> {
        results.get(key).map(FieldValue::to_string)
    }

    #[test]
    fn test_mission_name_from_label() {
        let results = run("MISSION: INFERNO STATUS: SUCCESS", extract_mission_name);
        assert_eq!(text(&results, ResultKey::MissionName).as_deref(), Some("Inferno"));
    }

    #[test]
    fn test_mission_name_from_known_list() {
        let results = run("operation\nDecapitation complete", extract_mission_name);
        assert_eq!(text(&results, ResultKey::MissionName).as_deref(), Some("Decapitation"));
    }

    #[test]
    fn test_difficulty_first_tier_wins() {
        let results = run("Lethal\nRuthless", extract_difficulty);
        assert_eq!(text(&results, ResultKey::MissionDifficulty).as_deref(), Some("Ruthless"));
    }

    #[test]
    fn test_objective_any_case() {
        let results = run("status: success", extract_objective);
        assert_eq!(text(&results, ResultKey::Objective).as_deref(), Some("1"));

        let results = run("Victory", extract_objective);
        assert_eq!(text(&results, ResultKey::Objective).as_deref(), Some("1"));

        let results = run("STATUS: FAILED", extract_objective);
        assert!(!results.contains(ResultKey::Objective));
    }

    #[test]
    fn test_geneseed_confirmed() {
        let results = run("Gene-Seed retrieved", extract_geneseed);
        assert_eq!(text(&results, ResultKey::Geneseed).as_deref(), Some("1"));

        let results = run("GENESEED\nXP 20", extract_geneseed);
        assert_eq!(text(&results, ResultKey::Geneseed).as_deref(), Some("1"));
    }

    #[test]
    fn test_geneseed_ambiguous_vs_absent() {
        let mut results = ResultMap::new();
        let mentioned = NormalizedText::new("GENESEED");
        extract_geneseed(&mentioned, &mut results);
        apply_geneseed_default(&mentioned, &mut results);
        assert!(!results.contains(ResultKey::Geneseed));

        let mut results = ResultMap::new();
        let absent = NormalizedText::new("Kills 1 2 3");
        extract_geneseed(&absent, &mut results);
        apply_geneseed_default(&absent, &mut results);
        assert_eq!(text(&results, ResultKey::Geneseed).as_deref(), Some("0"));
    }

    #[test]
    fn test_waves() {
        let results = run("STATUS: WAVE 14", extract_waves);
        assert_eq!(text(&results, ResultKey::Waves).as_deref(), Some("14"));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("VOIDSONG"), "Voidsong");
        assert_eq!(title_case(""), "");
    }
}
