//! Player name and class detection.
//!
//! The result screen lays out each squad member as a name near a class label,
//! but OCR scrambles the layout in several recurring ways. Each recurring
//! layout gets a [`PlayerStrategy`]; [`detect_players`] runs them in a fixed
//! order until three players are found.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::classes::{SquadClass, match_class};
use super::names::extract_player_name;
use super::results::{MAX_PLAYERS, PlayerField, ResultKey, ResultMap};

/// Lines searched above a class label for its player's name.
const NAME_LOOKBACK: usize = 6;
const MAX_NAME_LOOKBACK: usize = 8;
const MAX_NAME_LOOKAHEAD: usize = 4;

// "Vanguard [a]", "Sniper[12]"
static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([A-Za-zÄÖÜäöü]{4,})\s*\[([aieAIEof0-9]{1,2})\]").expect("valid regex")
});
static MAX_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)MAX\b").expect("valid regex"));
static MAX_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bMAX\b").expect("valid regex"));
static SAME_LINE_NOISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[|:$#\[\]0-9]").expect("valid regex"));
// "Titus [i]"
static NAME_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([A-ZÄÖÜ][a-zäöüßà-ÿ0-9]+(?:\s+[A-Za-zäöüßà-ÿ0-9]+)*)\s*\[i\]")
        .expect("valid regex")
});
static CLASS_A_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([A-Za-zÄÖÜäöü]{4,})\s*\[a\]").expect("valid regex"));
static FLEX_BRACKET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([A-Za-zÄÖÜäöü]{5,})\s*\[[^\]]{0,3}\]").expect("valid regex")
});
static LONG_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-zÄÖÜäöü]{5,}").expect("valid regex"));
static CLASS_MAX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b([A-Za-z]{5,})\s+MAX\b").expect("valid regex"));
// Lines made only of punctuation and digits
static DECORATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[\s\[\](){}|\\/\-.,;:#@!?*&%$=+<>~`'"0-9]+$"#).expect("valid regex")
});
static SHORT_NAME_EXCEPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^B[oö]rni$").expect("valid regex"));

/// A detected squad member. The name may be empty when only the class was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerCandidate {
    pub name: String,
    pub class: SquadClass,
}

impl PlayerCandidate {
    pub fn new(name: impl Into<String>, class: SquadClass) -> Self {
        Self {
            name: name.into(),
            class,
        }
    }
}

/// Players found so far, in detection order.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: Vec<PlayerCandidate>,
}

impl Roster {
    fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_PLAYERS as usize
    }

    pub fn has_name(&self, name: &str) -> bool {
        !name.is_empty() && self.players.iter().any(|p| p.name == name)
    }

    pub fn has_class(&self, class: SquadClass) -> bool {
        self.players.iter().any(|p| p.class == class)
    }

    /// Adds the candidate unless the roster is full or it repeats a name or class.
    pub fn try_add(&mut self, candidate: PlayerCandidate) -> bool {
        if self.is_full() || self.has_name(&candidate.name) || self.has_class(candidate.class) {
            return false;
        }
        self.players.push(candidate);
        true
    }

    pub fn into_players(self) -> Vec<PlayerCandidate> {
        self.players
    }

    /// Candidates this roster holds beyond the first `base` entries.
    fn added_since(self, base: usize) -> Vec<PlayerCandidate> {
        self.players.into_iter().skip(base).collect()
    }
}

/// One way of pairing names with classes in the OCR lines.
///
/// `found` holds players already detected by earlier strategies. The returned
/// candidates are new players in detection order.
pub trait PlayerStrategy {
    fn name(&self) -> &'static str;
    fn detect(&self, lines: &[String], found: &Roster) -> Vec<PlayerCandidate>;
}

/// Lines above `index`, nearest first.
fn preceding(lines: &[String], index: usize, count: usize) -> impl Iterator<Item = &String> {
    lines[index.saturating_sub(count)..index].iter().rev()
}

/// Name for a class label at `index`: text before the label on the same line,
/// else the nearest preceding line that yields an unused name.
fn name_near_label(lines: &[String], index: usize, before: &str, roster: &Roster) -> Option<String> {
    if !before.trim().is_empty() {
        let same_line = SAME_LINE_NOISE_RE.replace_all(before, " ");
        if let Some(name) = extract_player_name(same_line.trim()) {
            if !roster.has_name(&name) {
                return Some(name);
            }
        }
    }

    preceding(lines, index, NAME_LOOKBACK)
        .filter_map(|line| extract_player_name(line))
        .find(|name| !roster.has_name(name))
}

/// `Vanguard [a]`: a class word followed by a one or two character marker.
pub struct MarkerStrategy;

impl PlayerStrategy for MarkerStrategy {
    fn name(&self) -> &'static str {
        "marker"
    }

    fn detect(&self, lines: &[String], found: &Roster) -> Vec<PlayerCandidate> {
        let mut roster = found.clone();
        for (i, line) in lines.iter().enumerate() {
            let Some(caps) = MARKER_RE.captures(line) else {
                continue;
            };
            let Some(class) = match_class(&caps[1]) else {
                continue;
            };
            if roster.is_full() {
                continue;
            }

            let start = caps.get(0).map_or(0, |m| m.start());
            let before = &line[..start];
            // Labels after "MAX" belong to the class-MAX layout
            if MAX_SUFFIX_RE.is_match(before) {
                continue;
            }

            if let Some(name) = name_near_label(lines, i, before, &roster) {
                roster.try_add(PlayerCandidate::new(name, class));
            }
        }
        roster.added_since(found.len())
    }
}

/// `Titus [i]` followed within three lines by `Bulwark [a]`.
pub struct NameMarkerStrategy;

impl PlayerStrategy for NameMarkerStrategy {
    fn name(&self) -> &'static str {
        "name-marker"
    }

    fn detect(&self, lines: &[String], found: &Roster) -> Vec<PlayerCandidate> {
        let mut roster = found.clone();
        for (i, line) in lines.iter().enumerate() {
            if roster.is_full() {
                break;
            }
            let Some(caps) = NAME_MARKER_RE.captures(line) else {
                continue;
            };
            let name = caps[1].trim();
            if name.chars().count() < 3 {
                continue;
            }

            let class = lines
                .iter()
                .skip(i + 1)
                .take(3)
                .filter_map(|next| CLASS_A_MARKER_RE.captures(next))
                .find_map(|c| match_class(&c[1]));
            if let Some(class) = class {
                roster.try_add(PlayerCandidate::new(name, class));
            }
        }
        roster.added_since(found.len())
    }
}

/// A five-plus letter class word followed by any short bracketed marker.
pub struct FlexibleBracketStrategy;

impl PlayerStrategy for FlexibleBracketStrategy {
    fn name(&self) -> &'static str {
        "flexible-bracket"
    }

    fn detect(&self, lines: &[String], found: &Roster) -> Vec<PlayerCandidate> {
        let mut roster = found.clone();
        for (i, line) in lines.iter().enumerate() {
            if roster.is_full() {
                break;
            }
            if MAX_WORD_RE.is_match(line) {
                continue;
            }
            let Some(caps) = FLEX_BRACKET_RE.captures(line) else {
                continue;
            };
            let Some(class) = match_class(&caps[1]) else {
                continue;
            };
            if roster.has_class(class) {
                continue;
            }

            let start = caps.get(0).map_or(0, |m| m.start());
            if let Some(name) = name_near_label(lines, i, &line[..start], &roster) {
                roster.try_add(PlayerCandidate::new(name, class));
            }
        }
        roster.added_since(found.len())
    }
}

/// Any class word on a line, paired with the nearest name above it.
pub struct StandaloneClassStrategy;

impl PlayerStrategy for StandaloneClassStrategy {
    fn name(&self) -> &'static str {
        "standalone-class"
    }

    fn detect(&self, lines: &[String], found: &Roster) -> Vec<PlayerCandidate> {
        let mut roster = found.clone();
        for (i, line) in lines.iter().enumerate() {
            if roster.is_full() {
                break;
            }
            let line = line.trim();
            if MAX_WORD_RE.is_match(line) {
                continue;
            }

            // Only the first new class word on a line is considered
            let class = LONG_WORD_RE
                .find_iter(line)
                .filter_map(|word| match_class(word.as_str()))
                .find(|class| !roster.has_class(*class));
            let Some(class) = class else {
                continue;
            };

            let name = preceding(lines, i, NAME_LOOKBACK)
                .filter_map(|l| extract_player_name(l))
                .find(|name| !roster.has_name(name));
            if let Some(name) = name {
                roster.try_add(PlayerCandidate::new(name, class));
            }
        }
        roster.added_since(found.len())
    }
}

/// `Heavy MAX`: a maxed-out class label. The player is kept even without a name.
pub struct ClassMaxStrategy;

impl ClassMaxStrategy {
    fn is_high_confidence(name: &str) -> bool {
        name.chars().count() >= 5 || SHORT_NAME_EXCEPTION_RE.is_match(name)
    }

    fn find_name<'a>(candidates: impl Iterator<Item = &'a String>, roster: &Roster) -> Option<String> {
        candidates
            .filter(|line| !DECORATIVE_RE.is_match(line))
            .filter_map(|line| extract_player_name(line))
            .find(|name| Self::is_high_confidence(name) && !roster.has_name(name))
    }
}

impl PlayerStrategy for ClassMaxStrategy {
    fn name(&self) -> &'static str {
        "class-max"
    }

    fn detect(&self, lines: &[String], found: &Roster) -> Vec<PlayerCandidate> {
        let mut roster = found.clone();
        for (i, line) in lines.iter().enumerate() {
            if roster.is_full() {
                break;
            }
            let Some(caps) = CLASS_MAX_RE.captures(line.trim()) else {
                continue;
            };
            let Some(class) = match_class(&caps[1]) else {
                continue;
            };
            if roster.has_class(class) {
                continue;
            }

            let following = lines.iter().skip(i + 1).take(MAX_NAME_LOOKAHEAD);
            let name = Self::find_name(preceding(lines, i, MAX_NAME_LOOKBACK), &roster)
                .or_else(|| Self::find_name(following, &roster))
                .unwrap_or_default();
            roster.try_add(PlayerCandidate::new(name, class));
        }
        roster.added_since(found.len())
    }
}

/// A name line directly above a line holding only a class word.
pub struct NameAboveClassStrategy;

impl PlayerStrategy for NameAboveClassStrategy {
    fn name(&self) -> &'static str {
        "name-above-class"
    }

    fn detect(&self, lines: &[String], found: &Roster) -> Vec<PlayerCandidate> {
        let mut roster = found.clone();
        for pair in lines.windows(2) {
            if roster.is_full() {
                break;
            }
            let Some(class) = match_class(pair[1].trim()) else {
                continue;
            };
            if roster.has_class(class) {
                continue;
            }

            if let Some(name) = extract_player_name(pair[0].trim()) {
                if name.chars().count() >= 3 && !roster.has_name(&name) {
                    roster.try_add(PlayerCandidate::new(name, class));
                }
            }
        }
        roster.added_since(found.len())
    }
}

/// The strategy cascade, in the order it runs.
pub fn strategies() -> Vec<Box<dyn PlayerStrategy>> {
    vec![
        Box::new(MarkerStrategy),
        Box::new(NameMarkerStrategy),
        Box::new(FlexibleBracketStrategy),
        Box::new(StandaloneClassStrategy),
        Box::new(ClassMaxStrategy),
        Box::new(NameAboveClassStrategy),
    ]
}

/// Runs the cascade and returns up to three players in detection order.
pub fn detect_players(lines: &[String]) -> Vec<PlayerCandidate> {
    let mut roster = Roster::default();
    for strategy in strategies() {
        if roster.is_full() {
            break;
        }
        for candidate in strategy.detect(lines, &roster) {
            debug!(
                strategy = strategy.name(),
                name = %candidate.name,
                class = %candidate.class,
                "Player detected"
            );
            roster.try_add(candidate);
        }
    }
    roster.into_players()
}

/// Writes players into slots 1-3 in detection order, skipping populated slots.
pub fn assign_players(players: &[PlayerCandidate], results: &mut ResultMap) {
    for (slot, player) in (1..=MAX_PLAYERS).zip(players) {
        let name_key = ResultKey::player(slot, PlayerField::Name);
        if results.contains(name_key) {
            continue;
        }
        results.insert_if_absent(name_key, player.name.as_str());
        results.insert_if_absent(ResultKey::player(slot, PlayerField::Class), player.class.label());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::results::FieldValue;

    fn lines(text: &[&str]) -> Vec<String> {
        text.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_marker_names_from_preceding_lines() {
        let lines = lines(&["Brocco", "Vanguard [a]", "Titus", "Bulwark [i]", "Gaius", "SNIPER [e]"]);
        let players = detect_players(&lines);
        assert_eq!(
            players,
            vec![
                PlayerCandidate::new("Brocco", SquadClass::Vanguard),
                PlayerCandidate::new("Titus", SquadClass::Bulwark),
                PlayerCandidate::new("Gaius", SquadClass::Sniper),
            ]
        );
    }

    #[test]
    fn test_marker_name_on_same_line() {
        let players = detect_players(&lines(&["Titus: Bulwark [i]"]));
        assert_eq!(players, vec![PlayerCandidate::new("Titus", SquadClass::Bulwark)]);
    }

    #[test]
    fn test_name_marker_strategy() {
        let lines = lines(&["Gaius [i]", "12 4", "Tactcal [a]"]);
        let found = NameMarkerStrategy.detect(&lines, &Roster::default());
        assert_eq!(found, vec![PlayerCandidate::new("Gaius", SquadClass::Tactical)]);
    }

    #[test]
    fn test_marker_skips_label_after_max() {
        let lines = lines(&["Brocco", "Heavy MAX Vanguard [a]"]);
        assert!(MarkerStrategy.detect(&lines, &Roster::default()).is_empty());
    }

    #[test]
    fn test_flexible_bracket_strategy() {
        let lines = lines(&["Titus", "Assault [x1]"]);
        assert!(MarkerStrategy.detect(&lines, &Roster::default()).is_empty());

        let found = FlexibleBracketStrategy.detect(&lines, &Roster::default());
        assert_eq!(found, vec![PlayerCandidate::new("Titus", SquadClass::Assault)]);
    }

    #[test]
    fn test_standalone_class_strategy() {
        let lines = lines(&["Titus", "some text", "Assault"]);
        let found = StandaloneClassStrategy.detect(&lines, &Roster::default());
        assert_eq!(found, vec![PlayerCandidate::new("Titus", SquadClass::Assault)]);
    }

    #[test]
    fn test_class_max_skips_decorative_lines() {
        let players = detect_players(&lines(&["Brocco", "[12]", "Vanguard MAX"]));
        assert_eq!(players, vec![PlayerCandidate::new("Brocco", SquadClass::Vanguard)]);
    }

    #[test]
    fn test_class_max_without_confident_name() {
        let players = detect_players(&lines(&["Bob", "Heavy MAX"]));
        assert_eq!(players, vec![PlayerCandidate::new("", SquadClass::Heavy)]);
    }

    #[test]
    fn test_class_max_players_without_names_coexist() {
        let lines = lines(&["Heavy MAX", "Sniper MAX"]);
        let found = ClassMaxStrategy.detect(&lines, &Roster::default());
        assert_eq!(
            found,
            vec![
                PlayerCandidate::new("", SquadClass::Heavy),
                PlayerCandidate::new("", SquadClass::Sniper),
            ]
        );
    }

    #[test]
    fn test_name_above_class_strategy() {
        let lines = lines(&["Brocco", "Sniper"]);
        let found = NameAboveClassStrategy.detect(&lines, &Roster::default());
        assert_eq!(found, vec![PlayerCandidate::new("Brocco", SquadClass::Sniper)]);
    }

    #[test]
    fn test_strategies_respect_found_players() {
        let mut found = Roster::default();
        found.try_add(PlayerCandidate::new("Brocco", SquadClass::Sniper));

        let lines = lines(&["Brocco", "Sniper"]);
        assert!(NameAboveClassStrategy.detect(&lines, &found).is_empty());
    }

    #[test]
    fn test_roster_rejects_duplicates_and_caps_at_three() {
        let mut roster = Roster::default();
        assert!(roster.try_add(PlayerCandidate::new("Titus", SquadClass::Bulwark)));
        assert!(!roster.try_add(PlayerCandidate::new("Titus", SquadClass::Heavy)));
        assert!(!roster.try_add(PlayerCandidate::new("Gaius", SquadClass::Bulwark)));
        assert!(roster.try_add(PlayerCandidate::new("", SquadClass::Heavy)));
        assert!(roster.try_add(PlayerCandidate::new("", SquadClass::Sniper)));
        assert!(roster.is_full());
        assert!(!roster.try_add(PlayerCandidate::new("Gaius", SquadClass::Assault)));
    }

    #[test]
    fn test_assign_players_keeps_populated_slots() {
        let mut results = ResultMap::new();
        results.insert_if_absent(ResultKey::player(1, PlayerField::Name), "Manual");

        let players = vec![
            PlayerCandidate::new("Titus", SquadClass::Bulwark),
            PlayerCandidate::new("Gaius", SquadClass::Sniper),
        ];
        assign_players(&players, &mut results);

        assert_eq!(
            results.get(ResultKey::player(1, PlayerField::Name)),
            Some(&FieldValue::from("Manual"))
        );
        assert!(!results.contains(ResultKey::player(1, PlayerField::Class)));
        assert_eq!(
            results.get(ResultKey::player(2, PlayerField::Class)),
            Some(&FieldValue::from("Sniper"))
        );
    }

    #[test]
    fn test_no_players_in_stat_table() {
        let lines = lines(&["[LEFT]", "MISSION: INFERNO STATUS: SUCCESS", "[RIGHT]", "Kills 10 20 30"]);
        assert!(detect_players(&lines).is_empty());
    }
}
