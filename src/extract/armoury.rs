use regex::Regex;
use std::sync::LazyLock;

use super::normalize::NormalizedText;
use super::results::{ResultKey, ResultMap};

const REWARDS_WINDOW: usize = 150;
const ARMOURY_BEFORE: usize = 50;
const ARMOURY_AFTER: usize = 100;

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));
// "2 150": armoury count next to a requisition amount
static COUNT_WITH_REQUISITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-3])\s+(\d{2,3})").expect("valid regex"));
static COUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([0-3])\s+").expect("valid regex"));

/// Up to `chars` characters of `text` starting at byte offset `start`.
fn window_after(text: &str, start: usize, chars: usize) -> &str {
    let rest = &text[start..];
    let end = rest.char_indices().nth(chars).map_or(rest.len(), |(i, _)| i);
    &rest[..end]
}

/// Byte offset `chars` characters before `index`, or 0.
fn offset_before(text: &str, index: usize, chars: usize) -> usize {
    if chars == 0 {
        return index;
    }
    text[..index].char_indices().rev().nth(chars - 1).map_or(0, |(i, _)| i)
}

fn from_rewards(upper: &str) -> Option<String> {
    let rewards = upper.find("REWARDS")?;
    let mut window = window_after(upper, rewards, REWARDS_WINDOW);
    if let Some(cut) = window.find("CHARACTER").filter(|i| *i > 0) {
        window = &window[..cut];
    }

    let count = NUMBER_RE
        .find_iter(window)
        .filter_map(|m| m.as_str().parse::<u32>().ok())
        .find(|n| *n <= 3);
    if let Some(count) = count {
        return Some(count.to_string());
    }

    COUNT_WITH_REQUISITION_RE
        .captures(window)
        .filter(|caps| caps[2].parse::<u32>().is_ok_and(|n| n >= 100))
        .map(|caps| caps[1].to_string())
}

fn near_armoury(upper: &str) -> Option<String> {
    let index = upper.find("ARMOURY")?;
    let start = offset_before(upper, index, ARMOURY_BEFORE);
    let end = index + window_after(upper, index, ARMOURY_AFTER).len();
    COUNT_RE.captures(&upper[start..end]).map(|caps| caps[1].to_string())
}

/// Armoury data count (0-3) from the rewards panel.
pub fn extract_armoury(text: &NormalizedText, results: &mut ResultMap) {
    if let Some(count) = from_rewards(&text.upper).or_else(|| near_armoury(&text.upper)) {
        results.insert_if_absent(ResultKey::Armoury, count);
    }
}
