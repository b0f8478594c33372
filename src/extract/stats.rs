//! Per-player statistic rows.
//!
//! Each statistic is one row of the stats table: a label followed by one
//! number per player. The rows are described as data in [`STAT_TABLE`]; new
//! labels or misread variants go there.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::results::{MAX_PLAYERS, ResultKey, ResultMap, StatField};

const DEFAULT_CEILING: u32 = 1_000_000;

/// How to find one statistic row.
#[derive(Debug)]
pub struct StatSpec {
    pub field: StatField,
    /// Tried in order against each upper-cased line
    pub labels: &'static [&'static str],
    /// Lines matching this are not the row even if a label matches
    pub exclude: Option<&'static str>,
    /// Values must be below this
    pub ceiling: u32,
    /// Read isolated "U"/"O" as zero before taking numbers
    pub fix_zero_misreads: bool,
    /// Write zeros when the label is present but no usable numbers are
    pub default_to_zero: bool,
}

pub const STAT_TABLE: &[StatSpec] = &[
    StatSpec {
        field: StatField::Kills,
        labels: &[r"\bKILLS\b", r"(?i)K[I1l]{1,2}[L1]{1,2}S", r"KILLS"],
        exclude: Some(r"(?i)SPECIAL|SPECIA"),
        ceiling: DEFAULT_CEILING,
        fix_zero_misreads: false,
        default_to_zero: false,
    },
    StatSpec {
        field: StatField::Elite,
        labels: &[r"SPECIAL\s*KILLS", r"(?i)SPEC[I1]AL\s*K[I1]LLS", r"(?i)SPECIA.*KILLS"],
        exclude: None,
        ceiling: DEFAULT_CEILING,
        fix_zero_misreads: false,
        default_to_zero: false,
    },
    StatSpec {
        field: StatField::Death,
        labels: &[r"(?i)INCAPACITATION", r"(?i)INCAP"],
        exclude: None,
        ceiling: 100,
        fix_zero_misreads: true,
        default_to_zero: false,
    },
    StatSpec {
        field: StatField::Damage,
        labels: &[r"DAMAGE\s*TAKEN", r"(?i)DAMAGE.*TAKEN", r"(?i)DAM.*TAK"],
        exclude: None,
        ceiling: DEFAULT_CEILING,
        fix_zero_misreads: false,
        default_to_zero: false,
    },
    StatSpec {
        field: StatField::Melee,
        labels: &[r"(?i)MELEE\s*DAMAGE", r"(?i)MELEE.*DAMAGE", r"(?i)MELEE.*DAM"],
        exclude: None,
        ceiling: DEFAULT_CEILING,
        fix_zero_misreads: false,
        default_to_zero: false,
    },
    StatSpec {
        field: StatField::Ranged,
        labels: &[r"(?i)RANGED\s*DAMAGE", r"(?i)RANGED.*DAMAGE", r"(?i)RANGED.*DAM"],
        exclude: None,
        ceiling: DEFAULT_CEILING,
        fix_zero_misreads: false,
        default_to_zero: false,
    },
    StatSpec {
        field: StatField::Items,
        labels: &[r"(?i)ITEMS\s*FOUND", r"(?i)ITEMS.*FOUND", r"(?i)ITEM.*FOUND"],
        exclude: None,
        ceiling: DEFAULT_CEILING,
        fix_zero_misreads: false,
        default_to_zero: false,
    },
    StatSpec {
        field: StatField::Revived,
        labels: &[r"(?i)TEAMMATES\s*REVIVED", r"(?i)TEAMMATE.*REVIVE", r"(?i)TEAM.*REVIVE"],
        exclude: None,
        ceiling: DEFAULT_CEILING,
        fix_zero_misreads: false,
        default_to_zero: false,
    },
];

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));
static ZERO_MISREAD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[UO]\b").expect("valid regex"));

struct CompiledStat {
    spec: &'static StatSpec,
    labels: Vec<Regex>,
    exclude: Option<Regex>,
}

static COMPILED_TABLE: LazyLock<Vec<CompiledStat>> = LazyLock::new(|| {
    STAT_TABLE
        .iter()
        .map(|spec| CompiledStat {
            spec,
            labels: spec
                .labels
                .iter()
                .map(|p| Regex::new(p).expect("valid label regex"))
                .collect(),
            exclude: spec.exclude.map(|p| Regex::new(p).expect("valid exclusion regex")),
        })
        .collect()
});

impl CompiledStat {
    /// Values for p1.. in order, or None when the row was not found.
    ///
    /// Labels are tried in order, lines in document order. The first label
    /// line whose trailing numbers are all valid wins.
    fn find_values(&self, lines: &[String]) -> Option<Vec<u32>> {
        let mut label_found = false;

        for label in &self.labels {
            for line in lines {
                let upper = line.to_uppercase();
                if !label.is_match(&upper) {
                    continue;
                }
                if self.exclude.as_ref().is_some_and(|re| re.is_match(&upper)) {
                    continue;
                }
                label_found = true;

                let source = if self.spec.fix_zero_misreads {
                    ZERO_MISREAD_RE.replace_all(line, "0")
                } else {
                    line.into()
                };
                if let Some(values) = self.trailing_values(&source) {
                    return Some(values);
                }
            }
        }

        if label_found && self.spec.default_to_zero {
            return Some(vec![0; MAX_PLAYERS as usize]);
        }
        None
    }

    /// The last (up to three) numbers on the line, if all are under the ceiling.
    fn trailing_values(&self, line: &str) -> Option<Vec<u32>> {
        let numbers: Vec<&str> = NUMBER_RE.find_iter(line).map(|m| m.as_str()).collect();
        if numbers.is_empty() {
            return None;
        }

        let tail = &numbers[numbers.len().saturating_sub(MAX_PLAYERS as usize)..];
        tail.iter()
            .map(|n| n.parse::<u32>().ok().filter(|v| *v < self.spec.ceiling))
            .collect()
    }
}

/// Fills every statistic row found in `lines` into the result map.
pub fn extract_stats(lines: &[String], results: &mut ResultMap) {
    for stat in COMPILED_TABLE.iter() {
        let Some(values) = stat.find_values(lines) else {
            debug!(stat = stat.spec.field.suffix(), "Stat row not found");
            continue;
        };
        debug!(stat = stat.spec.field.suffix(), ?values, "Stat row");

        for (slot, value) in (1..=MAX_PLAYERS).zip(values) {
            results.insert_if_absent(ResultKey::stat(slot, stat.spec.field), value);
        }
    }
}
