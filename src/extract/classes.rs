use std::fmt;
use strsim::levenshtein;

/// Maximum edit distance accepted for a fuzzy class match.
const MAX_CLASS_DISTANCE: usize = 2;

/// Squad classes shown on the result screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SquadClass {
    Bulwark,
    Assault,
    Vanguard,
    Tactical,
    Sniper,
    Heavy,
    Techmarine,
}

impl SquadClass {
    /// Canonical order. Fuzzy ties resolve to the earlier entry.
    pub const ALL: [SquadClass; 7] = [
        SquadClass::Bulwark,
        SquadClass::Assault,
        SquadClass::Vanguard,
        SquadClass::Tactical,
        SquadClass::Sniper,
        SquadClass::Heavy,
        SquadClass::Techmarine,
    ];

    pub fn canonical(self) -> &'static str {
        match self {
            SquadClass::Bulwark => "BULWARK",
            SquadClass::Assault => "ASSAULT",
            SquadClass::Vanguard => "VANGUARD",
            SquadClass::Tactical => "TACTICAL",
            SquadClass::Sniper => "SNIPER",
            SquadClass::Heavy => "HEAVY",
            SquadClass::Techmarine => "TECHMARINE",
        }
    }

    /// Display form written to the result map, e.g. "Vanguard".
    pub fn label(self) -> &'static str {
        match self {
            SquadClass::Bulwark => "Bulwark",
            SquadClass::Assault => "Assault",
            SquadClass::Vanguard => "Vanguard",
            SquadClass::Tactical => "Tactical",
            SquadClass::Sniper => "Sniper",
            SquadClass::Heavy => "Heavy",
            SquadClass::Techmarine => "Techmarine",
        }
    }
}

impl fmt::Display for SquadClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Misreads seen often enough to map directly.
const OCR_CLASS_FIXES: &[(&str, SquadClass)] = &[
    ("ANGUNRO", SquadClass::Vanguard),
    ("ANGUARD", SquadClass::Vanguard),
    ("VANGUNRD", SquadClass::Vanguard),
    ("VANGURD", SquadClass::Vanguard),
    ("BULWAR", SquadClass::Bulwark),
    ("BÜLWARK", SquadClass::Bulwark),
    ("ASSAUL", SquadClass::Assault),
    ("ASSAUT", SquadClass::Assault),
    ("TACTIAL", SquadClass::Tactical),
    ("SNIPE", SquadClass::Sniper),
    ("TECHMAR", SquadClass::Techmarine),
    ("ECHMAR", SquadClass::Techmarine),
];

/// Resolves an OCR token to a squad class.
///
/// Tries an exact match, then the misread table, then the closest canonical
/// name by Levenshtein distance (at most 2).
pub fn match_class(word: &str) -> Option<SquadClass> {
    let upper = word.to_uppercase();

    if let Some(class) = SquadClass::ALL.iter().find(|c| c.canonical() == upper) {
        return Some(*class);
    }

    if let Some((_, class)) = OCR_CLASS_FIXES.iter().find(|(misread, _)| *misread == upper) {
        return Some(*class);
    }

    let mut best: Option<(SquadClass, usize)> = None;
    for class in SquadClass::ALL {
        let distance = levenshtein(&upper, class.canonical());
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((class, distance));
        }
    }

    best.filter(|(_, d)| *d <= MAX_CLASS_DISTANCE).map(|(class, _)| class)
}
