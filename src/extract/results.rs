//! The extracted result map.
//!
//! Keys are a closed set. Insertion is first-writer-wins: once a key holds a
//! value, later extraction strategies cannot replace it.

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Number of player slots on a result screen.
pub const MAX_PLAYERS: u8 = 3;

/// Per-player numeric statistics, in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatField {
    Kills,
    /// Special kills
    Elite,
    /// Incapacitations
    Death,
    /// Damage taken
    Damage,
    Melee,
    Ranged,
    Items,
    Revived,
}

impl StatField {
    pub const ALL: [StatField; 8] = [
        StatField::Kills,
        StatField::Elite,
        StatField::Death,
        StatField::Damage,
        StatField::Melee,
        StatField::Ranged,
        StatField::Items,
        StatField::Revived,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            StatField::Kills => "kills",
            StatField::Elite => "elite",
            StatField::Death => "death",
            StatField::Damage => "damage",
            StatField::Melee => "melee",
            StatField::Ranged => "ranged",
            StatField::Items => "items",
            StatField::Revived => "revived",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlayerField {
    Name,
    Class,
    Stat(StatField),
}

impl PlayerField {
    fn suffix(self) -> &'static str {
        match self {
            PlayerField::Name => "name",
            PlayerField::Class => "class",
            PlayerField::Stat(stat) => stat.suffix(),
        }
    }
}

/// A result-map key. Ordering follows the schema: mission fields, global
/// flags, then each player's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResultKey {
    MissionName,
    MissionDifficulty,
    Objective,
    Geneseed,
    Armoury,
    Waves,
    Player { slot: u8, field: PlayerField },
}

impl ResultKey {
    /// Key for a player field. `slot` is 1-based.
    pub fn player(slot: u8, field: PlayerField) -> Self {
        debug_assert!((1..=MAX_PLAYERS).contains(&slot), "player slot {slot} out of range");
        ResultKey::Player { slot, field }
    }

    pub fn stat(slot: u8, stat: StatField) -> Self {
        Self::player(slot, PlayerField::Stat(stat))
    }

    /// Every key in schema order.
    pub fn all() -> Vec<ResultKey> {
        let mut keys = vec![
            ResultKey::MissionName,
            ResultKey::MissionDifficulty,
            ResultKey::Objective,
            ResultKey::Geneseed,
            ResultKey::Armoury,
            ResultKey::Waves,
        ];
        for slot in 1..=MAX_PLAYERS {
            keys.push(ResultKey::player(slot, PlayerField::Name));
            keys.push(ResultKey::player(slot, PlayerField::Class));
            keys.extend(StatField::ALL.iter().map(|&stat| ResultKey::stat(slot, stat)));
        }
        keys
    }
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultKey::MissionName => f.write_str("mission-name"),
            ResultKey::MissionDifficulty => f.write_str("mission-difficulty"),
            ResultKey::Objective => f.write_str("global-objective"),
            ResultKey::Geneseed => f.write_str("global-geneseed"),
            ResultKey::Armoury => f.write_str("global-armoury"),
            ResultKey::Waves => f.write_str("global-waves"),
            ResultKey::Player { slot, field } => write!(f, "p{}-{}", slot, field.suffix()),
        }
    }
}

impl FromStr for ResultKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResultKey::all()
            .into_iter()
            .find(|key| key.to_string() == s)
            .ok_or_else(|| format!("Unknown result key: {}", s))
    }
}

/// A detected value. Flags and armoury counts are text ("0".."3") to match
/// the form fields they are reviewed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Int(u32),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Int(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        FieldValue::Int(n)
    }
}

/// Extracted fields. A missing key means "not detected".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultMap {
    fields: BTreeMap<ResultKey, FieldValue>,
}

impl ResultMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` unless the key is already populated. Returns true if stored.
    pub fn insert_if_absent(&mut self, key: ResultKey, value: impl Into<FieldValue>) -> bool {
        if self.fields.contains_key(&key) {
            return false;
        }
        self.fields.insert(key, value.into());
        true
    }

    pub fn get(&self, key: ResultKey) -> Option<&FieldValue> {
        self.fields.get(&key)
    }

    pub fn contains(&self, key: ResultKey) -> bool {
        self.fields.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (ResultKey, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }
}

impl Serialize for ResultMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(&key.to_string(), value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_strings() {
        assert_eq!(ResultKey::Objective.to_string(), "global-objective");
        assert_eq!(ResultKey::stat(2, StatField::Kills).to_string(), "p2-kills");
        assert_eq!(ResultKey::player(3, PlayerField::Class).to_string(), "p3-class");
        assert_eq!("p1-elite".parse::<ResultKey>().unwrap(), ResultKey::stat(1, StatField::Elite));
        assert!("p4-kills".parse::<ResultKey>().is_err());
    }

    #[test]
    fn test_schema_has_all_keys_in_order() {
        let keys = ResultKey::all();
        assert_eq!(keys.len(), 6 + 3 * 10);
        assert_eq!(keys[6].to_string(), "p1-name");
        assert_eq!(keys[7].to_string(), "p1-class");
        assert_eq!(keys[8].to_string(), "p1-kills");
        assert_eq!(keys.last().unwrap().to_string(), "p3-revived");

        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(sorted, keys);
    }

    #[test]
    fn test_first_writer_wins() {
        let mut map = ResultMap::new();
        assert!(map.insert_if_absent(ResultKey::MissionName, "Inferno"));
        assert!(!map.insert_if_absent(ResultKey::MissionName, "Servo"));
        assert_eq!(map.get(ResultKey::MissionName), Some(&FieldValue::from("Inferno")));
    }

    #[test]
    fn test_serializes_as_flat_object() {
        let mut map = ResultMap::new();
        map.insert_if_absent(ResultKey::stat(1, StatField::Kills), 10u32);
        map.insert_if_absent(ResultKey::Objective, "1");

        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json, serde_json::json!({"global-objective": "1", "p1-kills": 10}));
    }
}
