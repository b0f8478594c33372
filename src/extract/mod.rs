pub mod armoury;
pub mod classes;
pub mod mission;
pub mod names;
pub mod normalize;
pub mod players;
pub mod results;
pub mod stats;

pub use normalize::NormalizedText;
pub use players::detect_players;
pub use results::{ResultKey, ResultMap};
#[cfg(test)]
pub use results::{FieldValue, PlayerField, StatField};

use tracing::{debug, info};

/// High-level function: raw OCR text → result map.
///
/// Every extractor writes only keys that are still empty, so the order below
/// decides which heuristic wins a contested field.
pub fn parse_game_data(raw: &str) -> ResultMap {
    let text = NormalizedText::new(raw);
    debug!("Normalized OCR text into {} lines", text.lines.len());

    let mut results = ResultMap::new();
    mission::extract_mission_name(&text, &mut results);
    mission::extract_difficulty(&text, &mut results);
    mission::extract_objective(&text, &mut results);
    mission::extract_geneseed(&text, &mut results);

    let players = detect_players(&text.lines);
    players::assign_players(&players, &mut results);

    stats::extract_stats(&text.lines, &mut results);
    mission::extract_waves(&text, &mut results);
    armoury::extract_armoury(&text, &mut results);
    mission::apply_geneseed_default(&text, &mut results);

    info!("Extracted {} fields ({} players)", results.len(), players.len());
    results
}
