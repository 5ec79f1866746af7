//! Heat partitioning and structure naming.

use crate::error::{EngineError, EngineResult};
use crate::models::{DEFAULT_PLAYERS_PER_HEAT, MAX_PLAYERS_PER_HEAT, RegistrationId};

/// Resolve the effective heat size: explicit request parameter, then the
/// event's configured default, then the global default. Must be within
/// `1..=MAX_PLAYERS_PER_HEAT`.
pub fn resolve_players_per_heat(
    requested: Option<u32>,
    event_default: Option<u32>,
) -> EngineResult<u32> {
    let per_heat = requested
        .or(event_default)
        .unwrap_or(DEFAULT_PLAYERS_PER_HEAT);
    if per_heat == 0 || per_heat > MAX_PLAYERS_PER_HEAT {
        return Err(EngineError::validation(
            "players_per_heat",
            format!("must be between 1 and {MAX_PLAYERS_PER_HEAT}, got {per_heat}"),
        ));
    }
    Ok(per_heat)
}

/// Partition registrations into consecutive chunks of `per_heat`. The last
/// chunk may be smaller; it is never padded with byes.
pub fn partition_heats(ids: &[RegistrationId], per_heat: u32) -> Vec<Vec<RegistrationId>> {
    ids.chunks(per_heat as usize).map(<[_]>::to_vec).collect()
}

/// Label for the heat at `index` (0-based): "Heat 1", "Heat 2", …
pub fn heat_label(index: usize) -> String {
    format!("Heat {}", index + 1)
}

/// Letter name for the group at `index` (0-based): A, B, …, Z, AA, AB, …
///
/// Naming is based on the current group count at creation time; letters are
/// not reused after deletion.
pub fn group_letter(index: usize) -> String {
    let mut n = index + 1; // bijective base 26
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).expect("ASCII letters")
}
