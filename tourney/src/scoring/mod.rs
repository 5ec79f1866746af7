//! Match-progression state machine.
//!
//! A match moves `scheduled → in_progress → completed`; bye matches go
//! straight to `completed` at creation time. Sets are opened and played in
//! strict ascending order, a set always has a strict winner, and the match
//! finalizes automatically once either competitor reaches the majority
//! threshold `ceil(best_of / 2)`.
//!
//! Everything here is a pure function over a match and its sets; persistence
//! of the resulting transitions is the engine's job.

use crate::error::{EngineError, EngineResult};
use crate::models::{GameSet, Match, Slot};

/// Set wins required to take a match.
pub fn majority(best_of: u32) -> u32 {
    best_of.div_ceil(2)
}

/// Largest score value a set can hold; bounded by the storage column type.
pub const MAX_SET_SCORE: u32 = i32::MAX as u32;

/// Reject score values above [`MAX_SET_SCORE`] before they reach storage.
pub fn validate_score_bounds(score1: u32, score2: u32) -> EngineResult<()> {
    for (field, value) in [
        ("registration1_score", score1),
        ("registration2_score", score2),
    ] {
        if value > MAX_SET_SCORE {
            return Err(EngineError::validation(
                field,
                format!("score {value} exceeds the maximum of {MAX_SET_SCORE}"),
            ));
        }
    }
    Ok(())
}

/// Lifecycle phase of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    Scheduled,
    InProgress,
    Completed,
}

pub fn match_phase(m: &Match, sets: &[GameSet]) -> MatchPhase {
    if m.played {
        MatchPhase::Completed
    } else if sets.iter().any(|s| s.played) {
        MatchPhase::InProgress
    } else {
        MatchPhase::Scheduled
    }
}

/// Set wins per competitor among played sets.
pub fn win_counts(sets: &[GameSet]) -> (u32, u32) {
    let mut wins = (0, 0);
    for set in sets {
        match set.winner_slot() {
            Some(Slot::One) => wins.0 += 1,
            Some(Slot::Two) => wins.1 += 1,
            None => {}
        }
    }
    wins
}

/// Validate that a new set may be opened for the match, returning the next
/// set number.
///
/// Rejected when the match is completed, the set count already reached
/// `best_of`, an existing set is still unplayed, or a competitor already
/// holds the majority.
pub fn validate_set_addition(m: &Match, sets: &[GameSet], best_of: u32) -> EngineResult<u32> {
    if m.played {
        return Err(EngineError::conflict("match is already completed"));
    }
    if sets.len() as u32 >= best_of {
        return Err(EngineError::conflict(format!(
            "match already has the maximum of {best_of} sets"
        )));
    }
    if let Some(open) = sets.iter().find(|s| !s.played) {
        return Err(EngineError::conflict(format!(
            "set {} must be played before a new set is opened",
            open.set_number
        )));
    }
    let (wins1, wins2) = win_counts(sets);
    let needed = majority(best_of);
    if wins1 >= needed || wins2 >= needed {
        return Err(EngineError::conflict(
            "match winner is already decided, no further sets may be added",
        ));
    }
    Ok(sets.len() as u32 + 1)
}

/// Validate a set result before it is marked played.
///
/// Sets always have a strict winner: equal scores are disallowed and at
/// least one score must be positive. All lower-numbered sets of the match
/// must already be played.
pub fn validate_set_played(set: &GameSet, all_sets: &[GameSet]) -> EngineResult<()> {
    if set.registration1_score == 0 && set.registration2_score == 0 {
        return Err(EngineError::validation(
            "scores",
            "at least one score must be greater than zero",
        ));
    }
    if set.registration1_score == set.registration2_score {
        return Err(EngineError::validation(
            "scores",
            format!(
                "a set cannot end in a draw ({}-{})",
                set.registration1_score, set.registration2_score
            ),
        ));
    }
    if let Some(earlier) = all_sets
        .iter()
        .find(|s| s.set_number < set.set_number && !s.played)
    {
        return Err(EngineError::conflict(format!(
            "set {} cannot be played before set {}",
            set.set_number, earlier.set_number
        )));
    }
    Ok(())
}

/// Check whether either competitor has reached the majority among played
/// sets. Returns the winning slot when the match is decided.
pub fn decide_winner(sets: &[GameSet], best_of: u32) -> Option<Slot> {
    let (wins1, wins2) = win_counts(sets);
    let needed = majority(best_of);
    if wins1 >= needed {
        Some(Slot::One)
    } else if wins2 >= needed {
        Some(Slot::Two)
    } else {
        None
    }
}

/// Validate an explicit completion assertion: every set played, win counts
/// unequal, and the winning count at majority. Returns the winning slot for
/// the caller to map to a registration id.
pub fn validate_match_completion(m: &Match, sets: &[GameSet], best_of: u32) -> EngineResult<Slot> {
    if m.played {
        return Err(EngineError::conflict("match is already completed"));
    }
    if let Some(open) = sets.iter().find(|s| !s.played) {
        return Err(EngineError::conflict(format!(
            "set {} is not played yet",
            open.set_number
        )));
    }
    let (wins1, wins2) = win_counts(sets);
    if wins1 == wins2 {
        return Err(EngineError::validation(
            "sets",
            format!("set wins are tied {wins1}-{wins2}, a match must have a winner"),
        ));
    }
    let needed = majority(best_of);
    if wins1.max(wins2) < needed {
        return Err(EngineError::validation(
            "sets",
            format!(
                "winner has {} set wins but {needed} are required",
                wins1.max(wins2)
            ),
        ));
    }
    Ok(if wins1 > wins2 { Slot::One } else { Slot::Two })
}
