//! Single-elimination bracket sizing, seeding, and match planning.
//!
//! Seeded slots follow the standard tournament seeding order so top seeds are
//! maximally separated in early rounds. Byes occupy the highest entry numbers
//! and therefore pair against the top seeds, producing automatic walkovers in
//! round 1. All downstream rounds are pre-created with winner pointers so
//! recording a result auto-populates the next round's empty slot.

use std::collections::HashSet;

use crate::error::{EngineError, EngineResult};
use crate::models::{MatchPlan, RegistrationId, SeedEntry, Slot};

/// Smallest power of two that fits `count` entrants.
pub fn bracket_size(count: usize) -> usize {
    count.next_power_of_two().max(2)
}

/// Number of byes needed to fill the bracket.
pub fn bye_count(count: usize) -> usize {
    bracket_size(count) - count
}

/// Check that every seed references a member of `registration_ids` and that
/// no seed rank or registration id repeats. Reports the first offender.
pub fn validate_seeds(
    seeds: &[SeedEntry],
    registration_ids: &[RegistrationId],
) -> EngineResult<()> {
    let members: HashSet<RegistrationId> = registration_ids.iter().copied().collect();
    let mut seen_ids = HashSet::new();
    let mut seen_ranks = HashSet::new();

    for entry in seeds {
        if !members.contains(&entry.registration_id) {
            return Err(EngineError::validation(
                "seeds",
                format!("registration {} is not entered in this event", entry.registration_id),
            ));
        }
        if !seen_ids.insert(entry.registration_id) {
            return Err(EngineError::validation(
                "seeds",
                format!("registration {} is seeded more than once", entry.registration_id),
            ));
        }
        if entry.seed == 0 {
            return Err(EngineError::validation(
                "seeds",
                format!("seed rank must be at least 1 for registration {}", entry.registration_id),
            ));
        }
        if !seen_ranks.insert(entry.seed) {
            return Err(EngineError::validation(
                "seeds",
                format!("duplicate seed rank {}", entry.seed),
            ));
        }
    }
    Ok(())
}

/// Entry number (1-based) occupying each bracket slot, in the standard
/// seeding sequence: size 4 → `[1, 4, 2, 3]`, size 8 → `[1, 8, 4, 5, 2, 7, 3, 6]`.
/// Consecutive slot pairs form the round-1 matches, so entry 1 meets the
/// highest entry number and entries 1 and 2 can only meet in the final.
pub fn seeding_order(size: usize) -> Vec<usize> {
    debug_assert!(size.is_power_of_two());
    let mut order = vec![1];
    while order.len() < size {
        let doubled = order.len() * 2;
        let mut next = Vec::with_capacity(doubled);
        for &entry in &order {
            next.push(entry);
            next.push(doubled + 1 - entry);
        }
        order = next;
    }
    order
}

/// Place entrants into bracket slots. `seeded` must be ordered by seed rank;
/// `unseeded` keeps its given order (shuffling, if any, happens upstream).
/// Byes fill the remaining entry numbers.
pub fn assign_slots(
    seeded: &[RegistrationId],
    unseeded: &[RegistrationId],
) -> Vec<Option<RegistrationId>> {
    let count = seeded.len() + unseeded.len();
    let size = bracket_size(count);

    let mut entrants: Vec<Option<RegistrationId>> = Vec::with_capacity(size);
    entrants.extend(seeded.iter().copied().map(Some));
    entrants.extend(unseeded.iter().copied().map(Some));
    entrants.resize(size, None);

    seeding_order(size)
        .into_iter()
        .map(|entry| entrants[entry - 1])
        .collect()
}

/// Build the complete bracket match plan from filled slots.
///
/// Round-1 matches with a single occupant are recorded as already-played
/// walkovers and their winner is propagated into the downstream slot
/// immediately; no sets are ever created for a bye.
pub fn plan_bracket(slots: &[Option<RegistrationId>]) -> Vec<MatchPlan> {
    let size = slots.len();
    debug_assert!(size.is_power_of_two() && size >= 2);
    let total_rounds = size.trailing_zeros();

    // Flat layout: round 1 first, then each following round. The index of
    // the first match of round r (1-based) is size - size / 2^(r-1).
    let round_offset = |round: u32| size - (size >> (round - 1));

    let mut matches = Vec::with_capacity(size - 1);
    for round in 1..=total_rounds {
        let in_round = size >> round;
        for number in 0..in_round {
            let (winner_to, winner_to_slot) = if round == total_rounds {
                (None, None)
            } else {
                let downstream = round_offset(round + 1) + number / 2;
                let slot = if number % 2 == 0 { Slot::One } else { Slot::Two };
                (Some(downstream), Some(slot))
            };
            let (registration1_id, registration2_id) = if round == 1 {
                (slots[number * 2], slots[number * 2 + 1])
            } else {
                (None, None)
            };
            matches.push(MatchPlan {
                group: None,
                round,
                match_number: number as u32 + 1,
                registration1_id,
                registration2_id,
                bracket_position: (round == 1).then_some(number as u32 + 1),
                winner_to,
                winner_to_slot,
                played: false,
                winner_id: None,
            });
        }
    }

    // Resolve round-1 walkovers.
    for index in 0..size / 2 {
        let (winner, downstream) = {
            let m = &matches[index];
            let winner = match (m.registration1_id, m.registration2_id) {
                (Some(id), None) | (None, Some(id)) => id,
                _ => continue,
            };
            (winner, m.winner_to.zip(m.winner_to_slot))
        };
        matches[index].played = true;
        matches[index].winner_id = Some(winner);
        if let Some((target, slot)) = downstream {
            match slot {
                Slot::One => matches[target].registration1_id = Some(winner),
                Slot::Two => matches[target].registration2_id = Some(winner),
            }
        }
    }

    matches
}
