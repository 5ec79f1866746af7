//! Pure structure builders.
//!
//! Everything in this module is deterministic given its input order; any
//! shuffling happens upstream in the caller's registration ordering.

pub mod bracket;
pub mod heats;
pub mod round_robin;

pub use bracket::{bracket_size, bye_count, plan_bracket, validate_seeds};
pub use heats::{group_letter, heat_label, partition_heats, resolve_players_per_heat};
pub use round_robin::{Round, Schedule, round_robin};
