//! Derived completion flags.
//!
//! Always a pure recomputation from current persisted state, never an
//! incremental update, so the flags stay consistent with the underlying
//! match and group rows regardless of which operation triggered the
//! recompute.

use crate::models::{Group, Match};

/// A group is completed when all of its matches are played. A group without
/// matches (a freshly generated heat) is vacuously completed.
pub fn group_is_completed(matches: &[Match]) -> bool {
    matches.iter().all(|m| m.played)
}

/// An event is completed when it has at least one group and every group is
/// completed.
pub fn event_is_completed(groups: &[Group]) -> bool {
    !groups.is_empty() && groups.iter().all(|g| g.completed)
}
