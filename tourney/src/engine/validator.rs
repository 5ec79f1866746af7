//! Registration membership validation.
//!
//! Precondition gate for every structure builder: each supplied id must be a
//! registration actually belonging to the event.

use std::collections::HashSet;

use crate::models::{Registration, RegistrationId};

/// Outcome of a membership check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationCheck {
    pub valid: bool,
    /// Ids that are not registrations of the event, in input order.
    pub invalid_ids: Vec<RegistrationId>,
}

/// Check `ids` against the event's registrations. No side effects.
pub fn check_membership(
    event_registrations: &[Registration],
    ids: &[RegistrationId],
) -> RegistrationCheck {
    let members: HashSet<RegistrationId> = event_registrations.iter().map(|r| r.id).collect();
    let invalid_ids: Vec<RegistrationId> = ids
        .iter()
        .copied()
        .filter(|id| !members.contains(id))
        .collect();
    RegistrationCheck {
        valid: invalid_ids.is_empty(),
        invalid_ids,
    }
}
