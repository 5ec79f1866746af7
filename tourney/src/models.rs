//! Domain entities for events, registrations, groups, matches, and sets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type EventId = i64;
pub type RegistrationId = i64;
pub type GroupId = i64;
pub type MatchId = i64;
pub type SetId = i64;

/// Fallback when neither the request nor the event configures a heat size.
pub const DEFAULT_PLAYERS_PER_HEAT: u32 = 4;

/// Sanity cap on heat size.
pub const MAX_PLAYERS_PER_HEAT: u32 = 50;

/// Competition format of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventFormat {
    /// Round-robin groups
    Groups,
    /// Single-elimination bracket
    SingleElimination,
    /// Fixed-size heats for preliminary rounds
    Heats,
}

impl EventFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Groups => "groups",
            Self::SingleElimination => "single_elimination",
            Self::Heats => "heats",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "groups" => Some(Self::Groups),
            "single_elimination" => Some(Self::SingleElimination),
            "heats" => Some(Self::Heats),
            _ => None,
        }
    }
}

/// One of the two competitor slots of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot {
    One,
    Two,
}

impl Slot {
    pub fn as_i16(self) -> i16 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            _ => None,
        }
    }
}

/// A competition event. The engine reads its configuration and only ever
/// mutates the derived `completed` flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub format: EventFormat,
    /// Maximum sets per match; odd, at least 1.
    pub best_of: u32,
    /// Event-level default heat size.
    pub players_per_heat: Option<u32>,
    pub points_schema_id: Option<i64>,
    pub completed: bool,
}

/// An entry of one competitor (or doubles pair) in an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub event_id: EventId,
    /// Set by heat/group generation; a registration belongs to at most one
    /// group at a time.
    pub group_id: Option<GroupId>,
    pub player1_name: String,
    pub player2_name: Option<String>,
}

/// A round-robin group, also used as the container for a heat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub event_id: EventId,
    /// Single letter for round-robin groups ("A", "B", …), heat label for
    /// heats ("Heat 1", "Heat 2", …).
    pub name: String,
    /// Derived: all matches within the group are played.
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// A match between two registrations.
///
/// Exactly one `None` registration slot marks a bye, decided without sets.
/// Bracket matches of later rounds start with both slots empty and are
/// populated as upstream results come in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub event_id: EventId,
    /// None for pure bracket matches not tied to a group.
    pub group_id: Option<GroupId>,
    /// 1-based round index.
    pub round: u32,
    /// 1-based position within the round, scoped per group.
    pub match_number: u32,
    pub registration1_id: Option<RegistrationId>,
    pub registration2_id: Option<RegistrationId>,
    /// Slot index within the full bracket, round 1 only.
    pub bracket_position: Option<u32>,
    /// Downstream bracket match a winner advances into.
    pub winner_to: Option<MatchId>,
    pub winner_to_slot: Option<Slot>,
    pub played: bool,
    pub winner_id: Option<RegistrationId>,
    pub created_at: DateTime<Utc>,
}

impl Match {
    /// A bye has exactly one empty registration slot.
    pub fn is_bye(&self) -> bool {
        self.registration1_id.is_some() != self.registration2_id.is_some()
    }

    /// Registration occupying the given slot.
    pub fn registration_in(&self, slot: Slot) -> Option<RegistrationId> {
        match slot {
            Slot::One => self.registration1_id,
            Slot::Two => self.registration2_id,
        }
    }
}

/// A single set of a match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSet {
    pub id: SetId,
    pub match_id: MatchId,
    /// 1-based, contiguous, no gaps.
    pub set_number: u32,
    pub registration1_score: u32,
    pub registration2_score: u32,
    pub played: bool,
}

impl GameSet {
    /// Winner slot of a played set. Sets never draw, so this is `None` only
    /// for unplayed sets.
    pub fn winner_slot(&self) -> Option<Slot> {
        if !self.played || self.registration1_score == self.registration2_score {
            return None;
        }
        if self.registration1_score > self.registration2_score {
            Some(Slot::One)
        } else {
            Some(Slot::Two)
        }
    }
}

/// Seed assignment for bracket generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedEntry {
    pub registration_id: RegistrationId,
    /// 1 is the top seed.
    pub seed: u32,
}

/// One planned group and its member registrations, before persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPlan {
    pub name: String,
    pub members: Vec<RegistrationId>,
}

/// One planned match. `group` and `winner_to` are indices into the owning
/// [`StructurePlan`], resolved to row ids at persistence time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPlan {
    pub group: Option<usize>,
    pub round: u32,
    pub match_number: u32,
    pub registration1_id: Option<RegistrationId>,
    pub registration2_id: Option<RegistrationId>,
    pub bracket_position: Option<u32>,
    pub winner_to: Option<usize>,
    pub winner_to_slot: Option<Slot>,
    pub played: bool,
    pub winner_id: Option<RegistrationId>,
}

/// Full structure produced by a builder, persisted in one transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructurePlan {
    pub groups: Vec<GroupPlan>,
    pub matches: Vec<MatchPlan>,
}

/// One created heat with its member count
#[derive(Debug, Clone, Serialize)]
pub struct HeatSummary {
    pub group: Group,
    pub member_count: usize,
}

/// Result of a heat/bracket generation run
#[derive(Debug, Clone, Serialize)]
pub struct GenerationSummary {
    pub total_heats: usize,
    pub total_registrations: usize,
    pub heats: Vec<HeatSummary>,
}

/// Result of creating a round-robin group
#[derive(Debug, Clone, Serialize)]
pub struct GroupCreated {
    pub group: Group,
    pub match_count: usize,
}

/// Counts removed by a bulk structure reset
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ResetCounts {
    pub groups: usize,
    pub matches: usize,
}
