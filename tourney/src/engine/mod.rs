//! The tournament engine orchestrator.
//!
//! [`TournamentEngine`] ties the pure builders in [`crate::scheduling`] and
//! the state machine in [`crate::scoring`] to a [`TournamentStore`]. Every
//! operation is request-scoped: read current structures, validate, write —
//! with the multi-row writes delegated to the store's atomic compound
//! operations.

pub mod completion;
pub mod validator;

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info};
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    Event, EventFormat, EventId, GameSet, GenerationSummary, GroupCreated, GroupId, GroupPlan,
    HeatSummary, Match, MatchId, MatchPlan, RegistrationId, SeedEntry, SetId, StructurePlan,
};
use crate::scheduling::{self, bracket, round_robin};
use crate::scoring;
use crate::store::{PersistMode, TournamentStore};

/// Options for heat generation
#[derive(Debug, Clone)]
pub struct HeatOptions {
    /// Overrides the event's configured heat size.
    pub players_per_heat: Option<u32>,
    /// Apply a uniform random permutation before partitioning.
    pub shuffle: bool,
    /// Delete existing heats and matches first instead of failing.
    pub regenerate: bool,
}

impl Default for HeatOptions {
    fn default() -> Self {
        Self {
            players_per_heat: None,
            shuffle: true,
            regenerate: false,
        }
    }
}

/// Options for bracket generation
#[derive(Debug, Clone)]
pub struct BracketOptions {
    /// Randomize the order of unseeded registrations.
    pub shuffle: bool,
    pub seeds: Vec<SeedEntry>,
}

impl Default for BracketOptions {
    fn default() -> Self {
        Self {
            shuffle: true,
            seeds: Vec::new(),
        }
    }
}

/// Outcome of recording a set result
#[derive(Debug, Clone, Serialize)]
pub struct SetRecorded {
    pub set: GameSet,
    /// Match state after majority detection ran.
    pub match_state: Match,
}

/// Structure generation and match progression against a persistence store
#[derive(Clone)]
pub struct TournamentEngine {
    store: Arc<dyn TournamentStore>,
}

impl TournamentEngine {
    pub fn new(store: Arc<dyn TournamentStore>) -> Self {
        Self { store }
    }

    async fn require_event(&self, event_id: EventId) -> EngineResult<Event> {
        self.store
            .find_event(event_id)
            .await?
            .ok_or(EngineError::not_found("event", event_id))
    }

    async fn require_match(&self, match_id: MatchId) -> EngineResult<Match> {
        self.store
            .find_match(match_id)
            .await?
            .ok_or(EngineError::not_found("match", match_id))
    }

    async fn require_set(&self, set_id: SetId) -> EngineResult<GameSet> {
        self.store
            .find_set(set_id)
            .await?
            .ok_or(EngineError::not_found("set", set_id))
    }

    /// Partition the event's registrations into fixed-size heats.
    ///
    /// Refuses when heats already exist unless `regenerate` is set, in which
    /// case the existing structures are deleted first.
    pub async fn generate_heats(
        &self,
        event_id: EventId,
        options: HeatOptions,
    ) -> EngineResult<GenerationSummary> {
        let event = self.require_event(event_id).await?;
        if event.format != EventFormat::Heats {
            return Err(EngineError::validation(
                "format",
                format!(
                    "event format {} does not support heat generation",
                    event.format.as_str()
                ),
            ));
        }
        let per_heat = scheduling::resolve_players_per_heat(
            options.players_per_heat,
            event.players_per_heat,
        )?;

        let registrations = self.store.find_registrations_by_event(event_id).await?;
        if registrations.is_empty() {
            return Err(EngineError::validation(
                "registrations",
                "event has no registrations",
            ));
        }
        let mut ids: Vec<RegistrationId> = registrations.iter().map(|r| r.id).collect();
        if options.shuffle {
            ids.shuffle(&mut rand::rng());
        }

        let chunks = scheduling::partition_heats(&ids, per_heat);
        let plan = StructurePlan {
            groups: chunks
                .iter()
                .enumerate()
                .map(|(i, members)| GroupPlan {
                    name: scheduling::heat_label(i),
                    members: members.clone(),
                })
                .collect(),
            matches: Vec::new(),
        };

        let mode = if options.regenerate {
            PersistMode::Replace
        } else {
            PersistMode::FailIfExists
        };
        let groups = self.store.persist_structure(event_id, &plan, mode).await?;

        for group in &groups {
            self.recompute_group_completion(group.id).await?;
        }
        self.recompute_event_completion(event_id).await?;

        info!(
            "generated {} heats of up to {per_heat} for event {event_id}",
            groups.len()
        );
        Ok(GenerationSummary {
            total_heats: groups.len(),
            total_registrations: ids.len(),
            heats: groups
                .into_iter()
                .zip(&chunks)
                .map(|(group, members)| HeatSummary {
                    group,
                    member_count: members.len(),
                })
                .collect(),
        })
    }

    /// Delete all heats of the event, detaching member registrations and
    /// recomputing event completion. Returns the number of deleted heats.
    pub async fn reset_heats(&self, event_id: EventId) -> EngineResult<usize> {
        self.require_event(event_id).await?;
        let counts = self.store.reset_event_structures(event_id).await?;
        if counts.groups == 0 && counts.matches == 0 {
            return Err(EngineError::conflict("no heats exist for this event"));
        }
        self.recompute_event_completion(event_id).await?;
        info!(
            "reset event {event_id}: removed {} heats and {} matches",
            counts.groups, counts.matches
        );
        Ok(counts.groups)
    }

    /// Create a round-robin group from the given registrations and schedule
    /// all of its matches.
    pub async fn create_group(
        &self,
        event_id: EventId,
        registration_ids: &[RegistrationId],
    ) -> EngineResult<GroupCreated> {
        let event = self.require_event(event_id).await?;
        if event.format != EventFormat::Groups {
            return Err(EngineError::validation(
                "format",
                format!(
                    "event format {} does not support group creation",
                    event.format.as_str()
                ),
            ));
        }
        if registration_ids.len() < 2 {
            return Err(EngineError::validation(
                "registration_ids",
                "a group needs at least 2 registrations",
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = registration_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(EngineError::validation(
                "registration_ids",
                format!("registration {dup} is listed more than once"),
            ));
        }

        let registrations = self.store.find_registrations_by_event(event_id).await?;
        let check = validator::check_membership(&registrations, registration_ids);
        if !check.valid {
            return Err(EngineError::validation(
                "registration_ids",
                format!(
                    "not registrations of this event: {:?}",
                    check.invalid_ids
                ),
            ));
        }
        let members: HashSet<RegistrationId> = registration_ids.iter().copied().collect();
        if let Some(taken) = registrations
            .iter()
            .find(|r| members.contains(&r.id) && r.group_id.is_some())
        {
            return Err(EngineError::conflict(format!(
                "registration {} is already assigned to a group",
                taken.id
            )));
        }

        let existing = self.store.find_groups_by_event(event_id).await?;
        let name = scheduling::group_letter(existing.len());

        let schedule = round_robin::round_robin(registration_ids.len());
        let matches: Vec<MatchPlan> = schedule
            .rounds
            .iter()
            .enumerate()
            .flat_map(|(round_index, round)| {
                round
                    .pairs
                    .iter()
                    .enumerate()
                    .map(move |(pair_index, &(a, b))| MatchPlan {
                        group: Some(0),
                        round: round_index as u32 + 1,
                        match_number: pair_index as u32 + 1,
                        registration1_id: Some(registration_ids[a]),
                        registration2_id: Some(registration_ids[b]),
                        bracket_position: None,
                        winner_to: None,
                        winner_to_slot: None,
                        played: false,
                        winner_id: None,
                    })
            })
            .collect();
        let match_count = matches.len();

        let plan = StructurePlan {
            groups: vec![GroupPlan {
                name: name.clone(),
                members: registration_ids.to_vec(),
            }],
            matches,
        };
        let mut groups = self
            .store
            .persist_structure(event_id, &plan, PersistMode::Append)
            .await?;
        let group = groups.remove(0);

        self.recompute_group_completion(group.id).await?;
        self.recompute_event_completion(event_id).await?;

        info!(
            "created group {name} with {} members and {match_count} matches for event {event_id}",
            registration_ids.len()
        );
        Ok(GroupCreated { group, match_count })
    }

    /// Delete a group, cascading to its matches and sets, detaching member
    /// registrations, and recomputing event completion.
    pub async fn delete_group(&self, group_id: GroupId) -> EngineResult<()> {
        let group = self
            .store
            .find_group(group_id)
            .await?
            .ok_or(EngineError::not_found("group", group_id))?;
        self.store.delete_group_cascade(group_id).await?;
        self.recompute_event_completion(group.event_id).await?;
        info!("deleted group {} of event {}", group.name, group.event_id);
        Ok(())
    }

    /// Generate the single-elimination bracket for the event.
    ///
    /// Unlike heat generation there is no implicit regenerate; existing
    /// structures must be reset through [`Self::reset_heats`] first.
    pub async fn generate_bracket(
        &self,
        event_id: EventId,
        options: BracketOptions,
    ) -> EngineResult<GenerationSummary> {
        let event = self.require_event(event_id).await?;
        if event.format != EventFormat::SingleElimination {
            return Err(EngineError::validation(
                "format",
                format!(
                    "event format {} does not support bracket generation",
                    event.format.as_str()
                ),
            ));
        }

        let registrations = self.store.find_registrations_by_event(event_id).await?;
        let ids: Vec<RegistrationId> = registrations.iter().map(|r| r.id).collect();
        if ids.len() < 2 {
            return Err(EngineError::validation(
                "registrations",
                "a bracket needs at least 2 registrations",
            ));
        }
        bracket::validate_seeds(&options.seeds, &ids)?;

        let mut seeds = options.seeds.clone();
        seeds.sort_by_key(|s| s.seed);
        let seeded: Vec<RegistrationId> = seeds.iter().map(|s| s.registration_id).collect();
        let seeded_set: HashSet<RegistrationId> = seeded.iter().copied().collect();
        let mut unseeded: Vec<RegistrationId> = ids
            .iter()
            .copied()
            .filter(|id| !seeded_set.contains(id))
            .collect();
        if options.shuffle {
            unseeded.shuffle(&mut rand::rng());
        }

        let slots = bracket::assign_slots(&seeded, &unseeded);
        let plan = StructurePlan {
            groups: Vec::new(),
            matches: bracket::plan_bracket(&slots),
        };
        self.store
            .persist_structure(event_id, &plan, PersistMode::FailIfExists)
            .await?;
        self.recompute_event_completion(event_id).await?;

        info!(
            "generated a {}-slot bracket ({} byes) for event {event_id}",
            slots.len(),
            bracket::bye_count(ids.len())
        );
        Ok(GenerationSummary {
            total_heats: 0,
            total_registrations: ids.len(),
            heats: Vec::new(),
        })
    }

    /// List the event's heats/groups with member counts.
    pub async fn list_heats(&self, event_id: EventId) -> EngineResult<Vec<HeatSummary>> {
        self.require_event(event_id).await?;
        let groups = self.store.find_groups_by_event(event_id).await?;
        let registrations = self.store.find_registrations_by_event(event_id).await?;
        Ok(groups
            .into_iter()
            .map(|group| {
                let member_count = registrations
                    .iter()
                    .filter(|r| r.group_id == Some(group.id))
                    .count();
                HeatSummary { group, member_count }
            })
            .collect())
    }

    /// Open the next set of a match without scores.
    pub async fn open_set(&self, match_id: MatchId) -> EngineResult<GameSet> {
        let m = self.require_match(match_id).await?;
        self.require_competitors(&m)?;
        let event = self.require_event(m.event_id).await?;
        let sets = self.store.find_sets_by_match(match_id).await?;
        let next = scoring::validate_set_addition(&m, &sets, event.best_of)?;
        self.store.insert_set(match_id, next).await
    }

    /// Write scores into an unplayed set. Score validation is deferred until
    /// the set is asserted played.
    pub async fn update_set(
        &self,
        set_id: SetId,
        registration1_score: u32,
        registration2_score: u32,
    ) -> EngineResult<GameSet> {
        scoring::validate_score_bounds(registration1_score, registration2_score)?;
        let set = self.require_set(set_id).await?;
        if set.played {
            return Err(EngineError::conflict(format!(
                "set {} is already played and cannot be rescored",
                set.set_number
            )));
        }
        self.store
            .update_set_scores(set_id, registration1_score, registration2_score)
            .await?;
        Ok(GameSet {
            registration1_score,
            registration2_score,
            ..set
        })
    }

    /// Assert a set is played with its current scores, then run majority
    /// detection on the match.
    pub async fn play_set(&self, set_id: SetId) -> EngineResult<SetRecorded> {
        let set = self.require_set(set_id).await?;
        if set.played {
            return Err(EngineError::conflict(format!(
                "set {} is already played",
                set.set_number
            )));
        }
        let m = self.require_match(set.match_id).await?;
        let event = self.require_event(m.event_id).await?;
        let sets = self.store.find_sets_by_match(m.id).await?;

        let candidate = GameSet {
            played: true,
            ..set.clone()
        };
        scoring::validate_set_played(&candidate, &sets)?;
        self.store.mark_set_played(set_id).await?;
        debug!(
            "match {} set {}: {}-{}",
            m.id, set.set_number, set.registration1_score, set.registration2_score
        );

        let refreshed = self.store.find_sets_by_match(m.id).await?;
        if let Some(slot) = scoring::decide_winner(&refreshed, event.best_of) {
            let winner = m
                .registration_in(slot)
                .ok_or_else(|| EngineError::conflict("winning slot has no registration"))?;
            self.finalize_and_cascade(&m, winner).await?;
        }

        let match_state = self.require_match(m.id).await?;
        let set = self.require_set(set_id).await?;
        Ok(SetRecorded { set, match_state })
    }

    /// Record a set result in one step: open or rescore the set, write the
    /// scores, and mark it played. `set_number` must be an existing unplayed
    /// set or the next one in sequence.
    pub async fn record_set(
        &self,
        match_id: MatchId,
        set_number: u32,
        registration1_score: u32,
        registration2_score: u32,
    ) -> EngineResult<SetRecorded> {
        if set_number == 0 {
            return Err(EngineError::validation("set_number", "must be at least 1"));
        }
        scoring::validate_score_bounds(registration1_score, registration2_score)?;
        let m = self.require_match(match_id).await?;
        let event = self.require_event(m.event_id).await?;
        let sets = self.store.find_sets_by_match(match_id).await?;

        let target = match sets.iter().find(|s| s.set_number == set_number) {
            Some(existing) if existing.played => {
                return Err(EngineError::conflict(format!(
                    "set {set_number} is already played and cannot be rescored"
                )));
            }
            Some(existing) => existing.clone(),
            None => {
                self.require_competitors(&m)?;
                let next = scoring::validate_set_addition(&m, &sets, event.best_of)?;
                if set_number != next {
                    return Err(EngineError::conflict(format!(
                        "sets must be recorded in order: expected set {next}, got set {set_number}"
                    )));
                }
                // Validate the score line before the row exists so a rejected
                // result does not leave an open set behind.
                let probe = GameSet {
                    id: 0,
                    match_id,
                    set_number,
                    registration1_score,
                    registration2_score,
                    played: true,
                };
                scoring::validate_set_played(&probe, &sets)?;
                self.store.insert_set(match_id, next).await?
            }
        };

        self.store
            .update_set_scores(target.id, registration1_score, registration2_score)
            .await?;
        self.play_set(target.id).await
    }

    /// Explicitly assert a match is finished instead of relying on majority
    /// auto-detection.
    pub async fn complete_match(&self, match_id: MatchId) -> EngineResult<Match> {
        let m = self.require_match(match_id).await?;
        let event = self.require_event(m.event_id).await?;
        let sets = self.store.find_sets_by_match(match_id).await?;
        let slot = scoring::validate_match_completion(&m, &sets, event.best_of)?;
        let winner = m
            .registration_in(slot)
            .ok_or_else(|| EngineError::conflict("winning slot has no registration"))?;
        self.finalize_and_cascade(&m, winner).await?;
        self.require_match(match_id).await
    }

    /// Recompute the event's derived completion flag from its groups.
    pub async fn recompute_event_completion(&self, event_id: EventId) -> EngineResult<bool> {
        let groups = self.store.find_groups_by_event(event_id).await?;
        let completed = completion::event_is_completed(&groups);
        self.store.set_event_completed(event_id, completed).await?;
        Ok(completed)
    }

    async fn recompute_group_completion(&self, group_id: GroupId) -> EngineResult<bool> {
        let matches = self.store.find_matches_by_group(group_id).await?;
        let completed = completion::group_is_completed(&matches);
        self.store.set_group_completed(group_id, completed).await?;
        Ok(completed)
    }

    fn require_competitors(&self, m: &Match) -> EngineResult<()> {
        if m.registration1_id.is_none() || m.registration2_id.is_none() {
            return Err(EngineError::conflict(
                "match does not have both competitors yet",
            ));
        }
        Ok(())
    }

    /// Finalize a decided match and cascade: advance the winner into the
    /// downstream bracket slot, then recompute group and event completion.
    async fn finalize_and_cascade(
        &self,
        m: &Match,
        winner: RegistrationId,
    ) -> EngineResult<()> {
        self.store.finalize_match(m.id, winner).await?;
        if let (Some(target), Some(slot)) = (m.winner_to, m.winner_to_slot) {
            self.store.set_match_slot(target, slot, winner).await?;
            debug!("advanced registration {winner} from match {} to match {target}", m.id);
        }
        if let Some(group_id) = m.group_id {
            self.recompute_group_completion(group_id).await?;
        }
        self.recompute_event_completion(m.event_id).await?;
        info!("match {} completed, winner registration {winner}", m.id);
        Ok(())
    }
}
