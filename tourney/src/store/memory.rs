//! In-memory store for tests.
//!
//! Backs the engine with plain hash maps behind a mutex, which makes every
//! compound operation trivially atomic. Seeding helpers create events and
//! registrations directly, standing in for the registration subsystem that
//! owns those rows in production.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    Event, EventFormat, EventId, GameSet, Group, GroupId, Match, MatchId, Registration,
    RegistrationId, ResetCounts, SetId, Slot, StructurePlan,
};
use crate::store::{PersistMode, TournamentStore};

#[derive(Default)]
struct MemoryInner {
    events: HashMap<EventId, Event>,
    registrations: HashMap<RegistrationId, Registration>,
    groups: HashMap<GroupId, Group>,
    matches: HashMap<MatchId, Match>,
    sets: HashMap<SetId, GameSet>,
    next_id: i64,
}

impl MemoryInner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn delete_group_rows(&mut self, group_id: GroupId) -> usize {
        let match_ids: Vec<MatchId> = self
            .matches
            .values()
            .filter(|m| m.group_id == Some(group_id))
            .map(|m| m.id)
            .collect();
        let deleted = match_ids.len();
        self.sets.retain(|_, s| !match_ids.contains(&s.match_id));
        for id in match_ids {
            self.matches.remove(&id);
        }
        for registration in self.registrations.values_mut() {
            if registration.group_id == Some(group_id) {
                registration.group_id = None;
            }
        }
        self.groups.remove(&group_id);
        deleted
    }

    fn reset_event(&mut self, event_id: EventId) -> ResetCounts {
        let group_ids: Vec<GroupId> = self
            .groups
            .values()
            .filter(|g| g.event_id == event_id)
            .map(|g| g.id)
            .collect();
        let mut counts = ResetCounts {
            groups: group_ids.len(),
            matches: 0,
        };
        for group_id in group_ids {
            counts.matches += self.delete_group_rows(group_id);
        }
        // Pure bracket matches carry no group.
        let stray: Vec<MatchId> = self
            .matches
            .values()
            .filter(|m| m.event_id == event_id)
            .map(|m| m.id)
            .collect();
        counts.matches += stray.len();
        self.sets.retain(|_, s| !stray.contains(&s.match_id));
        for id in stray {
            self.matches.remove(&id);
        }
        counts
    }
}

/// In-memory [`TournamentStore`] implementation
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an event row for tests.
    pub fn seed_event(
        &self,
        format: EventFormat,
        best_of: u32,
        players_per_heat: Option<u32>,
    ) -> Event {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let event = Event {
            id,
            name: format!("Event {id}"),
            format,
            best_of,
            players_per_heat,
            points_schema_id: None,
            completed: false,
        };
        inner.events.insert(id, event.clone());
        event
    }

    /// Create a registration row for tests.
    pub fn seed_registration(&self, event_id: EventId, player1_name: &str) -> Registration {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let registration = Registration {
            id,
            event_id,
            group_id: None,
            player1_name: player1_name.to_string(),
            player2_name: None,
        };
        inner.registrations.insert(id, registration.clone());
        registration
    }

    /// Current registration row, for assertions on `group_id`.
    pub fn registration(&self, id: RegistrationId) -> Option<Registration> {
        self.inner.lock().unwrap().registrations.get(&id).cloned()
    }

    /// Current event row, for assertions on `completed`.
    pub fn event(&self, id: EventId) -> Option<Event> {
        self.inner.lock().unwrap().events.get(&id).cloned()
    }
}

#[async_trait]
impl TournamentStore for MemoryStore {
    async fn find_event(&self, event_id: EventId) -> EngineResult<Option<Event>> {
        Ok(self.inner.lock().unwrap().events.get(&event_id).cloned())
    }

    async fn set_event_completed(&self, event_id: EventId, completed: bool) -> EngineResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let event = inner
            .events
            .get_mut(&event_id)
            .ok_or(EngineError::not_found("event", event_id))?;
        event.completed = completed;
        Ok(())
    }

    async fn find_registrations_by_event(
        &self,
        event_id: EventId,
    ) -> EngineResult<Vec<Registration>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<Registration> = inner
            .registrations
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }

    async fn find_groups_by_event(&self, event_id: EventId) -> EngineResult<Vec<Group>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<Group> = inner
            .groups
            .values()
            .filter(|g| g.event_id == event_id)
            .cloned()
            .collect();
        rows.sort_by_key(|g| g.id);
        Ok(rows)
    }

    async fn find_group(&self, group_id: GroupId) -> EngineResult<Option<Group>> {
        Ok(self.inner.lock().unwrap().groups.get(&group_id).cloned())
    }

    async fn set_group_completed(&self, group_id: GroupId, completed: bool) -> EngineResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let group = inner
            .groups
            .get_mut(&group_id)
            .ok_or(EngineError::not_found("group", group_id))?;
        group.completed = completed;
        Ok(())
    }

    async fn find_matches_by_event(&self, event_id: EventId) -> EngineResult<Vec<Match>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<Match> = inner
            .matches
            .values()
            .filter(|m| m.event_id == event_id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| (m.round, m.match_number, m.id));
        Ok(rows)
    }

    async fn find_matches_by_group(&self, group_id: GroupId) -> EngineResult<Vec<Match>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<Match> = inner
            .matches
            .values()
            .filter(|m| m.group_id == Some(group_id))
            .cloned()
            .collect();
        rows.sort_by_key(|m| (m.round, m.match_number, m.id));
        Ok(rows)
    }

    async fn find_match(&self, match_id: MatchId) -> EngineResult<Option<Match>> {
        Ok(self.inner.lock().unwrap().matches.get(&match_id).cloned())
    }

    async fn set_match_slot(
        &self,
        match_id: MatchId,
        slot: Slot,
        registration_id: RegistrationId,
    ) -> EngineResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let m = inner
            .matches
            .get_mut(&match_id)
            .ok_or(EngineError::not_found("match", match_id))?;
        match slot {
            Slot::One => m.registration1_id = Some(registration_id),
            Slot::Two => m.registration2_id = Some(registration_id),
        }
        Ok(())
    }

    async fn find_sets_by_match(&self, match_id: MatchId) -> EngineResult<Vec<GameSet>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<GameSet> = inner
            .sets
            .values()
            .filter(|s| s.match_id == match_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.set_number);
        Ok(rows)
    }

    async fn find_set(&self, set_id: SetId) -> EngineResult<Option<GameSet>> {
        Ok(self.inner.lock().unwrap().sets.get(&set_id).cloned())
    }

    async fn insert_set(&self, match_id: MatchId, set_number: u32) -> EngineResult<GameSet> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.matches.contains_key(&match_id) {
            return Err(EngineError::not_found("match", match_id));
        }
        if inner
            .sets
            .values()
            .any(|s| s.match_id == match_id && s.set_number == set_number)
        {
            return Err(EngineError::conflict(format!(
                "set {set_number} already exists for this match"
            )));
        }
        let id = inner.next_id();
        let set = GameSet {
            id,
            match_id,
            set_number,
            registration1_score: 0,
            registration2_score: 0,
            played: false,
        };
        inner.sets.insert(id, set.clone());
        Ok(set)
    }

    async fn update_set_scores(
        &self,
        set_id: SetId,
        registration1_score: u32,
        registration2_score: u32,
    ) -> EngineResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let set = inner
            .sets
            .get_mut(&set_id)
            .ok_or(EngineError::not_found("set", set_id))?;
        set.registration1_score = registration1_score;
        set.registration2_score = registration2_score;
        Ok(())
    }

    async fn mark_set_played(&self, set_id: SetId) -> EngineResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let set = inner
            .sets
            .get_mut(&set_id)
            .ok_or(EngineError::not_found("set", set_id))?;
        set.played = true;
        Ok(())
    }

    async fn persist_structure(
        &self,
        event_id: EventId,
        plan: &StructurePlan,
        mode: PersistMode,
    ) -> EngineResult<Vec<Group>> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.events.contains_key(&event_id) {
            return Err(EngineError::not_found("event", event_id));
        }

        let has_structures = inner.groups.values().any(|g| g.event_id == event_id)
            || inner.matches.values().any(|m| m.event_id == event_id);
        match mode {
            PersistMode::FailIfExists if has_structures => {
                return Err(EngineError::conflict(
                    "structures already exist for this event",
                ));
            }
            PersistMode::Replace => {
                inner.reset_event(event_id);
            }
            _ => {}
        }

        let mut groups = Vec::with_capacity(plan.groups.len());
        let mut group_ids = Vec::with_capacity(plan.groups.len());
        for group_plan in &plan.groups {
            let id = inner.next_id();
            let group = Group {
                id,
                event_id,
                name: group_plan.name.clone(),
                completed: false,
                created_at: Utc::now(),
            };
            inner.groups.insert(id, group.clone());
            group_ids.push(id);
            for member in &group_plan.members {
                if let Some(registration) = inner.registrations.get_mut(member) {
                    registration.group_id = Some(id);
                }
            }
            groups.push(group);
        }

        let match_ids: Vec<MatchId> = plan.matches.iter().map(|_| inner.next_id()).collect();
        for (match_plan, &id) in plan.matches.iter().zip(&match_ids) {
            let m = Match {
                id,
                event_id,
                group_id: match_plan.group.map(|g| group_ids[g]),
                round: match_plan.round,
                match_number: match_plan.match_number,
                registration1_id: match_plan.registration1_id,
                registration2_id: match_plan.registration2_id,
                bracket_position: match_plan.bracket_position,
                winner_to: match_plan.winner_to.map(|w| match_ids[w]),
                winner_to_slot: match_plan.winner_to_slot,
                played: match_plan.played,
                winner_id: match_plan.winner_id,
                created_at: Utc::now(),
            };
            inner.matches.insert(id, m);
        }

        Ok(groups)
    }

    async fn reset_event_structures(&self, event_id: EventId) -> EngineResult<ResetCounts> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.events.contains_key(&event_id) {
            return Err(EngineError::not_found("event", event_id));
        }
        Ok(inner.reset_event(event_id))
    }

    async fn delete_group_cascade(&self, group_id: GroupId) -> EngineResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.groups.contains_key(&group_id) {
            return Err(EngineError::not_found("group", group_id));
        }
        inner.delete_group_rows(group_id);
        Ok(())
    }

    async fn finalize_match(
        &self,
        match_id: MatchId,
        winner_id: RegistrationId,
    ) -> EngineResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let m = inner
            .matches
            .get_mut(&match_id)
            .ok_or(EngineError::not_found("match", match_id))?;
        m.played = true;
        m.winner_id = Some(winner_id);
        for set in inner.sets.values_mut() {
            if set.match_id == match_id {
                set.played = true;
            }
        }
        Ok(())
    }
}
