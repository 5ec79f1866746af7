//! Persistence interface and implementations.
//!
//! The engine talks to storage exclusively through [`TournamentStore`], a
//! trait of typed operations. [`PgStore`] is the PostgreSQL implementation;
//! [`MemoryStore`] is an in-memory fake used by the test suites.
//!
//! Compound operations (`persist_structure`, `reset_event_structures`,
//! `delete_group_cascade`, `finalize_match`) are atomic: the PostgreSQL
//! implementation wraps each in a transaction that locks the event row, so
//! two concurrent generation calls for the same event cannot both pass the
//! existence guard.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub mod config;
pub mod memory;
pub mod postgres;

pub use config::StoreConfig;
pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::EngineResult;
use crate::models::{
    Event, EventId, GameSet, Group, GroupId, Match, MatchId, Registration, RegistrationId,
    ResetCounts, SetId, Slot, StructurePlan,
};

/// How [`TournamentStore::persist_structure`] treats existing structures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistMode {
    /// Refuse when any groups or matches already exist for the event.
    FailIfExists,
    /// Delete existing structures first, then persist.
    Replace,
    /// Add to whatever exists (group creation on a running event).
    Append,
}

/// Typed persistence operations for the engine
#[async_trait]
pub trait TournamentStore: Send + Sync {
    async fn find_event(&self, event_id: EventId) -> EngineResult<Option<Event>>;
    async fn set_event_completed(&self, event_id: EventId, completed: bool) -> EngineResult<()>;

    async fn find_registrations_by_event(
        &self,
        event_id: EventId,
    ) -> EngineResult<Vec<Registration>>;

    async fn find_groups_by_event(&self, event_id: EventId) -> EngineResult<Vec<Group>>;
    async fn find_group(&self, group_id: GroupId) -> EngineResult<Option<Group>>;
    async fn set_group_completed(&self, group_id: GroupId, completed: bool) -> EngineResult<()>;

    /// Matches of an event ordered by (round, match_number).
    async fn find_matches_by_event(&self, event_id: EventId) -> EngineResult<Vec<Match>>;
    /// Matches of a group ordered by (round, match_number).
    async fn find_matches_by_group(&self, group_id: GroupId) -> EngineResult<Vec<Match>>;
    async fn find_match(&self, match_id: MatchId) -> EngineResult<Option<Match>>;
    /// Populate one registration slot of a (bracket) match.
    async fn set_match_slot(
        &self,
        match_id: MatchId,
        slot: Slot,
        registration_id: RegistrationId,
    ) -> EngineResult<()>;

    /// Sets of a match ordered by set_number.
    async fn find_sets_by_match(&self, match_id: MatchId) -> EngineResult<Vec<GameSet>>;
    async fn find_set(&self, set_id: SetId) -> EngineResult<Option<GameSet>>;
    async fn insert_set(&self, match_id: MatchId, set_number: u32) -> EngineResult<GameSet>;
    async fn update_set_scores(
        &self,
        set_id: SetId,
        registration1_score: u32,
        registration2_score: u32,
    ) -> EngineResult<()>;
    async fn mark_set_played(&self, set_id: SetId) -> EngineResult<()>;

    /// Atomically persist a generated structure. Inserts groups, attaches
    /// member registrations, inserts matches, and resolves plan-internal
    /// winner pointers to row ids. With [`PersistMode::FailIfExists`] the
    /// whole operation fails with a conflict when structures already exist.
    /// Returns the created groups in plan order.
    async fn persist_structure(
        &self,
        event_id: EventId,
        plan: &StructurePlan,
        mode: PersistMode,
    ) -> EngineResult<Vec<Group>>;

    /// Atomically delete all groups and matches (and their sets) of an event
    /// and detach member registrations.
    async fn reset_event_structures(&self, event_id: EventId) -> EngineResult<ResetCounts>;

    /// Atomically delete one group, its matches and their sets, detaching
    /// member registrations.
    async fn delete_group_cascade(&self, group_id: GroupId) -> EngineResult<()>;

    /// Atomically record a decided match: set winner and played, and
    /// force-mark any remaining unplayed sets as played (moot once a winner
    /// is determined).
    async fn finalize_match(
        &self,
        match_id: MatchId,
        winner_id: RegistrationId,
    ) -> EngineResult<()>;
}

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new connection pool from configuration.
    pub async fn new(config: &StoreConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check that the database answers a trivial query.
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
