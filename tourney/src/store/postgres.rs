//! PostgreSQL implementation of [`TournamentStore`].
//!
//! Queries are bound at runtime; see `schema.sql` for the backing tables.
//! Compound operations lock the owning event (or match) row with
//! `SELECT ... FOR UPDATE` inside a transaction, which makes the existence
//! guards race-free: of two concurrent generation calls, exactly one commits.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Row, Transaction};

use crate::error::{EngineError, EngineResult};
use crate::models::{
    Event, EventFormat, EventId, GameSet, Group, GroupId, Match, MatchId, Registration,
    RegistrationId, ResetCounts, SetId, Slot, StructurePlan,
};
use crate::store::{PersistMode, TournamentStore};

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lock the event row for the duration of the transaction. Errors with
    /// `NotFound` when the event does not exist.
    async fn lock_event(
        tx: &mut Transaction<'_, Postgres>,
        event_id: EventId,
    ) -> EngineResult<()> {
        sqlx::query("SELECT id FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(EngineError::not_found("event", event_id))?;
        Ok(())
    }

    /// Delete all structures of the event within the open transaction.
    async fn reset_event_tx(
        tx: &mut Transaction<'_, Postgres>,
        event_id: EventId,
    ) -> EngineResult<ResetCounts> {
        sqlx::query(
            "DELETE FROM match_sets
             WHERE match_id IN (SELECT id FROM matches WHERE event_id = $1)",
        )
        .bind(event_id)
        .execute(&mut **tx)
        .await?;

        let matches = sqlx::query("DELETE FROM matches WHERE event_id = $1")
            .bind(event_id)
            .execute(&mut **tx)
            .await?
            .rows_affected() as usize;

        sqlx::query("UPDATE registrations SET group_id = NULL WHERE event_id = $1")
            .bind(event_id)
            .execute(&mut **tx)
            .await?;

        let groups = sqlx::query("DELETE FROM event_groups WHERE event_id = $1")
            .bind(event_id)
            .execute(&mut **tx)
            .await?
            .rows_affected() as usize;

        Ok(ResetCounts { groups, matches })
    }
}

fn event_from_row(row: &PgRow) -> EngineResult<Event> {
    let format_str: String = row.get("format");
    let format = EventFormat::parse(&format_str)
        .ok_or_else(|| sqlx::Error::Decode(format!("unknown event format {format_str:?}").into()))?;
    Ok(Event {
        id: row.get("id"),
        name: row.get("name"),
        format,
        best_of: row.get::<i32, _>("best_of") as u32,
        players_per_heat: row.get::<Option<i32>, _>("players_per_heat").map(|v| v as u32),
        points_schema_id: row.get("points_schema_id"),
        completed: row.get("completed"),
    })
}

fn registration_from_row(row: &PgRow) -> Registration {
    Registration {
        id: row.get("id"),
        event_id: row.get("event_id"),
        group_id: row.get("group_id"),
        player1_name: row.get("player1_name"),
        player2_name: row.get("player2_name"),
    }
}

fn group_from_row(row: &PgRow) -> Group {
    Group {
        id: row.get("id"),
        event_id: row.get("event_id"),
        name: row.get("name"),
        completed: row.get("completed"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    }
}

fn match_from_row(row: &PgRow) -> Match {
    Match {
        id: row.get("id"),
        event_id: row.get("event_id"),
        group_id: row.get("group_id"),
        round: row.get::<i32, _>("round") as u32,
        match_number: row.get::<i32, _>("match_number") as u32,
        registration1_id: row.get("registration1_id"),
        registration2_id: row.get("registration2_id"),
        bracket_position: row.get::<Option<i32>, _>("bracket_position").map(|v| v as u32),
        winner_to: row.get("winner_to"),
        winner_to_slot: row
            .get::<Option<i16>, _>("winner_to_slot")
            .and_then(Slot::from_i16),
        played: row.get("played"),
        winner_id: row.get("winner_id"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    }
}

fn set_from_row(row: &PgRow) -> GameSet {
    GameSet {
        id: row.get("id"),
        match_id: row.get("match_id"),
        set_number: row.get::<i32, _>("set_number") as u32,
        registration1_score: row.get::<i32, _>("registration1_score") as u32,
        registration2_score: row.get::<i32, _>("registration2_score") as u32,
        played: row.get("played"),
    }
}

const MATCH_COLUMNS: &str = "id, event_id, group_id, round, match_number, registration1_id, \
                             registration2_id, bracket_position, winner_to, winner_to_slot, \
                             played, winner_id, created_at";

#[async_trait]
impl TournamentStore for PgStore {
    async fn find_event(&self, event_id: EventId) -> EngineResult<Option<Event>> {
        let row = sqlx::query(
            "SELECT id, name, format, best_of, players_per_heat, points_schema_id, completed
             FROM events WHERE id = $1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| event_from_row(&r)).transpose()
    }

    async fn set_event_completed(&self, event_id: EventId, completed: bool) -> EngineResult<()> {
        let result = sqlx::query("UPDATE events SET completed = $1 WHERE id = $2")
            .bind(completed)
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(EngineError::not_found("event", event_id));
        }
        Ok(())
    }

    async fn find_registrations_by_event(
        &self,
        event_id: EventId,
    ) -> EngineResult<Vec<Registration>> {
        let rows = sqlx::query(
            "SELECT id, event_id, group_id, player1_name, player2_name
             FROM registrations WHERE event_id = $1 ORDER BY id",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(registration_from_row).collect())
    }

    async fn find_groups_by_event(&self, event_id: EventId) -> EngineResult<Vec<Group>> {
        let rows = sqlx::query(
            "SELECT id, event_id, name, completed, created_at
             FROM event_groups WHERE event_id = $1 ORDER BY id",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(group_from_row).collect())
    }

    async fn find_group(&self, group_id: GroupId) -> EngineResult<Option<Group>> {
        let row = sqlx::query(
            "SELECT id, event_id, name, completed, created_at FROM event_groups WHERE id = $1",
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| group_from_row(&r)))
    }

    async fn set_group_completed(&self, group_id: GroupId, completed: bool) -> EngineResult<()> {
        let result = sqlx::query("UPDATE event_groups SET completed = $1 WHERE id = $2")
            .bind(completed)
            .bind(group_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(EngineError::not_found("group", group_id));
        }
        Ok(())
    }

    async fn find_matches_by_event(&self, event_id: EventId) -> EngineResult<Vec<Match>> {
        let rows = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE event_id = $1 ORDER BY round, match_number, id"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(match_from_row).collect())
    }

    async fn find_matches_by_group(&self, group_id: GroupId) -> EngineResult<Vec<Match>> {
        let rows = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE group_id = $1 ORDER BY round, match_number, id"
        ))
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(match_from_row).collect())
    }

    async fn find_match(&self, match_id: MatchId) -> EngineResult<Option<Match>> {
        let row = sqlx::query(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"))
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| match_from_row(&r)))
    }

    async fn set_match_slot(
        &self,
        match_id: MatchId,
        slot: Slot,
        registration_id: RegistrationId,
    ) -> EngineResult<()> {
        let query = match slot {
            Slot::One => "UPDATE matches SET registration1_id = $1 WHERE id = $2",
            Slot::Two => "UPDATE matches SET registration2_id = $1 WHERE id = $2",
        };
        let result = sqlx::query(query)
            .bind(registration_id)
            .bind(match_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(EngineError::not_found("match", match_id));
        }
        Ok(())
    }

    async fn find_sets_by_match(&self, match_id: MatchId) -> EngineResult<Vec<GameSet>> {
        let rows = sqlx::query(
            "SELECT id, match_id, set_number, registration1_score, registration2_score, played
             FROM match_sets WHERE match_id = $1 ORDER BY set_number",
        )
        .bind(match_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(set_from_row).collect())
    }

    async fn find_set(&self, set_id: SetId) -> EngineResult<Option<GameSet>> {
        let row = sqlx::query(
            "SELECT id, match_id, set_number, registration1_score, registration2_score, played
             FROM match_sets WHERE id = $1",
        )
        .bind(set_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| set_from_row(&r)))
    }

    async fn insert_set(&self, match_id: MatchId, set_number: u32) -> EngineResult<GameSet> {
        let row = sqlx::query(
            "INSERT INTO match_sets (match_id, set_number, registration1_score, registration2_score, played)
             VALUES ($1, $2, 0, 0, FALSE)
             RETURNING id, match_id, set_number, registration1_score, registration2_score, played",
        )
        .bind(match_id)
        .bind(set_number as i32)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            // Two submissions racing for the same set number: the unique
            // index decides, the loser gets a conflict rather than a
            // storage failure.
            if let sqlx::Error::Database(db) = &err {
                if db.is_unique_violation() {
                    return EngineError::conflict(format!(
                        "set {set_number} already exists for this match"
                    ));
                }
            }
            EngineError::Storage(err)
        })?;
        Ok(set_from_row(&row))
    }

    async fn update_set_scores(
        &self,
        set_id: SetId,
        registration1_score: u32,
        registration2_score: u32,
    ) -> EngineResult<()> {
        let result = sqlx::query(
            "UPDATE match_sets SET registration1_score = $1, registration2_score = $2 WHERE id = $3",
        )
        .bind(registration1_score as i32)
        .bind(registration2_score as i32)
        .bind(set_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(EngineError::not_found("set", set_id));
        }
        Ok(())
    }

    async fn mark_set_played(&self, set_id: SetId) -> EngineResult<()> {
        let result = sqlx::query("UPDATE match_sets SET played = TRUE WHERE id = $1")
            .bind(set_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(EngineError::not_found("set", set_id));
        }
        Ok(())
    }

    async fn persist_structure(
        &self,
        event_id: EventId,
        plan: &StructurePlan,
        mode: PersistMode,
    ) -> EngineResult<Vec<Group>> {
        let mut tx = self.pool.begin().await?;
        Self::lock_event(&mut tx, event_id).await?;

        let existing: i64 = sqlx::query(
            "SELECT (SELECT COUNT(*) FROM event_groups WHERE event_id = $1)
                  + (SELECT COUNT(*) FROM matches WHERE event_id = $1) AS total",
        )
        .bind(event_id)
        .fetch_one(&mut *tx)
        .await?
        .get("total");

        match mode {
            PersistMode::FailIfExists if existing > 0 => {
                return Err(EngineError::conflict(
                    "structures already exist for this event",
                ));
            }
            PersistMode::Replace => {
                Self::reset_event_tx(&mut tx, event_id).await?;
            }
            _ => {}
        }

        let mut groups = Vec::with_capacity(plan.groups.len());
        for group_plan in &plan.groups {
            let row = sqlx::query(
                "INSERT INTO event_groups (event_id, name, completed)
                 VALUES ($1, $2, FALSE)
                 RETURNING id, event_id, name, completed, created_at",
            )
            .bind(event_id)
            .bind(&group_plan.name)
            .fetch_one(&mut *tx)
            .await?;
            let group = group_from_row(&row);

            if !group_plan.members.is_empty() {
                sqlx::query("UPDATE registrations SET group_id = $1 WHERE id = ANY($2)")
                    .bind(group.id)
                    .bind(&group_plan.members)
                    .execute(&mut *tx)
                    .await?;
            }
            groups.push(group);
        }

        let mut match_ids = Vec::with_capacity(plan.matches.len());
        for match_plan in &plan.matches {
            let row = sqlx::query(
                "INSERT INTO matches (event_id, group_id, round, match_number,
                                      registration1_id, registration2_id, bracket_position,
                                      winner_to_slot, played, winner_id)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                 RETURNING id",
            )
            .bind(event_id)
            .bind(match_plan.group.map(|g| groups[g].id))
            .bind(match_plan.round as i32)
            .bind(match_plan.match_number as i32)
            .bind(match_plan.registration1_id)
            .bind(match_plan.registration2_id)
            .bind(match_plan.bracket_position.map(|p| p as i32))
            .bind(match_plan.winner_to_slot.map(Slot::as_i16))
            .bind(match_plan.played)
            .bind(match_plan.winner_id)
            .fetch_one(&mut *tx)
            .await?;
            match_ids.push(row.get::<MatchId, _>("id"));
        }

        // Winner pointers reference plan indices; resolve them to row ids
        // now that every match is inserted.
        for (match_plan, &id) in plan.matches.iter().zip(&match_ids) {
            if let Some(target) = match_plan.winner_to {
                sqlx::query("UPDATE matches SET winner_to = $1 WHERE id = $2")
                    .bind(match_ids[target])
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(groups)
    }

    async fn reset_event_structures(&self, event_id: EventId) -> EngineResult<ResetCounts> {
        let mut tx = self.pool.begin().await?;
        Self::lock_event(&mut tx, event_id).await?;
        let counts = Self::reset_event_tx(&mut tx, event_id).await?;
        tx.commit().await?;
        Ok(counts)
    }

    async fn delete_group_cascade(&self, group_id: GroupId) -> EngineResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM event_groups WHERE id = $1 FOR UPDATE")
            .bind(group_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(EngineError::not_found("group", group_id))?;

        sqlx::query(
            "DELETE FROM match_sets
             WHERE match_id IN (SELECT id FROM matches WHERE group_id = $1)",
        )
        .bind(group_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM matches WHERE group_id = $1")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE registrations SET group_id = NULL WHERE group_id = $1")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM event_groups WHERE id = $1")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn finalize_match(
        &self,
        match_id: MatchId,
        winner_id: RegistrationId,
    ) -> EngineResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM matches WHERE id = $1 FOR UPDATE")
            .bind(match_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(EngineError::not_found("match", match_id))?;

        sqlx::query("UPDATE matches SET played = TRUE, winner_id = $1 WHERE id = $2")
            .bind(winner_id)
            .bind(match_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE match_sets SET played = TRUE WHERE match_id = $1 AND played = FALSE")
            .bind(match_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
