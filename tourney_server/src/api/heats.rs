//! Heat generation API handlers.
//!
//! Heats partition an event's registrations into fixed-size groups without
//! scheduling any matches.
//!
//! # Examples
//!
//! Generate heats of 4:
//! ```bash
//! curl -X POST http://localhost:4444/api/events/1/heats/generate \
//!   -H "Content-Type: application/json" \
//!   -d '{"players_per_heat": 4}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tourney::engine::HeatOptions;
use tourney::models::{EventId, GenerationSummary, HeatSummary};

use super::{ApiError, AppState, error_response};

#[derive(Debug, Deserialize)]
pub struct GenerateHeatsRequest {
    /// Overrides the event's configured heat size.
    pub players_per_heat: Option<u32>,
    #[serde(default = "default_true")]
    pub shuffle_registrations: bool,
    #[serde(default)]
    pub regenerate: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub deleted_heats: usize,
}

/// Partition the event's registrations into heats.
///
/// # Response
///
/// Returns `200 OK` with the generation summary:
/// ```json
/// {
///   "total_heats": 3,
///   "total_registrations": 9,
///   "heats": [{"group": {"id": 7, "name": "Heat 1", ...}, "member_count": 4}]
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: wrong event format, no registrations, heat size out
///   of range, or heats already exist without `regenerate`
/// - `404 Not Found`: event doesn't exist
pub async fn generate(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
    Json(request): Json<GenerateHeatsRequest>,
) -> Result<Json<GenerationSummary>, ApiError> {
    let options = HeatOptions {
        players_per_heat: request.players_per_heat,
        shuffle: request.shuffle_registrations,
        regenerate: request.regenerate,
    };
    state
        .engine
        .generate_heats(event_id, options)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Delete all heats of the event.
///
/// # Errors
///
/// - `400 Bad Request`: no heats exist for the event
/// - `404 Not Found`: event doesn't exist
pub async fn reset(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> Result<Json<ResetResponse>, ApiError> {
    state
        .engine
        .reset_heats(event_id)
        .await
        .map(|deleted_heats| Json(ResetResponse { deleted_heats }))
        .map_err(error_response)
}

/// List the event's heats with member counts.
pub async fn list(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> Result<Json<Vec<HeatSummary>>, ApiError> {
    state
        .engine
        .list_heats(event_id)
        .await
        .map(Json)
        .map_err(error_response)
}
