//! Set scoring and match completion API handlers.
//!
//! Scoring is a two-step flow: write scores into an open set with
//! `PUT /api/sets/{id}`, then assert it played with
//! `POST /api/sets/{id}/played`. The played assertion validates the score
//! line and runs majority detection, which may finalize the match and
//! advance the winner into the next bracket round.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tourney::engine::SetRecorded;
use tourney::models::{GameSet, Match, MatchId, SetId};

use super::{ApiError, AppState, error_response};

#[derive(Debug, Deserialize)]
pub struct SetScoresRequest {
    pub registration1_score: u32,
    pub registration2_score: u32,
}

/// Open the next set of a match.
///
/// # Errors
///
/// - `400 Bad Request`: match completed, competitors not determined yet, an
///   earlier set still open, set count at `best_of`, or winner already
///   decided
/// - `404 Not Found`: match doesn't exist
pub async fn open_set(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> Result<Json<GameSet>, ApiError> {
    state
        .engine
        .open_set(match_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Write scores into an open set.
///
/// Scores may be rewritten freely until the set is marked played; the score
/// line is only validated by the played assertion.
pub async fn update_set(
    State(state): State<AppState>,
    Path(set_id): Path<SetId>,
    Json(request): Json<SetScoresRequest>,
) -> Result<Json<GameSet>, ApiError> {
    state
        .engine
        .update_set(set_id, request.registration1_score, request.registration2_score)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Assert a set is played and run majority detection.
///
/// # Response
///
/// Returns `200 OK` with the played set and the match state after majority
/// detection:
/// ```json
/// {"set": {...}, "match_state": {"played": true, "winner_id": 12, ...}}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: set already played, drawn or all-zero scores, or an
///   earlier set still open
/// - `404 Not Found`: set doesn't exist
pub async fn play_set(
    State(state): State<AppState>,
    Path(set_id): Path<SetId>,
) -> Result<Json<SetRecorded>, ApiError> {
    state
        .engine
        .play_set(set_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Explicitly complete a match from its played sets.
///
/// # Errors
///
/// - `400 Bad Request`: match already completed, open sets remain, win
///   counts tied, or the leader is below the majority threshold
/// - `404 Not Found`: match doesn't exist
pub async fn complete_match(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> Result<Json<Match>, ApiError> {
    state
        .engine
        .complete_match(match_id)
        .await
        .map(Json)
        .map_err(error_response)
}
