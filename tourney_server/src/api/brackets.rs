//! Bracket generation API handlers.
//!
//! # Examples
//!
//! Generate a bracket with two seeded entrants:
//! ```bash
//! curl -X POST http://localhost:4444/api/events/1/bracket/generate \
//!   -H "Content-Type: application/json" \
//!   -d '{"seeds": [{"registration_id": 12, "seed": 1}, {"registration_id": 40, "seed": 2}]}'
//! ```

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tourney::engine::BracketOptions;
use tourney::models::{EventId, GenerationSummary, SeedEntry};

use super::{ApiError, AppState, error_response};

#[derive(Debug, Deserialize)]
pub struct GenerateBracketRequest {
    #[serde(default = "default_true")]
    pub shuffle_registrations: bool,
    #[serde(default)]
    pub seeds: Vec<SeedEntry>,
}

fn default_true() -> bool {
    true
}

/// Build the single-elimination bracket for the event.
///
/// Seeded registrations are placed by the standard seeding order; the rest
/// fill the remaining slots, shuffled unless `shuffle_registrations` is
/// false. Byes pair against the top seeds and resolve immediately.
///
/// # Errors
///
/// - `400 Bad Request`: wrong event format, fewer than 2 registrations,
///   invalid seeds (first offender named), or structures already exist
/// - `404 Not Found`: event doesn't exist
pub async fn generate(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
    Json(request): Json<GenerateBracketRequest>,
) -> Result<Json<GenerationSummary>, ApiError> {
    let options = BracketOptions {
        shuffle: request.shuffle_registrations,
        seeds: request.seeds,
    };
    state
        .engine
        .generate_bracket(event_id, options)
        .await
        .map(Json)
        .map_err(error_response)
}
