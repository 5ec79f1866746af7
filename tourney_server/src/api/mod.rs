//! HTTP API for the tournament engine.
//!
//! Thin handlers over [`TournamentEngine`]: deserialize the request, call the
//! engine, map the result to JSON. All domain rules live in the library.
//!
//! # Endpoints Overview
//!
//! ## Events
//! - `POST /api/events/{id}/heats/generate` - Partition registrations into heats
//! - `POST /api/events/{id}/heats/reset` - Delete all heats of an event
//! - `GET  /api/events/{id}/heats` - List heats with member counts
//! - `POST /api/events/{id}/bracket/generate` - Build the elimination bracket
//!
//! ## Groups
//! - `POST /api/groups` - Create a round-robin group with its matches
//! - `DELETE /api/groups/{id}` - Delete a group (cascades to matches and sets)
//!
//! ## Scoring
//! - `POST /api/matches/{id}/sets` - Open the next set of a match
//! - `PUT  /api/sets/{id}` - Write scores into an open set
//! - `POST /api/sets/{id}/played` - Assert a set played, run majority detection
//! - `POST /api/matches/{id}/complete` - Explicitly complete a match
//!
//! ## Health Check
//! - `GET /health` - Server health status

pub mod brackets;
pub mod groups;
pub mod heats;
pub mod scores;

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use tourney::{EngineError, TournamentEngine};
use tower_http::cors::CorsLayer;

/// Application state shared across all handlers.
///
/// Cloned per request; cheap due to the Arc wrappers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TournamentEngine>,
    pub pool: Arc<PgPool>,
}

/// JSON error body returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map an engine error to a status code and JSON body.
///
/// Validation and conflict errors are both client mistakes (400), missing
/// rows are 404, and storage failures are 500 with the detail kept out of
/// the response.
pub(crate) fn error_response(err: EngineError) -> ApiError {
    let (status, message) = match &err {
        EngineError::Validation { .. } | EngineError::Conflict(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        EngineError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        EngineError::Storage(source) => {
            tracing::error!("storage failure: {source}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            )
        }
    };
    (status, Json(ErrorResponse { error: message }))
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/events/{event_id}/heats/generate", post(heats::generate))
        .route("/events/{event_id}/heats/reset", post(heats::reset))
        .route("/events/{event_id}/heats", get(heats::list))
        .route(
            "/events/{event_id}/bracket/generate",
            post(brackets::generate),
        )
        .route("/groups", post(groups::create))
        .route("/groups/{group_id}", delete(groups::remove))
        .route("/matches/{match_id}/sets", post(scores::open_set))
        .route("/matches/{match_id}/complete", post(scores::complete_match))
        .route("/sets/{set_id}", put(scores::update_set))
        .route("/sets/{set_id}/played", post(scores::play_set));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Verifies database connectivity with a trivial query. Returns `200 OK`
/// when healthy, `503 Service Unavailable` otherwise.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = sqlx::query("SELECT 1")
        .fetch_one(&*state.pool)
        .await
        .is_ok();

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
