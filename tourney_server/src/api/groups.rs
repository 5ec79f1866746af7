//! Round-robin group API handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tourney::models::{EventId, GroupCreated, GroupId, RegistrationId};

use super::{ApiError, AppState, error_response};

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub event_id: EventId,
    pub registration_ids: Vec<RegistrationId>,
}

/// Create a group and schedule its round-robin matches.
///
/// # Response
///
/// Returns `200 OK` with the group and the number of scheduled matches:
/// ```json
/// {"group": {"id": 3, "name": "A", ...}, "match_count": 6}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: wrong event format, fewer than 2 ids, duplicate or
///   foreign ids, or a member already assigned to a group
/// - `404 Not Found`: event doesn't exist
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateGroupRequest>,
) -> Result<Json<GroupCreated>, ApiError> {
    state
        .engine
        .create_group(request.event_id, &request.registration_ids)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Delete a group, cascading to its matches and sets.
///
/// Member registrations are detached and event completion is recomputed.
/// Returns `204 No Content` on success, `404 Not Found` for an unknown
/// group.
pub async fn remove(
    State(state): State<AppState>,
    Path(group_id): Path<GroupId>,
) -> Result<StatusCode, ApiError> {
    state
        .engine
        .delete_group(group_id)
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(error_response)
}
