use axum::{
    Json,
    extract::{Path, State},
};
use tm_common::api::assignments::{
    AssignmentResponse, CreateAssignmentRequest, PendingAssignmentResponse,
};
use tm_common::db::{self, NewAssignmentRequest};

use crate::SharedState;
use crate::auth::AuthUser;
use crate::error::ApiError;

/// `POST /api/assignments` — a manager asks for a developer on a role.
pub async fn create_assignment(
    State(state): State<SharedState>,
    auth: AuthUser,
    Json(payload): Json<CreateAssignmentRequest>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    let request = NewAssignmentRequest {
        role_id: payload.role_id,
        project_id: payload.project_id,
        developer_id: payload.developer_id,
        comment: payload.comments,
    };

    let assignment =
        db::create_assignment_request(&state.pool, auth.employee_id, &request).await?;
    Ok(Json(assignment.into()))
}

/// `GET /api/assignments/pending` — the review queue, TFS only.
pub async fn list_pending(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<Vec<PendingAssignmentResponse>>, ApiError> {
    let pending = db::fetch_pending_assignments(&state.pool, auth.employee_id).await?;
    Ok(Json(pending.into_iter().map(Into::into).collect()))
}

/// `POST /api/assignments/:assignment_id/approve`
pub async fn approve(
    State(state): State<SharedState>,
    Path(assignment_id): Path<i64>,
    auth: AuthUser,
) -> Result<Json<AssignmentResponse>, ApiError> {
    let assignment = db::approve_assignment(&state.pool, auth.employee_id, assignment_id).await?;
    Ok(Json(assignment.into()))
}

/// `POST /api/assignments/:assignment_id/reject`
pub async fn reject(
    State(state): State<SharedState>,
    Path(assignment_id): Path<i64>,
    auth: AuthUser,
) -> Result<Json<AssignmentResponse>, ApiError> {
    let assignment = db::reject_assignment(&state.pool, auth.employee_id, assignment_id).await?;
    Ok(Json(assignment.into()))
}
