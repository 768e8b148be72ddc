use axum::{
    Json,
    extract::{Path, State},
};
use tm_common::api::history::RoleHistoryEntry;
use tm_common::db::{fetch_eligible_developer_ids, fetch_role_history};

use crate::SharedState;
use crate::auth::AuthUser;
use crate::error::ApiError;

/// `GET /api/developers/eligible` — ids of developers currently free for
/// staffing, recomputed from live assignment state on every call.
pub async fn list_eligible(
    State(state): State<SharedState>,
    _auth: AuthUser,
) -> Result<Json<Vec<i64>>, ApiError> {
    let ids = fetch_eligible_developer_ids(&state.pool).await?;
    Ok(Json(ids))
}

/// `GET /api/developers/:developer_id/history` — roles the developer
/// completed, newest first.
pub async fn role_history(
    State(state): State<SharedState>,
    Path(developer_id): Path<i64>,
    _auth: AuthUser,
) -> Result<Json<Vec<RoleHistoryEntry>>, ApiError> {
    let entries = fetch_role_history(&state.pool, developer_id).await?;
    Ok(Json(entries))
}
