use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tm_common::api::candidates::RoleCandidatesResponse;
use tm_common::db::fetch_role_candidates;

use crate::SharedState;
use crate::auth::AuthUser;
use crate::error::ApiError;

#[derive(Debug, Deserialize, Default)]
pub struct CandidateQuery {
    /// Restrict the result to one role of the project.
    pub role_id: Option<i64>,
}

/// `GET /api/projects/:project_id/candidates` — every open role of the
/// project with its requirements and ranked candidates. Roles without
/// requirements come back flagged `unscored` with an empty candidate list.
pub async fn list_candidates(
    State(state): State<SharedState>,
    Path(project_id): Path<i64>,
    Query(query): Query<CandidateQuery>,
    _auth: AuthUser,
) -> Result<Json<Vec<RoleCandidatesResponse>>, ApiError> {
    let roles =
        fetch_role_candidates(&state.pool, project_id, query.role_id, &state.rank).await?;
    Ok(Json(roles))
}
