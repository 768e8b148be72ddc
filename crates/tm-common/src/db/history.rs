//! Read side of the permanent role-history ledger. Entries are written only
//! by the approval transaction in `db::assignments`; nothing here mutates.

use deadpool_postgres::PoolError;
use thiserror::Error;
use tokio_postgres::Error as PgError;
use tracing::instrument;

use crate::api::history::RoleHistoryEntry;
use crate::db::PgPool;
use crate::db::util::TimedClientExt;

#[derive(Debug, Error)]
pub enum HistoryStoreError {
    #[error("could not check out a connection: {0}")]
    Pool(#[from] PoolError),
    #[error("query failed: {0}")]
    Postgres(#[from] PgError),
    #[error("history row did not map: {0}")]
    Mapping(String),
    #[error("{0}")]
    NotFound(String),
}

fn mapping_err(err: impl std::fmt::Display) -> HistoryStoreError {
    HistoryStoreError::Mapping(err.to_string())
}

/// Every role a developer has held, newest first, with the role and project
/// context the profile page displays.
#[instrument(skip(pool))]
pub async fn fetch_role_history(
    pool: &PgPool,
    developer_id: i64,
) -> Result<Vec<RoleHistoryEntry>, HistoryStoreError> {
    let client = pool.get().await?;

    client
        .timed_query_opt_cached(
            "SELECT id FROM tms.employees WHERE id = $1",
            &[&developer_id],
            "history.developer_lookup",
        )
        .await?
        .ok_or_else(|| {
            HistoryStoreError::NotFound(format!("developer {developer_id} not found"))
        })?;

    let rows = client
        .timed_query_cached(
            "SELECT rh.id, rh.developer_id, rh.role_id, rh.assignment_id, rh.recorded_at, \
                    pr.name AS role_name, pr.description AS role_description, pr.feedback, \
                    p.id AS project_id, p.name AS project_name \
               FROM tms.role_history rh \
               JOIN tms.project_roles pr ON pr.id = rh.role_id \
               JOIN tms.projects p ON p.id = pr.project_id \
              WHERE rh.developer_id = $1 \
              ORDER BY rh.recorded_at DESC, rh.id DESC",
            &[&developer_id],
            "history.role_history",
        )
        .await?;

    rows.iter()
        .map(|row| {
            Ok(RoleHistoryEntry {
                id: row.try_get("id").map_err(mapping_err)?,
                developer_id: row.try_get("developer_id").map_err(mapping_err)?,
                role_id: row.try_get("role_id").map_err(mapping_err)?,
                role_name: row.try_get("role_name").map_err(mapping_err)?,
                role_description: row.try_get("role_description").map_err(mapping_err)?,
                feedback: row.try_get("feedback").map_err(mapping_err)?,
                project_id: row.try_get("project_id").map_err(mapping_err)?,
                project_name: row.try_get("project_name").map_err(mapping_err)?,
                assignment_id: row.try_get("assignment_id").map_err(mapping_err)?,
                recorded_at: row.try_get("recorded_at").map_err(mapping_err)?,
            })
        })
        .collect()
}
