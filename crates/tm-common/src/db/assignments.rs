//! Assignment workflow storage: request creation, TFS decisions and the
//! pending queue.
//!
//! Decisions run as a conditional update inside one transaction. The
//! `status = 'pending'` predicate is what serializes racing callers: the
//! loser's update matches zero rows, and a status re-read turns that into
//! the precise error. The role-history append commits in the same
//! transaction as the approval, so neither is ever visible without the
//! other.

use deadpool_postgres::{GenericClient, PoolError};
use thiserror::Error;
use tokio_postgres::{Error as PgError, Row};
use tracing::{info, instrument};

use crate::db::util::TimedClientExt;
use crate::db::PgPool;
use crate::workflow::{self, AssignmentAction, TransitionError};
use crate::{Assignment, AssignmentStatus, Employee, EmployeeRole};

#[derive(Debug, Error)]
pub enum AssignmentStoreError {
    #[error("could not check out a connection: {0}")]
    Pool(#[from] PoolError),
    #[error("query failed: {0}")]
    Postgres(#[from] PgError),
    #[error("assignment row did not map: {0}")]
    Mapping(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("caller {0} is not a registered employee")]
    UnknownActor(i64),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("{0}")]
    Conflict(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAssignmentRequest {
    pub role_id: i64,
    pub project_id: i64,
    pub developer_id: i64,
    pub comment: Option<String>,
}

/// A pending request joined with the display names the review queue shows.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAssignment {
    pub assignment: Assignment,
    pub developer_name: String,
    pub project_name: String,
}

const ASSIGNMENT_COLUMNS: &str =
    "id, role_id, project_id, developer_id, manager_id, approver_id, status, comment, \
     requested_at, approved_at";

fn mapping_err(err: impl std::fmt::Display) -> AssignmentStoreError {
    AssignmentStoreError::Mapping(err.to_string())
}

fn parse_status(raw: &str) -> Result<AssignmentStatus, AssignmentStoreError> {
    AssignmentStatus::parse(raw)
        .ok_or_else(|| AssignmentStoreError::Mapping(format!("unknown assignment status: {raw}")))
}

fn row_to_assignment(row: &Row) -> Result<Assignment, AssignmentStoreError> {
    let raw_status: String = row.try_get("status").map_err(mapping_err)?;
    Ok(Assignment {
        id: row.try_get("id").map_err(mapping_err)?,
        role_id: row.try_get("role_id").map_err(mapping_err)?,
        project_id: row.try_get("project_id").map_err(mapping_err)?,
        developer_id: row.try_get("developer_id").map_err(mapping_err)?,
        manager_id: row.try_get("manager_id").map_err(mapping_err)?,
        approver_id: row.try_get("approver_id").map_err(mapping_err)?,
        status: parse_status(&raw_status)?,
        comment: row.try_get("comment").map_err(mapping_err)?,
        requested_at: row.try_get("requested_at").map_err(mapping_err)?,
        approved_at: row.try_get("approved_at").map_err(mapping_err)?,
    })
}

async fn fetch_actor(
    client: &impl GenericClient,
    employee_id: i64,
) -> Result<Employee, AssignmentStoreError> {
    let row = client
        .timed_query_opt_cached(
            "SELECT id, name, role FROM tms.employees WHERE id = $1",
            &[&employee_id],
            "assignments.actor_lookup",
        )
        .await?
        .ok_or(AssignmentStoreError::UnknownActor(employee_id))?;

    let raw_role: String = row.try_get("role").map_err(mapping_err)?;
    Ok(Employee {
        id: row.try_get("id").map_err(mapping_err)?,
        name: row.try_get("name").map_err(mapping_err)?,
        role: EmployeeRole::parse(&raw_role)
            .ok_or_else(|| AssignmentStoreError::Mapping(format!("unknown role tag: {raw_role}")))?,
    })
}

/// Files a new request on behalf of a manager. Guard order mirrors the
/// review surface: caller role, then existence of role / project /
/// developer, then cross-record validity.
#[instrument(skip(pool, request))]
pub async fn create_assignment_request(
    pool: &PgPool,
    actor_id: i64,
    request: &NewAssignmentRequest,
) -> Result<Assignment, AssignmentStoreError> {
    let client = pool.get().await?;

    let actor = fetch_actor(&client, actor_id).await?;
    workflow::authorize(AssignmentAction::Request, actor.role)?;

    let role_row = client
        .timed_query_opt_cached(
            "SELECT id, project_id FROM tms.project_roles WHERE id = $1",
            &[&request.role_id],
            "assignments.role_lookup",
        )
        .await?
        .ok_or_else(|| {
            AssignmentStoreError::NotFound(format!("role {} not found", request.role_id))
        })?;

    client
        .timed_query_opt_cached(
            "SELECT id FROM tms.projects WHERE id = $1",
            &[&request.project_id],
            "assignments.project_lookup",
        )
        .await?
        .ok_or_else(|| {
            AssignmentStoreError::NotFound(format!("project {} not found", request.project_id))
        })?;

    let role_project: i64 = role_row.try_get("project_id").map_err(mapping_err)?;
    if role_project != request.project_id {
        return Err(AssignmentStoreError::Invalid(format!(
            "role {} belongs to project {}, not project {}",
            request.role_id, role_project, request.project_id
        )));
    }

    let developer = fetch_actor(&client, request.developer_id)
        .await
        .map_err(|err| match err {
            AssignmentStoreError::UnknownActor(id) => {
                AssignmentStoreError::NotFound(format!("developer {id} not found"))
            }
            other => other,
        })?;
    if developer.role != EmployeeRole::Developer {
        return Err(AssignmentStoreError::Invalid(format!(
            "employee {} holds the {} role and cannot be assigned to a project role",
            developer.id,
            developer.role.as_ref()
        )));
    }

    let insert = format!(
        "INSERT INTO tms.assignments (role_id, project_id, developer_id, manager_id, status, comment) \
         VALUES ($1, $2, $3, $4, 'pending', $5) \
         RETURNING {ASSIGNMENT_COLUMNS}"
    );
    let row = client
        .timed_query_opt_cached(
            &insert,
            &[
                &request.role_id,
                &request.project_id,
                &request.developer_id,
                &actor.id,
                &request.comment,
            ],
            "assignments.insert_request",
        )
        .await?
        .ok_or_else(|| AssignmentStoreError::Mapping("insert returned no row".into()))?;

    let assignment = row_to_assignment(&row)?;
    info!(
        assignment_id = assignment.id,
        role_id = assignment.role_id,
        developer_id = assignment.developer_id,
        "assignment request created"
    );
    Ok(assignment)
}

/// Approves a pending assignment and appends its role-history row in the
/// same transaction.
#[instrument(skip(pool))]
pub async fn approve_assignment(
    pool: &PgPool,
    actor_id: i64,
    assignment_id: i64,
) -> Result<Assignment, AssignmentStoreError> {
    decide_assignment(pool, actor_id, assignment_id, AssignmentAction::Approve).await
}

/// Rejects a pending assignment. The approver column records who declined;
/// the approval timestamp stays null and no history is written.
#[instrument(skip(pool))]
pub async fn reject_assignment(
    pool: &PgPool,
    actor_id: i64,
    assignment_id: i64,
) -> Result<Assignment, AssignmentStoreError> {
    decide_assignment(pool, actor_id, assignment_id, AssignmentAction::Reject).await
}

async fn decide_assignment(
    pool: &PgPool,
    actor_id: i64,
    assignment_id: i64,
    action: AssignmentAction,
) -> Result<Assignment, AssignmentStoreError> {
    let mut client = pool.get().await?;

    // Role guard before touching the record: a wrong-role caller is refused
    // even when the assignment does not exist or is already decided.
    let actor = fetch_actor(&client, actor_id).await?;
    workflow::authorize(action, actor.role)?;

    // The guard passed, so the plan for a pending row is infallible here;
    // the WHERE clause below enforces that precondition atomically.
    let transition =
        workflow::plan_transition(Some(AssignmentStatus::Pending), action, actor.role)?;

    let tx = client.transaction().await?;

    let update = format!(
        "UPDATE tms.assignments \
            SET status = $3, \
                approver_id = $2, \
                approved_at = CASE WHEN $3 = 'approved' THEN NOW() ELSE approved_at END \
          WHERE id = $1 AND status = 'pending' \
        RETURNING {ASSIGNMENT_COLUMNS}"
    );
    let updated = tx
        .timed_query_opt_cached(
            &update,
            &[&assignment_id, &actor.id, &transition.next.as_str()],
            "assignments.decide",
        )
        .await?;

    let Some(row) = updated else {
        // Zero rows: missing, or no longer pending. Re-read to answer which.
        let status_row = tx
            .query_opt(
                "SELECT status FROM tms.assignments WHERE id = $1",
                &[&assignment_id],
            )
            .await?;
        return match status_row {
            None => Err(AssignmentStoreError::NotFound(format!(
                "assignment {assignment_id} not found"
            ))),
            Some(row) => {
                let raw: String = row.try_get("status").map_err(mapping_err)?;
                let current = parse_status(&raw)?;
                match workflow::plan_transition(Some(current), action, actor.role) {
                    Err(err) => Err(err.into()),
                    Ok(_) => Err(AssignmentStoreError::Conflict(format!(
                        "assignment {assignment_id} changed concurrently"
                    ))),
                }
            }
        };
    };

    let assignment = row_to_assignment(&row)?;

    if transition.records_history {
        tx.timed_execute_cached(
            "INSERT INTO tms.role_history (developer_id, role_id, assignment_id, recorded_at) \
             VALUES ($1, $2, $3, $4)",
            &[
                &assignment.developer_id,
                &assignment.role_id,
                &assignment.id,
                &assignment.approved_at,
            ],
            "assignments.append_history",
        )
        .await?;
    }

    tx.commit().await?;

    info!(
        assignment_id,
        action = action.as_ref(),
        status = assignment.status.as_str(),
        "assignment decision committed"
    );
    Ok(assignment)
}

/// The TFS review queue: every pending request with the display names the
/// operator UI shows. An empty queue is an empty list, not an error.
#[instrument(skip(pool))]
pub async fn fetch_pending_assignments(
    pool: &PgPool,
    actor_id: i64,
) -> Result<Vec<PendingAssignment>, AssignmentStoreError> {
    let client = pool.get().await?;

    let actor = fetch_actor(&client, actor_id).await?;
    if actor.role != EmployeeRole::Tfs {
        return Err(AssignmentStoreError::Forbidden(format!(
            "listing pending assignments requires the tfs role (caller holds {})",
            actor.role.as_ref()
        )));
    }

    let rows = client
        .timed_query_cached(
            "SELECT a.id, a.role_id, a.project_id, a.developer_id, a.manager_id, \
                    a.approver_id, a.status, a.comment, a.requested_at, a.approved_at, \
                    d.name AS developer_name, p.name AS project_name \
               FROM tms.assignments a \
               JOIN tms.employees d ON d.id = a.developer_id \
               JOIN tms.projects p ON p.id = a.project_id \
              WHERE a.status = 'pending' \
              ORDER BY a.requested_at, a.id",
            &[],
            "assignments.pending_queue",
        )
        .await?;

    rows.iter()
        .map(|row| {
            Ok(PendingAssignment {
                assignment: row_to_assignment(row)?,
                developer_name: row.try_get("developer_name").map_err(mapping_err)?,
                project_name: row.try_get("project_name").map_err(mapping_err)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_rejects_unknown_tags() {
        assert!(parse_status("pending").is_ok());
        assert!(parse_status("approved").is_ok());
        assert!(parse_status("rejected").is_ok());
        assert!(matches!(
            parse_status("on-hold"),
            Err(AssignmentStoreError::Mapping(_))
        ));
    }

    #[test]
    fn transition_errors_keep_their_kind() {
        let err = AssignmentStoreError::from(TransitionError::WrongState {
            action: AssignmentAction::Approve,
            current: Some(AssignmentStatus::Approved),
        });
        assert!(matches!(
            err,
            AssignmentStoreError::Transition(TransitionError::WrongState { .. })
        ));
        assert_eq!(
            err.to_string(),
            "cannot approve an assignment in the approved state"
        );
    }
}
