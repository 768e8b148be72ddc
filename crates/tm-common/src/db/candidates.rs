//! Advisory read path: who is free, and who fits a role best.
//!
//! Eligibility is recomputed from assignment rows on every query, and a batch
//! over a project's roles computes it exactly once before scoring.

use std::collections::HashMap;

use deadpool_postgres::{GenericClient, PoolError};
use thiserror::Error;
use tokio_postgres::{Error as PgError, Row};
use tracing::instrument;

use crate::api::candidates::{CandidateDto, RequiredSkillDto, RoleCandidatesResponse};
use crate::db::PgPool;
use crate::db::util::TimedClientExt;
use crate::matching::eligibility::{AssignmentView, eligible_developer_ids};
use crate::matching::rank::{RankConfig, rank_candidates};
use crate::{
    AssignmentStatus, DeveloperSkills, ProjectRole, RequiredSkill, SkillCategory, SkillRating,
};

#[derive(Debug, Error)]
pub enum CandidateFetchError {
    #[error("could not check out a connection: {0}")]
    Pool(#[from] PoolError),
    #[error("query failed: {0}")]
    Postgres(#[from] PgError),
    #[error("candidate row did not map: {0}")]
    Mapping(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Invalid(String),
}

fn mapping_err(err: impl std::fmt::Display) -> CandidateFetchError {
    CandidateFetchError::Mapping(err.to_string())
}

fn parse_category(raw: &str) -> Result<SkillCategory, CandidateFetchError> {
    SkillCategory::parse(raw)
        .ok_or_else(|| CandidateFetchError::Mapping(format!("unknown skill category: {raw}")))
}

fn row_to_role(row: &Row) -> Result<ProjectRole, CandidateFetchError> {
    Ok(ProjectRole {
        id: row.try_get("id").map_err(mapping_err)?,
        project_id: row.try_get("project_id").map_err(mapping_err)?,
        name: row.try_get("name").map_err(mapping_err)?,
        description: row.try_get("description").map_err(mapping_err)?,
        feedback: row.try_get("feedback").map_err(mapping_err)?,
    })
}

async fn assignment_views(
    client: &impl GenericClient,
) -> Result<Vec<AssignmentView>, CandidateFetchError> {
    let rows = client
        .timed_query_cached(
            "SELECT a.developer_id, a.status, \
                    (pr.feedback IS NOT NULL AND btrim(pr.feedback) <> '') AS role_closed \
               FROM tms.assignments a \
               JOIN tms.project_roles pr ON pr.id = a.role_id",
            &[],
            "candidates.assignment_views",
        )
        .await?;

    rows.iter()
        .map(|row| {
            let raw_status: String = row.try_get("status").map_err(mapping_err)?;
            Ok(AssignmentView {
                developer_id: row.try_get("developer_id").map_err(mapping_err)?,
                status: AssignmentStatus::parse(&raw_status).ok_or_else(|| {
                    CandidateFetchError::Mapping(format!("unknown assignment status: {raw_status}"))
                })?,
                role_closed: row.try_get("role_closed").map_err(mapping_err)?,
            })
        })
        .collect()
}

async fn eligible_ids(client: &impl GenericClient) -> Result<Vec<i64>, CandidateFetchError> {
    let developer_rows = client
        .timed_query_cached(
            "SELECT id FROM tms.employees WHERE role = 'developer' ORDER BY id",
            &[],
            "candidates.developer_pool",
        )
        .await?;
    let developers: Vec<i64> = developer_rows
        .iter()
        .map(|row| row.try_get("id").map_err(mapping_err))
        .collect::<Result<_, _>>()?;

    let views = assignment_views(client).await?;
    Ok(eligible_developer_ids(&developers, &views))
}

/// Developers free to take a new role right now, ascending by id.
#[instrument(skip(pool))]
pub async fn fetch_eligible_developer_ids(
    pool: &PgPool,
) -> Result<Vec<i64>, CandidateFetchError> {
    let client = pool.get().await?;
    eligible_ids(&client).await
}

async fn fetch_roles(
    client: &impl GenericClient,
    project_id: i64,
    role_id: Option<i64>,
) -> Result<Vec<ProjectRole>, CandidateFetchError> {
    match role_id {
        Some(role_id) => {
            let row = client
                .timed_query_opt_cached(
                    "SELECT id, project_id, name, description, feedback \
                       FROM tms.project_roles WHERE id = $1",
                    &[&role_id],
                    "candidates.role_lookup",
                )
                .await?
                .ok_or_else(|| {
                    CandidateFetchError::NotFound(format!("role {role_id} not found"))
                })?;
            let role = row_to_role(&row)?;
            if role.project_id != project_id {
                return Err(CandidateFetchError::Invalid(format!(
                    "role {role_id} belongs to project {}, not project {project_id}",
                    role.project_id
                )));
            }
            Ok(vec![role])
        }
        // Batch mode considers open roles only; closed ones are done.
        None => {
            let rows = client
                .timed_query_cached(
                    "SELECT id, project_id, name, description, feedback \
                       FROM tms.project_roles \
                      WHERE project_id = $1 \
                        AND (feedback IS NULL OR btrim(feedback) = '') \
                      ORDER BY id",
                    &[&project_id],
                    "candidates.open_roles",
                )
                .await?;
            rows.iter().map(row_to_role).collect()
        }
    }
}

async fn fetch_required_skills(
    client: &impl GenericClient,
    role_ids: &[i64],
) -> Result<HashMap<i64, Vec<RequiredSkill>>, CandidateFetchError> {
    let rows = client
        .timed_query_cached(
            "SELECT role_id, skill_name, category, level \
               FROM tms.role_required_skills \
              WHERE role_id = ANY($1) \
              ORDER BY role_id, skill_name",
            &[&role_ids],
            "candidates.required_skills",
        )
        .await?;

    let mut by_role: HashMap<i64, Vec<RequiredSkill>> = HashMap::new();
    for row in rows {
        let role_id: i64 = row.try_get("role_id").map_err(mapping_err)?;
        let raw_category: String = row.try_get("category").map_err(mapping_err)?;
        by_role.entry(role_id).or_default().push(RequiredSkill {
            name: row.try_get("skill_name").map_err(mapping_err)?,
            category: parse_category(&raw_category)?,
            level: row.try_get("level").map_err(mapping_err)?,
        });
    }
    Ok(by_role)
}

async fn fetch_developer_skills(
    client: &impl GenericClient,
    developer_ids: &[i64],
) -> Result<Vec<DeveloperSkills>, CandidateFetchError> {
    let rows = client
        .timed_query_cached(
            "SELECT e.id, s.name, s.category, s.level \
               FROM tms.employees e \
               LEFT JOIN tms.skills s ON s.employee_id = e.id \
              WHERE e.id = ANY($1) \
              ORDER BY e.id, s.name",
            &[&developer_ids],
            "candidates.developer_skills",
        )
        .await?;

    let mut pool: Vec<DeveloperSkills> = Vec::new();
    for row in rows {
        let developer_id: i64 = row.try_get("id").map_err(mapping_err)?;
        if pool.last().map(|d| d.developer_id) != Some(developer_id) {
            pool.push(DeveloperSkills {
                developer_id,
                skills: Vec::new(),
            });
        }

        // Null skill columns mean the developer has nothing recorded yet.
        let name: Option<String> = row.try_get("name").map_err(mapping_err)?;
        if let (Some(name), Some(current)) = (name, pool.last_mut()) {
            let raw_category: String = row.try_get("category").map_err(mapping_err)?;
            current.skills.push(SkillRating {
                name,
                category: parse_category(&raw_category)?,
                level: row.try_get("level").map_err(mapping_err)?,
            });
        }
    }
    Ok(pool)
}

/// Required skills plus a ranked candidate list for each requested role.
///
/// With a `role_id` the response covers exactly that role (a closed role
/// comes back with no candidates); without one it covers every open role of
/// the project. Roles without requirements are flagged unscored and rank
/// nobody.
#[instrument(skip(pool, config))]
pub async fn fetch_role_candidates(
    pool: &PgPool,
    project_id: i64,
    role_id: Option<i64>,
    config: &RankConfig,
) -> Result<Vec<RoleCandidatesResponse>, CandidateFetchError> {
    let client = pool.get().await?;

    client
        .timed_query_opt_cached(
            "SELECT id FROM tms.projects WHERE id = $1",
            &[&project_id],
            "candidates.project_lookup",
        )
        .await?
        .ok_or_else(|| CandidateFetchError::NotFound(format!("project {project_id} not found")))?;

    let roles = fetch_roles(&client, project_id, role_id).await?;
    if roles.is_empty() {
        return Ok(Vec::new());
    }

    let role_ids: Vec<i64> = roles.iter().map(|role| role.id).collect();
    let mut required_by_role = fetch_required_skills(&client, &role_ids).await?;

    // One eligibility pass for the whole batch.
    let eligible = eligible_ids(&client).await?;
    let developer_pool = if eligible.is_empty() {
        Vec::new()
    } else {
        fetch_developer_skills(&client, &eligible).await?
    };

    let mut responses = Vec::with_capacity(roles.len());
    for role in roles {
        let required = required_by_role.remove(&role.id).unwrap_or_default();
        let unscored = required.is_empty();

        let candidates: Vec<CandidateDto> = if unscored || role.is_closed() {
            Vec::new()
        } else {
            rank_candidates(&required, &developer_pool, config)
                .into_iter()
                .map(|candidate| CandidateDto {
                    developer_id: candidate.developer_id,
                    score: candidate.score,
                })
                .collect()
        };

        responses.push(RoleCandidatesResponse {
            role_id: role.id,
            project_id: role.project_id,
            name: role.name,
            description: role.description,
            feedback: role.feedback,
            unscored,
            required_skills: required.into_iter().map(RequiredSkillDto::from).collect(),
            candidates,
        });
    }

    Ok(responses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parsing_rejects_unknown_tags() {
        assert!(parse_category("hard").is_ok());
        assert!(parse_category("soft").is_ok());
        assert!(matches!(
            parse_category("medium"),
            Err(CandidateFetchError::Mapping(_))
        ));
    }
}
