use deadpool_postgres::PoolError;
use thiserror::Error;
use tokio_postgres::Error as PgError;
use tracing::{info, instrument};

use crate::db::{DbPoolError, PgPool};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("could not check out a connection: {0}")]
    Pool(#[from] PoolError),
    #[error("migration statement failed: {0}")]
    Postgres(#[from] PgError),
    #[error("could not build the pool: {0}")]
    PoolBuild(#[from] DbPoolError),
}

struct Migration {
    id: i32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        id: 1,
        description: "talent schema: employees, skills, projects, roles, assignments, history",
        sql: r#"
CREATE SCHEMA IF NOT EXISTS tms;

CREATE TABLE IF NOT EXISTS tms.employees (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('developer', 'manager', 'tfs')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS tms.skills (
    id BIGSERIAL PRIMARY KEY,
    employee_id BIGINT NOT NULL REFERENCES tms.employees(id),
    name TEXT NOT NULL,
    category TEXT NOT NULL CHECK (category IN ('hard', 'soft')),
    level INTEGER NOT NULL CHECK (level > 0),
    UNIQUE (employee_id, name)
);

CREATE TABLE IF NOT EXISTS tms.projects (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS tms.project_roles (
    id BIGSERIAL PRIMARY KEY,
    project_id BIGINT NOT NULL REFERENCES tms.projects(id),
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    feedback TEXT
);

CREATE TABLE IF NOT EXISTS tms.role_required_skills (
    id BIGSERIAL PRIMARY KEY,
    role_id BIGINT NOT NULL REFERENCES tms.project_roles(id),
    skill_name TEXT NOT NULL,
    category TEXT NOT NULL CHECK (category IN ('hard', 'soft')),
    level INTEGER NOT NULL CHECK (level >= 0),
    UNIQUE (role_id, skill_name, category)
);

CREATE TABLE IF NOT EXISTS tms.assignments (
    id BIGSERIAL PRIMARY KEY,
    role_id BIGINT NOT NULL REFERENCES tms.project_roles(id),
    project_id BIGINT NOT NULL REFERENCES tms.projects(id),
    developer_id BIGINT NOT NULL REFERENCES tms.employees(id),
    manager_id BIGINT NOT NULL REFERENCES tms.employees(id),
    approver_id BIGINT REFERENCES tms.employees(id),
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'approved', 'rejected')),
    comment TEXT,
    requested_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    approved_at TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS tms.role_history (
    id BIGSERIAL PRIMARY KEY,
    developer_id BIGINT NOT NULL REFERENCES tms.employees(id),
    role_id BIGINT NOT NULL REFERENCES tms.project_roles(id),
    assignment_id BIGINT NOT NULL UNIQUE REFERENCES tms.assignments(id),
    recorded_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_assignments_pending
    ON tms.assignments(requested_at, id)
    WHERE status = 'pending';
CREATE INDEX IF NOT EXISTS idx_assignments_developer_approved
    ON tms.assignments(developer_id)
    WHERE status = 'approved';
CREATE INDEX IF NOT EXISTS idx_role_history_developer
    ON tms.role_history(developer_id, recorded_at);
"#,
    },
    Migration {
        id: 2,
        description: "assignment decision consistency checks",
        sql: r#"
DO $$
BEGIN
    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'chk_approval_timestamp'
    ) THEN
        ALTER TABLE tms.assignments
            ADD CONSTRAINT chk_approval_timestamp
            CHECK ((status = 'approved') = (approved_at IS NOT NULL));
    END IF;

    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'chk_approver_present'
    ) THEN
        ALTER TABLE tms.assignments
            ADD CONSTRAINT chk_approver_present
            CHECK (status = 'pending' OR approver_id IS NOT NULL);
    END IF;
END $$;
"#,
    },
];

async fn apply(
    client: &mut deadpool_postgres::Client,
    migration: &Migration,
) -> Result<(), MigrationError> {
    let tx = client.transaction().await?;
    tx.batch_execute(migration.sql).await?;
    tx.execute(
        "INSERT INTO tms.schema_migrations (id, description) VALUES ($1, $2)",
        &[&migration.id, &migration.description],
    )
    .await?;
    tx.commit().await?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    let mut client = pool.get().await?;

    // Bookkeeping table lives alongside the data, so the schema must exist
    // before the first migration records itself.
    client
        .batch_execute(
            "CREATE SCHEMA IF NOT EXISTS tms;
             CREATE TABLE IF NOT EXISTS tms.schema_migrations (
                id INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
             );",
        )
        .await?;

    for migration in MIGRATIONS {
        let seen = client
            .query_opt(
                "SELECT id FROM tms.schema_migrations WHERE id = $1",
                &[&migration.id],
            )
            .await?;
        if seen.is_some() {
            continue;
        }

        apply(&mut client, migration).await?;

        info!(
            id = migration.id,
            description = migration.description,
            "applied migration"
        );
    }

    Ok(())
}
