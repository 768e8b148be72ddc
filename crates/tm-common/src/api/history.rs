use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable record that a developer held a role, enriched with the role and
/// project context for display. Written once at approval time; the linked
/// assignment is the one whose approval created the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleHistoryEntry {
    pub id: i64,
    pub developer_id: i64,
    pub role_id: i64,
    pub role_name: String,
    pub role_description: String,
    pub feedback: Option<String>,
    pub project_id: i64,
    pub project_name: String,
    pub assignment_id: i64,
    pub recorded_at: DateTime<Utc>,
}
