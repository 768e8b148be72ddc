use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::assignments::PendingAssignment;
use crate::{Assignment, AssignmentStatus};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAssignmentRequest {
    pub role_id: i64,
    pub project_id: i64,
    pub developer_id: i64,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentResponse {
    pub id: i64,
    pub role_id: i64,
    pub project_id: i64,
    pub developer_id: i64,
    pub manager_id: i64,
    pub approver_id: Option<i64>,
    pub status: AssignmentStatus,
    pub comment: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl From<Assignment> for AssignmentResponse {
    fn from(assignment: Assignment) -> Self {
        Self {
            id: assignment.id,
            role_id: assignment.role_id,
            project_id: assignment.project_id,
            developer_id: assignment.developer_id,
            manager_id: assignment.manager_id,
            approver_id: assignment.approver_id,
            status: assignment.status,
            comment: assignment.comment,
            requested_at: assignment.requested_at,
            approved_at: assignment.approved_at,
        }
    }
}

/// Review-queue entry: the assignment plus the names the queue displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAssignmentResponse {
    #[serde(flatten)]
    pub assignment: AssignmentResponse,
    pub developer_name: String,
    pub project_name: String,
}

impl From<PendingAssignment> for PendingAssignmentResponse {
    fn from(pending: PendingAssignment) -> Self {
        Self {
            assignment: pending.assignment.into(),
            developer_name: pending.developer_name,
            project_name: pending.project_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_assignment() -> Assignment {
        Assignment {
            id: 11,
            role_id: 3,
            project_id: 2,
            developer_id: 7,
            manager_id: 5,
            approver_id: None,
            status: AssignmentStatus::Pending,
            comment: Some("urgent backfill".into()),
            requested_at: "2025-06-01T09:00:00Z".parse().unwrap(),
            approved_at: None,
        }
    }

    #[test]
    fn response_serializes_status_as_snake_case() {
        let response = AssignmentResponse::from(sample_assignment());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["approved_at"], serde_json::Value::Null);
        assert_eq!(json["comment"], "urgent backfill");
    }

    #[test]
    fn pending_entry_flattens_assignment_fields() {
        let pending = PendingAssignment {
            assignment: sample_assignment(),
            developer_name: "Ada Park".into(),
            project_name: "Billing Revamp".into(),
        };
        let json = serde_json::to_value(PendingAssignmentResponse::from(pending)).unwrap();
        assert_eq!(json["id"], 11);
        assert_eq!(json["developer_name"], "Ada Park");
        assert_eq!(json["project_name"], "Billing Revamp");
    }

    #[test]
    fn create_request_accepts_missing_comments() {
        let request: CreateAssignmentRequest =
            serde_json::from_str(r#"{"role_id":3,"project_id":2,"developer_id":7}"#).unwrap();
        assert_eq!(request.comments, None);
    }
}
