pub mod api;
pub mod db;
pub mod logging;
pub mod matching;
pub mod workflow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role tag carried by every employee record. Mutated only by the platform's
/// role-change operation; this service reads it to authorize workflow actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EmployeeRole {
    Developer,
    Manager,
    Tfs,
}

impl EmployeeRole {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "developer" => Some(Self::Developer),
            "manager" => Some(Self::Manager),
            "tfs" => Some(Self::Tfs),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
    Hard,
    Soft,
}

impl SkillCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hard => "hard",
            Self::Soft => "soft",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "hard" => Some(Self::Hard),
            "soft" => Some(Self::Soft),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Approved,
    Rejected,
}

impl AssignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub role: EmployeeRole,
}

/// One recorded proficiency of an employee. Levels are positive integers on
/// the platform-wide scale; the pair (name, category) identifies the skill
/// when matched against role requirements.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillRating {
    pub name: String,
    pub category: SkillCategory,
    pub level: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequiredSkill {
    pub name: String,
    pub category: SkillCategory,
    pub level: i32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeveloperSkills {
    pub developer_id: i64,
    pub skills: Vec<SkillRating>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRole {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub description: String,
    pub feedback: Option<String>,
}

impl ProjectRole {
    /// A role with a recorded feedback note is closed: it is never offered
    /// for matching and no longer counts as currently held.
    pub fn is_closed(&self) -> bool {
        self.feedback
            .as_deref()
            .is_some_and(|note| !note.trim().is_empty())
    }
}

/// A single assignment request. One row per request event; re-requesting a
/// rejected pairing starts a fresh row rather than reopening the old one.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
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
