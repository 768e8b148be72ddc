use serde::{Deserialize, Serialize};

use crate::{RequiredSkill, SkillCategory};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredSkillDto {
    pub name: String,
    pub category: SkillCategory,
    pub level: i32,
}

impl From<RequiredSkill> for RequiredSkillDto {
    fn from(skill: RequiredSkill) -> Self {
        Self {
            name: skill.name,
            category: skill.category,
            level: skill.level,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateDto {
    pub developer_id: i64,
    pub score: u8,
}

/// One role's slice of a candidates query: its requirement set and the
/// ranked, eligible, positively-scored developers. `unscored` marks roles
/// with no requirements defined, which never rank anyone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleCandidatesResponse {
    pub role_id: i64,
    pub project_id: i64,
    pub name: String,
    pub description: String,
    pub feedback: Option<String>,
    pub unscored: bool,
    pub required_skills: Vec<RequiredSkillDto>,
    pub candidates: Vec<CandidateDto>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_entry_serializes_candidates_in_order() {
        let response = RoleCandidatesResponse {
            role_id: 4,
            project_id: 9,
            name: "Platform Engineer".into(),
            description: "Owns the deploy pipeline".into(),
            feedback: None,
            unscored: false,
            required_skills: vec![RequiredSkillDto {
                name: "Go".into(),
                category: SkillCategory::Hard,
                level: 3,
            }],
            candidates: vec![
                CandidateDto {
                    developer_id: 1,
                    score: 100,
                },
                CandidateDto {
                    developer_id: 2,
                    score: 33,
                },
            ],
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["required_skills"][0]["category"], "hard");
        assert_eq!(json["candidates"][0]["developer_id"], 1);
        assert_eq!(json["candidates"][0]["score"], 100);
        assert_eq!(json["candidates"][1]["score"], 33);
        assert_eq!(json["unscored"], false);
    }
}
