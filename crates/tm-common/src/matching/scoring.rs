//! Coverage scoring of one developer against one role's requirement set.

use std::collections::HashMap;

use crate::{RequiredSkill, SkillCategory, SkillRating};

/// Contribution of a single requirement, in [0, 100].
///
/// Meeting or exceeding the required level is worth exactly 100; below it the
/// contribution scales linearly. A required level of zero is satisfied by
/// mere possession, which is also where the linear form tops out anyway.
pub fn skill_contribution(required_level: i32, developer_level: i32) -> f64 {
    if required_level <= 0 {
        return 100.0;
    }
    (f64::from(developer_level) * 100.0 / f64::from(required_level)).clamp(0.0, 100.0)
}

/// Mean coverage of the requirement set, rounded to the nearest integer.
///
/// Requirements are matched by exact (name, category); a requirement the
/// developer does not hold contributes 0. Extra developer skills never count.
/// Returns `None` for a role with no requirements at all — such a role is
/// unscored, and callers must surface that rather than rank everyone at 0.
pub fn coverage_score(required: &[RequiredSkill], skills: &[SkillRating]) -> Option<u8> {
    if required.is_empty() {
        return None;
    }

    let by_key: HashMap<(&str, SkillCategory), i32> = skills
        .iter()
        .map(|skill| ((skill.name.as_str(), skill.category), skill.level))
        .collect();

    let total: f64 = required
        .iter()
        .map(|req| {
            by_key
                .get(&(req.name.as_str(), req.category))
                .map_or(0.0, |level| skill_contribution(req.level, *level))
        })
        .sum();

    let mean = total / required.len() as f64;
    Some(mean.round() as u8)
}
