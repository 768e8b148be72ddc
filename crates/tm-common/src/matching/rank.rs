//! Ranking of eligible developers for a single role.

use std::cmp::Reverse;

use crate::{DeveloperSkills, RequiredSkill};

use super::scoring::coverage_score;

const DEFAULT_TOP_CANDIDATES: usize = 10;

/// Tunables for the advisory candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankConfig {
    /// Maximum number of candidates returned per role.
    pub top_candidates: usize,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            top_candidates: DEFAULT_TOP_CANDIDATES,
        }
    }
}

impl RankConfig {
    /// Reads `TM_TOP_CANDIDATES`; anything unparsable or zero falls back to
    /// the default.
    pub fn from_env() -> Self {
        let top_candidates = std::env::var("TM_TOP_CANDIDATES")
            .ok()
            .and_then(|raw| raw.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_TOP_CANDIDATES);
        Self { top_candidates }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankedCandidate {
    pub developer_id: i64,
    pub score: u8,
}

/// Scores every developer in `pool` against `required` and returns the top
/// slice, best first, ties broken by developer id ascending.
///
/// Zero-scored developers are dropped — someone who satisfies none of the
/// requirements is not a candidate. An empty requirement set yields an empty
/// list; the caller reports such roles as unscored instead of ranking.
pub fn rank_candidates(
    required: &[RequiredSkill],
    pool: &[DeveloperSkills],
    config: &RankConfig,
) -> Vec<RankedCandidate> {
    if required.is_empty() {
        return Vec::new();
    }

    let mut ranked: Vec<RankedCandidate> = pool
        .iter()
        .filter_map(|developer| {
            let score = coverage_score(required, &developer.skills)?;
            (score > 0).then_some(RankedCandidate {
                developer_id: developer.developer_id,
                score,
            })
        })
        .collect();

    ranked.sort_by_key(|candidate| (Reverse(candidate.score), candidate.developer_id));
    ranked.truncate(config.top_candidates);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SkillCategory, SkillRating};

    fn go_requirement(level: i32) -> Vec<RequiredSkill> {
        vec![RequiredSkill {
            name: "Go".into(),
            category: SkillCategory::Hard,
            level,
        }]
    }

    fn developer(id: i64, go_level: Option<i32>) -> DeveloperSkills {
        DeveloperSkills {
            developer_id: id,
            skills: go_level
                .map(|level| {
                    vec![SkillRating {
                        name: "Go".into(),
                        category: SkillCategory::Hard,
                        level,
                    }]
                })
                .unwrap_or_default(),
        }
    }

    #[test]
    fn orders_by_score_then_excludes_zero() {
        // The canonical trio: full match, partial match, no skills at all.
        let pool = [
            developer(1, Some(3)),
            developer(2, Some(1)),
            developer(3, None),
        ];
        let ranked = rank_candidates(&go_requirement(3), &pool, &RankConfig::default());

        assert_eq!(
            ranked,
            vec![
                RankedCandidate {
                    developer_id: 1,
                    score: 100
                },
                RankedCandidate {
                    developer_id: 2,
                    score: 33
                },
            ]
        );
    }

    #[test]
    fn ties_break_by_developer_id_ascending() {
        let pool = [
            developer(9, Some(3)),
            developer(2, Some(3)),
            developer(5, Some(3)),
        ];
        let ranked = rank_candidates(&go_requirement(3), &pool, &RankConfig::default());
        let ids: Vec<i64> = ranked.iter().map(|c| c.developer_id).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[test]
    fn truncates_to_the_configured_top_slice() {
        let pool: Vec<DeveloperSkills> = (1..=15).map(|id| developer(id, Some(3))).collect();
        let ranked = rank_candidates(&go_requirement(3), &pool, &RankConfig::default());
        assert_eq!(ranked.len(), 10);

        let ranked = rank_candidates(
            &go_requirement(3),
            &pool,
            &RankConfig { top_candidates: 3 },
        );
        assert_eq!(ranked.len(), 3);
    }

    #[test]
    fn unscored_roles_rank_nobody() {
        let pool = [developer(1, Some(3)), developer(2, Some(5))];
        let ranked = rank_candidates(&[], &pool, &RankConfig::default());
        assert!(ranked.is_empty());
    }

    #[test]
    fn empty_pool_yields_empty_list() {
        let ranked = rank_candidates(&go_requirement(2), &[], &RankConfig::default());
        assert!(ranked.is_empty());
    }
}
