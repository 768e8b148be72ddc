pub mod eligibility;
pub mod rank;
pub mod scoring;

pub use eligibility::{AssignmentView, eligible_developer_ids, occupied_developer_ids};
pub use rank::{RankConfig, RankedCandidate, rank_candidates};
pub use scoring::{coverage_score, skill_contribution};
