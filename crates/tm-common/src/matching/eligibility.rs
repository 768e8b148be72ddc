//! The live eligibility view over assignment state.
//!
//! A developer is occupied while any approved assignment of theirs targets a
//! role that has not yet received feedback. Occupancy is always derived from
//! the assignment rows at query time — there is no cached flag to drift out
//! of sync when a role closes or another approval lands.

use std::collections::BTreeSet;

use crate::AssignmentStatus;

/// Per-assignment slice of the data the filter needs: who, in what state,
/// and whether the target role has been closed by feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentView {
    pub developer_id: i64,
    pub status: AssignmentStatus,
    pub role_closed: bool,
}

/// Developers currently holding an open role.
pub fn occupied_developer_ids(assignments: &[AssignmentView]) -> BTreeSet<i64> {
    assignments
        .iter()
        .filter(|view| view.status == AssignmentStatus::Approved && !view.role_closed)
        .map(|view| view.developer_id)
        .collect()
}

/// Filters `developers` down to those free for new matching, preserving the
/// caller's ordering.
pub fn eligible_developer_ids(developers: &[i64], assignments: &[AssignmentView]) -> Vec<i64> {
    let occupied = occupied_developer_ids(assignments);
    developers
        .iter()
        .copied()
        .filter(|id| !occupied.contains(id))
        .collect()
}
