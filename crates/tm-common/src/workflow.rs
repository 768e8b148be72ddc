//! Guard logic for the assignment lifecycle.
//!
//! Every action on an assignment funnels through [`plan_transition`] so the
//! authorization rules and the pending-only state guard live in one place
//! instead of being scattered across conditional updates. The store layer
//! executes the returned plan inside a single transaction.

use thiserror::Error;

use crate::{AssignmentStatus, EmployeeRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum AssignmentAction {
    /// A manager files a new request. Always starts a fresh `pending` row.
    Request,
    /// The talent function accepts a pending request and records history.
    Approve,
    /// The talent function declines a pending request. No history is written.
    Reject,
}

impl AssignmentAction {
    pub fn required_role(self) -> EmployeeRole {
        match self {
            Self::Request => EmployeeRole::Manager,
            Self::Approve | Self::Reject => EmployeeRole::Tfs,
        }
    }
}

/// What executing an action does to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: AssignmentStatus,
    /// Approval appends exactly one role-history row, atomically with the
    /// status flip. No other action touches history.
    pub records_history: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error(
        "{} requires the {} role (caller holds {})",
        .action.as_ref(),
        .action.required_role().as_ref(),
        .actual.as_ref()
    )]
    Forbidden {
        action: AssignmentAction,
        actual: EmployeeRole,
    },
    #[error(
        "cannot {} an assignment in the {} state",
        .action.as_ref(),
        .current.map_or("missing", |status| status.as_str())
    )]
    WrongState {
        action: AssignmentAction,
        current: Option<AssignmentStatus>,
    },
}

/// Role guard on its own. Callers that have not yet loaded the assignment use
/// this so a wrong-role caller is refused before any existence or state check.
pub fn authorize(action: AssignmentAction, actor: EmployeeRole) -> Result<(), TransitionError> {
    if actor == action.required_role() {
        Ok(())
    } else {
        Err(TransitionError::Forbidden { action, actual: actor })
    }
}

/// Full transition map: (current status, action, actor role) to the resulting
/// transition. `current` is `None` when no assignment row exists yet, which
/// only `Request` may act on. The role guard always fires first, so a caller
/// with the wrong role sees `Forbidden` regardless of the record's state.
pub fn plan_transition(
    current: Option<AssignmentStatus>,
    action: AssignmentAction,
    actor: EmployeeRole,
) -> Result<Transition, TransitionError> {
    authorize(action, actor)?;

    match (action, current) {
        (AssignmentAction::Request, None) => Ok(Transition {
            next: AssignmentStatus::Pending,
            records_history: false,
        }),
        (AssignmentAction::Approve, Some(AssignmentStatus::Pending)) => Ok(Transition {
            next: AssignmentStatus::Approved,
            records_history: true,
        }),
        (AssignmentAction::Reject, Some(AssignmentStatus::Pending)) => Ok(Transition {
            next: AssignmentStatus::Rejected,
            records_history: false,
        }),
        (action, current) => Err(TransitionError::WrongState { action, current }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approve_from_pending_records_history() {
        let transition = plan_transition(
            Some(AssignmentStatus::Pending),
            AssignmentAction::Approve,
            EmployeeRole::Tfs,
        )
        .unwrap();
        assert_eq!(transition.next, AssignmentStatus::Approved);
        assert!(transition.records_history);
    }

    #[test]
    fn reject_from_pending_skips_history() {
        let transition = plan_transition(
            Some(AssignmentStatus::Pending),
            AssignmentAction::Reject,
            EmployeeRole::Tfs,
        )
        .unwrap();
        assert_eq!(transition.next, AssignmentStatus::Rejected);
        assert!(!transition.records_history);
    }

    #[test]
    fn request_only_applies_to_a_fresh_record() {
        let transition =
            plan_transition(None, AssignmentAction::Request, EmployeeRole::Manager).unwrap();
        assert_eq!(transition.next, AssignmentStatus::Pending);
        assert!(!transition.records_history);

        let err = plan_transition(
            Some(AssignmentStatus::Pending),
            AssignmentAction::Request,
            EmployeeRole::Manager,
        )
        .unwrap_err();
        assert!(matches!(err, TransitionError::WrongState { .. }));
    }

    #[test]
    fn terminal_states_are_final() {
        for terminal in [AssignmentStatus::Approved, AssignmentStatus::Rejected] {
            for action in [AssignmentAction::Approve, AssignmentAction::Reject] {
                let err =
                    plan_transition(Some(terminal), action, EmployeeRole::Tfs).unwrap_err();
                assert_eq!(
                    err,
                    TransitionError::WrongState {
                        action,
                        current: Some(terminal)
                    }
                );
            }
        }
    }

    #[test]
    fn wrong_role_is_refused_for_every_action() {
        let cases = [
            (AssignmentAction::Request, EmployeeRole::Tfs),
            (AssignmentAction::Request, EmployeeRole::Developer),
            (AssignmentAction::Approve, EmployeeRole::Manager),
            (AssignmentAction::Approve, EmployeeRole::Developer),
            (AssignmentAction::Reject, EmployeeRole::Manager),
            (AssignmentAction::Reject, EmployeeRole::Developer),
        ];
        for (action, actor) in cases {
            let err = authorize(action, actor).unwrap_err();
            assert_eq!(err, TransitionError::Forbidden { action, actual: actor });
        }
    }

    #[test]
    fn role_guard_fires_before_the_state_guard() {
        // A manager poking an already-approved assignment must hear
        // "forbidden", not "wrong state".
        let err = plan_transition(
            Some(AssignmentStatus::Approved),
            AssignmentAction::Approve,
            EmployeeRole::Manager,
        )
        .unwrap_err();
        assert!(matches!(err, TransitionError::Forbidden { .. }));
    }

    #[test]
    fn forbidden_message_names_both_roles() {
        let err = authorize(AssignmentAction::Approve, EmployeeRole::Manager).unwrap_err();
        assert_eq!(
            err.to_string(),
            "approve requires the tfs role (caller holds manager)"
        );
    }
}
