//! Who may act on a leave request, and how.
//!
//! The whole policy lives in [`stage`], keyed by the requester's role and the
//! request's current status.

use crate::leave::error::LeaveError;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, ReviewAction};
use crate::model::role::{RequesterRole, Role};

/// The approvers and actions available at one point of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub approvers: &'static [Role],
    pub actions: &'static [ReviewAction],
}

const COURSE_ADMIN_REVIEW: Stage = Stage {
    approvers: &[Role::CourseAdmin],
    actions: &[
        ReviewAction::Approve,
        ReviewAction::Reject,
        ReviewAction::Forward,
    ],
};

const SUPER_ADMIN_REVIEW: Stage = Stage {
    approvers: &[Role::SuperAdmin],
    actions: &[ReviewAction::Approve, ReviewAction::Reject],
};

const SINGLE_STAGE_REVIEW: Stage = Stage {
    approvers: &[Role::AdminPersonnel, Role::SuperAdmin],
    actions: &[ReviewAction::Approve, ReviewAction::Reject],
};

/// `None` for terminal statuses and for combinations the workflow never reaches.
pub fn stage(requester: RequesterRole, status: LeaveStatus) -> Option<Stage> {
    match (requester, status) {
        (RequesterRole::Tutor, LeaveStatus::Pending) => Some(COURSE_ADMIN_REVIEW),
        (RequesterRole::Tutor, LeaveStatus::Forwarded) => Some(SUPER_ADMIN_REVIEW),
        (_, LeaveStatus::Pending) => Some(SINGLE_STAGE_REVIEW),
        _ => None,
    }
}

/// Checks that `actor` may apply `action` to `request` in its current state.
pub fn authorize(
    request: &LeaveRequest,
    actor_id: u64,
    actor_role: Role,
    action: ReviewAction,
) -> Result<(), LeaveError> {
    if request.status.is_terminal() {
        return Err(LeaveError::invalid_transition(action, request.status));
    }

    let stage = stage(request.requester_role, request.status)
        .ok_or_else(|| LeaveError::invalid_transition(action, request.status))?;

    if !stage.approvers.contains(&actor_role) {
        return Err(LeaveError::authorization(format!(
            "{actor_role} cannot review a {} request that is {}",
            request.requester_role, request.status
        )));
    }

    if actor_id == request.requester_id {
        return Err(LeaveError::authorization(
            "you cannot review your own leave request",
        ));
    }

    if !stage.actions.contains(&action) {
        return Err(LeaveError::invalid_transition(action, request.status));
    }

    Ok(())
}

/// Actions `actor_role` may currently take on `request`; empty when none.
pub fn allowed_actions(request: &LeaveRequest, actor_role: Role) -> &'static [ReviewAction] {
    match stage(request.requester_role, request.status) {
        Some(stage) if stage.approvers.contains(&actor_role) => stage.actions,
        _ => &[],
    }
}

/// Every (requester role, status) pair `actor_role` is an approver for.
pub fn review_queue_filter(actor_role: Role) -> Vec<(RequesterRole, LeaveStatus)> {
    const REQUESTERS: [RequesterRole; 4] = [
        RequesterRole::Tutor,
        RequesterRole::Peon,
        RequesterRole::Technical,
        RequesterRole::AdminPersonnel,
    ];
    const OPEN: [LeaveStatus; 2] = [LeaveStatus::Pending, LeaveStatus::Forwarded];

    REQUESTERS
        .iter()
        .flat_map(|requester| OPEN.iter().map(move |status| (*requester, *status)))
        .filter(|(requester, status)| {
            stage(*requester, *status).is_some_and(|s| s.approvers.contains(&actor_role))
        })
        .collect()
}
