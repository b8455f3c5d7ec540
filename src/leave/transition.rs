use chrono::{DateTime, Utc};

use crate::leave::error::LeaveError;
use crate::leave::policy::LeavePolicy;
use crate::leave::router;
use crate::model::leave_balance::BalanceKey;
use crate::model::leave_request::{ApprovalEntry, LeaveRequest, LeaveStatus, ReviewAction};
use crate::model::role::Role;

/// An authenticated reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: u64,
    pub role: Role,
}

/// Days to charge to a balance, and the allowance to open it with if it does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerDebit {
    pub key: BalanceKey,
    pub days: u32,
    pub allowance: u32,
}

/// A checked state change, computed from the locked current request.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub action: ReviewAction,
    pub next_status: LeaveStatus,
    pub chain_entry: Option<ApprovalEntry>,
    pub rejection_reason: Option<String>,
    pub debit: Option<LedgerDebit>,
    pub at: DateTime<Utc>,
}

pub fn plan(
    request: &LeaveRequest,
    actor: Actor,
    action: ReviewAction,
    rejection_reason: Option<&str>,
    policy: &LeavePolicy,
    now: DateTime<Utc>,
) -> Result<Transition, LeaveError> {
    router::authorize(request, actor.id, actor.role, action)?;

    let entry = || ApprovalEntry {
        approver_role: actor.role,
        approver_id: actor.id,
        action,
        acted_at: now,
    };

    let transition = match action {
        ReviewAction::Approve => Transition {
            action,
            next_status: LeaveStatus::Approved,
            chain_entry: Some(entry()),
            rejection_reason: None,
            debit: Some(LedgerDebit {
                key: BalanceKey {
                    user_id: request.requester_id,
                    role: request.requester_role,
                    year: request.year(),
                },
                days: request.total_days,
                allowance: policy.allowance(request.requester_role),
            }),
            at: now,
        },
        ReviewAction::Forward => Transition {
            action,
            next_status: LeaveStatus::Forwarded,
            chain_entry: Some(entry()),
            rejection_reason: None,
            debit: None,
            at: now,
        },
        ReviewAction::Reject => {
            let reason = rejection_reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .ok_or_else(|| LeaveError::validation("rejection reason is required"))?;
            Transition {
                action,
                next_status: LeaveStatus::Rejected,
                chain_entry: None,
                rejection_reason: Some(reason.to_string()),
                debit: None,
                at: now,
            }
        }
    };

    Ok(transition)
}

impl Transition {
    pub fn apply(&self, request: &mut LeaveRequest) {
        request.status = self.next_status;
        if let Some(entry) = &self.chain_entry {
            request.approval_chain.push(entry.clone());
        }
        if let Some(reason) = &self.rejection_reason {
            request.rejection_reason = Some(reason.clone());
        }
        request.updated_at = self.at;
    }
}
