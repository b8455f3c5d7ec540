use chrono::{DateTime, Utc};

use crate::leave::error::LeaveError;
use crate::leave::transition::Transition;
use crate::model::leave_balance::{BalanceKey, LeaveBalance};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest};
use crate::model::role::RequesterRole;

/// Persistence for leave requests and the balance ledger.
///
/// `apply_review` is the only write path after creation. Implementations must
/// run it as one atomic unit: the request is re-read under a lock, `plan` is
/// evaluated against that fresh copy, and the ledger debit (if any) and the
/// status change are committed together or not at all. The balance row is
/// created on first debit.
#[allow(async_fn_in_trait)]
pub trait LeaveStore {
    async fn insert(
        &self,
        new: NewLeaveRequest,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, LeaveError>;

    async fn find(&self, id: u64) -> Result<Option<LeaveRequest>, LeaveError>;

    /// Newest first.
    async fn list_for_user(
        &self,
        user_id: u64,
        role: RequesterRole,
    ) -> Result<Vec<LeaveRequest>, LeaveError>;

    /// Requests whose (requester role, status) is one of `stages`, oldest first.
    async fn list_open(
        &self,
        stages: &[(RequesterRole, LeaveStatus)],
    ) -> Result<Vec<LeaveRequest>, LeaveError>;

    /// The stored balance for `key`, if any. Never creates a row.
    async fn find_balance(&self, key: BalanceKey) -> Result<Option<LeaveBalance>, LeaveError>;

    async fn apply_review<F>(&self, id: u64, plan: F) -> Result<LeaveRequest, LeaveError>
    where
        F: FnOnce(&LeaveRequest) -> Result<Transition, LeaveError>;
}
