//! In-process store used by the workflow tests.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use futures::lock::Mutex;

use crate::leave::error::LeaveError;
use crate::leave::store::LeaveStore;
use crate::leave::transition::Transition;
use crate::model::leave_balance::{BalanceKey, LeaveBalance};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest};
use crate::model::role::RequesterRole;

#[derive(Default)]
struct State {
    next_id: u64,
    requests: BTreeMap<u64, LeaveRequest>,
    balances: HashMap<BalanceKey, LeaveBalance>,
}

/// Every operation holds one async mutex, which serializes reviews the way row locks do.
#[derive(Default)]
pub struct MemoryLeaveStore {
    state: Mutex<State>,
}

impl MemoryLeaveStore {
    pub async fn seed_balance(&self, balance: LeaveBalance) {
        self.state.lock().await.balances.insert(balance.key, balance);
    }
}

impl LeaveStore for MemoryLeaveStore {
    async fn insert(
        &self,
        new: NewLeaveRequest,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, LeaveError> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let request = new.into_request(state.next_id, now);
        state.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn find(&self, id: u64) -> Result<Option<LeaveRequest>, LeaveError> {
        Ok(self.state.lock().await.requests.get(&id).cloned())
    }

    async fn list_for_user(
        &self,
        user_id: u64,
        role: RequesterRole,
    ) -> Result<Vec<LeaveRequest>, LeaveError> {
        let state = self.state.lock().await;
        Ok(state
            .requests
            .values()
            .rev()
            .filter(|r| r.requester_id == user_id && r.requester_role == role)
            .cloned()
            .collect())
    }

    async fn list_open(
        &self,
        stages: &[(RequesterRole, LeaveStatus)],
    ) -> Result<Vec<LeaveRequest>, LeaveError> {
        let state = self.state.lock().await;
        Ok(state
            .requests
            .values()
            .filter(|r| stages.contains(&(r.requester_role, r.status)))
            .cloned()
            .collect())
    }

    async fn find_balance(&self, key: BalanceKey) -> Result<Option<LeaveBalance>, LeaveError> {
        Ok(self.state.lock().await.balances.get(&key).cloned())
    }

    async fn apply_review<F>(&self, id: u64, plan: F) -> Result<LeaveRequest, LeaveError>
    where
        F: FnOnce(&LeaveRequest) -> Result<Transition, LeaveError>,
    {
        let mut state = self.state.lock().await;
        let State {
            requests, balances, ..
        } = &mut *state;

        let request = requests.get_mut(&id).ok_or(LeaveError::NotFound { id })?;
        let transition = plan(request)?;

        if let Some(debit) = &transition.debit {
            balances
                .entry(debit.key)
                .or_insert_with(|| LeaveBalance::new(debit.key, debit.allowance))
                .record_approval(debit.days)?;
        }

        transition.apply(request);
        Ok(request.clone())
    }
}
