use chrono::{Datelike, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::leave::error::LeaveError;
use crate::leave::notifier::LeaveNotifier;
use crate::leave::policy::LeavePolicy;
use crate::leave::router;
use crate::leave::store::LeaveStore;
use crate::leave::transition::{self, Actor};
use crate::leave::validation::{LeaveApplication, validate_application};
use crate::model::leave_balance::{BalanceKey, BalanceSummary, LeaveBalance};
use crate::model::leave_request::{LeaveRequest, ReviewAction};
use crate::model::role::{RequesterRole, Role};

#[derive(Debug, Serialize, ToSchema)]
pub struct LeaveHistory {
    pub leaves: Vec<LeaveRequest>,
    pub balance: BalanceSummary,
}

/// Leave request lifecycle: application, review and history.
pub struct LeaveWorkflow<S, N> {
    store: S,
    notifier: N,
    policy: LeavePolicy,
}

impl<S: LeaveStore, N: LeaveNotifier> LeaveWorkflow<S, N> {
    pub fn new(store: S, notifier: N, policy: LeavePolicy) -> Self {
        Self {
            store,
            notifier,
            policy,
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[instrument(
        name = "leave_apply",
        skip(self, application),
        fields(requester_id = application.requester_id, requester_role = %application.requester_role)
    )]
    pub async fn apply_for_leave(
        &self,
        application: LeaveApplication,
    ) -> Result<LeaveRequest, LeaveError> {
        let now = Utc::now();
        let new = validate_application(application, now.date_naive(), self.policy.allow_backdated)?;
        let request = self.store.insert(new, now).await?;

        info!(
            leave_id = request.id,
            total_days = request.total_days,
            "Leave request submitted"
        );

        if let Err(e) = self.notifier.leave_submitted(&request).await {
            warn!(error = %e, leave_id = request.id, "Failed to notify approvers");
        }

        Ok(request)
    }

    #[instrument(
        name = "leave_review",
        skip(self, rejection_reason),
        fields(actor_id = actor.id, actor_role = %actor.role, action = %action)
    )]
    pub async fn review_leave(
        &self,
        request_id: u64,
        actor: Actor,
        action: ReviewAction,
        rejection_reason: Option<String>,
    ) -> Result<LeaveRequest, LeaveError> {
        let now = Utc::now();
        let policy = &self.policy;

        let updated = self
            .store
            .apply_review(request_id, |current| {
                transition::plan(
                    current,
                    actor,
                    action,
                    rejection_reason.as_deref(),
                    policy,
                    now,
                )
            })
            .await
            .inspect_err(|e| info!(error = %e, "Leave review refused"))?;

        info!(status = %updated.status, "Leave request reviewed");

        if let Err(e) = self.notifier.leave_reviewed(&updated, actor).await {
            warn!(error = %e, leave_id = updated.id, "Failed to notify requester");
        }

        Ok(updated)
    }

    /// Requests of `user_id` in `role`, with the balance of `year` (current year by default).
    ///
    /// Read only: a year with no ledger row reports the full policy allowance.
    pub async fn get_leave_history(
        &self,
        user_id: u64,
        role: RequesterRole,
        year: Option<i32>,
    ) -> Result<LeaveHistory, LeaveError> {
        let key = BalanceKey {
            user_id,
            role,
            year: year.unwrap_or_else(|| Utc::now().year()),
        };

        let leaves = self.store.list_for_user(user_id, role).await?;
        let balance = self
            .store
            .find_balance(key)
            .await?
            .unwrap_or_else(|| LeaveBalance::new(key, self.policy.allowance(role)));

        Ok(LeaveHistory {
            leaves,
            balance: BalanceSummary::from(&balance),
        })
    }

    pub async fn get_leave(&self, request_id: u64) -> Result<LeaveRequest, LeaveError> {
        self.store
            .find(request_id)
            .await?
            .ok_or(LeaveError::NotFound { id: request_id })
    }

    /// Open requests `actor_role` is allowed to act on right now.
    pub async fn review_queue(&self, actor_role: Role) -> Result<Vec<LeaveRequest>, LeaveError> {
        let stages = router::review_queue_filter(actor_role);
        self.store.list_open(&stages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leave::memory_store::MemoryLeaveStore;
    use crate::model::leave_request::LeaveStatus;
    use anyhow::anyhow;
    use chrono::Duration;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        reviewed: Mutex<Vec<(u64, LeaveStatus)>>,
        fail: bool,
    }

    impl LeaveNotifier for RecordingNotifier {
        async fn leave_submitted(&self, _request: &LeaveRequest) -> anyhow::Result<()> {
            if self.fail {
                return Err(anyhow!("smtp down"));
            }
            Ok(())
        }

        async fn leave_reviewed(&self, request: &LeaveRequest, _actor: Actor) -> anyhow::Result<()> {
            if self.fail {
                return Err(anyhow!("smtp down"));
            }
            self.reviewed
                .lock()
                .unwrap()
                .push((request.id, request.status));
            Ok(())
        }
    }

    const PEON: u64 = 100;
    const TUTOR: u64 = 200;
    const ADMIN_PERSONNEL: Actor = Actor {
        id: 1,
        role: Role::AdminPersonnel,
    };
    const COURSE_ADMIN: Actor = Actor {
        id: 2,
        role: Role::CourseAdmin,
    };
    const SUPER_ADMIN: Actor = Actor {
        id: 3,
        role: Role::SuperAdmin,
    };

    fn backdating_policy() -> LeavePolicy {
        LeavePolicy {
            allow_backdated: true,
            ..LeavePolicy::default()
        }
    }

    fn workflow() -> LeaveWorkflow<MemoryLeaveStore, RecordingNotifier> {
        LeaveWorkflow::new(
            MemoryLeaveStore::default(),
            RecordingNotifier::default(),
            backdating_policy(),
        )
    }

    fn application(user: u64, role: RequesterRole, start: &str, end: &str) -> LeaveApplication {
        LeaveApplication {
            requester_id: user,
            requester_role: role,
            leave_type: "casual".into(),
            start_date: start.into(),
            end_date: end.into(),
            reason: "personal errand".into(),
        }
    }

    fn key_2025(user: u64, role: RequesterRole) -> BalanceKey {
        BalanceKey {
            user_id: user,
            role,
            year: 2025,
        }
    }

    async fn stored_balance(
        wf: &LeaveWorkflow<MemoryLeaveStore, RecordingNotifier>,
        key: BalanceKey,
    ) -> Option<LeaveBalance> {
        wf.store().find_balance(key).await.unwrap()
    }

    async fn used(wf: &LeaveWorkflow<MemoryLeaveStore, RecordingNotifier>, key: BalanceKey) -> u32 {
        stored_balance(wf, key).await.map(|b| b.used_leaves).unwrap_or(0)
    }

    #[actix_web::test]
    async fn scenario_a_approval_charges_the_ledger() {
        let wf = workflow();
        let request = wf
            .apply_for_leave(application(PEON, RequesterRole::Peon, "2025-01-10", "2025-01-12"))
            .await
            .unwrap();
        assert_eq!(request.total_days, 3);
        assert_eq!(request.status, LeaveStatus::Pending);

        let approved = wf
            .review_leave(request.id, ADMIN_PERSONNEL, ReviewAction::Approve, None)
            .await
            .unwrap();
        assert_eq!(approved.status, LeaveStatus::Approved);
        assert_eq!(approved.approval_chain.len(), 1);

        let balance = stored_balance(&wf, key_2025(PEON, RequesterRole::Peon))
            .await
            .unwrap();
        assert_eq!(balance.total_leaves, 12);
        assert_eq!(balance.used_leaves, 3);
        assert_eq!(balance.remaining_leaves(), 9);
    }

    #[actix_web::test]
    async fn scenario_b_balance_is_enforced_at_approval_only() {
        let wf = workflow();
        let first = wf
            .apply_for_leave(application(PEON, RequesterRole::Peon, "2025-01-10", "2025-01-12"))
            .await
            .unwrap();
        wf.review_leave(first.id, ADMIN_PERSONNEL, ReviewAction::Approve, None)
            .await
            .unwrap();

        let second = wf
            .apply_for_leave(application(PEON, RequesterRole::Peon, "2025-02-01", "2025-02-10"))
            .await
            .unwrap();
        assert_eq!(second.total_days, 10);

        let err = wf
            .review_leave(second.id, SUPER_ADMIN, ReviewAction::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LeaveError::InsufficientBalance {
                requested: 10,
                remaining: 9
            }
        ));

        let stored = wf.get_leave(second.id).await.unwrap();
        assert_eq!(stored.status, LeaveStatus::Pending);
        assert!(stored.approval_chain.is_empty());
        assert_eq!(used(&wf, key_2025(PEON, RequesterRole::Peon)).await, 3);

        // still actionable: the approver resolves it by rejecting
        let rejected = wf
            .review_leave(second.id, SUPER_ADMIN, ReviewAction::Reject, Some("no balance left".into()))
            .await
            .unwrap();
        assert_eq!(rejected.status, LeaveStatus::Rejected);
        assert_eq!(used(&wf, key_2025(PEON, RequesterRole::Peon)).await, 3);
    }

    #[actix_web::test]
    async fn scenario_c_tutor_forward_then_reject() {
        let wf = workflow();
        let request = wf
            .apply_for_leave(application(TUTOR, RequesterRole::Tutor, "2025-03-03", "2025-03-04"))
            .await
            .unwrap();

        let forwarded = wf
            .review_leave(request.id, COURSE_ADMIN, ReviewAction::Forward, None)
            .await
            .unwrap();
        assert_eq!(forwarded.status, LeaveStatus::Forwarded);

        let rejected = wf
            .review_leave(
                request.id,
                SUPER_ADMIN,
                ReviewAction::Reject,
                Some("insufficient coverage".into()),
            )
            .await
            .unwrap();
        assert_eq!(rejected.status, LeaveStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("insufficient coverage"));
        assert_eq!(rejected.approval_chain.len(), 1);
        assert_eq!(used(&wf, key_2025(TUTOR, RequesterRole::Tutor)).await, 0);
    }

    #[actix_web::test]
    async fn tutor_two_stage_approval_builds_the_chain() {
        let wf = workflow();
        let request = wf
            .apply_for_leave(application(TUTOR, RequesterRole::Tutor, "2025-03-03", "2025-03-04"))
            .await
            .unwrap();

        let err = wf
            .review_leave(request.id, SUPER_ADMIN, ReviewAction::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::Authorization { .. }));

        wf.review_leave(request.id, COURSE_ADMIN, ReviewAction::Forward, None)
            .await
            .unwrap();
        let approved = wf
            .review_leave(request.id, SUPER_ADMIN, ReviewAction::Approve, None)
            .await
            .unwrap();

        let roles: Vec<Role> = approved
            .approval_chain
            .iter()
            .map(|e| e.approver_role)
            .collect();
        assert_eq!(roles, vec![Role::CourseAdmin, Role::SuperAdmin]);
        assert_eq!(used(&wf, key_2025(TUTOR, RequesterRole::Tutor)).await, 2);
    }

    #[actix_web::test]
    async fn repeating_a_review_on_a_terminal_request_fails_without_double_counting() {
        let wf = workflow();
        let request = wf
            .apply_for_leave(application(PEON, RequesterRole::Peon, "2025-01-10", "2025-01-11"))
            .await
            .unwrap();

        wf.review_leave(request.id, ADMIN_PERSONNEL, ReviewAction::Approve, None)
            .await
            .unwrap();
        let err = wf
            .review_leave(request.id, ADMIN_PERSONNEL, ReviewAction::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::InvalidStateTransition { .. }));

        let stored = wf.get_leave(request.id).await.unwrap();
        assert_eq!(stored.approval_chain.len(), 1);
        assert_eq!(used(&wf, key_2025(PEON, RequesterRole::Peon)).await, 2);
    }

    #[actix_web::test]
    async fn balance_boundary_is_inclusive() {
        let wf = workflow();
        let key = key_2025(PEON, RequesterRole::Peon);
        wf.store()
            .seed_balance(LeaveBalance {
                key,
                total_leaves: 12,
                used_leaves: 7,
            })
            .await;

        let too_long = wf
            .apply_for_leave(application(PEON, RequesterRole::Peon, "2025-04-01", "2025-04-06"))
            .await
            .unwrap();
        let exact = wf
            .apply_for_leave(application(PEON, RequesterRole::Peon, "2025-05-01", "2025-05-05"))
            .await
            .unwrap();

        let err = wf
            .review_leave(too_long.id, ADMIN_PERSONNEL, ReviewAction::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::InsufficientBalance { .. }));

        wf.review_leave(exact.id, ADMIN_PERSONNEL, ReviewAction::Approve, None)
            .await
            .unwrap();
        let balance = stored_balance(&wf, key).await.unwrap();
        assert_eq!(balance.remaining_leaves(), 0);
        assert_eq!(balance.total_leaves - balance.used_leaves, balance.remaining_leaves());
    }

    #[actix_web::test]
    async fn concurrent_approvals_of_one_request_succeed_once() {
        let wf = workflow();
        let key = key_2025(PEON, RequesterRole::Peon);
        wf.store()
            .seed_balance(LeaveBalance {
                key,
                total_leaves: 12,
                used_leaves: 8,
            })
            .await;
        let request = wf
            .apply_for_leave(application(PEON, RequesterRole::Peon, "2025-06-01", "2025-06-03"))
            .await
            .unwrap();

        let (a, b) = futures::join!(
            wf.review_leave(request.id, ADMIN_PERSONNEL, ReviewAction::Approve, None),
            wf.review_leave(request.id, SUPER_ADMIN, ReviewAction::Approve, None),
        );

        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes.iter().any(|r| matches!(
            r,
            Err(LeaveError::InvalidStateTransition { .. })
        )));
        assert_eq!(used(&wf, key).await, 11);
    }

    #[actix_web::test]
    async fn concurrent_approvals_across_requests_do_not_lose_updates() {
        let wf = workflow();
        let key = key_2025(PEON, RequesterRole::Peon);
        let mut ids = Vec::new();
        for month in 1..=3 {
            let start = format!("2025-{month:02}-01");
            let end = format!("2025-{month:02}-05");
            ids.push(
                wf.apply_for_leave(application(PEON, RequesterRole::Peon, &start, &end))
                    .await
                    .unwrap()
                    .id,
            );
        }

        let (a, b, c) = futures::join!(
            wf.review_leave(ids[0], ADMIN_PERSONNEL, ReviewAction::Approve, None),
            wf.review_leave(ids[1], ADMIN_PERSONNEL, ReviewAction::Approve, None),
            wf.review_leave(ids[2], SUPER_ADMIN, ReviewAction::Approve, None),
        );

        let ok = [a.is_ok(), b.is_ok(), c.is_ok()]
            .iter()
            .filter(|ok| **ok)
            .count();
        assert_eq!(ok, 2);
        assert_eq!(used(&wf, key).await, 10);
    }

    #[actix_web::test]
    async fn notifier_failure_does_not_undo_the_transition() {
        let wf = LeaveWorkflow::new(
            MemoryLeaveStore::default(),
            RecordingNotifier {
                fail: true,
                ..RecordingNotifier::default()
            },
            backdating_policy(),
        );
        let request = wf
            .apply_for_leave(application(PEON, RequesterRole::Peon, "2025-01-10", "2025-01-10"))
            .await
            .unwrap();

        let approved = wf
            .review_leave(request.id, ADMIN_PERSONNEL, ReviewAction::Approve, None)
            .await
            .unwrap();
        assert_eq!(approved.status, LeaveStatus::Approved);
        assert_eq!(
            wf.get_leave(request.id).await.unwrap().status,
            LeaveStatus::Approved
        );
    }

    #[actix_web::test]
    async fn notifier_sees_each_successful_review() {
        let wf = workflow();
        let request = wf
            .apply_for_leave(application(TUTOR, RequesterRole::Tutor, "2025-03-03", "2025-03-03"))
            .await
            .unwrap();
        wf.review_leave(request.id, COURSE_ADMIN, ReviewAction::Forward, None)
            .await
            .unwrap();
        let _ = wf
            .review_leave(request.id, COURSE_ADMIN, ReviewAction::Approve, None)
            .await;

        let reviewed = wf.notifier.reviewed.lock().unwrap().clone();
        assert_eq!(reviewed, vec![(request.id, LeaveStatus::Forwarded)]);
    }

    #[actix_web::test]
    async fn default_policy_refuses_backdated_requests() {
        let wf = LeaveWorkflow::new(
            MemoryLeaveStore::default(),
            RecordingNotifier::default(),
            LeavePolicy::default(),
        );
        let yesterday = (Utc::now().date_naive() - Duration::days(1)).to_string();
        let tomorrow = (Utc::now().date_naive() + Duration::days(1)).to_string();

        let err = wf
            .apply_for_leave(application(PEON, RequesterRole::Peon, &yesterday, &tomorrow))
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::Validation { .. }));

        wf.apply_for_leave(application(PEON, RequesterRole::Peon, &tomorrow, &tomorrow))
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn unknown_request_is_not_found() {
        let wf = workflow();
        let err = wf
            .review_leave(99, SUPER_ADMIN, ReviewAction::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::NotFound { id: 99 }));
    }

    #[actix_web::test]
    async fn history_and_queue() {
        let wf = workflow();
        let peon_leave = wf
            .apply_for_leave(application(PEON, RequesterRole::Peon, "2025-01-10", "2025-01-12"))
            .await
            .unwrap();
        let tutor_leave = wf
            .apply_for_leave(application(TUTOR, RequesterRole::Tutor, "2025-01-10", "2025-01-12"))
            .await
            .unwrap();
        wf.review_leave(peon_leave.id, ADMIN_PERSONNEL, ReviewAction::Approve, None)
            .await
            .unwrap();

        let history = wf
            .get_leave_history(PEON, RequesterRole::Peon, Some(2025))
            .await
            .unwrap();
        assert_eq!(history.leaves.len(), 1);
        assert_eq!(history.balance.used_leaves, 3);
        assert_eq!(history.balance.remaining_leaves, 9);

        let fresh = wf
            .get_leave_history(TUTOR, RequesterRole::Tutor, Some(2031))
            .await
            .unwrap();
        assert_eq!(fresh.balance.total_leaves, 12);
        assert_eq!(fresh.balance.used_leaves, 0);

        let course_queue = wf.review_queue(Role::CourseAdmin).await.unwrap();
        assert_eq!(
            course_queue.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![tutor_leave.id]
        );
        assert!(wf.review_queue(Role::AdminPersonnel).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn history_read_does_not_create_a_ledger_row() {
        let wf = workflow();
        let key = BalanceKey {
            user_id: PEON,
            role: RequesterRole::Peon,
            year: -5000,
        };

        let history = wf
            .get_leave_history(PEON, RequesterRole::Peon, Some(-5000))
            .await
            .unwrap();
        assert_eq!(history.balance.total_leaves, 12);
        assert_eq!(history.balance.remaining_leaves, 12);
        assert!(stored_balance(&wf, key).await.is_none());
    }
}
