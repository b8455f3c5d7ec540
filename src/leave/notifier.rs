use chrono::Utc;
use sqlx::MySqlPool;

use crate::leave::router;
use crate::leave::transition::Actor;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};

/// Best-effort delivery of workflow events. Errors are logged by the caller and never undo a transition.
#[allow(async_fn_in_trait)]
pub trait LeaveNotifier {
    async fn leave_submitted(&self, request: &LeaveRequest) -> anyhow::Result<()>;

    async fn leave_reviewed(&self, request: &LeaveRequest, actor: Actor) -> anyhow::Result<()>;
}

/// Queues emails in `email_queue` for the mail worker to send.
#[derive(Clone)]
pub struct MailQueueNotifier {
    pool: MySqlPool,
}

impl MailQueueNotifier {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn enqueue(
        &self,
        recipient_user_id: Option<u64>,
        recipient_role: Option<&str>,
        subject: &str,
        body: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO email_queue
                (recipient_user_id, recipient_role, subject, body, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(recipient_user_id)
        .bind(recipient_role)
        .bind(subject)
        .bind(body)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl LeaveNotifier for MailQueueNotifier {
    async fn leave_submitted(&self, request: &LeaveRequest) -> anyhow::Result<()> {
        let Some(stage) = router::stage(request.requester_role, request.status) else {
            return Ok(());
        };

        let subject = format!("Leave request #{} awaiting review", request.id);
        let body = format!(
            "A {} leave request from {} #{} ({} to {}, {} day(s)) is awaiting your review.",
            request.leave_type,
            request.requester_role,
            request.requester_id,
            request.start_date,
            request.end_date,
            request.total_days
        );

        for role in stage.approvers {
            self.enqueue(None, Some(role.as_ref()), &subject, &body).await?;
        }
        Ok(())
    }

    async fn leave_reviewed(&self, request: &LeaveRequest, actor: Actor) -> anyhow::Result<()> {
        let subject = format!("Leave request #{} {}", request.id, request.status);
        let body = match request.status {
            LeaveStatus::Rejected => format!(
                "Your leave from {} to {} was rejected by {}: {}",
                request.start_date,
                request.end_date,
                actor.role,
                request.rejection_reason.as_deref().unwrap_or("-")
            ),
            LeaveStatus::Forwarded => format!(
                "Your leave from {} to {} was forwarded by {} for final approval.",
                request.start_date, request.end_date, actor.role
            ),
            _ => format!(
                "Your leave from {} to {} ({} day(s)) is now {}.",
                request.start_date, request.end_date, request.total_days, request.status
            ),
        };

        self.enqueue(Some(request.requester_id), None, &subject, &body)
            .await?;

        if request.status == LeaveStatus::Forwarded {
            self.leave_submitted(request).await?;
        }
        Ok(())
    }
}
