use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{MySqlConnection, MySqlPool};

use crate::leave::error::LeaveError;
use crate::leave::ledger;
use crate::leave::store::LeaveStore;
use crate::leave::transition::Transition;
use crate::model::leave_balance::{BalanceKey, LeaveBalance};
use crate::model::leave_request::{
    ApprovalEntry, ApprovalRow, LeaveRequest, LeaveRequestRow, LeaveStatus, NewLeaveRequest,
};
use crate::model::role::RequesterRole;

const SELECT_LEAVE: &str = r#"
    SELECT id, requester_id, requester_role, leave_type, start_date, end_date,
           total_days, reason, status, rejection_reason, created_at, updated_at
    FROM leave_requests
"#;

#[derive(Clone)]
pub struct MySqlLeaveStore {
    pool: MySqlPool,
}

impl MySqlLeaveStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Loads approval chains for `rows` and assembles the requests, keeping row order.
async fn attach_chains(
    conn: &mut MySqlConnection,
    rows: Vec<LeaveRequestRow>,
) -> Result<Vec<LeaveRequest>, LeaveError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        r#"
        SELECT leave_id, approver_role, approver_id, action, acted_at
        FROM leave_approvals
        WHERE leave_id IN ({})
        ORDER BY acted_at, id
        "#,
        placeholders(rows.len())
    );

    let mut q = sqlx::query_as::<_, ApprovalRow>(&sql);
    for row in &rows {
        q = q.bind(row.id);
    }
    let approvals = q.fetch_all(&mut *conn).await?;

    let mut chains: HashMap<u64, Vec<ApprovalEntry>> = HashMap::new();
    for approval in approvals {
        let leave_id = approval.leave_id;
        chains
            .entry(leave_id)
            .or_default()
            .push(ApprovalEntry::try_from(approval)?);
    }

    rows.into_iter()
        .map(|row| {
            let chain = chains.remove(&row.id).unwrap_or_default();
            row.into_request(chain).map_err(LeaveError::from)
        })
        .collect()
}

impl LeaveStore for MySqlLeaveStore {
    async fn insert(
        &self,
        new: NewLeaveRequest,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, LeaveError> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (requester_id, requester_role, leave_type, start_date, end_date,
                 total_days, reason, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.requester_id)
        .bind(new.requester_role.as_ref())
        .bind(new.leave_type.as_ref())
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.total_days)
        .bind(&new.reason)
        .bind(LeaveStatus::Pending.as_ref())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(new.into_request(result.last_insert_id(), now))
    }

    async fn find(&self, id: u64) -> Result<Option<LeaveRequest>, LeaveError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("{SELECT_LEAVE} WHERE id = ?");

        let row = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => Ok(attach_chains(&mut *conn, vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_for_user(
        &self,
        user_id: u64,
        role: RequesterRole,
    ) -> Result<Vec<LeaveRequest>, LeaveError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!(
            "{SELECT_LEAVE} WHERE requester_id = ? AND requester_role = ? ORDER BY created_at DESC, id DESC"
        );

        let rows = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(user_id)
            .bind(role.as_ref())
            .fetch_all(&mut *conn)
            .await?;

        attach_chains(&mut *conn, rows).await
    }

    async fn list_open(
        &self,
        stages: &[(RequesterRole, LeaveStatus)],
    ) -> Result<Vec<LeaveRequest>, LeaveError> {
        if stages.is_empty() {
            return Ok(Vec::new());
        }

        let where_sql = stages
            .iter()
            .map(|_| "(requester_role = ? AND status = ?)")
            .collect::<Vec<_>>()
            .join(" OR ");
        let sql = format!("{SELECT_LEAVE} WHERE {where_sql} ORDER BY created_at, id");

        let mut q = sqlx::query_as::<_, LeaveRequestRow>(&sql);
        for (role, status) in stages {
            q = q.bind(role.as_ref()).bind(status.as_ref());
        }

        let mut conn = self.pool.acquire().await?;
        let rows = q.fetch_all(&mut *conn).await?;
        attach_chains(&mut *conn, rows).await
    }

    async fn find_balance(&self, key: BalanceKey) -> Result<Option<LeaveBalance>, LeaveError> {
        let mut conn = self.pool.acquire().await?;
        ledger::find(&mut *conn, key).await
    }

    async fn apply_review<F>(&self, id: u64, plan: F) -> Result<LeaveRequest, LeaveError>
    where
        F: FnOnce(&LeaveRequest) -> Result<Transition, LeaveError>,
    {
        let mut tx = self.pool.begin().await?;

        // Lock order is request row, then balance row.
        let sql = format!("{SELECT_LEAVE} WHERE id = ? FOR UPDATE");
        let row = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LeaveError::NotFound { id })?;

        let mut request = attach_chains(&mut *tx, vec![row])
            .await?
            .pop()
            .ok_or(LeaveError::NotFound { id })?;

        let transition = plan(&request)?;

        if let Some(debit) = &transition.debit {
            ledger::record_approval(&mut *tx, debit.key, debit.days, debit.allowance).await?;
        }

        transition.apply(&mut request);

        sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, rejection_reason = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(request.status.as_ref())
        .bind(request.rejection_reason.as_deref())
        .bind(request.updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(entry) = &transition.chain_entry {
            sqlx::query(
                r#"
                INSERT INTO leave_approvals
                    (leave_id, approver_role, approver_id, action, acted_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(id)
            .bind(entry.approver_role.as_ref())
            .bind(entry.approver_id)
            .bind(entry.action.as_ref())
            .bind(entry.acted_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(request)
    }
}
