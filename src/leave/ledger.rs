//! MySQL side of the leave balance ledger.
//!
//! Functions take a bare connection so callers decide the transaction scope.

use sqlx::MySqlConnection;

use crate::leave::error::LeaveError;
use crate::model::leave_balance::{BalanceKey, LeaveBalance};

#[derive(Debug, sqlx::FromRow)]
struct BalanceRow {
    total_leaves: u32,
    used_leaves: u32,
}

impl BalanceRow {
    fn into_balance(self, key: BalanceKey) -> LeaveBalance {
        LeaveBalance {
            key,
            total_leaves: self.total_leaves,
            used_leaves: self.used_leaves,
        }
    }
}

pub async fn find(
    conn: &mut MySqlConnection,
    key: BalanceKey,
) -> Result<Option<LeaveBalance>, LeaveError> {
    let row = sqlx::query_as::<_, BalanceRow>(
        r#"
        SELECT total_leaves, used_leaves
        FROM leave_balances
        WHERE user_id = ? AND user_role = ? AND year = ?
        "#,
    )
    .bind(key.user_id)
    .bind(key.role.as_ref())
    .bind(key.year)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|row| row.into_balance(key)))
}

/// Get-or-create under an exclusive row lock held until the transaction ends.
///
/// The no-op `ON DUPLICATE KEY UPDATE` takes X on an existing row. `INSERT IGNORE`
/// would take S there, and two approvers holding S then deadlock on the
/// `FOR UPDATE` upgrade.
pub async fn lock_or_create(
    conn: &mut MySqlConnection,
    key: BalanceKey,
    allowance: u32,
) -> Result<LeaveBalance, LeaveError> {
    sqlx::query(
        r#"
        INSERT INTO leave_balances
            (user_id, user_role, year, total_leaves, used_leaves)
        VALUES (?, ?, ?, ?, 0)
        ON DUPLICATE KEY UPDATE used_leaves = used_leaves
        "#,
    )
    .bind(key.user_id)
    .bind(key.role.as_ref())
    .bind(key.year)
    .bind(allowance)
    .execute(&mut *conn)
    .await?;

    let row = sqlx::query_as::<_, BalanceRow>(
        r#"
        SELECT total_leaves, used_leaves
        FROM leave_balances
        WHERE user_id = ? AND user_role = ? AND year = ?
        FOR UPDATE
        "#,
    )
    .bind(key.user_id)
    .bind(key.role.as_ref())
    .bind(key.year)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into_balance(key))
}

/// Must run inside a transaction; the balance row stays locked until it ends.
pub async fn record_approval(
    conn: &mut MySqlConnection,
    key: BalanceKey,
    days: u32,
    allowance: u32,
) -> Result<LeaveBalance, LeaveError> {
    let mut balance = lock_or_create(conn, key, allowance).await?;

    balance.record_approval(days)?;

    sqlx::query(
        r#"
        UPDATE leave_balances
        SET used_leaves = ?
        WHERE user_id = ? AND user_role = ? AND year = ?
        "#,
    )
    .bind(balance.used_leaves)
    .bind(key.user_id)
    .bind(key.role.as_ref())
    .bind(key.year)
    .execute(&mut *conn)
    .await?;

    Ok(balance)
}
