use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::model::role::{RequesterRole, Role};

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LeaveType {
    Sick,
    Casual,
    Personal,
    Emergency,
    Academic,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Forwarded,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, LeaveStatus::Approved | LeaveStatus::Rejected)
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
    Forward,
}

/// One step in the approval chain: who forwarded or approved, and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ApprovalEntry {
    #[schema(example = "course_admin", value_type = String)]
    pub approver_role: Role,
    #[schema(example = 7)]
    pub approver_id: u64,
    #[schema(example = "forward", value_type = String)]
    pub action: ReviewAction,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub acted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub requester_id: u64,
    #[schema(example = "tutor", value_type = String)]
    pub requester_role: RequesterRole,
    #[schema(example = "sick", value_type = String)]
    pub leave_type: LeaveType,
    #[schema(example = "2026-01-10", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-12", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = 3)]
    pub total_days: u32,
    #[schema(example = "Fever")]
    pub reason: String,
    #[schema(example = "pending", value_type = String)]
    pub status: LeaveStatus,
    pub rejection_reason: Option<String>,
    pub approval_chain: Vec<ApprovalEntry>,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl LeaveRequest {
    /// Ledger year the request is charged against.
    pub fn year(&self) -> i32 {
        use chrono::Datelike;
        self.start_date.year()
    }
}

/// A validated application, ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLeaveRequest {
    pub requester_id: u64,
    pub requester_role: RequesterRole,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: u32,
    pub reason: String,
}

impl NewLeaveRequest {
    pub fn into_request(self, id: u64, now: DateTime<Utc>) -> LeaveRequest {
        LeaveRequest {
            id,
            requester_id: self.requester_id,
            requester_role: self.requester_role,
            leave_type: self.leave_type,
            start_date: self.start_date,
            end_date: self.end_date,
            total_days: self.total_days,
            reason: self.reason,
            status: LeaveStatus::Pending,
            rejection_reason: None,
            approval_chain: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Row shape of `leave_requests`; enums are stored as their snake/lowercase names.
#[derive(Debug, sqlx::FromRow)]
pub struct LeaveRequestRow {
    pub id: u64,
    pub requester_id: u64,
    pub requester_role: String,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: u32,
    pub reason: String,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row shape of `leave_approvals`.
#[derive(Debug, sqlx::FromRow)]
pub struct ApprovalRow {
    pub leave_id: u64,
    pub approver_role: String,
    pub approver_id: u64,
    pub action: String,
    pub acted_at: DateTime<Utc>,
}

impl TryFrom<ApprovalRow> for ApprovalEntry {
    type Error = strum::ParseError;

    fn try_from(row: ApprovalRow) -> Result<Self, Self::Error> {
        Ok(ApprovalEntry {
            approver_role: row.approver_role.parse()?,
            approver_id: row.approver_id,
            action: row.action.parse()?,
            acted_at: row.acted_at,
        })
    }
}

impl LeaveRequestRow {
    pub fn into_request(self, approval_chain: Vec<ApprovalEntry>) -> Result<LeaveRequest, strum::ParseError> {
        Ok(LeaveRequest {
            id: self.id,
            requester_id: self.requester_id,
            requester_role: self.requester_role.parse()?,
            leave_type: self.leave_type.parse()?,
            start_date: self.start_date,
            end_date: self.end_date,
            total_days: self.total_days,
            reason: self.reason,
            status: self.status.parse()?,
            rejection_reason: self.rejection_reason,
            approval_chain,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
