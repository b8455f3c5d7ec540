use chrono::NaiveDate;

use crate::leave::error::LeaveError;
use crate::model::leave_request::{LeaveType, NewLeaveRequest};
use crate::model::role::RequesterRole;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw application as received from the caller.
#[derive(Debug, Clone)]
pub struct LeaveApplication {
    pub requester_id: u64,
    pub requester_role: RequesterRole,
    pub leave_type: String,
    pub start_date: String,
    pub end_date: String,
    pub reason: String,
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, LeaveError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        LeaveError::validation(format!("{field} must be a valid date (YYYY-MM-DD)"))
    })
}

/// Inclusive day count of `start..=end`.
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> u32 {
    ((end - start).num_days() + 1).max(0) as u32
}

pub fn validate_application(
    app: LeaveApplication,
    today: NaiveDate,
    allow_backdated: bool,
) -> Result<NewLeaveRequest, LeaveError> {
    let start_date = parse_date("start_date", &app.start_date)?;
    let end_date = parse_date("end_date", &app.end_date)?;

    if start_date > end_date {
        return Err(LeaveError::validation("start_date cannot be after end_date"));
    }

    if !allow_backdated && start_date < today {
        return Err(LeaveError::validation("start_date cannot be in the past"));
    }

    let reason = app.reason.trim();
    if reason.is_empty() {
        return Err(LeaveError::validation("reason is required"));
    }

    let leave_type: LeaveType = app.leave_type.trim().parse().map_err(|_| {
        LeaveError::validation(
            "Invalid leave type. Allowed: sick, casual, personal, emergency, academic",
        )
    })?;

    Ok(NewLeaveRequest {
        requester_id: app.requester_id,
        requester_role: app.requester_role,
        leave_type,
        start_date,
        end_date,
        total_days: inclusive_days(start_date, end_date),
        reason: reason.to_string(),
    })
}
