use crate::auth::auth::AuthUser;
use crate::leave::error::LeaveError;
use crate::leave::mysql_store::MySqlLeaveStore;
use crate::leave::notifier::MailQueueNotifier;
use crate::leave::router;
use crate::leave::validation::LeaveApplication;
use crate::leave::workflow::{LeaveHistory, LeaveWorkflow};
use crate::model::leave_request::{LeaveRequest, ReviewAction};
use crate::model::role::RequesterRole;
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub type AppWorkflow = LeaveWorkflow<MySqlLeaveStore, MailQueueNotifier>;

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "sick")]
    pub leave_type: String,
    #[schema(example = "2026-01-10", format = "date")]
    pub start_date: String,
    #[schema(example = "2026-01-12", format = "date")]
    pub end_date: String,
    #[schema(example = "Fever, doctor advised rest")]
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RejectLeave {
    #[schema(example = "insufficient coverage")]
    pub reason: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Balance year, defaults to the current year
    pub year: Option<i32>,
}

#[derive(Deserialize, IntoParams)]
pub struct UserHistoryQuery {
    /// Role the user applied under (tutor, peon, technical, admin_personnel)
    #[param(value_type = String, example = "tutor")]
    pub role: RequesterRole,
    /// Balance year, defaults to the current year
    pub year: Option<i32>,
}

#[derive(Serialize, ToSchema)]
pub struct QueueItem {
    pub leave: LeaveRequest,
    #[schema(value_type = Vec<String>, example = json!(["approve", "reject", "forward"]))]
    pub allowed_actions: Vec<ReviewAction>,
}

/* =========================
Apply for leave (staff)
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "Invalid dates, reason or leave type", body = Object, example = json!({
            "message": "start_date cannot be after end_date"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not a staff member")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    payload: web::Json<CreateLeave>,
) -> Result<impl Responder, LeaveError> {
    let requester_role = auth.require_requester()?;
    let payload = payload.into_inner();

    let leave = workflow
        .apply_for_leave(LeaveApplication {
            requester_id: auth.user_id,
            requester_role,
            leave_type: payload.leave_type,
            start_date: payload.start_date,
            end_date: payload.end_date,
            reason: payload.reason,
        })
        .await?;

    Ok(HttpResponse::Created().json(leave))
}

async fn review(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    leave_id: u64,
    action: ReviewAction,
    rejection_reason: Option<String>,
) -> Result<HttpResponse, LeaveError> {
    tracing::debug!(username = %auth.username, leave_id, %action, "Review requested");

    let leave = workflow
        .review_leave(leave_id, auth.actor(), action, rejection_reason)
        .await?;
    Ok(HttpResponse::Ok().json(leave))
}

/* =========================
Approve / forward / reject
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(("leave_id" = u64, Path, description = "ID of the leave request to approve")),
    responses(
        (status = 200, description = "Leave approved and balance charged", body = LeaveRequest),
        (status = 403, description = "Role may not act on this request now"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Request already decided or balance insufficient", body = Object, example = json!({
            "message": "insufficient leave balance: requested 10 day(s), 9 remaining"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    path: web::Path<u64>,
) -> Result<impl Responder, LeaveError> {
    review(auth, workflow, path.into_inner(), ReviewAction::Approve, None).await
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/forward",
    params(("leave_id" = u64, Path, description = "ID of the tutor leave request to forward")),
    responses(
        (status = 200, description = "Leave forwarded to the super admin", body = LeaveRequest),
        (status = 403, description = "Only a course admin can forward"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Request cannot be forwarded in its current state")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn forward_leave(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    path: web::Path<u64>,
) -> Result<impl Responder, LeaveError> {
    review(auth, workflow, path.into_inner(), ReviewAction::Forward, None).await
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(("leave_id" = u64, Path, description = "ID of the leave request to reject")),
    request_body = RejectLeave,
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRequest),
        (status = 400, description = "Rejection reason missing"),
        (status = 403, description = "Role may not act on this request now"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Request already decided")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    path: web::Path<u64>,
    body: web::Json<RejectLeave>,
) -> Result<impl Responder, LeaveError> {
    let reason = body.into_inner().reason;
    review(auth, workflow, path.into_inner(), ReviewAction::Reject, reason).await
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave request to fetch")),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the requester nor an approver"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "leave request 7 not found"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    path: web::Path<u64>,
) -> Result<impl Responder, LeaveError> {
    let leave = workflow.get_leave(path.into_inner()).await?;

    if leave.requester_id != auth.user_id {
        auth.require_approver()?;
    }

    Ok(HttpResponse::Ok().json(leave))
}

/// Own leave history with the balance of the requested year
#[utoipa::path(
    get,
    path = "/api/leave/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Leaves and balance", body = LeaveHistory),
        (status = 403, description = "Caller is not a staff member")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn my_history(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    query: web::Query<HistoryQuery>,
) -> Result<impl Responder, LeaveError> {
    let role = auth.require_requester()?;
    let history = workflow
        .get_leave_history(auth.user_id, role, query.year)
        .await?;
    Ok(HttpResponse::Ok().json(history))
}

/// Leave history of any staff member, for approvers
#[utoipa::path(
    get,
    path = "/api/leave/users/{user_id}/history",
    params(
        ("user_id" = u64, Path, description = "Staff user id"),
        UserHistoryQuery
    ),
    responses(
        (status = 200, description = "Leaves and balance", body = LeaveHistory),
        (status = 403, description = "Approver roles only")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn user_history(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
    path: web::Path<u64>,
    query: web::Query<UserHistoryQuery>,
) -> Result<impl Responder, LeaveError> {
    auth.require_approver()?;
    let history = workflow
        .get_leave_history(path.into_inner(), query.role, query.year)
        .await?;
    Ok(HttpResponse::Ok().json(history))
}

/// Requests waiting on the caller's role
#[utoipa::path(
    get,
    path = "/api/leave/queue",
    responses(
        (status = 200, description = "Open requests and what the caller may do with each", body = Vec<QueueItem>),
        (status = 403, description = "Approver roles only")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn review_queue(
    auth: AuthUser,
    workflow: web::Data<AppWorkflow>,
) -> Result<impl Responder, LeaveError> {
    auth.require_approver()?;

    let items: Vec<QueueItem> = workflow
        .review_queue(auth.role)
        .await?
        .into_iter()
        // own requests are never reviewable by their author
        .filter(|leave| leave.requester_id != auth.user_id)
        .map(|leave| QueueItem {
            allowed_actions: router::allowed_actions(&leave, auth.role).to_vec(),
            leave,
        })
        .collect();

    Ok(HttpResponse::Ok().json(items))
}
