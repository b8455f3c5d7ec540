use crate::api::leave_request::{CreateLeave, QueueItem, RejectLeave};
use crate::leave::workflow::LeaveHistory;
use crate::model::leave_balance::BalanceSummary;
use crate::model::leave_request::{ApprovalEntry, LeaveRequest};
use crate::models::{LoginReqDto, TokenPair};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Campus Leave API",
        version = "1.0.0",
        description = r#"
## Campus Leave Management

Leave applications and approvals for campus staff.

### 🔹 Workflow
- **Tutors**: pending → course admin approves, rejects, or forwards → super admin approves or rejects
- **Peons, technical staff, admin personnel**: pending → admin personnel or super admin approves or rejects
- Approval charges the requester's yearly balance; an approval that would overdraw it is refused

### 🔐 Security
All `/api` endpoints require a **JWT Bearer** access token from `/auth/login`.
The caller's role is taken from the token only.

### 📦 Response Format
- JSON bodies; errors as `{ "message": "..." }`
"#,
    ),
    paths(
        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::forward_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::my_history,
        crate::api::leave_request::user_history,
        crate::api::leave_request::review_queue,

        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout
    ),
    components(
        schemas(
            CreateLeave,
            RejectLeave,
            LeaveRequest,
            ApprovalEntry,
            LeaveHistory,
            BalanceSummary,
            QueueItem,
            LoginReqDto,
            TokenPair
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave application and approval APIs"),
        (name = "Auth", description = "Login and token rotation"),
    )
)]
pub struct ApiDoc;
