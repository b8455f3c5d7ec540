use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::{Display, Error};
use serde_json::json;

/// Failure of a leave workflow operation. Every variant leaves stored state untouched.
#[derive(Debug, Display, Error)]
pub enum LeaveError {
    #[display(fmt = "{}", message)]
    Validation { message: String },

    #[display(fmt = "{}", message)]
    Authorization { message: String },

    #[display(fmt = "leave request {} not found", id)]
    NotFound { id: u64 },

    #[display(fmt = "cannot {} a request that is {}", action, status)]
    InvalidStateTransition { action: String, status: String },

    #[display(
        fmt = "insufficient leave balance: requested {} day(s), {} remaining",
        requested,
        remaining
    )]
    InsufficientBalance { requested: u32, remaining: u32 },

    #[display(fmt = "database error: {}", source)]
    Database { source: sqlx::Error },

    #[display(fmt = "{}", message)]
    Internal { message: String },
}

impl LeaveError {
    pub fn validation(message: impl Into<String>) -> Self {
        LeaveError::Validation {
            message: message.into(),
        }
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        LeaveError::Authorization {
            message: message.into(),
        }
    }

    pub fn invalid_transition(action: impl ToString, status: impl ToString) -> Self {
        LeaveError::InvalidStateTransition {
            action: action.to_string(),
            status: status.to_string(),
        }
    }
}

impl From<sqlx::Error> for LeaveError {
    fn from(source: sqlx::Error) -> Self {
        LeaveError::Database { source }
    }
}

impl From<strum::ParseError> for LeaveError {
    fn from(e: strum::ParseError) -> Self {
        LeaveError::Internal {
            message: format!("stored value could not be decoded: {e}"),
        }
    }
}

impl ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::Validation { .. } => StatusCode::BAD_REQUEST,
            LeaveError::Authorization { .. } => StatusCode::FORBIDDEN,
            LeaveError::NotFound { .. } => StatusCode::NOT_FOUND,
            LeaveError::InvalidStateTransition { .. } | LeaveError::InsufficientBalance { .. } => {
                StatusCode::CONFLICT
            }
            LeaveError::Database { .. } | LeaveError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            LeaveError::Database { .. } | LeaveError::Internal { .. } => {
                tracing::error!(error = %self, "Leave operation failed");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}
