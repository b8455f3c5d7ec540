use crate::config::Config;
use crate::leave::error::LeaveError;
use crate::leave::transition::Actor;
use crate::model::role::{RequesterRole, Role};
use crate::auth::jwt::verify_token;
use crate::models::TokenType;
use actix_web::{
    FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data,
};
use futures::future::{Ready, ready};

/// Caller identity, taken from a verified access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
}

fn from_header(req: &HttpRequest) -> Result<AuthUser, actix_web::Error> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| ErrorUnauthorized("Missing token"))?;

    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("Config missing"))?;

    let claims =
        verify_token(token, &config.jwt_secret).map_err(|_| ErrorUnauthorized("Invalid token"))?;

    if claims.token_type != TokenType::Access {
        return Err(ErrorUnauthorized("Access token required"));
    }

    Ok(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role: claims.role,
    })
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // auth_middleware already verified the token on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }
        ready(from_header(req))
    }
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.user_id,
            role: self.role,
        }
    }

    pub fn require_requester(&self) -> Result<RequesterRole, LeaveError> {
        self.role
            .as_requester()
            .ok_or_else(|| LeaveError::authorization("Only staff can apply for leave"))
    }

    pub fn require_approver(&self) -> Result<(), LeaveError> {
        if self.role.is_approver() {
            Ok(())
        } else {
            Err(LeaveError::authorization("Approver roles only"))
        }
    }
}
