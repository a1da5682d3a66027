use crate::config::Config;
use crate::error::AppError;
use crate::model::role::{Principal, Roles};
use crate::models::TokenType;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, http::header, web::Data};
use futures::future::{Ready, ready};

use super::jwt::verify_token;

/// The authenticated caller, built from an access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
    pub roles: Roles,
}

impl AuthUser {
    pub fn principal(&self) -> Principal {
        Principal::new(self.user_id, self.roles)
    }

    pub fn require_staff(&self, action: &str) -> crate::error::Result<()> {
        self.principal().require_staff(action)
    }

    /// Staff may act on anyone; everyone else only on themselves.
    pub fn require_self_or_staff(&self, user_id: u64) -> crate::error::Result<()> {
        if self.user_id == user_id || self.roles.is_staff() {
            Ok(())
        } else {
            Err(AppError::Forbidden("You can only view your own profile".into()))
        }
    }
}

/// Token from an `Authorization: Bearer ...` header.
pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Validates an access token and builds the caller from its claims.
pub fn authenticate(token: Option<&str>, config: &Config) -> Result<AuthUser, AppError> {
    let token = token.ok_or_else(|| AppError::Unauthorized("Missing bearer token".into()))?;
    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;
    if claims.token_type != TokenType::Access {
        return Err(AppError::Unauthorized("Access token required".into()));
    }
    Ok(AuthUser {
        user_id: claims.user_id,
        roles: claims.roles(),
        email: claims.sub,
    })
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware when the route is wrapped
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let Some(config) = req.app_data::<Data<Config>>() else {
            return ready(Err(AppError::Internal(anyhow::anyhow!("Config missing"))));
        };
        ready(authenticate(bearer_token(req), config))
    }
}
