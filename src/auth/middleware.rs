use crate::auth::auth::authenticate;
use crate::config::Config;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header,
    web::Data,
};

/// Rejects requests without a valid access token and stashes the caller in
/// the request extensions for the `AuthUser` extractor.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    match authenticate(token, config) {
        Ok(user) => {
            tracing::debug!(user_id = user.user_id, path = %req.path(), "Authenticated request");
            req.extensions_mut().insert(user);
            next.call(req).await
        }
        Err(err) => {
            let resp = err.error_response();
            Ok(req.into_response(resp))
        }
    }
}
