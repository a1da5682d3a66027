use crate::attendance::AttendanceService;
use crate::auth::auth::AuthUser;
use crate::error::Result;
use crate::model::shift::{NewShift, ShiftPatch};
use actix_web::{HttpResponse, web};

/// Active shifts
#[utoipa::path(
    get,
    path = "/api/v1/shifts",
    responses(
        (status = 200, description = "Active shifts ordered by id", body = [crate::model::shift::Shift]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn list_shifts(
    _auth: AuthUser,
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.list_shifts().await?))
}

/// The active shift covering the current civil time
#[utoipa::path(
    get,
    path = "/api/v1/shifts/current",
    responses(
        (status = 200, description = "Current shift", body = crate::model::shift::Shift),
        (status = 400, description = "No active shift covers the current time"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn current_shift(
    _auth: AuthUser,
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.current_shift().await?))
}

/// Create a shift
#[utoipa::path(
    post,
    path = "/api/v1/shifts",
    request_body = NewShift,
    responses(
        (status = 201, description = "Shift created", body = crate::model::shift::Shift),
        (status = 400, description = "Empty name or start_time after end_time"),
        (status = 403, description = "Caller is not an owner or trainer")
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn create_shift(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    payload: web::Json<NewShift>,
) -> Result<HttpResponse> {
    let shift = service.create_shift(&auth.principal(), &payload).await?;
    Ok(HttpResponse::Created().json(shift))
}

/// Rename, describe, activate or deactivate a shift
#[utoipa::path(
    put,
    path = "/api/v1/shifts/{shift_id}",
    params(("shift_id", Path, description = "Shift ID")),
    request_body = ShiftPatch,
    responses(
        (status = 200, description = "Updated shift", body = crate::model::shift::Shift),
        (status = 403, description = "Caller is not an owner or trainer"),
        (status = 404, description = "Shift not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Shift"
)]
pub async fn update_shift(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    path: web::Path<u64>,
    payload: web::Json<ShiftPatch>,
) -> Result<HttpResponse> {
    let shift = service
        .update_shift(&auth.principal(), path.into_inner(), &payload)
        .await?;
    Ok(HttpResponse::Ok().json(shift))
}
