//! Staff-only attendance management. Writes here bypass the time-in /
//! time-out sequence checks.

use crate::attendance::AttendanceService;
use crate::auth::auth::AuthUser;
use crate::error::Result;
use crate::model::attendance::{
    AttendanceFilter, AttendancePatch, AttendanceStatus, ClientTimestamp, NewAttendance,
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminCreateReq {
    pub user_id: u64,
    pub shift_id: u64,
    #[schema(value_type = String, format = "date", example = "2025-03-10")]
    pub attendance_date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    #[serde(default)]
    pub time_in: Option<ClientTimestamp>,
    #[schema(value_type = Option<String>, format = "date-time")]
    #[serde(default)]
    pub time_out: Option<ClientTimestamp>,
    pub status: AttendanceStatus,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AdminUpdateReq {
    #[schema(value_type = Option<String>, format = "date-time")]
    #[serde(default)]
    pub time_in: Option<ClientTimestamp>,
    #[schema(value_type = Option<String>, format = "date-time")]
    #[serde(default)]
    pub time_out: Option<ClientTimestamp>,
    pub status: Option<AttendanceStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminListQuery {
    pub user_id: Option<u64>,
    pub shift_id: Option<u64>,
    #[schema(value_type = Option<String>, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
}

/// Create an attendance record in any state
#[utoipa::path(
    post,
    path = "/api/v1/attendance/admin",
    request_body = AdminCreateReq,
    responses(
        (status = 201, description = "Record created", body = crate::model::attendance::AttendanceRecord),
        (status = 403, description = "Caller is not an owner or trainer"),
        (status = 404, description = "Shift not found"),
        (status = 409, description = "Record already exists for this user, shift and date")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance Admin"
)]
pub async fn create_record(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    payload: web::Json<AdminCreateReq>,
) -> Result<HttpResponse> {
    let req = payload.into_inner();
    let clock = service.clock();
    let record = NewAttendance {
        user_id: req.user_id,
        shift_id: req.shift_id,
        attendance_date: req.attendance_date,
        time_in: req.time_in.map(|t| t.resolve(clock)).transpose()?,
        time_out: req.time_out.map(|t| t.resolve(clock)).transpose()?,
        status: req.status,
        timeout_default: false,
    };
    let created = service.admin_create(&auth.principal(), &record).await?;
    Ok(HttpResponse::Created().json(created))
}

/// Overwrite fields of an attendance record
#[utoipa::path(
    put,
    path = "/api/v1/attendance/admin/{record_id}",
    params(("record_id", Path, description = "Attendance record ID")),
    request_body = AdminUpdateReq,
    responses(
        (status = 200, description = "Updated record, or the record unchanged when no fields are supplied", body = crate::model::attendance::AttendanceRecord),
        (status = 400, description = "Timestamp out of range"),
        (status = 403, description = "Caller is not an owner or trainer"),
        (status = 404, description = "Record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance Admin"
)]
pub async fn update_record(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    path: web::Path<u64>,
    payload: web::Json<AdminUpdateReq>,
) -> Result<HttpResponse> {
    let req = payload.into_inner();
    let clock = service.clock();
    let patch = AttendancePatch {
        time_in: req.time_in.map(|t| t.resolve(clock)).transpose()?,
        time_out: req.time_out.map(|t| t.resolve(clock)).transpose()?,
        status: req.status,
    };
    let updated = service
        .admin_update(&auth.principal(), path.into_inner(), &patch)
        .await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// Fetch any attendance record
#[utoipa::path(
    get,
    path = "/api/v1/attendance/admin/{record_id}",
    params(("record_id", Path, description = "Attendance record ID")),
    responses(
        (status = 200, description = "Attendance record", body = crate::model::attendance::AttendanceRecord),
        (status = 403, description = "Caller is not an owner or trainer"),
        (status = 404, description = "Record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance Admin"
)]
pub async fn get_record(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    let record = service.admin_get(&auth.principal(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Search attendance records
#[utoipa::path(
    get,
    path = "/api/v1/attendance/admin",
    params(
        ("user_id" = Option<u64>, Query, description = "Filter by user"),
        ("shift_id" = Option<u64>, Query, description = "Filter by shift"),
        ("start_date" = Option<String>, Query, description = "Inclusive lower bound (YYYY-MM-DD)"),
        ("end_date" = Option<String>, Query, description = "Inclusive upper bound (YYYY-MM-DD)")
    ),
    responses(
        (status = 200, description = "Matching records, newest first", body = [crate::model::attendance::AttendanceRecord]),
        (status = 403, description = "Caller is not an owner or trainer")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance Admin"
)]
pub async fn list_records(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    query: web::Query<AdminListQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let filter = AttendanceFilter {
        user_id: query.user_id,
        shift_id: query.shift_id,
        from: query.start_date,
        to: query.end_date,
    };
    let records = service.admin_list(&auth.principal(), &filter).await?;
    Ok(HttpResponse::Ok().json(records))
}
