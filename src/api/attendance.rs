use crate::attendance::AttendanceService;
use crate::auth::auth::AuthUser;
use crate::error::Result;
use crate::model::attendance::{AttendanceRecord, ClientTimestamp};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct TimeInReq {
    #[schema(example = 1)]
    pub shift_id: u64,
    /// Civil date; defaults to today.
    #[schema(value_type = Option<String>, format = "date", example = "2025-03-10")]
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TimeOutReq {
    /// RFC 3339 timestamp, or a bare local date-time read as civil time.
    /// Defaults to now.
    #[schema(value_type = Option<String>, format = "date-time", example = "2025-03-10T11:45:00+05:30")]
    #[serde(default)]
    pub time_out: Option<ClientTimestamp>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TimeOutResponse {
    #[schema(example = "Time-out recorded successfully")]
    pub message: String,
    pub record: AttendanceRecord,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct HistoryQuery {
    #[schema(value_type = Option<String>, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MonthQuery {
    #[schema(example = 2025)]
    pub year: Option<i32>,
    #[schema(example = 3)]
    pub month: Option<u32>,
}

/// Record time-in for a shift
#[utoipa::path(
    post,
    path = "/api/v1/attendance/time-in",
    request_body = TimeInReq,
    responses(
        (status = 200, description = "Time-in recorded, or already recorded for this shift", body = crate::attendance::TimeInOutcome),
        (status = 400, description = "Shift missing or inactive"),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Store unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn time_in(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    payload: web::Json<TimeInReq>,
) -> Result<HttpResponse> {
    let outcome = service
        .record_time_in(auth.user_id, payload.shift_id, payload.date)
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Record time-out for the shift covering the given (or current) time
#[utoipa::path(
    post,
    path = "/api/v1/attendance/time-out",
    request_body = TimeOutReq,
    responses(
        (status = 200, description = "Time-out recorded", body = TimeOutResponse),
        (status = 400, description = "No active shift, time-in missing or time-out already recorded"),
        (status = 404, description = "No attendance record for today's shift"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn time_out(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    payload: web::Json<TimeOutReq>,
) -> Result<HttpResponse> {
    let record = service
        .record_time_out(auth.user_id, payload.into_inner().time_out)
        .await?;
    Ok(HttpResponse::Ok().json(TimeOutResponse {
        message: "Time-out recorded successfully".into(),
        record,
    }))
}

/// The caller's records for today
#[utoipa::path(
    get,
    path = "/api/v1/attendance/today",
    responses(
        (status = 200, description = "Today's records", body = [AttendanceRecord]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today(auth: AuthUser, service: web::Data<AttendanceService>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.today(auth.user_id).await?))
}

/// The caller's records, newest first
#[utoipa::path(
    get,
    path = "/api/v1/attendance/history",
    params(
        ("start_date" = Option<String>, Query, description = "Inclusive lower bound (YYYY-MM-DD)"),
        ("end_date" = Option<String>, Query, description = "Inclusive upper bound (YYYY-MM-DD)")
    ),
    responses(
        (status = 200, description = "Attendance history", body = [AttendanceRecord]),
        (status = 400, description = "start_date after end_date"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn history(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse> {
    let records = service
        .history(auth.user_id, query.start_date, query.end_date)
        .await?;
    Ok(HttpResponse::Ok().json(records))
}

/// Present/absent day counts for a month
#[utoipa::path(
    get,
    path = "/api/v1/attendance/stats/monthly",
    params(
        ("year" = Option<i32>, Query, description = "Defaults to the current year"),
        ("month" = Option<u32>, Query, description = "1-12, defaults to the current month")
    ),
    responses(
        (status = 200, description = "Monthly statistics", body = crate::attendance::MonthlyStats),
        (status = 400, description = "Invalid month"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn monthly_stats(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse> {
    let stats = service
        .monthly_stats(auth.user_id, query.year, query.month)
        .await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// Correct the time-out on one of the caller's own records
#[utoipa::path(
    put,
    path = "/api/v1/attendance/{record_id}",
    params(("record_id", Path, description = "Attendance record ID")),
    request_body = TimeOutReq,
    responses(
        (status = 200, description = "Updated record", body = AttendanceRecord),
        (status = 400, description = "Time-in missing or time-out before time-in"),
        (status = 404, description = "Record not found for this user"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn update_own(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    path: web::Path<u64>,
    payload: web::Json<TimeOutReq>,
) -> Result<HttpResponse> {
    let record = service
        .correct_time_out(auth.user_id, path.into_inner(), payload.into_inner().time_out)
        .await?;
    Ok(HttpResponse::Ok().json(record))
}
