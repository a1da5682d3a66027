use crate::api::attendance::{HistoryQuery, MonthQuery, TimeInReq, TimeOutReq, TimeOutResponse};
use crate::api::attendance_admin::{AdminCreateReq, AdminListQuery, AdminUpdateReq};
use crate::api::gym::CreateGym;
use crate::api::location::{CreatePincode, CreateStateCountry};
use crate::attendance::{MonthlyStats, TimeInOutcome};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::gym::Gym;
use crate::model::location::{Pincode, StateCountry};
use crate::model::shift::{NewShift, Shift, ShiftPatch};
use crate::model::user::User;
use crate::models::{EmailReq, LoginReqDto, RegisterReq, TokenPair, VerifyOtpReq};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gym Attendance API",
        version = "1.0.0",
        description = r#"
## Gym attendance backend

Members record **time-in** and **time-out** against daily shifts. A background
job marks absentees and closes sessions left open past the grace period.

### Key features
- **Attendance**: time-in, time-out, today, history, monthly statistics
- **Shifts**: active shifts, the shift covering now, staff administration
- **Attendance admin**: staff create and correct records directly
- **Accounts**: registration with email OTP, JWT login and refresh
- **Reference data**: gyms, states and pincodes

### Security
Most endpoints require a **JWT bearer token**. Staff-only operations need the
owner or trainer role.

All dates and times are in the deployment's civil timezone.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::verify_otp,
        crate::auth::handlers::resend_otp,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::attendance::time_in,
        crate::api::attendance::time_out,
        crate::api::attendance::today,
        crate::api::attendance::history,
        crate::api::attendance::monthly_stats,
        crate::api::attendance::update_own,

        crate::api::attendance_admin::create_record,
        crate::api::attendance_admin::update_record,
        crate::api::attendance_admin::get_record,
        crate::api::attendance_admin::list_records,

        crate::api::shift::list_shifts,
        crate::api::shift::current_shift,
        crate::api::shift::create_shift,
        crate::api::shift::update_shift,

        crate::api::gym::create_gym,
        crate::api::gym::list_gyms,
        crate::api::gym::get_gym,

        crate::api::location::create_state_country,
        crate::api::location::list_state_countries,
        crate::api::location::get_state_country,
        crate::api::location::delete_state_country,
        crate::api::location::create_pincode,
        crate::api::location::list_pincodes,
        crate::api::location::get_pincode,
        crate::api::location::get_pincode_by_code,
        crate::api::location::delete_pincode,

        crate::api::user::list_users,
        crate::api::user::get_user,
        crate::api::user::gym_users
    ),
    components(
        schemas(
            AttendanceRecord,
            AttendanceStatus,
            TimeInReq,
            TimeInOutcome,
            TimeOutReq,
            TimeOutResponse,
            HistoryQuery,
            MonthQuery,
            MonthlyStats,
            AdminCreateReq,
            AdminUpdateReq,
            AdminListQuery,
            Shift,
            NewShift,
            ShiftPatch,
            Gym,
            CreateGym,
            StateCountry,
            CreateStateCountry,
            Pincode,
            CreatePincode,
            User,
            RegisterReq,
            VerifyOtpReq,
            EmailReq,
            LoginReqDto,
            TokenPair
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, OTP verification and tokens"),
        (name = "Attendance", description = "Self-service attendance"),
        (name = "Attendance Admin", description = "Staff attendance management"),
        (name = "Shift", description = "Shift lookup and administration"),
        (name = "Gym", description = "Gym registry"),
        (name = "Location", description = "States, countries and pincodes"),
        (name = "User", description = "User profiles"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
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
