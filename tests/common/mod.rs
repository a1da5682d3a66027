use actix_web::web;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use gym_attendance::attendance::{AttendanceService, AttendanceStore, ReconciliationJobs};
use gym_attendance::auth::jwt::generate_access_token;
use gym_attendance::clock::ManualClock;
use gym_attendance::config::Config;
use gym_attendance::db::{MemoryStore, seed_default_shifts};
use gym_attendance::model::role::Roles;
use gym_attendance::routes::{attendance_scope, shift_scope};
use std::sync::Arc;

/// Seeded Morning shift id (03:00:00 - 12:59:59).
#[allow(dead_code)]
pub const MORNING: u64 = 1;
/// Seeded Evening shift id (13:00:00 - 23:59:59).
#[allow(dead_code)]
pub const EVENING: u64 = 2;

pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(330 * 60).expect("valid offset")
}

/// A civil instant on 2025-03-10.
#[allow(dead_code)]
pub fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
    ist().with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
}

#[allow(dead_code)]
pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

/// Service, jobs and their shared fakes.
#[allow(dead_code)]
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub service: AttendanceService,
    #[allow(dead_code)]
    pub jobs: ReconciliationJobs,
    pub config: Config,
}

/// Memory store with the default shifts, clock pinned at `now`.
#[allow(dead_code)]
pub async fn harness(now: DateTime<FixedOffset>) -> Harness {
    let config = Config::test_default();
    let store = Arc::new(MemoryStore::new());
    seed_default_shifts(store.as_ref()).await.unwrap();
    let clock = Arc::new(ManualClock::new(now));

    let dyn_store: Arc<dyn AttendanceStore> = store.clone();
    let service = AttendanceService::new(dyn_store.clone(), clock.clone());
    let jobs = ReconciliationJobs::new(dyn_store, clock.clone(), config.default_timeout_grace());

    Harness {
        store,
        clock,
        service,
        jobs,
        config,
    }
}

#[allow(dead_code)]
pub fn bearer(config: &Config, user_id: u64, roles: Roles) -> (&'static str, String) {
    let token = generate_access_token(
        user_id,
        format!("user{user_id}@example.com"),
        roles,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .unwrap();
    ("Authorization", format!("Bearer {token}"))
}

/// App with the attendance and shift routes over the harness's store.
/// Rate limiters are left out since test requests carry no peer address.
#[macro_export]
macro_rules! test_app {
    ($h:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($h.config.clone()))
                .app_data(actix_web::web::Data::new($h.service.clone()))
                .configure($crate::common::configure_api),
        )
        .await
    };
}

#[allow(dead_code)]
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(attendance_scope())
            .service(shift_scope()),
    );
}
