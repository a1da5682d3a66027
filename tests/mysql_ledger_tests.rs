//! Runs against a real MySQL when `TEST_DATABASE_URL` is set; skipped otherwise.

mod common;

use common::{at, day, ist};
use gym_attendance::attendance::{AttendanceLedger, DirectWriteLedger, DefaultTimeout, ShiftStore};
use gym_attendance::db::{MySqlStore, init_db, seed_default_shifts};
use gym_attendance::error::{AppError, StateError};
use gym_attendance::model::attendance::{AttendanceFilter, AttendanceStatus, NewAttendance};

async fn store() -> Option<(MySqlStore, u64, u64)> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return None;
    };
    let pool = init_db(&url).await.unwrap();
    let store = MySqlStore::new(pool.clone(), ist());
    seed_default_shifts(&store).await.unwrap();
    let shift_id = store.list_shifts().await.unwrap()[0].id;

    let code = uuid::Uuid::new_v4().to_simple().to_string()[..8].to_uppercase();
    let gym_id = sqlx::query("INSERT INTO gym (gym_code, gym_name) VALUES (?, 'Test gym')")
        .bind(&code)
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_id();
    let user_id = sqlx::query(
        "INSERT INTO users (gym_id, email, password, full_name, pincode, is_verified) \
         VALUES (?, ?, 'x', 'Ledger Test', '110001', TRUE)",
    )
    .bind(gym_id)
    .bind(format!("ledger-{code}@example.com"))
    .execute(&pool)
    .await
    .unwrap()
    .last_insert_id();

    Some((store, user_id, shift_id))
}

#[actix_web::test]
async fn triple_is_unique_and_transitions_are_guarded() {
    let Some((store, user_id, shift_id)) = store().await else {
        return;
    };
    let seeded = store
        .create(&NewAttendance::absence(user_id, shift_id, day(10)), at(3, 0))
        .await
        .unwrap();
    assert_eq!(seeded.status, AttendanceStatus::Absent);

    let err = store
        .create(&NewAttendance::absence(user_id, shift_id, day(10)), at(3, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = store.set_time_out(seeded.id, at(10, 0), at(10, 0)).await.unwrap_err();
    assert!(matches!(err, AppError::State(StateError::TimeInMissing)));

    let opened = store.set_time_in(seeded.id, at(9, 0)).await.unwrap();
    assert_eq!(opened.status, AttendanceStatus::Present);
    assert_eq!(opened.time_in, Some(at(9, 0)));

    let err = store.set_time_in(seeded.id, at(9, 30)).await.unwrap_err();
    assert!(matches!(err, AppError::State(StateError::AlreadyTimedIn)));

    let closed = store.set_time_out(seeded.id, at(11, 0), at(11, 0)).await.unwrap();
    assert_eq!(closed.time_out, Some(at(11, 0)));
    let err = store.set_time_out(seeded.id, at(12, 0), at(12, 0)).await.unwrap_err();
    assert!(matches!(err, AppError::State(StateError::AlreadyCompleted)));
}

#[actix_web::test]
async fn batch_writes_skip_existing_rows() {
    let Some((store, user_id, shift_id)) = store().await else {
        return;
    };
    let pairs = [(user_id, shift_id)];
    assert_eq!(store.insert_absence_markers(day(11), &pairs, at(3, 0)).await.unwrap(), 1);
    assert_eq!(store.insert_absence_markers(day(11), &pairs, at(3, 0)).await.unwrap(), 0);

    let filter = AttendanceFilter {
        user_id: Some(user_id),
        ..AttendanceFilter::default()
    }
    .on(day(11));
    let record = store.query(&filter).await.unwrap().remove(0);

    // not timed in, so the default time-out must not apply
    let update = DefaultTimeout {
        record_id: record.id,
        time_out: at(12, 0),
    };
    assert_eq!(store.apply_default_timeouts(&[update], at(12, 0)).await.unwrap(), 0);
}

#[actix_web::test]
async fn unknown_user_is_not_found() {
    let Some((store, _, shift_id)) = store().await else {
        return;
    };
    let err = store
        .create(&NewAttendance::absence(u64::MAX, shift_id, day(10)), at(3, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[actix_web::test]
async fn batch_leaves_present_rows_untouched() {
    let Some((store, user_id, shift_id)) = store().await else {
        return;
    };
    let present = store
        .create(
            &NewAttendance {
                time_in: Some(at(9, 0)),
                status: AttendanceStatus::Present,
                ..NewAttendance::absence(user_id, shift_id, day(12))
            },
            at(9, 0),
        )
        .await
        .unwrap();

    let pairs = [(user_id, shift_id)];
    assert_eq!(store.insert_absence_markers(day(12), &pairs, at(10, 0)).await.unwrap(), 0);

    let after = store.get(present.id).await.unwrap().unwrap();
    assert_eq!(after.status, AttendanceStatus::Present);
    assert_eq!(after.time_in, Some(at(9, 0)));
    assert_eq!(after.updated_at, present.updated_at);
}
