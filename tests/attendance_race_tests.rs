//! Time-in against a ledger that loses the race to a competing writer.

mod common;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use common::{MORNING, at, day};
use gym_attendance::attendance::{
    AttendanceLedger, AttendanceService, AttendanceStore, DefaultTimeout, DirectWriteLedger,
    MemberDirectory, ShiftStore,
};
use gym_attendance::clock::ManualClock;
use gym_attendance::db::{MemoryStore, seed_default_shifts};
use gym_attendance::error::Result;
use gym_attendance::model::attendance::{
    AttendanceFilter, AttendancePatch, AttendanceRecord, AttendanceStatus, NewAttendance,
};
use gym_attendance::model::shift::{NewShift, Shift, ShiftPatch};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Instant at which the competing request timed in.
fn rival_time_in() -> DateTime<FixedOffset> {
    at(8, 55)
}

/// Delegates to a memory store. When armed, the next `create` or
/// `set_time_in` lets a competing time-in land first.
struct CompetingLedger {
    inner: Arc<MemoryStore>,
    race_create: AtomicBool,
    race_time_in: AtomicBool,
}

impl CompetingLedger {
    fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            race_create: AtomicBool::new(false),
            race_time_in: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ShiftStore for CompetingLedger {
    async fn list_shifts(&self) -> Result<Vec<Shift>> {
        self.inner.list_shifts().await
    }

    async fn get_shift(&self, id: u64) -> Result<Option<Shift>> {
        self.inner.get_shift(id).await
    }

    async fn insert_shift(&self, shift: &NewShift) -> Result<Shift> {
        self.inner.insert_shift(shift).await
    }

    async fn update_shift(&self, id: u64, patch: &ShiftPatch) -> Result<Option<Shift>> {
        self.inner.update_shift(id, patch).await
    }
}

#[async_trait]
impl AttendanceLedger for CompetingLedger {
    async fn find(
        &self,
        user_id: u64,
        shift_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>> {
        self.inner.find(user_id, shift_id, date).await
    }

    async fn get(&self, id: u64) -> Result<Option<AttendanceRecord>> {
        self.inner.get(id).await
    }

    async fn create(
        &self,
        record: &NewAttendance,
        at: DateTime<FixedOffset>,
    ) -> Result<AttendanceRecord> {
        if self.race_create.swap(false, Ordering::SeqCst) {
            let rival = NewAttendance {
                time_in: Some(rival_time_in()),
                status: AttendanceStatus::Present,
                ..NewAttendance::absence(record.user_id, record.shift_id, record.attendance_date)
            };
            self.inner.create(&rival, rival_time_in()).await?;
        }
        self.inner.create(record, at).await
    }

    async fn set_time_in(
        &self,
        id: u64,
        instant: DateTime<FixedOffset>,
    ) -> Result<AttendanceRecord> {
        if self.race_time_in.swap(false, Ordering::SeqCst) {
            self.inner.set_time_in(id, rival_time_in()).await?;
        }
        self.inner.set_time_in(id, instant).await
    }

    async fn set_time_out(
        &self,
        id: u64,
        instant: DateTime<FixedOffset>,
        at: DateTime<FixedOffset>,
    ) -> Result<AttendanceRecord> {
        self.inner.set_time_out(id, instant, at).await
    }

    async fn correct_time_out(
        &self,
        id: u64,
        instant: DateTime<FixedOffset>,
        at: DateTime<FixedOffset>,
    ) -> Result<AttendanceRecord> {
        self.inner.correct_time_out(id, instant, at).await
    }

    async fn query(&self, filter: &AttendanceFilter) -> Result<Vec<AttendanceRecord>> {
        self.inner.query(filter).await
    }
}

#[async_trait]
impl DirectWriteLedger for CompetingLedger {
    async fn apply_patch(
        &self,
        id: u64,
        patch: &AttendancePatch,
        at: DateTime<FixedOffset>,
    ) -> Result<Option<AttendanceRecord>> {
        self.inner.apply_patch(id, patch, at).await
    }

    async fn insert_absence_markers(
        &self,
        date: NaiveDate,
        pairs: &[(u64, u64)],
        at: DateTime<FixedOffset>,
    ) -> Result<u64> {
        self.inner.insert_absence_markers(date, pairs, at).await
    }

    async fn apply_default_timeouts(
        &self,
        updates: &[DefaultTimeout],
        at: DateTime<FixedOffset>,
    ) -> Result<u64> {
        self.inner.apply_default_timeouts(updates, at).await
    }
}

#[async_trait]
impl MemberDirectory for CompetingLedger {
    async fn active_verified_user_ids(&self) -> Result<Vec<u64>> {
        self.inner.active_verified_user_ids().await
    }
}

async fn service_over(ledger: Arc<CompetingLedger>) -> AttendanceService {
    seed_default_shifts(ledger.inner.as_ref()).await.unwrap();
    let store: Arc<dyn AttendanceStore> = ledger;
    AttendanceService::new(store, Arc::new(ManualClock::new(at(9, 0))))
}

#[actix_web::test]
async fn lost_insert_race_reports_the_winning_record() {
    let memory = Arc::new(MemoryStore::new());
    let ledger = Arc::new(CompetingLedger::new(memory.clone()));
    let service = service_over(ledger.clone()).await;
    ledger.race_create.store(true, Ordering::SeqCst);

    let outcome = service.record_time_in(7, MORNING, None).await.unwrap();

    assert!(outcome.already_recorded);
    assert_eq!(outcome.record.time_in, Some(rival_time_in()));
    let records = memory.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].time_in, Some(rival_time_in()));
}

#[actix_web::test]
async fn lost_promotion_race_reports_the_winning_time_in() {
    let memory = Arc::new(MemoryStore::new());
    let ledger = Arc::new(CompetingLedger::new(memory.clone()));
    let service = service_over(ledger.clone()).await;
    let seeded = memory
        .create(&NewAttendance::absence(7, MORNING, day(10)), at(3, 0))
        .await
        .unwrap();
    ledger.race_time_in.store(true, Ordering::SeqCst);

    let outcome = service.record_time_in(7, MORNING, None).await.unwrap();

    assert!(outcome.already_recorded);
    assert_eq!(outcome.record.id, seeded.id);
    assert_eq!(outcome.record.status, AttendanceStatus::Present);
    assert_eq!(outcome.record.time_in, Some(rival_time_in()));
    assert_eq!(memory.records().len(), 1);
}

#[actix_web::test]
async fn concurrent_time_ins_record_exactly_once() {
    let memory = Arc::new(MemoryStore::new());
    let ledger = Arc::new(CompetingLedger::new(memory.clone()));
    let service = service_over(ledger).await;

    let attempts = (0..10).map(|_| service.record_time_in(7, MORNING, None));
    let outcomes = futures::future::join_all(attempts).await;

    let outcomes: Vec<_> = outcomes.into_iter().map(|o| o.unwrap()).collect();
    assert_eq!(outcomes.iter().filter(|o| !o.already_recorded).count(), 1);
    assert_eq!(memory.records().len(), 1);
    let id = memory.records()[0].id;
    assert!(outcomes.iter().all(|o| o.record.id == id));
}
