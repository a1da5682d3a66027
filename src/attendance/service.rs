use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::shift_directory::ShiftDirectory;
use super::stats::{self, MonthlyStats};
use super::store::AttendanceStore;
use crate::clock::Clock;
use crate::error::{AppError, Result, StateError};
use crate::model::attendance::{
    AttendanceFilter, AttendancePatch, AttendanceRecord, AttendanceStatus, ClientTimestamp,
    NewAttendance, RecordState,
};
use crate::model::role::Principal;
use crate::model::shift::{NewShift, Shift, ShiftPatch};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TimeInOutcome {
    pub message: String,
    pub record: AttendanceRecord,
    /// True when the record was already timed in and is returned unchanged.
    pub already_recorded: bool,
}

impl TimeInOutcome {
    fn recorded(record: AttendanceRecord) -> Self {
        Self {
            message: "Time-in recorded successfully".into(),
            record,
            already_recorded: false,
        }
    }

    fn already(record: AttendanceRecord) -> Self {
        Self {
            message: StateError::AlreadyTimedIn.to_string(),
            record,
            already_recorded: true,
        }
    }
}

/// Both self-service time-out paths refuse a time-out earlier than the
/// time-in. Staff writes through `admin_update` are not checked.
fn ensure_ordered(time_in: DateTime<FixedOffset>, time_out: DateTime<FixedOffset>) -> Result<()> {
    if time_out < time_in {
        return Err(AppError::Validation("time_out cannot be before time_in".into()));
    }
    Ok(())
}

/// Self-service and administrative attendance operations.
#[derive(Clone)]
pub struct AttendanceService {
    store: Arc<dyn AttendanceStore>,
    shifts: ShiftDirectory<dyn AttendanceStore>,
    clock: Arc<dyn Clock>,
}

impl AttendanceService {
    pub fn new(store: Arc<dyn AttendanceStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            shifts: ShiftDirectory::new(Arc::clone(&store)),
            store,
            clock,
        }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn shift_directory(&self) -> &ShiftDirectory<dyn AttendanceStore> {
        &self.shifts
    }

    /// Opens (or confirms) the user's attendance for a shift.
    ///
    /// Idempotent: a record that is already timed in comes back unchanged
    /// with `already_recorded` set. A seeded row without a time-in is
    /// promoted to `Present`.
    pub async fn record_time_in(
        &self,
        user_id: u64,
        shift_id: u64,
        date: Option<NaiveDate>,
    ) -> Result<TimeInOutcome> {
        let date = date.unwrap_or_else(|| self.clock.today());
        let shift = self
            .shifts
            .active_by_id(shift_id)
            .await?
            .ok_or(AppError::InvalidShift)?;
        let now = self.clock.now();

        if let Some(existing) = self.store.find(user_id, shift.id, date).await? {
            return self.time_in_existing(existing, now).await;
        }

        let record = NewAttendance {
            user_id,
            shift_id: shift.id,
            attendance_date: date,
            time_in: Some(now),
            time_out: None,
            status: AttendanceStatus::Present,
            timeout_default: false,
        };
        match self.store.create(&record, now).await {
            Ok(created) => {
                tracing::info!(user_id, shift_id, %date, "Time-in recorded");
                Ok(TimeInOutcome::recorded(created))
            }
            // another request or the absence sweep inserted the row first
            Err(AppError::Conflict(_)) => {
                let existing = self
                    .store
                    .find(user_id, shift.id, date)
                    .await?
                    .ok_or_else(|| AppError::Conflict("Attendance record changed concurrently".into()))?;
                self.time_in_existing(existing, now).await
            }
            Err(e) => Err(e),
        }
    }

    async fn time_in_existing(
        &self,
        existing: AttendanceRecord,
        now: DateTime<FixedOffset>,
    ) -> Result<TimeInOutcome> {
        if existing.time_in.is_some() {
            return Ok(TimeInOutcome::already(existing));
        }
        match self.store.set_time_in(existing.id, now).await {
            Ok(record) => {
                tracing::info!(
                    user_id = record.user_id,
                    shift_id = record.shift_id,
                    record_id = record.id,
                    "Time-in recorded on seeded record"
                );
                Ok(TimeInOutcome::recorded(record))
            }
            Err(AppError::State(StateError::AlreadyTimedIn)) => {
                let record = self
                    .store
                    .get(existing.id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Attendance record not found".into()))?;
                Ok(TimeInOutcome::already(record))
            }
            Err(e) => Err(e),
        }
    }

    /// Closes today's record for the shift covering `time_out` (or now).
    pub async fn record_time_out(
        &self,
        user_id: u64,
        time_out: Option<ClientTimestamp>,
    ) -> Result<AttendanceRecord> {
        let now = self.clock.now();
        let time_out = match time_out {
            Some(t) => t.resolve(self.clock.as_ref())?,
            None => now,
        };

        let shift = self
            .shifts
            .resolve_active_shift_covering(time_out.time())
            .await?
            .ok_or(AppError::NoActiveShift)?;
        let today = self.clock.today();

        let record = self
            .store
            .find(user_id, shift.id, today)
            .await?
            .ok_or_else(|| AppError::NotFound("No attendance record found for time-out".into()))?;

        match record.state() {
            RecordState::NotTimedIn => Err(StateError::TimeInMissing.into()),
            RecordState::Completed => Err(StateError::AlreadyCompleted.into()),
            RecordState::TimedIn => {
                if let Some(time_in) = record.time_in {
                    ensure_ordered(time_in, time_out)?;
                }
                let record = self.store.set_time_out(record.id, time_out, now).await?;
                tracing::info!(user_id, shift_id = shift.id, record_id = record.id, "Time-out recorded");
                Ok(record)
            }
        }
    }

    /// Self-service correction of a time-out on one of the caller's own
    /// records. Without a value the record is returned unchanged.
    pub async fn correct_time_out(
        &self,
        user_id: u64,
        record_id: u64,
        time_out: Option<ClientTimestamp>,
    ) -> Result<AttendanceRecord> {
        let record = self
            .store
            .get(record_id)
            .await?
            .filter(|r| r.user_id == user_id)
            .ok_or_else(|| AppError::NotFound("Attendance record not found".into()))?;

        let Some(time_out) = time_out else {
            return Ok(record);
        };
        let time_out = time_out.resolve(self.clock.as_ref())?;
        let time_in = record.time_in.ok_or(StateError::TimeInMissing)?;
        ensure_ordered(time_in, time_out)?;

        let updated = self
            .store
            .correct_time_out(record.id, time_out, self.clock.now())
            .await?;
        tracing::info!(user_id, record_id, "Time-out corrected");
        Ok(updated)
    }

    pub async fn today(&self, user_id: u64) -> Result<Vec<AttendanceRecord>> {
        let filter = AttendanceFilter::for_user(user_id).on(self.clock.today());
        self.store.query(&filter).await
    }

    /// Records for a user, newest first. Both bounds are inclusive.
    pub async fn history(
        &self,
        user_id: u64,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceRecord>> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(AppError::Validation("start_date cannot be after end_date".into()));
            }
        }
        let filter = AttendanceFilter {
            from: start,
            to: end,
            ..AttendanceFilter::for_user(user_id)
        };
        self.store.query(&filter).await
    }

    /// Defaults to the current civil month.
    pub async fn monthly_stats(
        &self,
        user_id: u64,
        year: Option<i32>,
        month: Option<u32>,
    ) -> Result<MonthlyStats> {
        let today = self.clock.today();
        let year = year.unwrap_or(today.year());
        let month = month.unwrap_or(today.month());
        let (first, last) = stats::month_bounds(year, month)?;

        let filter = AttendanceFilter {
            from: Some(first),
            to: Some(last),
            ..AttendanceFilter::for_user(user_id)
        };
        let records = self.store.query(&filter).await?;
        stats::monthly_stats(year, month, &records)
    }

    pub async fn list_shifts(&self) -> Result<Vec<Shift>> {
        self.shifts.list_active_shifts().await
    }

    pub async fn current_shift(&self) -> Result<Shift> {
        self.shifts
            .resolve_active_shift_covering(self.clock.time_of_day())
            .await?
            .ok_or(AppError::NoActiveShift)
    }

    pub async fn create_shift(&self, caller: &Principal, shift: &NewShift) -> Result<Shift> {
        caller.require_staff("manage shifts")?;
        self.shifts.create(shift).await
    }

    pub async fn update_shift(&self, caller: &Principal, id: u64, patch: &ShiftPatch) -> Result<Shift> {
        caller.require_staff("manage shifts")?;
        self.shifts.update(id, patch).await
    }

    /// Creates a record in whatever state the caller asks for.
    pub async fn admin_create(
        &self,
        caller: &Principal,
        record: &NewAttendance,
    ) -> Result<AttendanceRecord> {
        caller.require_staff("create attendance records")?;
        if !self.shifts.exists(record.shift_id).await? {
            return Err(AppError::NotFound("Shift not found".into()));
        }
        let created = self.store.create(record, self.clock.now()).await?;
        tracing::info!(
            actor = caller.user_id,
            user_id = record.user_id,
            record_id = created.id,
            "Attendance record created by staff"
        );
        Ok(created)
    }

    /// Applies the supplied fields with no transition guard. An empty patch
    /// returns the record unchanged.
    pub async fn admin_update(
        &self,
        caller: &Principal,
        record_id: u64,
        patch: &AttendancePatch,
    ) -> Result<AttendanceRecord> {
        caller.require_staff("update attendance records")?;
        if patch.is_empty() {
            return self.admin_get(caller, record_id).await;
        }
        let updated = self
            .store
            .apply_patch(record_id, patch, self.clock.now())
            .await?
            .ok_or_else(|| AppError::NotFound("Attendance record not found".into()))?;
        tracing::info!(actor = caller.user_id, record_id, "Attendance record updated by staff");
        Ok(updated)
    }

    pub async fn admin_get(&self, caller: &Principal, record_id: u64) -> Result<AttendanceRecord> {
        caller.require_staff("view attendance records")?;
        self.store
            .get(record_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Attendance record not found".into()))
    }

    pub async fn admin_list(
        &self,
        caller: &Principal,
        filter: &AttendanceFilter,
    ) -> Result<Vec<AttendanceRecord>> {
        caller.require_staff("view attendance records")?;
        self.store.query(filter).await
    }
}
