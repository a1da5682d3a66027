//! In-process store used by the test suite and for local experiments.
//!
//! Mirrors the MySQL store's guarantees: the (user, shift, date) triple is
//! unique, guarded transitions are checked under one lock, and batch writes
//! are all-or-nothing. Failures can be injected to exercise rollback paths.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::attendance::store::{
    AttendanceLedger, DefaultTimeout, DirectWriteLedger, MemberDirectory, ShiftStore,
};
use crate::error::{AppError, Result, StateError};
use crate::model::attendance::{
    AttendanceFilter, AttendancePatch, AttendanceRecord, AttendanceStatus, NewAttendance,
};
use crate::model::shift::{NewShift, Shift, ShiftPatch};

#[derive(Debug, Clone, Copy)]
struct Member {
    active: bool,
    verified: bool,
}

#[derive(Debug, Clone, Default)]
struct State {
    shifts: BTreeMap<u64, Shift>,
    records: BTreeMap<u64, AttendanceRecord>,
    members: BTreeMap<u64, Member>,
    next_shift_id: u64,
    next_record_id: u64,
}

impl State {
    fn find(&self, user_id: u64, shift_id: u64, date: NaiveDate) -> Option<&AttendanceRecord> {
        self.records.values().find(|r| {
            r.user_id == user_id && r.shift_id == shift_id && r.attendance_date == date
        })
    }

    fn insert(&mut self, record: &NewAttendance, at: DateTime<FixedOffset>) -> Result<AttendanceRecord> {
        if self
            .find(record.user_id, record.shift_id, record.attendance_date)
            .is_some()
        {
            return Err(AppError::Conflict(
                "Attendance already exists for this user, shift and date".into(),
            ));
        }
        self.next_record_id += 1;
        let created = AttendanceRecord {
            id: self.next_record_id,
            user_id: record.user_id,
            shift_id: record.shift_id,
            attendance_date: record.attendance_date,
            time_in: record.time_in,
            time_out: record.time_out,
            status: record.status,
            timeout_default: record.timeout_default,
            created_at: at,
            updated_at: at,
        };
        self.records.insert(created.id, created.clone());
        Ok(created)
    }

    fn record_mut(&mut self, id: u64) -> Result<&mut AttendanceRecord> {
        self.records
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Attendance record not found".into()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
    fail_batch_after: Mutex<Option<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user for the absence sweep.
    pub fn add_member(&self, user_id: u64, active: bool, verified: bool) {
        self.lock_state()
            .members
            .insert(user_id, Member { active, verified });
    }

    /// While set, every call fails as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes the next batch write fail after `n` items have been applied.
    /// Nothing from that batch is kept.
    pub fn fail_next_batch_after(&self, n: usize) {
        *self
            .fail_batch_after
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(n);
    }

    /// Every record, ordered by id.
    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.lock_state().records.values().cloned().collect()
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("memory store marked unavailable".into()));
        }
        Ok(self.lock_state())
    }

    fn take_batch_failure(&self) -> Option<usize> {
        self.fail_batch_after
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    /// Applies `step` to each item on a copy of the state and swaps it in
    /// only when every step succeeded.
    fn batch<T>(
        &self,
        items: &[T],
        mut step: impl FnMut(&mut State, &T) -> Result<u64>,
    ) -> Result<u64> {
        let fail_after = self.take_batch_failure();
        let mut guard = self.state()?;
        let mut staged = (*guard).clone();
        let mut changed = 0;
        for (i, item) in items.iter().enumerate() {
            if fail_after == Some(i) {
                return Err(AppError::Upstream("injected batch failure".into()));
            }
            changed += step(&mut staged, item)?;
        }
        *guard = staged;
        Ok(changed)
    }
}

#[async_trait]
impl ShiftStore for MemoryStore {
    async fn list_shifts(&self) -> Result<Vec<Shift>> {
        Ok(self.state()?.shifts.values().cloned().collect())
    }

    async fn get_shift(&self, id: u64) -> Result<Option<Shift>> {
        Ok(self.state()?.shifts.get(&id).cloned())
    }

    async fn insert_shift(&self, shift: &NewShift) -> Result<Shift> {
        let mut state = self.state()?;
        state.next_shift_id += 1;
        let created = Shift {
            id: state.next_shift_id,
            name: shift.name.clone(),
            start_time: shift.start_time,
            end_time: shift.end_time,
            is_active: shift.is_active,
            description: shift.description.clone(),
        };
        state.shifts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_shift(&self, id: u64, patch: &ShiftPatch) -> Result<Option<Shift>> {
        let mut state = self.state()?;
        let Some(shift) = state.shifts.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            shift.name = name.clone();
        }
        if let Some(active) = patch.is_active {
            shift.is_active = active;
        }
        if let Some(description) = &patch.description {
            shift.description = Some(description.clone());
        }
        Ok(Some(shift.clone()))
    }
}

#[async_trait]
impl AttendanceLedger for MemoryStore {
    async fn find(
        &self,
        user_id: u64,
        shift_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>> {
        Ok(self.state()?.find(user_id, shift_id, date).cloned())
    }

    async fn get(&self, id: u64) -> Result<Option<AttendanceRecord>> {
        Ok(self.state()?.records.get(&id).cloned())
    }

    async fn create(
        &self,
        record: &NewAttendance,
        at: DateTime<FixedOffset>,
    ) -> Result<AttendanceRecord> {
        self.state()?.insert(record, at)
    }

    async fn set_time_in(
        &self,
        id: u64,
        instant: DateTime<FixedOffset>,
    ) -> Result<AttendanceRecord> {
        let mut state = self.state()?;
        let record = state.record_mut(id)?;
        if record.time_in.is_some() {
            return Err(StateError::AlreadyTimedIn.into());
        }
        record.time_in = Some(instant);
        record.status = AttendanceStatus::Present;
        record.updated_at = instant;
        Ok(record.clone())
    }

    async fn set_time_out(
        &self,
        id: u64,
        instant: DateTime<FixedOffset>,
        at: DateTime<FixedOffset>,
    ) -> Result<AttendanceRecord> {
        let mut state = self.state()?;
        let record = state.record_mut(id)?;
        if record.time_in.is_none() {
            return Err(StateError::TimeInMissing.into());
        }
        if record.time_out.is_some() {
            return Err(StateError::AlreadyCompleted.into());
        }
        record.time_out = Some(instant);
        record.updated_at = at;
        Ok(record.clone())
    }

    async fn correct_time_out(
        &self,
        id: u64,
        instant: DateTime<FixedOffset>,
        at: DateTime<FixedOffset>,
    ) -> Result<AttendanceRecord> {
        let mut state = self.state()?;
        let record = state.record_mut(id)?;
        if record.time_in.is_none() {
            return Err(StateError::TimeInMissing.into());
        }
        record.time_out = Some(instant);
        record.timeout_default = false;
        record.updated_at = at;
        Ok(record.clone())
    }

    async fn query(&self, filter: &AttendanceFilter) -> Result<Vec<AttendanceRecord>> {
        let mut records: Vec<AttendanceRecord> = self
            .state()?
            .records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.attendance_date
                .cmp(&a.attendance_date)
                .then(a.shift_id.cmp(&b.shift_id))
                .then(a.id.cmp(&b.id))
        });
        Ok(records)
    }
}

#[async_trait]
impl DirectWriteLedger for MemoryStore {
    async fn apply_patch(
        &self,
        id: u64,
        patch: &AttendancePatch,
        at: DateTime<FixedOffset>,
    ) -> Result<Option<AttendanceRecord>> {
        let mut state = self.state()?;
        let Some(record) = state.records.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(time_in) = patch.time_in {
            record.time_in = Some(time_in);
        }
        if let Some(time_out) = patch.time_out {
            record.time_out = Some(time_out);
        }
        if let Some(status) = patch.status {
            record.status = status;
        }
        record.updated_at = at;
        Ok(Some(record.clone()))
    }

    async fn insert_absence_markers(
        &self,
        date: NaiveDate,
        pairs: &[(u64, u64)],
        at: DateTime<FixedOffset>,
    ) -> Result<u64> {
        self.batch(pairs, |state, &(user_id, shift_id)| {
            if state.find(user_id, shift_id, date).is_some() {
                return Ok(0);
            }
            state.insert(&NewAttendance::absence(user_id, shift_id, date), at)?;
            Ok(1)
        })
    }

    async fn apply_default_timeouts(
        &self,
        updates: &[DefaultTimeout],
        at: DateTime<FixedOffset>,
    ) -> Result<u64> {
        self.batch(updates, |state, update| {
            let Some(record) = state.records.get_mut(&update.record_id) else {
                return Ok(0);
            };
            if record.time_in.is_none() || record.time_out.is_some() || record.timeout_default {
                return Ok(0);
            }
            record.time_out = Some(update.time_out);
            record.timeout_default = true;
            record.updated_at = at;
            Ok(1)
        })
    }
}

#[async_trait]
impl MemberDirectory for MemoryStore {
    async fn active_verified_user_ids(&self) -> Result<Vec<u64>> {
        Ok(self
            .state()?
            .members
            .iter()
            .filter(|(_, m)| m.active && m.verified)
            .map(|(id, _)| *id)
            .collect())
    }
}
