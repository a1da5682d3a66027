//! Storage seams for the attendance core.
//!
//! The ledger has two entry points with different trust levels:
//! [`AttendanceLedger`] checks every transition it performs and is what the
//! self-service endpoints use; [`DirectWriteLedger`] writes whatever it is
//! given and is reserved for administrators and the reconciliation jobs.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::error::Result;
use crate::model::attendance::{AttendanceFilter, AttendancePatch, AttendanceRecord, NewAttendance};
use crate::model::shift::{NewShift, Shift, ShiftPatch};

#[async_trait]
pub trait ShiftStore: Send + Sync {
    /// Every shift, active or not, ordered by id.
    async fn list_shifts(&self) -> Result<Vec<Shift>>;

    async fn get_shift(&self, id: u64) -> Result<Option<Shift>>;

    async fn insert_shift(&self, shift: &NewShift) -> Result<Shift>;

    async fn update_shift(&self, id: u64, patch: &ShiftPatch) -> Result<Option<Shift>>;
}

#[async_trait]
pub trait AttendanceLedger: Send + Sync {
    async fn find(
        &self,
        user_id: u64,
        shift_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>>;

    async fn get(&self, id: u64) -> Result<Option<AttendanceRecord>>;

    /// Fails with `Conflict` when the (user, shift, date) triple already exists.
    async fn create(
        &self,
        record: &NewAttendance,
        at: DateTime<FixedOffset>,
    ) -> Result<AttendanceRecord>;

    /// Sets `time_in` and `status = Present`. Fails with
    /// `StateError::AlreadyTimedIn` when `time_in` is already set.
    async fn set_time_in(&self, id: u64, instant: DateTime<FixedOffset>)
    -> Result<AttendanceRecord>;

    /// Sets `time_out`. Fails with `StateError::TimeInMissing` or
    /// `StateError::AlreadyCompleted` when the record is not timed in.
    async fn set_time_out(
        &self,
        id: u64,
        instant: DateTime<FixedOffset>,
        at: DateTime<FixedOffset>,
    ) -> Result<AttendanceRecord>;

    /// Replaces `time_out` on a timed-in record and clears the
    /// system-assigned flag.
    async fn correct_time_out(
        &self,
        id: u64,
        instant: DateTime<FixedOffset>,
        at: DateTime<FixedOffset>,
    ) -> Result<AttendanceRecord>;

    /// Newest date first; ties ordered by shift then id.
    async fn query(&self, filter: &AttendanceFilter) -> Result<Vec<AttendanceRecord>>;
}

/// A system-assigned time-out computed by the reconciliation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultTimeout {
    pub record_id: u64,
    pub time_out: DateTime<FixedOffset>,
}

#[async_trait]
pub trait DirectWriteLedger: Send + Sync {
    /// Applies only the supplied fields, with no transition guard.
    /// `None` when the record does not exist.
    async fn apply_patch(
        &self,
        id: u64,
        patch: &AttendancePatch,
        at: DateTime<FixedOffset>,
    ) -> Result<Option<AttendanceRecord>>;

    /// Inserts `Absent` markers for each (user, shift) pair in one
    /// transaction. Pairs that already have a row are skipped silently.
    /// Returns the number of rows inserted.
    async fn insert_absence_markers(
        &self,
        date: NaiveDate,
        pairs: &[(u64, u64)],
        at: DateTime<FixedOffset>,
    ) -> Result<u64>;

    /// Applies every default time-out in one transaction. Each write only
    /// lands if the record still has no `time_out` and is not flagged.
    /// Returns the number of records changed.
    async fn apply_default_timeouts(
        &self,
        updates: &[DefaultTimeout],
        at: DateTime<FixedOffset>,
    ) -> Result<u64>;
}

#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Ids of users that are both active and verified, ascending.
    async fn active_verified_user_ids(&self) -> Result<Vec<u64>>;
}

/// Everything the attendance core needs from storage.
pub trait AttendanceStore:
    ShiftStore + AttendanceLedger + DirectWriteLedger + MemberDirectory
{
}

impl<T> AttendanceStore for T where
    T: ShiftStore + AttendanceLedger + DirectWriteLedger + MemberDirectory
{
}
