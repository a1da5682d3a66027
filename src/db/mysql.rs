use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use sqlx::{MySql, MySqlPool, Transaction};
use std::str::FromStr;

use crate::attendance::store::{
    AttendanceLedger, DefaultTimeout, DirectWriteLedger, MemberDirectory, ShiftStore,
};
use crate::error::{AppError, Result, StateError};
use crate::model::attendance::{
    AttendanceFilter, AttendancePatch, AttendanceRecord, AttendanceStatus, NewAttendance,
};
use crate::model::shift::{NewShift, Shift, ShiftPatch};

const ATTENDANCE_COLUMNS: &str = "id, user_id, shift_id, attendance_date, time_in, time_out, \
     status, timeout_default, created_at, updated_at";

const SHIFT_COLUMNS: &str = "id, name, start_time, end_time, is_active, description";

/// Attendance row as stored: instants in UTC, status as its one-letter code.
#[derive(sqlx::FromRow)]
struct AttendanceRow {
    id: u64,
    user_id: u64,
    shift_id: u64,
    attendance_date: NaiveDate,
    time_in: Option<DateTime<Utc>>,
    time_out: Option<DateTime<Utc>>,
    status: String,
    timeout_default: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AttendanceRow {
    fn into_record(self, offset: FixedOffset) -> Result<AttendanceRecord> {
        let status = AttendanceStatus::from_str(&self.status).map_err(|_| {
            AppError::Upstream(format!(
                "attendance {} has unknown status {:?}",
                self.id, self.status
            ))
        })?;
        Ok(AttendanceRecord {
            id: self.id,
            user_id: self.user_id,
            shift_id: self.shift_id,
            attendance_date: self.attendance_date,
            time_in: self.time_in.map(|t| t.with_timezone(&offset)),
            time_out: self.time_out.map(|t| t.with_timezone(&offset)),
            status,
            timeout_default: self.timeout_default,
            created_at: self.created_at.with_timezone(&offset),
            updated_at: self.updated_at.with_timezone(&offset),
        })
    }
}

fn utc(instant: DateTime<FixedOffset>) -> DateTime<Utc> {
    instant.with_timezone(&Utc)
}

enum FilterValue {
    Id(u64),
    Date(NaiveDate),
}

/// MySQL-backed implementation of every attendance store trait.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
    offset: FixedOffset,
}

impl MySqlStore {
    /// `offset` is the civil offset records are rendered in.
    pub fn new(pool: MySqlPool, offset: FixedOffset) -> Self {
        Self { pool, offset }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    async fn fetch_record(&self, id: u64) -> Result<Option<AttendanceRecord>> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE id = ?");
        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.into_record(self.offset))
            .transpose()
    }

    async fn fetch_record_tx(
        &self,
        tx: &mut Transaction<'_, MySql>,
        id: u64,
        lock: bool,
    ) -> Result<Option<AttendanceRecord>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE id = ?{}",
            if lock { " FOR UPDATE" } else { "" }
        );
        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .map(|row| row.into_record(self.offset))
            .transpose()
    }

    async fn require_record(&self, id: u64) -> Result<AttendanceRecord> {
        self.fetch_record(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Attendance record not found".into()))
    }
}

#[async_trait]
impl ShiftStore for MySqlStore {
    async fn list_shifts(&self) -> Result<Vec<Shift>> {
        let sql = format!("SELECT {SHIFT_COLUMNS} FROM shift ORDER BY id");
        Ok(sqlx::query_as::<_, Shift>(&sql).fetch_all(&self.pool).await?)
    }

    async fn get_shift(&self, id: u64) -> Result<Option<Shift>> {
        let sql = format!("SELECT {SHIFT_COLUMNS} FROM shift WHERE id = ?");
        Ok(sqlx::query_as::<_, Shift>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_shift(&self, shift: &NewShift) -> Result<Shift> {
        let result = sqlx::query(
            "INSERT INTO shift (name, start_time, end_time, is_active, description) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&shift.name)
        .bind(shift.start_time)
        .bind(shift.end_time)
        .bind(shift.is_active)
        .bind(&shift.description)
        .execute(&self.pool)
        .await?;

        self.get_shift(result.last_insert_id())
            .await?
            .ok_or_else(|| AppError::Upstream("inserted shift could not be read back".into()))
    }

    async fn update_shift(&self, id: u64, patch: &ShiftPatch) -> Result<Option<Shift>> {
        let mut tx = self.pool.begin().await?;
        let exists = sqlx::query_scalar::<_, u64>("SELECT id FROM shift WHERE id = ? FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        sqlx::query(
            "UPDATE shift SET name = COALESCE(?, name), is_active = COALESCE(?, is_active), \
             description = COALESCE(?, description) WHERE id = ?",
        )
        .bind(&patch.name)
        .bind(patch.is_active)
        .bind(&patch.description)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.get_shift(id).await
    }
}

#[async_trait]
impl AttendanceLedger for MySqlStore {
    async fn find(
        &self,
        user_id: u64,
        shift_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance \
             WHERE user_id = ? AND shift_id = ? AND attendance_date = ?"
        );
        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(user_id)
            .bind(shift_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.into_record(self.offset))
            .transpose()
    }

    async fn get(&self, id: u64) -> Result<Option<AttendanceRecord>> {
        self.fetch_record(id).await
    }

    async fn create(
        &self,
        record: &NewAttendance,
        at: DateTime<FixedOffset>,
    ) -> Result<AttendanceRecord> {
        let result = sqlx::query(
            "INSERT INTO attendance \
             (user_id, shift_id, attendance_date, time_in, time_out, status, timeout_default, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.user_id)
        .bind(record.shift_id)
        .bind(record.attendance_date)
        .bind(record.time_in.map(utc))
        .bind(record.time_out.map(utc))
        .bind(record.status.as_ref())
        .bind(record.timeout_default)
        .bind(utc(at))
        .bind(utc(at))
        .execute(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict(
                "Attendance already exists for this user, shift and date".into(),
            ),
            other => other,
        })?;

        self.require_record(result.last_insert_id()).await
    }

    async fn set_time_in(
        &self,
        id: u64,
        instant: DateTime<FixedOffset>,
    ) -> Result<AttendanceRecord> {
        let result = sqlx::query(
            "UPDATE attendance SET time_in = ?, status = ?, updated_at = ? \
             WHERE id = ? AND time_in IS NULL",
        )
        .bind(utc(instant))
        .bind(AttendanceStatus::Present.as_ref())
        .bind(utc(instant))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            self.require_record(id).await?;
            return Err(StateError::AlreadyTimedIn.into());
        }
        self.require_record(id).await
    }

    async fn set_time_out(
        &self,
        id: u64,
        instant: DateTime<FixedOffset>,
        at: DateTime<FixedOffset>,
    ) -> Result<AttendanceRecord> {
        let result = sqlx::query(
            "UPDATE attendance SET time_out = ?, updated_at = ? \
             WHERE id = ? AND time_in IS NOT NULL AND time_out IS NULL",
        )
        .bind(utc(instant))
        .bind(utc(at))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.require_record(id).await?;
            return Err(if current.time_in.is_none() {
                StateError::TimeInMissing
            } else {
                StateError::AlreadyCompleted
            }
            .into());
        }
        self.require_record(id).await
    }

    async fn correct_time_out(
        &self,
        id: u64,
        instant: DateTime<FixedOffset>,
        at: DateTime<FixedOffset>,
    ) -> Result<AttendanceRecord> {
        let result = sqlx::query(
            "UPDATE attendance SET time_out = ?, timeout_default = FALSE, updated_at = ? \
             WHERE id = ? AND time_in IS NOT NULL",
        )
        .bind(utc(instant))
        .bind(utc(at))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            self.require_record(id).await?;
            return Err(StateError::TimeInMissing.into());
        }
        self.require_record(id).await
    }

    async fn query(&self, filter: &AttendanceFilter) -> Result<Vec<AttendanceRecord>> {
        let mut conditions = Vec::new();
        let mut bindings = Vec::new();

        if let Some(user_id) = filter.user_id {
            conditions.push("user_id = ?");
            bindings.push(FilterValue::Id(user_id));
        }
        if let Some(shift_id) = filter.shift_id {
            conditions.push("shift_id = ?");
            bindings.push(FilterValue::Id(shift_id));
        }
        if let Some(from) = filter.from {
            conditions.push("attendance_date >= ?");
            bindings.push(FilterValue::Date(from));
        }
        if let Some(to) = filter.to {
            conditions.push("attendance_date <= ?");
            bindings.push(FilterValue::Date(to));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance {where_clause} \
             ORDER BY attendance_date DESC, shift_id ASC, id ASC"
        );
        tracing::debug!(sql = %sql, ?filter, "Querying attendance");

        let mut query = sqlx::query_as::<_, AttendanceRow>(&sql);
        for value in bindings {
            query = match value {
                FilterValue::Id(id) => query.bind(id),
                FilterValue::Date(date) => query.bind(date),
            };
        }

        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| row.into_record(self.offset))
            .collect()
    }
}

#[async_trait]
impl DirectWriteLedger for MySqlStore {
    async fn apply_patch(
        &self,
        id: u64,
        patch: &AttendancePatch,
        at: DateTime<FixedOffset>,
    ) -> Result<Option<AttendanceRecord>> {
        let mut tx = self.pool.begin().await?;
        if self.fetch_record_tx(&mut tx, id, true).await?.is_none() {
            return Ok(None);
        }

        sqlx::query(
            "UPDATE attendance SET time_in = COALESCE(?, time_in), \
             time_out = COALESCE(?, time_out), status = COALESCE(?, status), updated_at = ? \
             WHERE id = ?",
        )
        .bind(patch.time_in.map(utc))
        .bind(patch.time_out.map(utc))
        .bind(patch.status.map(|s| s.as_ref().to_string()))
        .bind(utc(at))
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let updated = self.fetch_record_tx(&mut tx, id, false).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn insert_absence_markers(
        &self,
        date: NaiveDate,
        pairs: &[(u64, u64)],
        at: DateTime<FixedOffset>,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for &(user_id, shift_id) in pairs {
            // existing triples are skipped; a row committed concurrently
            // surfaces as a unique violation and counts as skipped too
            let result = sqlx::query(
                "INSERT INTO attendance \
                 (user_id, shift_id, attendance_date, status, timeout_default, created_at, updated_at) \
                 SELECT ?, ?, ?, ?, FALSE, ?, ? FROM DUAL \
                 WHERE NOT EXISTS (SELECT 1 FROM attendance \
                 WHERE user_id = ? AND shift_id = ? AND attendance_date = ?)",
            )
            .bind(user_id)
            .bind(shift_id)
            .bind(date)
            .bind(AttendanceStatus::Absent.as_ref())
            .bind(utc(at))
            .bind(utc(at))
            .bind(user_id)
            .bind(shift_id)
            .bind(date)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from);
            inserted += match result {
                Ok(done) => done.rows_affected(),
                Err(AppError::Conflict(_)) => 0,
                Err(e) => return Err(e),
            };
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn apply_default_timeouts(
        &self,
        updates: &[DefaultTimeout],
        at: DateTime<FixedOffset>,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut applied = 0;
        for update in updates {
            let result = sqlx::query(
                "UPDATE attendance SET time_out = ?, timeout_default = TRUE, updated_at = ? \
                 WHERE id = ? AND time_in IS NOT NULL AND time_out IS NULL AND timeout_default = FALSE",
            )
            .bind(utc(update.time_out))
            .bind(utc(at))
            .bind(update.record_id)
            .execute(&mut *tx)
            .await?;
            applied += result.rows_affected();
        }
        tx.commit().await?;
        Ok(applied)
    }
}

#[async_trait]
impl MemberDirectory for MySqlStore {
    async fn active_verified_user_ids(&self) -> Result<Vec<u64>> {
        Ok(sqlx::query_scalar::<_, u64>(
            "SELECT id FROM users WHERE is_active = TRUE AND is_verified = TRUE ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?)
    }
}
