use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::clock::Clock;
use crate::error::{AppError, Result};

/// Stored status code. `P` and `A` are the persisted forms.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
pub enum AttendanceStatus {
    #[serde(rename = "P", alias = "Present")]
    #[strum(serialize = "P")]
    Present,
    #[serde(rename = "A", alias = "Absent")]
    #[strum(serialize = "A")]
    Absent,
}

/// Where a record sits in the time-in / time-out state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Row exists but nobody has timed in (system or admin seeded).
    NotTimedIn,
    TimedIn,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 42,
    "user_id": 7,
    "shift_id": 1,
    "attendance_date": "2025-03-10",
    "time_in": "2025-03-10T09:02:11+05:30",
    "time_out": null,
    "status": "P",
    "timeout_default": false,
    "created_at": "2025-03-10T09:02:11+05:30",
    "updated_at": "2025-03-10T09:02:11+05:30"
}))]
pub struct AttendanceRecord {
    pub id: u64,
    pub user_id: u64,
    pub shift_id: u64,
    #[schema(value_type = String, format = "date")]
    pub attendance_date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub time_in: Option<DateTime<FixedOffset>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub time_out: Option<DateTime<FixedOffset>>,
    pub status: AttendanceStatus,
    /// Set when `time_out` was assigned by the reconciliation job.
    pub timeout_default: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<FixedOffset>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<FixedOffset>,
}

impl AttendanceRecord {
    pub fn state(&self) -> RecordState {
        match (self.time_in, self.time_out) {
            (None, _) => RecordState::NotTimedIn,
            (Some(_), None) => RecordState::TimedIn,
            (Some(_), Some(_)) => RecordState::Completed,
        }
    }
}

/// Input for creating a ledger row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendance {
    pub user_id: u64,
    pub shift_id: u64,
    pub attendance_date: NaiveDate,
    pub time_in: Option<DateTime<FixedOffset>>,
    pub time_out: Option<DateTime<FixedOffset>>,
    pub status: AttendanceStatus,
    pub timeout_default: bool,
}

impl NewAttendance {
    /// An absence marker: no times, status `Absent`.
    pub fn absence(user_id: u64, shift_id: u64, attendance_date: NaiveDate) -> Self {
        Self {
            user_id,
            shift_id,
            attendance_date,
            time_in: None,
            time_out: None,
            status: AttendanceStatus::Absent,
            timeout_default: false,
        }
    }
}

/// Unguarded field-wise update used by administrators.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendancePatch {
    pub time_in: Option<DateTime<FixedOffset>>,
    pub time_out: Option<DateTime<FixedOffset>>,
    pub status: Option<AttendanceStatus>,
}

impl AttendancePatch {
    pub fn is_empty(&self) -> bool {
        self.time_in.is_none() && self.time_out.is_none() && self.status.is_none()
    }
}

/// Ledger query. All bounds are inclusive; results come newest date first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceFilter {
    pub user_id: Option<u64>,
    pub shift_id: Option<u64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl AttendanceFilter {
    pub fn for_user(user_id: u64) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.from = Some(date);
        self.to = Some(date);
        self
    }

    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        self.user_id.is_none_or(|u| record.user_id == u)
            && self.shift_id.is_none_or(|s| record.shift_id == s)
            && self.from.is_none_or(|d| record.attendance_date >= d)
            && self.to.is_none_or(|d| record.attendance_date <= d)
    }
}

/// A timestamp as submitted by a client: with an explicit offset, or as a
/// bare wall-clock reading to be interpreted in the civil timezone.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ClientTimestamp {
    Zoned(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl ClientTimestamp {
    pub fn resolve(self, clock: &dyn Clock) -> Result<DateTime<FixedOffset>> {
        match self {
            ClientTimestamp::Zoned(dt) => Ok(clock.to_civil(dt)),
            ClientTimestamp::Naive(naive) => clock
                .localize(naive)
                .ok_or_else(|| AppError::Validation(format!("Timestamp {naive} is out of range"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    #[test]
    fn status_round_trips_through_storage_code() {
        assert_eq!(AttendanceStatus::Present.as_ref(), "P");
        assert_eq!(AttendanceStatus::from_str("A").unwrap(), AttendanceStatus::Absent);
        assert!(AttendanceStatus::from_str("X").is_err());
    }

    #[test]
    fn status_accepts_long_names_from_clients() {
        let s: AttendanceStatus = serde_json::from_str("\"Present\"").unwrap();
        assert_eq!(s, AttendanceStatus::Present);
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"P\"");
    }

    #[test]
    fn client_timestamp_accepts_both_forms() {
        let zoned: ClientTimestamp = serde_json::from_str("\"2025-03-10T18:30:00+05:30\"").unwrap();
        assert!(matches!(zoned, ClientTimestamp::Zoned(_)));
        let naive: ClientTimestamp = serde_json::from_str("\"2025-03-10T18:30:00\"").unwrap();
        assert!(matches!(naive, ClientTimestamp::Naive(_)));
    }

    #[test]
    fn filter_bounds_are_inclusive() {
        let d = |day| NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
        let filter = AttendanceFilter {
            from: Some(d(5)),
            to: Some(d(10)),
            ..AttendanceFilter::for_user(1)
        };
        let ts = FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2025, 3, 5, 0, 0, 0).unwrap();
        let mut record = AttendanceRecord {
            id: 1,
            user_id: 1,
            shift_id: 1,
            attendance_date: d(5),
            time_in: None,
            time_out: None,
            status: AttendanceStatus::Absent,
            timeout_default: false,
            created_at: ts,
            updated_at: ts,
        };
        assert!(filter.matches(&record));
        record.attendance_date = d(10);
        assert!(filter.matches(&record));
        record.attendance_date = d(11);
        assert!(!filter.matches(&record));
        record.attendance_date = d(7);
        record.user_id = 2;
        assert!(!filter.matches(&record));
    }
}
