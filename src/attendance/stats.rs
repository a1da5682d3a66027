use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeSet;
use utoipa::ToSchema;

use crate::error::{AppError, Result};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[schema(example = json!({
    "year": 2025,
    "month": 3,
    "total_days": 31,
    "present_days": 12,
    "absent_days": 19,
    "attendance_rate": 38.71
}))]
pub struct MonthlyStats {
    pub year: i32,
    pub month: u32,
    pub total_days: u32,
    /// Distinct dates with at least one `Present` record.
    pub present_days: u32,
    pub absent_days: u32,
    /// Percentage, rounded to two decimals.
    pub attendance_rate: f64,
}

/// First and last day of a calendar month.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::Validation(format!("Invalid month {year}-{month}")))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let last = next
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| AppError::Validation(format!("Invalid month {year}-{month}")))?;
    Ok((first, last))
}

pub fn attendance_rate(present_days: u32, total_days: u32) -> f64 {
    if total_days == 0 {
        return 0.0;
    }
    let rate = f64::from(present_days) / f64::from(total_days) * 100.0;
    (rate * 100.0).round() / 100.0
}

/// Summarises one user's records for a month. Records outside the month
/// are ignored.
pub fn monthly_stats(year: i32, month: u32, records: &[AttendanceRecord]) -> Result<MonthlyStats> {
    let (first, last) = month_bounds(year, month)?;
    let total_days = last.day();

    let present: BTreeSet<NaiveDate> = records
        .iter()
        .filter(|r| r.status == AttendanceStatus::Present)
        .map(|r| r.attendance_date)
        .filter(|d| *d >= first && *d <= last)
        .collect();
    let present_days = u32::try_from(present.len()).unwrap_or(total_days).min(total_days);

    Ok(MonthlyStats {
        year,
        month,
        total_days,
        present_days,
        absent_days: total_days - present_days,
        attendance_rate: attendance_rate(present_days, total_days),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn record(day: u32, shift_id: u64, status: AttendanceStatus) -> AttendanceRecord {
        let ts = FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap();
        AttendanceRecord {
            id: u64::from(day) * 10 + shift_id,
            user_id: 1,
            shift_id,
            attendance_date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            time_in: (status == AttendanceStatus::Present).then_some(ts),
            time_out: None,
            status,
            timeout_default: false,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn february_leap_year_bounds() {
        let (first, last) = month_bounds(2024, 2).unwrap();
        assert_eq!(first.day(), 1);
        assert_eq!(last.day(), 29);
        let (_, dec_last) = month_bounds(2025, 12).unwrap();
        assert_eq!(dec_last, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }

    #[test]
    fn month_out_of_range_is_rejected() {
        assert!(matches!(month_bounds(2025, 13), Err(AppError::Validation(_))));
        assert!(matches!(month_bounds(2025, 0), Err(AppError::Validation(_))));
    }

    #[test]
    fn present_days_count_distinct_dates() {
        let records = vec![
            record(3, 1, AttendanceStatus::Present),
            record(3, 2, AttendanceStatus::Present),
            record(4, 1, AttendanceStatus::Absent),
            record(5, 2, AttendanceStatus::Present),
        ];
        let stats = monthly_stats(2025, 3, &records).unwrap();
        assert_eq!(stats.total_days, 31);
        assert_eq!(stats.present_days, 2);
        assert_eq!(stats.absent_days, 29);
        assert_eq!(stats.attendance_rate, 6.45);
    }

    #[test]
    fn empty_month_has_zero_rate() {
        let stats = monthly_stats(2025, 4, &[]).unwrap();
        assert_eq!(stats.present_days, 0);
        assert_eq!(stats.absent_days, 30);
        assert_eq!(stats.attendance_rate, 0.0);
        assert_eq!(attendance_rate(0, 0), 0.0);
    }

    #[test]
    fn rate_rounds_to_two_decimals() {
        assert_eq!(attendance_rate(20, 30), 66.67);
        assert_eq!(attendance_rate(30, 30), 100.0);
    }
}
