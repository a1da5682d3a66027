//! Periodic reconciliation of the ledger.
//!
//! Both sweeps write through [`DirectWriteLedger`](super::store::DirectWriteLedger)
//! rather than the recording service, and both only consider today's civil
//! date. A session opened before midnight is therefore never given a
//! default time-out.

use chrono::{DateTime, Duration, FixedOffset};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

use super::shift_directory::ShiftDirectory;
use super::store::{AttendanceStore, DefaultTimeout};
use crate::clock::Clock;
use crate::error::Result;
use crate::model::attendance::{AttendanceFilter, AttendanceRecord};
use crate::model::shift::Shift;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Candidates found by the planning step.
    pub planned: usize,
    /// Rows actually written.
    pub applied: u64,
}

/// Every (user, active shift) pair with no row in `existing`.
pub fn plan_absence_markers(
    user_ids: &[u64],
    shifts: &[Shift],
    existing: &[AttendanceRecord],
) -> Vec<(u64, u64)> {
    let taken: HashSet<(u64, u64)> = existing.iter().map(|r| (r.user_id, r.shift_id)).collect();
    user_ids
        .iter()
        .flat_map(|&user| {
            shifts
                .iter()
                .filter(|s| s.is_active)
                .map(move |s| (user, s.id))
        })
        .filter(|pair| !taken.contains(pair))
        .collect()
}

/// Open sessions older than `grace`, closed at `time_in + grace`.
pub fn plan_default_timeouts(
    records: &[AttendanceRecord],
    now: DateTime<FixedOffset>,
    grace: Duration,
) -> Vec<DefaultTimeout> {
    records
        .iter()
        .filter(|r| r.time_out.is_none() && !r.timeout_default)
        .filter_map(|r| {
            let time_in = r.time_in?;
            (now - time_in > grace).then(|| DefaultTimeout {
                record_id: r.id,
                time_out: time_in + grace,
            })
        })
        .collect()
}

pub struct ReconciliationJobs {
    store: Arc<dyn AttendanceStore>,
    shifts: ShiftDirectory<dyn AttendanceStore>,
    clock: Arc<dyn Clock>,
    grace: Duration,
}

impl ReconciliationJobs {
    pub fn new(store: Arc<dyn AttendanceStore>, clock: Arc<dyn Clock>, grace: Duration) -> Self {
        Self {
            shifts: ShiftDirectory::new(Arc::clone(&store)),
            store,
            clock,
            grace,
        }
    }

    /// Inserts `Absent` markers for today's missing (user, shift) pairs.
    /// Re-running is a no-op for pairs that already have a row.
    #[instrument(name = "absence_sweep", skip(self))]
    pub async fn mark_absentees(&self) -> Result<SweepReport> {
        let today = self.clock.today();
        let shifts = self.shifts.list_active_shifts().await?;
        let users = self.store.active_verified_user_ids().await?;
        let existing = self.store.query(&AttendanceFilter::default().on(today)).await?;

        let pairs = plan_absence_markers(&users, &shifts, &existing);
        if pairs.is_empty() {
            return Ok(SweepReport::default());
        }
        let applied = self
            .store
            .insert_absence_markers(today, &pairs, self.clock.now())
            .await?;
        Ok(SweepReport {
            planned: pairs.len(),
            applied,
        })
    }

    /// Closes today's sessions that stayed open past the grace period.
    #[instrument(name = "default_timeout_sweep", skip(self))]
    pub async fn assign_default_timeouts(&self) -> Result<SweepReport> {
        let now = self.clock.now();
        let records = self
            .store
            .query(&AttendanceFilter::default().on(self.clock.today()))
            .await?;

        let updates = plan_default_timeouts(&records, now, self.grace);
        if updates.is_empty() {
            return Ok(SweepReport::default());
        }
        let applied = self.store.apply_default_timeouts(&updates, now).await?;
        Ok(SweepReport {
            planned: updates.len(),
            applied,
        })
    }

    /// One tick: both sweeps in order. Failures are logged, not returned.
    pub async fn run_once(&self) {
        match self.mark_absentees().await {
            Ok(report) => tracing::info!(
                planned = report.planned,
                applied = report.applied,
                "Absence sweep finished"
            ),
            Err(e) => tracing::error!(error = %e, "Absence sweep failed"),
        }
        match self.assign_default_timeouts().await {
            Ok(report) => tracing::info!(
                planned = report.planned,
                applied = report.applied,
                "Default time-out sweep finished"
            ),
            Err(e) => tracing::error!(error = %e, "Default time-out sweep failed"),
        }
    }

    /// Runs [`run_once`](Self::run_once) every `every`, starting immediately.
    /// Must be called from within an actix system.
    pub fn spawn(self: Arc<Self>, every: std::time::Duration) -> actix_web::rt::task::JoinHandle<()> {
        actix_web::rt::spawn(async move {
            let mut ticker = actix_web::rt::time::interval(every);
            loop {
                ticker.tick().await;
                self.run_once().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceStatus;
    use chrono::{NaiveDate, NaiveTime, TimeZone};

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(330 * 60).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
        ist().with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    fn shift(id: u64, active: bool) -> Shift {
        Shift {
            id,
            name: format!("s{id}"),
            start_time: NaiveTime::MIN,
            end_time: NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
            is_active: active,
            description: None,
        }
    }

    fn record(id: u64, user_id: u64, shift_id: u64, time_in: Option<DateTime<FixedOffset>>) -> AttendanceRecord {
        AttendanceRecord {
            id,
            user_id,
            shift_id,
            attendance_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            time_in,
            time_out: None,
            status: if time_in.is_some() {
                AttendanceStatus::Present
            } else {
                AttendanceStatus::Absent
            },
            timeout_default: false,
            created_at: at(3, 0),
            updated_at: at(3, 0),
        }
    }

    #[test]
    fn absence_plan_skips_existing_pairs_and_inactive_shifts() {
        let shifts = vec![shift(1, true), shift(2, true), shift(3, false)];
        let existing = vec![record(1, 10, 1, Some(at(9, 0)))];
        let plan = plan_absence_markers(&[10, 11], &shifts, &existing);
        assert_eq!(plan, vec![(10, 2), (11, 1), (11, 2)]);
    }

    #[test]
    fn timeout_plan_respects_grace() {
        let records = vec![
            record(1, 1, 1, Some(at(9, 0))),
            record(2, 2, 1, Some(at(9, 30))),
            record(3, 3, 1, None),
        ];
        let plan = plan_default_timeouts(&records, at(10, 15), Duration::hours(1));
        assert_eq!(
            plan,
            vec![DefaultTimeout {
                record_id: 1,
                time_out: at(10, 0)
            }]
        );
    }

    #[test]
    fn exactly_at_grace_is_not_yet_due() {
        let records = vec![record(1, 1, 1, Some(at(9, 0)))];
        assert!(plan_default_timeouts(&records, at(10, 0), Duration::hours(1)).is_empty());
    }

    #[test]
    fn flagged_or_closed_records_are_left_alone() {
        let mut flagged = record(1, 1, 1, Some(at(6, 0)));
        flagged.timeout_default = true;
        let mut closed = record(2, 2, 1, Some(at(6, 0)));
        closed.time_out = Some(at(6, 30));
        let plan = plan_default_timeouts(&[flagged, closed], at(12, 0), Duration::hours(1));
        assert!(plan.is_empty());
    }
}
