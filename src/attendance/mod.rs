//! Attendance core: shift resolution, the ledger seams, the recording
//! service and the background reconciliation jobs.

pub mod jobs;
pub mod service;
pub mod shift_directory;
pub mod stats;
pub mod store;

pub use jobs::{ReconciliationJobs, SweepReport};
pub use service::{AttendanceService, TimeInOutcome};
pub use shift_directory::ShiftDirectory;
pub use stats::MonthlyStats;
pub use store::{
    AttendanceLedger, AttendanceStore, DefaultTimeout, DirectWriteLedger, MemberDirectory,
    ShiftStore,
};
