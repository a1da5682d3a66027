use chrono::{NaiveTime, Timelike};
use std::sync::Arc;

use super::store::ShiftStore;
use crate::error::{AppError, Result};
use crate::model::shift::{NewShift, Shift, ShiftPatch};

/// Picks the active shift covering `time_of_day`.
///
/// Windows are inclusive at both ends. When active windows overlap (for
/// example two shifts sharing a 13:00 boundary) the lowest id wins, so the
/// answer is stable across calls and across store implementations.
///
/// Shift bounds have whole-second precision, so the fractional part of
/// `time_of_day` is dropped: 12:59:59.5 still falls in a window ending at
/// 12:59:59.
pub fn resolve_covering(shifts: &[Shift], time_of_day: NaiveTime) -> Option<&Shift> {
    let time_of_day = time_of_day.with_nanosecond(0).unwrap_or(time_of_day);
    shifts
        .iter()
        .filter(|s| s.is_active && s.covers(time_of_day))
        .min_by_key(|s| s.id)
}

pub struct ShiftDirectory<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for ShiftDirectory<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ShiftStore + ?Sized> ShiftDirectory<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Active shifts, ordered by id.
    pub async fn list_active_shifts(&self) -> Result<Vec<Shift>> {
        let mut shifts: Vec<Shift> = self
            .store
            .list_shifts()
            .await?
            .into_iter()
            .filter(|s| s.is_active)
            .collect();
        shifts.sort_by_key(|s| s.id);
        Ok(shifts)
    }

    pub async fn resolve_active_shift_covering(
        &self,
        time_of_day: NaiveTime,
    ) -> Result<Option<Shift>> {
        let shifts = self.store.list_shifts().await?;
        Ok(resolve_covering(&shifts, time_of_day).cloned())
    }

    /// The shift with this id, if it exists and is active.
    pub async fn active_by_id(&self, id: u64) -> Result<Option<Shift>> {
        Ok(self.store.get_shift(id).await?.filter(|s| s.is_active))
    }

    pub async fn exists(&self, id: u64) -> Result<bool> {
        Ok(self.store.get_shift(id).await?.is_some())
    }

    pub async fn create(&self, shift: &NewShift) -> Result<Shift> {
        shift.validate()?;
        let created = self.store.insert_shift(shift).await?;
        tracing::info!(shift_id = created.id, name = %created.name, "Shift created");
        Ok(created)
    }

    pub async fn update(&self, id: u64, patch: &ShiftPatch) -> Result<Shift> {
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(AppError::Validation("Shift name must not be empty".into()));
        }
        let updated = self
            .store
            .update_shift(id, patch)
            .await?
            .ok_or_else(|| AppError::NotFound("Shift not found".into()))?;
        tracing::info!(shift_id = id, is_active = updated.is_active, "Shift updated");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn shift(id: u64, start: NaiveTime, end: NaiveTime, active: bool) -> Shift {
        Shift {
            id,
            name: format!("shift-{id}"),
            start_time: start,
            end_time: end,
            is_active: active,
            description: None,
        }
    }

    #[test]
    fn shared_boundary_resolves_to_lowest_id() {
        // listed out of order on purpose
        let shifts = vec![
            shift(2, t(13, 0), t(18, 0), true),
            shift(1, t(9, 0), t(13, 0), true),
        ];
        for _ in 0..5 {
            assert_eq!(resolve_covering(&shifts, t(13, 0)).map(|s| s.id), Some(1));
        }
        assert_eq!(resolve_covering(&shifts, t(13, 1)).map(|s| s.id), Some(2));
    }

    #[test]
    fn inactive_shifts_never_resolve() {
        let shifts = vec![
            shift(1, t(9, 0), t(13, 0), false),
            shift(2, t(9, 0), t(18, 0), true),
        ];
        assert_eq!(resolve_covering(&shifts, t(10, 0)).map(|s| s.id), Some(2));
    }

    #[test]
    fn sub_second_readings_stay_in_the_closing_second() {
        let shifts = vec![
            shift(1, t(3, 0), NaiveTime::from_hms_opt(12, 59, 59).unwrap(), true),
            shift(2, t(13, 0), NaiveTime::from_hms_opt(23, 59, 59).unwrap(), true),
        ];
        let noon = NaiveTime::from_hms_milli_opt(12, 59, 59, 500).unwrap();
        assert_eq!(resolve_covering(&shifts, noon).map(|s| s.id), Some(1));
        let midnight = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap();
        assert_eq!(resolve_covering(&shifts, midnight).map(|s| s.id), Some(2));
    }

    #[test]
    fn uncovered_time_is_none() {
        let shifts = vec![shift(1, t(3, 0), t(12, 59), true)];
        assert!(resolve_covering(&shifts, t(2, 30)).is_none());
    }
}
