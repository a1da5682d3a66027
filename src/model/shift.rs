use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A recurring daily window during which attendance may be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "name": "Morning",
    "start_time": "03:00:00",
    "end_time": "12:59:59",
    "is_active": true,
    "description": "Morning shift from 3 AM to 12:59 PM"
}))]
pub struct Shift {
    pub id: u64,
    pub name: String,
    /// Inclusive lower bound, civil wall-clock time.
    #[schema(value_type = String, format = "time", example = "03:00:00")]
    pub start_time: NaiveTime,
    /// Inclusive upper bound, civil wall-clock time.
    #[schema(value_type = String, format = "time", example = "12:59:59")]
    pub end_time: NaiveTime,
    pub is_active: bool,
    pub description: Option<String>,
}

impl Shift {
    pub fn covers(&self, time_of_day: NaiveTime) -> bool {
        self.start_time <= time_of_day && time_of_day <= self.end_time
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewShift {
    #[schema(example = "Morning")]
    pub name: String,
    #[schema(value_type = String, format = "time", example = "03:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, format = "time", example = "12:59:59")]
    pub end_time: NaiveTime,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub description: Option<String>,
}

fn default_active() -> bool {
    true
}

impl NewShift {
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.name.trim().is_empty() {
            return Err(crate::error::AppError::Validation(
                "Shift name must not be empty".into(),
            ));
        }
        if self.start_time > self.end_time {
            return Err(crate::error::AppError::Validation(
                "start_time cannot be after end_time".into(),
            ));
        }
        Ok(())
    }
}

/// Partial update for a shift. Deactivation is preferred over deletion.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ShiftPatch {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub description: Option<String>,
}

/// The reference deployment's two shifts covering the operational day.
pub fn default_shifts() -> Vec<NewShift> {
    vec![
        NewShift {
            name: "Morning".to_string(),
            start_time: NaiveTime::from_hms_opt(3, 0, 0).unwrap_or_default(),
            end_time: NaiveTime::from_hms_opt(12, 59, 59).unwrap_or_default(),
            is_active: true,
            description: Some("Morning shift from 3 AM to 12:59 PM".to_string()),
        },
        NewShift {
            name: "Evening".to_string(),
            start_time: NaiveTime::from_hms_opt(13, 0, 0).unwrap_or_default(),
            end_time: NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default(),
            is_active: true,
            description: Some("Evening shift from 1 PM to 11:59 PM".to_string()),
        },
    ]
}
