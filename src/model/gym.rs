use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Gym {
    pub id: u64,
    /// Short public code members use to find their gym.
    #[schema(example = "3F9A1C2B")]
    pub gym_code: String,
    pub gym_name: String,
    pub address: Option<String>,
    pub district: Option<String>,
    pub state_ut: Option<String>,
    pub pincode: Option<String>,
    pub country: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

/// First eight hex characters of a v4 uuid, upper-cased.
pub fn generate_gym_code() -> String {
    uuid::Uuid::new_v4()
        .to_simple()
        .to_string()
        .chars()
        .take(8)
        .collect::<String>()
        .to_uppercase()
}
