use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::role::Roles;

/// Public view of a user row. The password hash never leaves `models::UserSql`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct User {
    pub id: u64,
    pub gym_id: u64,
    pub email: String,
    pub full_name: String,
    pub address: Option<String>,
    pub district: Option<String>,
    pub state_ut: Option<String>,
    pub pincode: String,
    pub phone: Option<String>,
    pub is_member: bool,
    pub is_trainer: bool,
    pub is_owner: bool,
    pub is_active: bool,
    pub is_verified: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn roles(&self) -> Roles {
        Roles {
            is_owner: self.is_owner,
            is_trainer: self.is_trainer,
            is_member: self.is_member,
        }
    }
}

/// `true` when `value` is exactly `len` ASCII digits.
pub fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

/// Cheap structural check; delivery of the OTP is the real proof of ownership.
pub fn is_plausible_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace)
}
