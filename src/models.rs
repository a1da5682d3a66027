use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::{AppError, Result};
use crate::model::role::Roles;
use crate::model::user::{is_digits, is_plausible_email};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterReq {
    #[schema(example = "member@example.com", format = "email")]
    pub email: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
    #[schema(example = "Asha Rao")]
    pub full_name: String,
    #[schema(example = 1)]
    pub gym_id: u64,
    #[schema(example = "560001")]
    pub pincode: String,
    pub address: Option<String>,
    pub district: Option<String>,
    pub state_ut: Option<String>,
    #[schema(example = "9876543210")]
    pub phone: Option<String>,
}

impl RegisterReq {
    pub fn validate(&self) -> Result<()> {
        if !is_plausible_email(self.email.trim()) {
            return Err(AppError::Validation("A valid email is required".into()));
        }
        if self.password.is_empty() {
            return Err(AppError::Validation("Password must not be empty".into()));
        }
        if self.full_name.trim().is_empty() {
            return Err(AppError::Validation("Full name must not be empty".into()));
        }
        if !is_digits(&self.pincode, 6) {
            return Err(AppError::Validation("Pincode must be 6 digits".into()));
        }
        if let Some(phone) = &self.phone {
            if !is_digits(phone, 10) {
                return Err(AppError::Validation("Phone must be 10 digits".into()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "member@example.com", format = "email")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyOtpReq {
    #[schema(example = "member@example.com", format = "email")]
    pub email: String,
    #[schema(example = "042917")]
    pub otp: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EmailReq {
    #[schema(example = "member@example.com", format = "email")]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Credential row used only by the auth handlers.
#[derive(FromRow)]
pub struct UserSql {
    pub id: u64,
    pub email: String,
    pub password: String,
    pub is_member: bool,
    pub is_trainer: bool,
    pub is_owner: bool,
    pub is_active: bool,
    pub is_verified: bool,
}

impl UserSql {
    pub fn roles(&self) -> Roles {
        Roles {
            is_owner: self.is_owner,
            is_trainer: self.is_trainer,
            is_member: self.is_member,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    /// Email address
    pub sub: String,
    pub is_owner: bool,
    pub is_trainer: bool,
    pub is_member: bool,
    pub exp: usize,
    pub jti: String,
    pub token_type: TokenType,
}

impl Claims {
    pub fn roles(&self) -> Roles {
        Roles {
            is_owner: self.is_owner,
            is_trainer: self.is_trainer,
            is_member: self.is_member,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TokenType {
    Access,
    Refresh,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req() -> RegisterReq {
        RegisterReq {
            email: "member@example.com".into(),
            password: "pw".into(),
            full_name: "Asha Rao".into(),
            gym_id: 1,
            pincode: "560001".into(),
            address: None,
            district: None,
            state_ut: None,
            phone: Some("9876543210".into()),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(req().validate().is_ok());
    }

    #[test]
    fn registration_field_checks() {
        let mut bad_pin = req();
        bad_pin.pincode = "5600".into();
        assert!(matches!(bad_pin.validate(), Err(AppError::Validation(_))));

        let mut bad_phone = req();
        bad_phone.phone = Some("98765-4321".into());
        assert!(bad_phone.validate().is_err());

        let mut bad_email = req();
        bad_email.email = "not-an-email".into();
        assert!(bad_email.validate().is_err());

        let mut no_password = req();
        no_password.password.clear();
        assert!(no_password.validate().is_err());
    }
}
