use chrono::{FixedOffset, Offset, Utc};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Attendance
    /// Minutes east of UTC for the civil timezone every attendance decision uses.
    pub civil_utc_offset_minutes: i32,
    pub default_timeout_grace_minutes: i64,
    pub reconcile_interval_secs: u64,

    pub otp_ttl_minutes: i64,
    pub log_dir: String,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn parsed_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let config = Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parsed_or("ACCESS_TOKEN_TTL", 900)?, // default 15 min
            refresh_token_ttl: parsed_or("REFRESH_TOKEN_TTL", 604_800)?, // default 7 days

            rate_login_per_min: parsed_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: parsed_or("RATE_REGISTER_PER_MIN", 30)?,
            rate_refresh_per_min: parsed_or("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),

            civil_utc_offset_minutes: parsed_or("CIVIL_UTC_OFFSET_MINUTES", 330)?,
            default_timeout_grace_minutes: parsed_or("DEFAULT_TIMEOUT_GRACE_MINUTES", 60)?,
            reconcile_interval_secs: parsed_or("RECONCILE_INTERVAL_SECS", 300)?,

            otp_ttl_minutes: parsed_or("OTP_TTL_MINUTES", 10)?,
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.checked_offset().is_none() {
            return Err(ConfigError::Invalid {
                key: "CIVIL_UTC_OFFSET_MINUTES",
                value: self.civil_utc_offset_minutes.to_string(),
            });
        }
        if self.default_timeout_grace_minutes <= 0 {
            return Err(ConfigError::Invalid {
                key: "DEFAULT_TIMEOUT_GRACE_MINUTES",
                value: self.default_timeout_grace_minutes.to_string(),
            });
        }
        if self.reconcile_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "RECONCILE_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    fn checked_offset(&self) -> Option<FixedOffset> {
        self.civil_utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
    }

    /// Civil offset; falls back to UTC only if `validate` was bypassed.
    pub fn civil_offset(&self) -> FixedOffset {
        self.checked_offset().unwrap_or_else(|| Utc.fix())
    }

    pub fn default_timeout_grace(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.default_timeout_grace_minutes)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    pub fn otp_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.otp_ttl_minutes)
    }

    /// Deterministic configuration for tests.
    pub fn test_default() -> Self {
        Self {
            database_url: "mysql://localhost/gym_test".to_string(),
            jwt_secret: "test_jwt_secret_32_bytes_minimum!!".to_string(),
            server_addr: "127.0.0.1:8080".to_string(),
            access_token_ttl: 900,
            refresh_token_ttl: 604_800,
            rate_login_per_min: 60,
            rate_register_per_min: 30,
            rate_refresh_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api/v1".to_string(),
            civil_utc_offset_minutes: 330,
            default_timeout_grace_minutes: 60,
            reconcile_interval_secs: 300,
            otp_ttl_minutes: 10,
            log_dir: "logs".to_string(),
        }
    }
}
