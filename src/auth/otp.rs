//! One-time passwords for email verification.
//!
//! Entries live in a bounded moka cache. The cache TTL only bounds memory;
//! expiry itself is decided against the injected [`Clock`], so tests can
//! move time forward without sleeping.

use chrono::{DateTime, Duration, FixedOffset};
use moka::future::Cache;
use rand::Rng;
use std::sync::Arc;

use crate::clock::Clock;

const OTP_CAPACITY: u64 = 100_000;

#[derive(Debug, Clone)]
struct OtpEntry {
    code: String,
    expires_at: DateTime<FixedOffset>,
}

#[derive(Clone)]
pub struct OtpStore {
    entries: Cache<String, OtpEntry>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32))
}

#[inline]
fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

impl OtpStore {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        let backstop = ttl
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(600))
            .saturating_mul(2);
        Self {
            entries: Cache::builder()
                .max_capacity(OTP_CAPACITY)
                .time_to_live(backstop)
                .build(),
            clock,
            ttl,
        }
    }

    /// Issues a fresh six-digit code, replacing any outstanding one.
    pub async fn issue(&self, email: &str) -> String {
        let code = generate_code();
        let entry = OtpEntry {
            code: code.clone(),
            expires_at: self.clock.now() + self.ttl,
        };
        self.entries.insert(normalize(email), entry).await;
        code
    }

    /// `true` exactly once per issued code, and only before it expires.
    pub async fn verify(&self, email: &str, code: &str) -> bool {
        let key = normalize(email);
        let Some(entry) = self.entries.get(&key).await else {
            return false;
        };
        if self.clock.now() > entry.expires_at {
            self.entries.invalidate(&key).await;
            return false;
        }
        if entry.code != code.trim() {
            return false;
        }
        // only the caller that actually removes the entry wins
        self.entries.remove(&key).await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn store() -> (Arc<ManualClock>, OtpStore) {
        let clock = Arc::new(ManualClock::new(
            FixedOffset::east_opt(330 * 60)
                .unwrap()
                .with_ymd_and_hms(2025, 3, 10, 9, 0, 0)
                .unwrap(),
        ));
        let otp = OtpStore::new(clock.clone(), Duration::minutes(10));
        (clock, otp)
    }

    #[actix_web::test]
    async fn code_is_six_digits_and_single_use() {
        let (_, otp) = store();
        let code = otp.issue("Member@Example.com").await;
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));

        assert!(otp.verify("member@example.com", &code).await);
        assert!(!otp.verify("member@example.com", &code).await);
    }

    #[actix_web::test]
    async fn expired_code_fails() {
        let (clock, otp) = store();
        let code = otp.issue("a@b.co").await;
        clock.advance(Duration::minutes(11));
        assert!(!otp.verify("a@b.co", &code).await);
    }

    #[actix_web::test]
    async fn reissue_replaces_previous_code() {
        let (_, otp) = store();
        let first = otp.issue("a@b.co").await;
        let second = otp.issue("a@b.co").await;
        if first != second {
            assert!(!otp.verify("a@b.co", &first).await);
        }
        assert!(otp.verify("a@b.co", &second).await);
    }

    #[actix_web::test]
    async fn wrong_code_keeps_entry() {
        let (_, otp) = store();
        let code = otp.issue("a@b.co").await;
        let wrong = if code == "000000" { "111111" } else { "000000" };
        assert!(!otp.verify("a@b.co", wrong).await);
        assert!(otp.verify("a@b.co", &code).await);
    }
}
