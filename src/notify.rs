//! Out-of-band delivery of one-time passwords.

use async_trait::async_trait;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_otp(&self, email: &str, code: &str) -> anyhow::Result<()>;
}

/// Writes OTPs to the application log instead of sending mail. Suitable for
/// development and for deployments that relay the log to a mail worker.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_otp(&self, email: &str, code: &str) -> anyhow::Result<()> {
        tracing::info!(email, "OTP issued");
        tracing::debug!(email, code, "OTP code");
        Ok(())
    }
}

/// Delivery failures are logged and never surface to the caller.
pub async fn deliver_otp(notifier: &dyn Notifier, email: &str, code: &str) {
    if let Err(e) = notifier.send_otp(email, code).await {
        tracing::warn!(email, error = %e, "Failed to deliver OTP");
    }
}
