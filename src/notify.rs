//! Out-of-band passcode delivery.
//!
//! The ledger hands the plaintext passcode to a [`Notifier`]; wiring a real
//! mail or SMS gateway in is a deployment concern behind this trait.

use crate::otp::OtpMethod;
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a passcode to the target address or number.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails. The challenge row already exists
    /// at that point; the user can simply request a fresh passcode.
    async fn send_passcode(
        &self,
        method: OtpMethod,
        target: &str,
        passcode: &str,
        display_name: &str,
    ) -> Result<()>;
}

/// Logs passcodes instead of delivering them. Default for development.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_passcode(
        &self,
        method: OtpMethod,
        target: &str,
        passcode: &str,
        display_name: &str,
    ) -> Result<()> {
        info!(
            method = method.as_str(),
            target, display_name, passcode, "log notifier: passcode not delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        let notifier = LogNotifier;
        let sent = notifier
            .send_passcode(OtpMethod::Email, "k***g@gmail.com", "123456", "khang")
            .await;
        assert!(sent.is_ok());
    }
}
