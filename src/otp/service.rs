use crate::error::AuthError;
use crate::otp::{crypto, repo::OtpRepo};
use anyhow::Context;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};

use super::models::OtpMethod;

/// Tunables for passcode issuance and verification.
#[derive(Clone, Copy, Debug)]
pub struct OtpConfig {
    expiry_seconds: i64,
    max_attempts: i32,
    max_requests_per_hour: i64,
}

impl OtpConfig {
    /// Defaults: 5 minute expiry, 5 verify attempts, 5 creations per hour.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            expiry_seconds: 5 * 60,
            max_attempts: 5,
            max_requests_per_hour: 5,
        }
    }

    #[must_use]
    pub const fn with_expiry_seconds(mut self, seconds: i64) -> Self {
        self.expiry_seconds = seconds;
        self
    }

    #[must_use]
    pub const fn with_max_requests_per_hour(mut self, limit: i64) -> Self {
        self.max_requests_per_hour = limit;
        self
    }

    #[must_use]
    pub const fn max_attempts(&self) -> i32 {
        self.max_attempts
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a verify call, before it is mapped onto the error taxonomy.
#[derive(Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    NoPending,
    Expired,
    AttemptsExceeded,
    Mismatch { remaining: i32 },
}

/// Issues and verifies passcode challenges.
///
/// The ledger owns challenge rows only; delivering the plaintext passcode to
/// the user is the caller's job.
#[derive(Clone)]
pub struct OtpLedger {
    pool: PgPool,
    config: OtpConfig,
}

impl OtpLedger {
    #[must_use]
    pub fn new(pool: PgPool, config: OtpConfig) -> Self {
        Self { pool, config }
    }

    /// Create a new passcode challenge for a user and return the plaintext
    /// passcode for out-of-band delivery.
    ///
    /// The transaction takes a per-user advisory lock before anything else,
    /// so concurrent creations serialize: the rate-limit count is exact and
    /// supersede-then-insert leaves exactly one pending challenge. A partial
    /// unique index on `(user_id) WHERE status = 'pending'` backs the same
    /// invariant in the store.
    ///
    /// # Errors
    ///
    /// `RateLimited` when the per-user creation limit for the trailing hour
    /// is hit; `Internal` on store failures.
    pub async fn create(
        &self,
        user_id: i64,
        method: OtpMethod,
        target: &str,
    ) -> Result<String, AuthError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin otp creation transaction")?;

        OtpRepo::lock_user(&mut tx, user_id).await?;

        let recent = OtpRepo::count_recent(&mut tx, user_id, 3600).await?;
        if recent >= self.config.max_requests_per_hour {
            warn!(user_id, recent, "otp creation rate limit exceeded");
            tx.rollback()
                .await
                .context("failed to roll back rate-limited otp creation")?;
            return Err(AuthError::RateLimited(
                "Too many OTP requests. Please try again later.".to_string(),
            ));
        }

        let superseded = OtpRepo::supersede_pending(&mut tx, user_id).await?;
        if superseded > 0 {
            info!(user_id, superseded, "superseded pending otp requests");
        }

        let passcode = crypto::generate_passcode();
        let code_hash = crypto::hash_passcode(&passcode, user_id);
        let id = OtpRepo::insert(
            &mut tx,
            user_id,
            &code_hash,
            method,
            target,
            self.config.expiry_seconds,
        )
        .await?;

        tx.commit()
            .await
            .context("failed to commit otp creation transaction")?;

        info!(user_id, otp_request_id = %id, method = method.as_str(), "created otp request");
        Ok(passcode)
    }

    /// Verify a passcode against the user's latest pending challenge.
    ///
    /// Fails closed in order: no pending challenge, expired, attempts
    /// exhausted (checked before incrementing). A failed guess always counts:
    /// the attempt is claimed before the hash comparison.
    ///
    /// # Errors
    ///
    /// `Internal` on store failures; everything else is a [`VerifyOutcome`].
    pub async fn verify(&self, user_id: i64, passcode: &str) -> Result<VerifyOutcome, AuthError> {
        let Some(request) = OtpRepo::find_latest_pending(&self.pool, user_id).await? else {
            warn!(user_id, "otp verify with no pending request");
            return Ok(VerifyOutcome::NoPending);
        };

        if request.is_expired(Utc::now()) {
            warn!(user_id, otp_request_id = %request.id, "otp verify after expiry");
            return Ok(VerifyOutcome::Expired);
        }

        if request.attempts >= self.config.max_attempts {
            warn!(user_id, otp_request_id = %request.id, "otp attempt limit reached");
            return Ok(VerifyOutcome::AttemptsExceeded);
        }

        // Claim the attempt slot atomically; a lost race means another verify
        // consumed the row or exhausted the limit in the meantime.
        let Some(attempts) =
            OtpRepo::claim_attempt(&self.pool, request.id, self.config.max_attempts).await?
        else {
            warn!(user_id, otp_request_id = %request.id, "otp attempt claim lost race");
            return Ok(VerifyOutcome::AttemptsExceeded);
        };

        let supplied_hash = crypto::hash_passcode(passcode, user_id);
        if supplied_hash != request.code_hash {
            let remaining = (self.config.max_attempts - attempts).max(0);
            warn!(user_id, otp_request_id = %request.id, remaining, "otp mismatch");
            return Ok(VerifyOutcome::Mismatch { remaining });
        }

        OtpRepo::mark_consumed(&self.pool, request.id).await?;
        info!(user_id, otp_request_id = %request.id, "otp verified");
        Ok(VerifyOutcome::Verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = OtpConfig::new();
        assert_eq!(config.expiry_seconds, 300);
        assert_eq!(config.max_attempts(), 5);
        assert_eq!(config.max_requests_per_hour, 5);
    }

    #[test]
    fn config_builders() {
        let config = OtpConfig::new()
            .with_expiry_seconds(60)
            .with_max_requests_per_hour(2);
        assert_eq!(config.expiry_seconds, 60);
        assert_eq!(config.max_requests_per_hour, 2);
    }

    #[test]
    fn verify_outcome_equality() {
        assert_eq!(
            VerifyOutcome::Mismatch { remaining: 4 },
            VerifyOutcome::Mismatch { remaining: 4 }
        );
        assert_ne!(VerifyOutcome::Verified, VerifyOutcome::NoPending);
    }
}
