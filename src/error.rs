//! Error taxonomy for the authentication core.
//!
//! Every fallible operation exposed by the domain services maps onto one of
//! these variants. Each variant carries a human-readable message; the stable
//! machine-readable code comes from [`AuthError::code`]. Internal detail
//! (database driver errors, upstream response bodies) is logged where it
//! happens and never makes it into the message returned to a caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed input, rejected before touching the store.
    #[error("{0}")]
    Validation(String),

    /// Duplicate username, email, or provider identity.
    #[error("{0}")]
    Conflict(String),

    /// Bad credential. Deliberately merged with "identifier not found" so
    /// callers cannot enumerate accounts.
    #[error("{0}")]
    Authentication(String),

    /// Account exists and the credential checked out, but the account state
    /// (disabled, banned, unverified) forbids the operation.
    #[error("{0}")]
    Authorization(String),

    /// OTP creation throttle hit; the message tells the caller to wait.
    #[error("{0}")]
    RateLimited(String),

    /// OTP passcode past its expiry.
    #[error("{0}")]
    Expired(String),

    /// OTP attempt counter exhausted.
    #[error("{0}")]
    AttemptsExceeded(String),

    /// Referenced user does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Identity provider or notifier failure.
    #[error("{0}")]
    Upstream(String),

    /// Store or timeout failure. The wrapped error is for logs only.
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// Stable machine-readable code surfaced in API error bodies.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Conflict(_) => "conflict",
            Self::Authentication(_) => "invalid_credentials",
            Self::Authorization(_) => "forbidden",
            Self::RateLimited(_) => "rate_limited",
            Self::Expired(_) => "otp_expired",
            Self::AttemptsExceeded(_) => "otp_attempts_exceeded",
            Self::NotFound(_) => "not_found",
            Self::Upstream(_) => "upstream_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Message safe to return to a caller.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            // Internal carries driver/timeout detail that must stay in logs.
            Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(anyhow::Error::new(err).context("database error"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn codes_are_stable() {
        assert_eq!(AuthError::Validation(String::new()).code(), "validation_error");
        assert_eq!(AuthError::Conflict(String::new()).code(), "conflict");
        assert_eq!(
            AuthError::Authentication(String::new()).code(),
            "invalid_credentials"
        );
        assert_eq!(AuthError::RateLimited(String::new()).code(), "rate_limited");
        assert_eq!(
            AuthError::AttemptsExceeded(String::new()).code(),
            "otp_attempts_exceeded"
        );
        assert_eq!(
            AuthError::Internal(anyhow!("boom")).code(),
            "internal_error"
        );
    }

    #[test]
    fn internal_message_is_opaque() {
        let err = AuthError::Internal(anyhow!("connection refused to 10.0.0.5:5432"));
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn public_variants_keep_their_message() {
        let err = AuthError::Authorization("Account is banned".to_string());
        assert_eq!(err.public_message(), "Account is banned");
    }
}
