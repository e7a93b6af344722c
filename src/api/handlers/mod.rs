//! HTTP handlers and the shared error body they answer with.

pub mod auth;
pub mod health;

use crate::error::AuthError;
use axum::{http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

/// Error body returned by every route: a stable machine-readable code plus a
/// human-readable message.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Map a domain error onto an HTTP rejection. Internal detail is logged here
/// and never leaves the process.
pub fn reject(err: &AuthError) -> (StatusCode, Json<ErrorBody>) {
    if let AuthError::Internal(inner) = err {
        error!("internal error: {inner:?}");
    }
    let status = match err {
        AuthError::Validation(_) | AuthError::Expired(_) | AuthError::AttemptsExceeded(_) => {
            StatusCode::BAD_REQUEST
        }
        AuthError::Authentication(_) => StatusCode::UNAUTHORIZED,
        AuthError::Authorization(_) => StatusCode::FORBIDDEN,
        AuthError::NotFound(_) => StatusCode::NOT_FOUND,
        AuthError::Conflict(_) => StatusCode::CONFLICT,
        AuthError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        AuthError::Upstream(_) => StatusCode::BAD_GATEWAY,
        AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorBody {
            code: err.code().to_string(),
            message: err.public_message(),
        }),
    )
}

/// Rejection for a missing or undecodable JSON payload.
pub fn reject_missing_payload() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            code: "validation_error".to_string(),
            message: "Missing or malformed payload".to_string(),
        }),
    )
}

/// Resolver over a lazy pool that never connects; payload-validation tests
/// reject before any query runs.
#[cfg(test)]
pub(crate) fn test_resolver() -> std::sync::Arc<crate::identity::IdentityResolver> {
    use crate::identity::IdentityResolver;
    use crate::notify::LogNotifier;
    use crate::otp::{OtpConfig, OtpLedger};
    use crate::token::TokenIssuer;
    use secrecy::SecretString;

    let pool = sqlx::PgPool::connect_lazy("postgres://localhost/luna_auth_test")
        .expect("lazy pool");
    let tokens = TokenIssuer::new(SecretString::from("handler-test-secret"));
    let otp = OtpLedger::new(pool.clone(), OtpConfig::new());
    std::sync::Arc::new(IdentityResolver::new(
        pool,
        tokens,
        otp,
        std::sync::Arc::new(LogNotifier),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        let cases = [
            (AuthError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AuthError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                AuthError::Authentication("x".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (AuthError::Authorization("x".into()), StatusCode::FORBIDDEN),
            (
                AuthError::RateLimited("x".into()),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (AuthError::Expired("x".into()), StatusCode::BAD_REQUEST),
            (
                AuthError::AttemptsExceeded("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (AuthError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AuthError::Upstream("x".into()), StatusCode::BAD_GATEWAY),
        ];
        for (err, status) in cases {
            assert_eq!(reject(&err).0, status, "{}", err.code());
        }
    }

    #[test]
    fn internal_rejection_is_opaque() {
        let err = AuthError::Internal(anyhow::anyhow!("pg pool exhausted"));
        let (status, Json(body)) = reject(&err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "internal_error");
        assert_eq!(body.message, "Internal server error");
    }
}
