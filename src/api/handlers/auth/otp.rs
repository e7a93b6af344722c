use crate::api::handlers::{
    auth::types::{MessageResponse, OtpRequestBody, OtpVerifyBody, OtpVerifyResponse},
    reject, reject_missing_payload, ErrorBody,
};
use crate::identity::IdentityResolver;
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::instrument;

#[utoipa::path(
    post,
    path = "/auth/otp/request",
    request_body = OtpRequestBody,
    responses(
        (status = 200, description = "Passcode issued and sent to the masked target", body = MessageResponse),
        (status = 400, description = "Already verified or no contact point for the method", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody),
        (status = 429, description = "Too many passcodes requested this hour", body = ErrorBody),
    ),
    tag = "otp"
)]
#[instrument(skip(resolver, payload))]
pub async fn request_otp(
    resolver: Extension<Arc<IdentityResolver>>,
    payload: Option<Json<OtpRequestBody>>,
) -> impl IntoResponse {
    let Some(Json(body)) = payload else {
        return reject_missing_payload().into_response();
    };

    match resolver.request_otp(body.user_id, body.method).await {
        Ok(message) => (StatusCode::OK, Json(MessageResponse { message })).into_response(),
        Err(err) => reject(&err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/otp/verify",
    request_body = OtpVerifyBody,
    responses(
        (status = 200, description = "Account verified", body = OtpVerifyResponse),
        (status = 400, description = "No pending, expired, or exhausted challenge", body = ErrorBody),
        (status = 401, description = "Wrong passcode; attempts remaining in the message", body = ErrorBody),
    ),
    tag = "otp"
)]
#[instrument(skip(resolver, payload))]
pub async fn verify_otp(
    resolver: Extension<Arc<IdentityResolver>>,
    payload: Option<Json<OtpVerifyBody>>,
) -> impl IntoResponse {
    let Some(Json(body)) = payload else {
        return reject_missing_payload().into_response();
    };

    match resolver.verify_otp(body.user_id, &body.otp).await {
        Ok(message) => (
            StatusCode::OK,
            Json(OtpVerifyResponse {
                message,
                account_verified: true,
            }),
        )
            .into_response(),
        Err(err) => reject(&err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::test_resolver;

    #[tokio::test]
    async fn missing_request_payload_is_a_bad_request() {
        let response = request_otp(Extension(test_resolver()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_verify_payload_is_a_bad_request() {
        let response = verify_otp(Extension(test_resolver()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
