use crate::api::handlers::{
    auth::types::{SignupRequest, SignupResponse},
    reject, reject_missing_payload, ErrorBody,
};
use crate::identity::{IdentityResolver, SignupInput};
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::instrument;

#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created, pending OTP verification", body = SignupResponse),
        (status = 400, description = "Malformed username, password, email, or phone number", body = ErrorBody),
        (status = 409, description = "Username, email, or phone number already registered", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip(resolver, payload))]
pub async fn signup(
    resolver: Extension<Arc<IdentityResolver>>,
    payload: Option<Json<SignupRequest>>,
) -> impl IntoResponse {
    let Some(Json(body)) = payload else {
        return reject_missing_payload().into_response();
    };

    let input = SignupInput {
        username: body.username,
        password: body.password,
        email: body.email,
        phone_number: body.phone_number,
    };
    match resolver.signup(input).await {
        Ok(user) => (
            StatusCode::CREATED,
            Json(SignupResponse {
                user_id: user.id,
                message: "Account created. Please verify with the OTP sent to you.".to_string(),
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
    async fn missing_payload_is_a_bad_request() {
        let response = signup(Extension(test_resolver()), None).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
