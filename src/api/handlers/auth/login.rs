use crate::api::handlers::{
    auth::types::{LoginRequest, TokenResponse, UserProfile},
    reject, reject_missing_payload, ErrorBody,
};
use crate::identity::IdentityResolver;
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::instrument;

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated; token pair issued", body = TokenResponse),
        (status = 401, description = "Unknown identifier or wrong password", body = ErrorBody),
        (status = 403, description = "Account disabled, banned, or unverified", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip(resolver, payload))]
pub async fn login(
    resolver: Extension<Arc<IdentityResolver>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(body)) = payload else {
        return reject_missing_payload().into_response();
    };

    match resolver.login(&body.identifier, &body.password).await {
        Ok(grant) => (
            StatusCode::OK,
            Json(TokenResponse {
                access_token: grant.access_token,
                refresh_token: grant.refresh_token,
                expires_in: grant.expires_in,
                user: UserProfile::from(&grant.user),
            }),
        )
            .into_response(),
        Err(err) => reject(&err).into_response(),
    }
}
