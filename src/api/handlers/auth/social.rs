use crate::api::handlers::{
    auth::types::{SocialLoginRequest, SocialLoginResponse, UserProfile},
    reject, reject_missing_payload, ErrorBody,
};
use crate::identity::IdentityResolver;
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::instrument;

#[utoipa::path(
    post,
    path = "/auth/social",
    request_body = SocialLoginRequest,
    responses(
        (status = 200, description = "Authenticated; account created on first contact", body = SocialLoginResponse),
        (status = 401, description = "Provider rejected the credential", body = ErrorBody),
        (status = 409, description = "Attested email belongs to a password account", body = ErrorBody),
        (status = 502, description = "Provider unreachable", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip(resolver, payload))]
pub async fn social_login(
    resolver: Extension<Arc<IdentityResolver>>,
    payload: Option<Json<SocialLoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(body)) = payload else {
        return reject_missing_payload().into_response();
    };

    match resolver.social_login(body.provider, &body.credential).await {
        Ok(social) => (
            StatusCode::OK,
            Json(SocialLoginResponse {
                access_token: social.grant.access_token,
                refresh_token: social.grant.refresh_token,
                expires_in: social.grant.expires_in,
                is_new_user: social.is_new_user,
                user: UserProfile::from(&social.grant.user),
            }),
        )
            .into_response(),
        Err(err) => reject(&err).into_response(),
    }
}
