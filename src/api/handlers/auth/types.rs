//! Request and response bodies for the authentication routes.

use crate::identity::{AccountStatus, SocialProvider, User};
use crate::otp::OtpMethod;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub user_id: i64,
    pub message: String,
}

#[derive(ToSchema, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Username, email, or phone number.
    pub identifier: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserProfile,
}

#[derive(ToSchema, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SocialLoginRequest {
    pub provider: SocialProvider,
    /// Provider credential: a Google ID token or a Facebook access token.
    pub credential: String,
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SocialLoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub is_new_user: bool,
    pub user: UserProfile,
}

#[derive(ToSchema, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OtpRequestBody {
    pub user_id: i64,
    pub method: OtpMethod,
}

#[derive(ToSchema, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OtpVerifyBody {
    pub user_id: i64,
    pub otp: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OtpVerifyResponse {
    pub message: String,
    pub account_verified: bool,
}

/// Public view of an identity record.
#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    /// Authentication mode: `local`, `google`, or `facebook`.
    pub auth_primary: String,
    pub status: AccountStatus,
    pub profile_completed: bool,
    pub account_verified: bool,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
            auth_primary: user.auth.provider_name().to_string(),
            status: user.status,
            profile_completed: user.profile_completed,
            account_verified: user.account_verified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{AccountStatus, AuthMode};
    use serde_json::json;

    #[test]
    fn profile_serializes_camel_case() {
        let user = User {
            id: 7,
            username: "khang".to_string(),
            email: Some("khang@gmail.com".to_string()),
            phone_number: Some("+84912344567".to_string()),
            auth: AuthMode::Local {
                password_hash: "$argon2id$...".to_string(),
            },
            status: AccountStatus::Active,
            account_verified: true,
            profile_completed: false,
            created_at: chrono::Utc::now(),
        };
        let profile = UserProfile::from(&user);
        let value = serde_json::to_value(&profile).expect("serialize profile");
        assert_eq!(
            value,
            json!({
                "id": 7,
                "username": "khang",
                "email": "khang@gmail.com",
                "phoneNumber": "+84912344567",
                "authPrimary": "local",
                "status": "active",
                "profileCompleted": false,
                "accountVerified": true,
            })
        );
    }

    #[test]
    fn social_request_accepts_lowercase_provider() {
        let body: SocialLoginRequest = serde_json::from_value(json!({
            "provider": "google",
            "credential": "token-123",
        }))
        .expect("deserialize social request");
        assert_eq!(body.provider, SocialProvider::Google);
    }

    #[test]
    fn otp_request_accepts_method() {
        let body: OtpRequestBody = serde_json::from_value(json!({
            "userId": 3,
            "method": "sms",
        }))
        .expect("deserialize otp request");
        assert_eq!(body.user_id, 3);
        assert_eq!(body.method, OtpMethod::Sms);
    }
}
