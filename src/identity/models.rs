use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};

/// Administrative account state. Transitions to `Disabled`/`Banned` happen
/// outside this service; here they only gate login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Disabled,
    Banned,
}

impl AccountStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
            Self::Banned => "banned",
        }
    }

    fn from_db(value: &str) -> Result<Self, sqlx::Error> {
        match value {
            "active" => Ok(Self::Active),
            "disabled" => Ok(Self::Disabled),
            "banned" => Ok(Self::Banned),
            _ => Err(decode_error(format!(
                "invalid users.status value: {value}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SocialProvider {
    Google,
    Facebook,
}

impl SocialProvider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Facebook => "facebook",
        }
    }

    fn from_db(value: &str) -> Result<Self, sqlx::Error> {
        match value {
            "google" => Ok(Self::Google),
            "facebook" => Ok(Self::Facebook),
            _ => Err(decode_error(format!(
                "invalid users.social_provider value: {value}"
            ))),
        }
    }
}

/// How the account authenticates.
///
/// Exactly one of {password hash, provider identity} exists per user; the
/// tagged union makes the "exactly one of" rule a decode-time guarantee
/// instead of a runtime check over nullable columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    Local { password_hash: String },
    Social {
        provider: SocialProvider,
        subject_id: String,
    },
}

impl AuthMode {
    /// Name used in responses and "please login with X" messages.
    #[must_use]
    pub const fn provider_name(&self) -> &'static str {
        match self {
            Self::Local { .. } => "local",
            Self::Social { provider, .. } => provider.as_str(),
        }
    }

    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }
}

/// Identity record. Created at signup or first social login, never deleted.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub auth: AuthMode,
    pub status: AccountStatus,
    pub account_verified: bool,
    pub profile_completed: bool,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for User {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let password_hash: Option<String> = row.try_get("password_hash")?;
        let social_provider: Option<String> = row.try_get("social_provider")?;
        let social_uid: Option<String> = row.try_get("social_uid")?;

        let auth = match (password_hash, social_provider, social_uid) {
            (Some(password_hash), None, None) => AuthMode::Local { password_hash },
            (None, Some(provider), Some(subject_id)) => AuthMode::Social {
                provider: SocialProvider::from_db(&provider)?,
                subject_id,
            },
            _ => {
                return Err(decode_error(
                    "users row must carry exactly one of password_hash or \
                     (social_provider, social_uid)"
                        .to_string(),
                ))
            }
        };

        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            phone_number: row.try_get("phone_number")?,
            auth,
            status: AccountStatus::from_db(&status)?,
            account_verified: row.try_get("account_verified")?,
            profile_completed: row.try_get("profile_completed")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        for status in [
            AccountStatus::Active,
            AccountStatus::Disabled,
            AccountStatus::Banned,
        ] {
            assert_eq!(AccountStatus::from_db(status.as_str()).ok(), Some(status));
        }
        assert!(AccountStatus::from_db("archived").is_err());
    }

    #[test]
    fn provider_round_trip() {
        assert_eq!(
            SocialProvider::from_db("google").ok(),
            Some(SocialProvider::Google)
        );
        assert_eq!(
            SocialProvider::from_db("facebook").ok(),
            Some(SocialProvider::Facebook)
        );
        assert!(SocialProvider::from_db("apple").is_err());
    }

    #[test]
    fn auth_mode_provider_names() {
        let local = AuthMode::Local {
            password_hash: "$argon2id$...".to_string(),
        };
        assert_eq!(local.provider_name(), "local");
        assert!(local.is_local());

        let social = AuthMode::Social {
            provider: SocialProvider::Google,
            subject_id: "sub-1".to_string(),
        };
        assert_eq!(social.provider_name(), "google");
        assert!(!social.is_local());
    }
}
