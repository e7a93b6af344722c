use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use uuid::Uuid;

/// How the passcode is delivered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OtpMethod {
    Email,
    Sms,
}

impl OtpMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
        }
    }

    fn from_db(value: &str) -> Result<Self, sqlx::Error> {
        match value {
            "email" => Ok(Self::Email),
            "sms" => Ok(Self::Sms),
            _ => Err(decode_error(format!(
                "invalid otp_requests.method value: {value}"
            ))),
        }
    }
}

/// Lifecycle of a passcode challenge.
///
/// `Pending` is the only state a verify can match. `Consumed` means a correct
/// passcode was presented; `Superseded` means a newer challenge replaced this
/// one. Expiry is derived from `expires_at` at read time, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OtpStatus {
    Pending,
    Consumed,
    Superseded,
}

impl OtpStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Consumed => "consumed",
            Self::Superseded => "superseded",
        }
    }

    fn from_db(value: &str) -> Result<Self, sqlx::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "consumed" => Ok(Self::Consumed),
            "superseded" => Ok(Self::Superseded),
            _ => Err(decode_error(format!(
                "invalid otp_requests.status value: {value}"
            ))),
        }
    }
}

/// A single passcode challenge. Rows are append-only audit history; only the
/// `status` and `attempts` columns ever change after insert.
#[derive(Debug, Clone)]
pub struct OtpRequest {
    pub id: Uuid,
    pub user_id: i64,
    pub code_hash: Vec<u8>,
    pub method: OtpMethod,
    pub target: String,
    pub status: OtpStatus,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OtpRequest {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

impl<'r> FromRow<'r, PgRow> for OtpRequest {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let method: String = row.try_get("method")?;
        let status: String = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            code_hash: row.try_get("code_hash")?,
            method: OtpMethod::from_db(&method)?,
            target: row.try_get("target")?,
            status: OtpStatus::from_db(&status)?,
            attempts: row.try_get("attempts")?,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
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
    use chrono::Duration;

    #[test]
    fn method_round_trip() {
        assert_eq!(OtpMethod::Email.as_str(), "email");
        assert_eq!(OtpMethod::Sms.as_str(), "sms");
    }

    #[test]
    fn status_round_trip() {
        for status in [OtpStatus::Pending, OtpStatus::Consumed, OtpStatus::Superseded] {
            assert_eq!(OtpStatus::from_db(status.as_str()).ok(), Some(status));
        }
        assert!(OtpStatus::from_db("verified").is_err());
    }

    #[test]
    fn expiry_is_derived_from_time() {
        let now = Utc::now();
        let request = OtpRequest {
            id: Uuid::nil(),
            user_id: 1,
            code_hash: vec![0; 32],
            method: OtpMethod::Email,
            target: "a***@x.io".to_string(),
            status: OtpStatus::Pending,
            attempts: 0,
            created_at: now,
            expires_at: now + Duration::minutes(5),
        };
        assert!(!request.is_expired(now));
        assert!(!request.is_expired(now + Duration::minutes(5)));
        assert!(request.is_expired(now + Duration::minutes(5) + Duration::seconds(1)));
    }
}
