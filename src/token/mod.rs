//! Signed session tokens.
//!
//! Access and refresh tokens are HS256 JWTs signed with one server-held
//! symmetric secret and differentiated only by the `token_type` claim and the
//! claim set present. That claim is enforced as a hard gate on every decode:
//! a refresh token can never pass where an access token is expected, even
//! though both verify under the same key. Tokens are signed, not encrypted;
//! claims are readable by anyone holding the token and must never contain
//! secrets.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

const DEFAULT_ACCESS_TTL_MINUTES: i64 = 60;
const DEFAULT_REFRESH_TTL_MINUTES: i64 = 7 * 24 * 60;

/// Claim names a caller may not override through extra claims.
const REGISTERED_CLAIMS: [&str; 6] = ["sub", "username", "email", "iat", "exp", "token_type"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User id, stringified.
    pub sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iat: i64,
    pub exp: i64,
    pub token_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to sign token")]
    Signing,
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("wrong token type: expected {expected}")]
    WrongTokenType { expected: &'static str },
}

/// Mints and validates access/refresh token pairs.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: SecretString,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            access_ttl: Duration::minutes(DEFAULT_ACCESS_TTL_MINUTES),
            refresh_ttl: Duration::minutes(DEFAULT_REFRESH_TTL_MINUTES),
        }
    }

    #[must_use]
    pub fn with_access_ttl_minutes(mut self, minutes: i64) -> Self {
        self.access_ttl = Duration::minutes(minutes.max(1));
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_minutes(mut self, minutes: i64) -> Self {
        self.refresh_ttl = Duration::minutes(minutes.max(1));
        self
    }

    /// Access token lifetime in seconds, surfaced as `expiresIn`.
    #[must_use]
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Mint an access token carrying identity claims.
    ///
    /// Extra claims are merged into the payload; attempts to override
    /// registered claim names are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] if encoding fails.
    pub fn issue_access_token(
        &self,
        user_id: i64,
        username: &str,
        email: Option<&str>,
        extra_claims: Option<Map<String, Value>>,
    ) -> Result<String, Error> {
        let now = Utc::now();
        let mut extra = extra_claims.unwrap_or_default();
        extra.retain(|key, _| !REGISTERED_CLAIMS.contains(&key.as_str()));

        let claims = Claims {
            sub: user_id.to_string(),
            username: Some(username.to_string()),
            email: email.map(str::to_string),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
            token_type: TokenKind::Access.as_str().to_string(),
            extra,
        };
        self.sign(&claims)
    }

    /// Mint a refresh token. Claims are limited to the subject id and the
    /// timestamps so a refresh token carries no authorization data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] if encoding fails.
    pub fn issue_refresh_token(&self, user_id: i64) -> Result<String, Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            username: None,
            email: None,
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
            token_type: TokenKind::Refresh.as_str().to_string(),
            extra: Map::new(),
        };
        self.sign(&claims)
    }

    /// Decode a token and enforce the expected kind.
    ///
    /// # Errors
    ///
    /// Fails distinctly on malformed encoding, invalid signature, expiry, and
    /// kind mismatch. Callers must treat all of them as "unauthenticated" but
    /// may log the distinction.
    pub fn decode(&self, token: &str, expected: TokenKind) -> Result<Claims, Error> {
        let key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        let data =
            jsonwebtoken::decode::<Claims>(token, &key, &validation).map_err(|err| {
                match err.kind() {
                    ErrorKind::ExpiredSignature => Error::Expired,
                    ErrorKind::InvalidSignature => Error::InvalidSignature,
                    _ => Error::Malformed,
                }
            })?;

        if data.claims.token_type != expected.as_str() {
            return Err(Error::WrongTokenType {
                expected: expected.as_str(),
            });
        }

        Ok(data.claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, Error> {
        let key = EncodingKey::from_secret(self.secret.expose_secret().as_bytes());
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &key)
            .map_err(|_| Error::Signing)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("secret", &"***")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SecretString::from("test-signing-secret"))
    }

    #[test]
    fn access_token_round_trip() -> Result<(), Error> {
        let issuer = issuer();
        let token = issuer.issue_access_token(42, "alice", Some("alice@example.com"), None)?;
        let claims = issuer.decode(&token, TokenKind::Access)?;
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.username.as_deref(), Some("alice"));
        assert_eq!(claims.email.as_deref(), Some("alice@example.com"));
        assert_eq!(claims.token_type, "access");
        assert_eq!(claims.exp - claims.iat, 60 * 60);
        Ok(())
    }

    #[test]
    fn refresh_token_carries_no_identity_claims() -> Result<(), Error> {
        let issuer = issuer();
        let token = issuer.issue_refresh_token(42)?;
        let claims = issuer.decode(&token, TokenKind::Refresh)?;
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.username, None);
        assert_eq!(claims.email, None);
        assert!(claims.extra.is_empty());
        Ok(())
    }

    #[test]
    fn refresh_token_rejected_as_access_token() -> Result<(), Error> {
        let issuer = issuer();
        let token = issuer.issue_refresh_token(42)?;
        let result = issuer.decode(&token, TokenKind::Access);
        assert!(matches!(
            result,
            Err(Error::WrongTokenType { expected: "access" })
        ));
        Ok(())
    }

    #[test]
    fn extra_claims_merge_but_cannot_override() -> Result<(), Error> {
        let issuer = issuer();
        let mut extra = Map::new();
        extra.insert("scope".to_string(), json!("profile"));
        extra.insert("sub".to_string(), json!("999"));
        let token = issuer.issue_access_token(7, "bob", None, Some(extra))?;
        let claims = issuer.decode(&token, TokenKind::Access)?;
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.extra.get("scope"), Some(&json!("profile")));
        assert!(!claims.extra.contains_key("sub"));
        Ok(())
    }

    #[test]
    fn tampered_signature_is_rejected() -> Result<(), Error> {
        let issuer = issuer();
        let other = TokenIssuer::new(SecretString::from("other-secret"));
        let token = other.issue_access_token(1, "mallory", None, None)?;
        assert!(matches!(
            issuer.decode(&token, TokenKind::Access),
            Err(Error::InvalidSignature)
        ));
        Ok(())
    }

    #[test]
    fn garbage_is_malformed() {
        let issuer = issuer();
        assert!(matches!(
            issuer.decode("not-a-token", TokenKind::Access),
            Err(Error::Malformed)
        ));
        assert!(matches!(
            issuer.decode("a.b.c", TokenKind::Access),
            Err(Error::Malformed)
        ));
    }

    #[test]
    fn expired_token_is_rejected() -> Result<(), Error> {
        let issuer = issuer();
        // Well past the default 60s validation leeway.
        let now = Utc::now();
        let claims = Claims {
            sub: "1".to_string(),
            username: Some("alice".to_string()),
            email: None,
            iat: (now - Duration::hours(3)).timestamp(),
            exp: (now - Duration::hours(2)).timestamp(),
            token_type: TokenKind::Access.as_str().to_string(),
            extra: Map::new(),
        };
        let token = issuer.sign(&claims)?;
        assert!(matches!(
            issuer.decode(&token, TokenKind::Access),
            Err(Error::Expired)
        ));
        Ok(())
    }
}
