//! Account lifecycle orchestration.
//!
//! [`IdentityResolver`] ties the pieces together: password hashing at signup,
//! identifier resolution and credential checks at login, provider-attested
//! identities at social login, and the verification passcode flow.

use crate::error::AuthError;
use crate::identity::models::{AccountStatus, AuthMode, SocialProvider, User};
use crate::identity::providers::IdentityProvider;
use crate::identity::repo::{InsertUserOutcome, UserRepo};
use crate::identity::username;
use crate::notify::Notifier;
use crate::otp::{crypto, OtpLedger, OtpMethod, VerifyOutcome};
use crate::token::TokenIssuer;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]{3,50}$").expect("username regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9]{8,15}$").expect("phone regex"));

const MIN_PASSWORD_LEN: usize = 6;
const MAX_PASSWORD_LEN: usize = 128;

/// Bound on username allocation retries at social account creation.
const MAX_USERNAME_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone)]
pub struct SignupInput {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

/// A successful authentication: the user plus a fresh token pair.
#[derive(Debug)]
pub struct LoginGrant {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Social login result; `is_new_user` tells the client whether to route to
/// profile completion.
#[derive(Debug)]
pub struct SocialGrant {
    pub grant: LoginGrant,
    pub is_new_user: bool,
}

pub struct IdentityResolver {
    pool: PgPool,
    tokens: TokenIssuer,
    otp: OtpLedger,
    notifier: Arc<dyn Notifier>,
    providers: HashMap<SocialProvider, Arc<dyn IdentityProvider>>,
}

impl IdentityResolver {
    #[must_use]
    pub fn new(
        pool: PgPool,
        tokens: TokenIssuer,
        otp: OtpLedger,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            pool,
            tokens,
            otp,
            notifier,
            providers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.providers.insert(provider.provider(), provider);
        self
    }

    /// Register a password-credentialed account. The account starts
    /// unverified; login is refused until an OTP verification completes.
    ///
    /// # Errors
    ///
    /// `Validation` on malformed fields, `Conflict` when the username, email,
    /// or phone number is already registered.
    pub async fn signup(&self, input: SignupInput) -> Result<User, AuthError> {
        let email = input
            .email
            .as_deref()
            .map(|email| email.trim().to_lowercase());
        validate_username(&input.username)?;
        validate_password(&input.password)?;
        if let Some(email) = email.as_deref() {
            validate_email(email)?;
        }
        if let Some(phone) = input.phone_number.as_deref() {
            validate_phone(phone)?;
        }

        // Friendly pre-checks; the unique indexes stay authoritative under
        // races and the insert below answers the same way.
        if UserRepo::find_by_username(&self.pool, &input.username)
            .await?
            .is_some()
        {
            return Err(AuthError::Conflict("Username already taken".to_string()));
        }
        if let Some(email) = email.as_deref() {
            if UserRepo::find_by_email(&self.pool, email).await?.is_some() {
                return Err(AuthError::Conflict("Email already registered".to_string()));
            }
        }

        let password_hash = crate::password::hash(&input.password)?;
        let outcome = UserRepo::insert_local(
            &self.pool,
            &input.username,
            email.as_deref(),
            input.phone_number.as_deref(),
            &password_hash,
        )
        .await?;

        match outcome {
            InsertUserOutcome::Created(user) => {
                info!(user_id = user.id, "registered local account");
                Ok(user)
            }
            InsertUserOutcome::UsernameTaken => {
                Err(AuthError::Conflict("Username already taken".to_string()))
            }
            InsertUserOutcome::EmailTaken => {
                Err(AuthError::Conflict("Email already registered".to_string()))
            }
            InsertUserOutcome::PhoneTaken => Err(AuthError::Conflict(
                "Phone number already registered".to_string(),
            )),
            InsertUserOutcome::SocialIdentityTaken => Err(AuthError::Internal(anyhow::anyhow!(
                "unexpected unique violation inserting local user"
            ))),
        }
    }

    /// Authenticate with a flexible identifier (username, email, or phone
    /// number, resolved in that order) and a password.
    ///
    /// # Errors
    ///
    /// `Authentication` for unknown identifiers and wrong passwords alike,
    /// and with a provider-naming message for social-only accounts;
    /// `Authorization` when the account state forbids login.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginGrant, AuthError> {
        let Some(user) = self.resolve_identifier(identifier).await? else {
            warn!("login with unknown identifier");
            return Err(AuthError::Authentication("Invalid credentials".to_string()));
        };

        let password_hash = match &user.auth {
            AuthMode::Local { password_hash } => password_hash,
            AuthMode::Social { provider, .. } => {
                warn!(user_id = user.id, "password login against social account");
                return Err(AuthError::Authentication(format!(
                    "Please login with {}",
                    provider.as_str()
                )));
            }
        };

        if !crate::password::verify(password, password_hash) {
            warn!(user_id = user.id, "password mismatch");
            return Err(AuthError::Authentication("Invalid credentials".to_string()));
        }

        check_account_gates(&user)?;

        let grant = self.issue_grant(user)?;
        info!(user_id = grant.user.id, "local login");
        Ok(grant)
    }

    /// Authenticate with a provider credential, creating the account on
    /// first contact.
    ///
    /// # Errors
    ///
    /// `Validation` for an unconfigured provider, `Authentication` when the
    /// provider rejects the credential, `Upstream` when the provider is
    /// unreachable, `Conflict` when the attested email belongs to a
    /// password-credentialed account.
    pub async fn social_login(
        &self,
        provider: SocialProvider,
        credential: &str,
    ) -> Result<SocialGrant, AuthError> {
        let verifier = self.providers.get(&provider).ok_or_else(|| {
            AuthError::Validation(format!("Unsupported provider: {}", provider.as_str()))
        })?;
        let identity = verifier.verify(credential).await?;

        if let Some(user) =
            UserRepo::find_by_social_identity(&self.pool, provider, &identity.subject_id).await?
        {
            let grant = self.issue_grant(user)?;
            info!(user_id = grant.user.id, provider = provider.as_str(), "social login");
            return Ok(SocialGrant {
                grant,
                is_new_user: false,
            });
        }

        let email = identity
            .email
            .as_deref()
            .map(|email| email.trim().to_lowercase());
        if let Some(email) = email.as_deref() {
            if let Some(existing) = UserRepo::find_by_email(&self.pool, email).await? {
                if existing.auth.is_local() {
                    return Err(AuthError::Conflict(
                        "Email already registered with local account".to_string(),
                    ));
                }
            }
        }

        let base = username::slugify(identity.display_name.as_deref().unwrap_or(""));
        for attempt in 0..MAX_USERNAME_ATTEMPTS {
            let candidate = username::candidate(&base, attempt);
            let outcome = UserRepo::insert_social(
                &self.pool,
                &candidate,
                email.as_deref(),
                provider,
                &identity.subject_id,
            )
            .await?;
            match outcome {
                InsertUserOutcome::Created(user) => {
                    info!(
                        user_id = user.id,
                        provider = provider.as_str(),
                        "created account from social login"
                    );
                    let grant = self.issue_grant(user)?;
                    return Ok(SocialGrant {
                        grant,
                        is_new_user: true,
                    });
                }
                InsertUserOutcome::UsernameTaken => continue,
                InsertUserOutcome::EmailTaken => {
                    return Err(AuthError::Conflict("Email already registered".to_string()))
                }
                InsertUserOutcome::PhoneTaken => {
                    return Err(AuthError::Internal(anyhow::anyhow!(
                        "unexpected phone conflict inserting social user"
                    )))
                }
                InsertUserOutcome::SocialIdentityTaken => {
                    // Lost the creation race; the account now exists.
                    let user = UserRepo::find_by_social_identity(
                        &self.pool,
                        provider,
                        &identity.subject_id,
                    )
                    .await?
                    .ok_or_else(|| {
                        AuthError::Internal(anyhow::anyhow!(
                            "provider identity vanished after unique violation"
                        ))
                    })?;
                    let grant = self.issue_grant(user)?;
                    return Ok(SocialGrant {
                        grant,
                        is_new_user: false,
                    });
                }
            }
        }

        Err(AuthError::Internal(anyhow::anyhow!(
            "failed to allocate a unique username after {MAX_USERNAME_ATTEMPTS} attempts"
        )))
    }

    /// Issue a verification passcode for an account and deliver it through
    /// the notifier. Returns the masked-target confirmation message.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown user, `Validation` when the account is
    /// already verified or lacks the requested contact point, `RateLimited`
    /// on the creation throttle, `Upstream` when delivery fails.
    pub async fn request_otp(
        &self,
        user_id: i64,
        method: OtpMethod,
    ) -> Result<String, AuthError> {
        let user = UserRepo::find_by_id(&self.pool, user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

        if user.account_verified {
            return Err(AuthError::Validation("Account already verified".to_string()));
        }

        let (target, masked) = match method {
            OtpMethod::Email => {
                let email = user.email.as_deref().ok_or_else(|| {
                    AuthError::Validation("No email address on file".to_string())
                })?;
                (email, crypto::mask_email(email))
            }
            OtpMethod::Sms => {
                let phone = user.phone_number.as_deref().ok_or_else(|| {
                    AuthError::Validation("No phone number on file".to_string())
                })?;
                (phone, crypto::mask_phone(phone))
            }
        };

        let passcode = self.otp.create(user.id, method, &masked).await?;

        self.notifier
            .send_passcode(method, target, &passcode, &user.username)
            .await
            .map_err(|err| {
                warn!(user_id, error = %err, "passcode delivery failed");
                AuthError::Upstream("Failed to send OTP".to_string())
            })?;

        Ok(format!("OTP sent to {masked}"))
    }

    /// Verify a passcode and mark the account verified.
    ///
    /// # Errors
    ///
    /// `Validation` for a malformed passcode or no pending challenge,
    /// `Expired` / `AttemptsExceeded` for dead challenges, `Authentication`
    /// for a wrong passcode (with remaining attempts in the message),
    /// `NotFound` if the user row has vanished.
    pub async fn verify_otp(&self, user_id: i64, passcode: &str) -> Result<String, AuthError> {
        if passcode.len() != crypto::PASSCODE_LENGTH
            || !passcode.chars().all(|c| c.is_ascii_digit())
        {
            return Err(AuthError::Validation("OTP must be 6 digits".to_string()));
        }

        match self.otp.verify(user_id, passcode).await? {
            VerifyOutcome::Verified => {}
            VerifyOutcome::NoPending => {
                return Err(AuthError::Validation(
                    "No pending OTP request. Please request a new one.".to_string(),
                ))
            }
            VerifyOutcome::Expired => {
                return Err(AuthError::Expired(
                    "OTP has expired. Please request a new one.".to_string(),
                ))
            }
            VerifyOutcome::AttemptsExceeded => {
                return Err(AuthError::AttemptsExceeded(
                    "Too many failed attempts. Please request a new OTP.".to_string(),
                ))
            }
            VerifyOutcome::Mismatch { remaining } => {
                return Err(AuthError::Authentication(format!(
                    "Invalid OTP. {remaining} attempts remaining."
                )))
            }
        }

        if !UserRepo::set_account_verified(&self.pool, user_id).await? {
            return Err(AuthError::NotFound("User not found".to_string()));
        }
        info!(user_id, "account verified");
        Ok("Account verified successfully. You can now login.".to_string())
    }

    async fn resolve_identifier(&self, identifier: &str) -> Result<Option<User>, AuthError> {
        if let Some(user) = UserRepo::find_by_username(&self.pool, identifier).await? {
            return Ok(Some(user));
        }
        if let Some(user) = UserRepo::find_by_email(&self.pool, identifier).await? {
            return Ok(Some(user));
        }
        Ok(UserRepo::find_by_phone(&self.pool, identifier).await?)
    }

    fn issue_grant(&self, user: User) -> Result<LoginGrant, AuthError> {
        let access_token = self
            .tokens
            .issue_access_token(user.id, &user.username, user.email.as_deref(), None)
            .map_err(|err| AuthError::Internal(anyhow::Error::new(err)))?;
        let refresh_token = self
            .tokens
            .issue_refresh_token(user.id)
            .map_err(|err| AuthError::Internal(anyhow::Error::new(err)))?;
        Ok(LoginGrant {
            user,
            access_token,
            refresh_token,
            expires_in: self.tokens.access_ttl_seconds(),
        })
    }
}

fn check_account_gates(user: &User) -> Result<(), AuthError> {
    match user.status {
        AccountStatus::Disabled => {
            return Err(AuthError::Authorization("Account is disabled".to_string()))
        }
        AccountStatus::Banned => {
            return Err(AuthError::Authorization("Account is banned".to_string()))
        }
        AccountStatus::Active => {}
    }
    if !user.account_verified {
        return Err(AuthError::Authorization(
            "Account not verified. Please verify with OTP.".to_string(),
        ));
    }
    Ok(())
}

fn validate_username(username: &str) -> Result<(), AuthError> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(AuthError::Validation(
            "Username must be 3-50 characters and contain only letters, numbers, and underscores"
                .to_string(),
        ))
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    let len = password.chars().count();
    if (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        Ok(())
    } else {
        Err(AuthError::Validation(
            "Password must be 6-128 characters".to_string(),
        ))
    }
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(AuthError::Validation("Invalid email format".to_string()))
    }
}

fn validate_phone(phone: &str) -> Result<(), AuthError> {
    if PHONE_RE.is_match(phone) {
        Ok(())
    } else {
        Err(AuthError::Validation(
            "Invalid phone number format".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(validate_username("khang_99").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("dot.name").is_err());
        assert!(validate_username(&"x".repeat(51)).is_err());
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("secret").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"p".repeat(128)).is_ok());
        assert!(validate_password(&"p".repeat(129)).is_err());
    }

    #[test]
    fn email_rules() {
        assert!(validate_email("khang@gmail.com").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("two@@signs.io").is_err());
        assert!(validate_email("spaced @mail.io").is_err());
        assert!(validate_email("nodot@host").is_err());
    }

    #[test]
    fn phone_rules() {
        assert!(validate_phone("+84912344567").is_ok());
        assert!(validate_phone("0912344567").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("+84-912-344").is_err());
    }

    #[test]
    fn disabled_and_banned_accounts_are_gated() {
        let mut user = User {
            id: 1,
            username: "khang".to_string(),
            email: Some("khang@gmail.com".to_string()),
            phone_number: None,
            auth: AuthMode::Local {
                password_hash: "$argon2id$...".to_string(),
            },
            status: AccountStatus::Active,
            account_verified: true,
            profile_completed: false,
            created_at: chrono::Utc::now(),
        };
        assert!(check_account_gates(&user).is_ok());

        user.status = AccountStatus::Disabled;
        assert!(matches!(
            check_account_gates(&user),
            Err(AuthError::Authorization(message)) if message == "Account is disabled"
        ));

        user.status = AccountStatus::Banned;
        assert!(matches!(
            check_account_gates(&user),
            Err(AuthError::Authorization(message)) if message == "Account is banned"
        ));

        user.status = AccountStatus::Active;
        user.account_verified = false;
        assert!(matches!(
            check_account_gates(&user),
            Err(AuthError::Authorization(message))
                if message == "Account not verified. Please verify with OTP."
        ));
    }
}
