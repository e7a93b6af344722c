//! Full account lifecycle against a real Postgres: signup, login refused
//! while unverified, passcode verification, then login with a decodable
//! token pair.
//!
//! Gated on `DATABASE_URL`; without it every test skips.

use anyhow::{ensure, Context, Result};
use async_trait::async_trait;
use luna_auth::error::AuthError;
use luna_auth::identity::{IdentityResolver, SignupInput};
use luna_auth::notify::Notifier;
use luna_auth::otp::{OtpConfig, OtpLedger, OtpMethod};
use luna_auth::token::{TokenIssuer, TokenKind};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::env;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

async fn test_pool() -> Result<Option<PgPool>> {
    let Ok(dsn) = env::var("DATABASE_URL") else {
        eprintln!("Skipping integration test: DATABASE_URL is not set");
        return Ok(None);
    };
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&dsn)
        .await
        .context("Failed to connect to Postgres")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    Ok(Some(pool))
}

/// Captures passcodes instead of delivering them.
#[derive(Default)]
struct RecordingNotifier {
    passcodes: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn last_passcode(&self) -> Option<String> {
        self.passcodes.lock().expect("notifier lock").last().cloned()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_passcode(
        &self,
        _method: OtpMethod,
        _target: &str,
        passcode: &str,
        _display_name: &str,
    ) -> Result<()> {
        self.passcodes
            .lock()
            .expect("notifier lock")
            .push(passcode.to_string());
        Ok(())
    }
}

#[tokio::test]
async fn signup_verify_then_login() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };

    let tokens = TokenIssuer::new(SecretString::from("integration-signing-secret"));
    let ledger = OtpLedger::new(pool.clone(), OtpConfig::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let resolver = IdentityResolver::new(pool.clone(), tokens.clone(), ledger, notifier.clone());

    let username = format!("flow_{}", Uuid::new_v4().simple());
    let user = resolver
        .signup(SignupInput {
            username: username.clone(),
            password: "hunter2pass".to_string(),
            email: Some(format!("{username}@example.com")),
            phone_number: None,
        })
        .await?;
    ensure!(!user.account_verified, "local signup must start unverified");

    let refused = resolver.login(&username, "hunter2pass").await;
    ensure!(
        matches!(refused, Err(AuthError::Authorization(_))),
        "unverified login must be refused, got {refused:?}"
    );

    let message = resolver.request_otp(user.id, OtpMethod::Email).await?;
    ensure!(
        message.starts_with("OTP sent to "),
        "unexpected confirmation message: {message}"
    );
    let passcode = notifier
        .last_passcode()
        .context("notifier captured no passcode")?;

    resolver.verify_otp(user.id, &passcode).await?;

    let grant = resolver.login(&username, "hunter2pass").await?;
    ensure!(grant.user.account_verified);
    ensure!(grant.expires_in > 0);

    let claims = tokens.decode(&grant.access_token, TokenKind::Access)?;
    ensure!(
        claims.sub == user.id.to_string(),
        "access token subject mismatch: {}",
        claims.sub
    );
    tokens.decode(&grant.refresh_token, TokenKind::Refresh)?;
    Ok(())
}

#[tokio::test]
async fn second_verification_request_supersedes_the_first_passcode() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };

    let tokens = TokenIssuer::new(SecretString::from("integration-signing-secret"));
    let ledger = OtpLedger::new(pool.clone(), OtpConfig::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let resolver = IdentityResolver::new(pool.clone(), tokens, ledger, notifier.clone());

    let username = format!("flow_{}", Uuid::new_v4().simple());
    let user = resolver
        .signup(SignupInput {
            username: username.clone(),
            password: "hunter2pass".to_string(),
            email: Some(format!("{username}@example.com")),
            phone_number: None,
        })
        .await?;

    resolver.request_otp(user.id, OtpMethod::Email).await?;
    let first = notifier
        .last_passcode()
        .context("notifier captured no passcode")?;
    resolver.request_otp(user.id, OtpMethod::Email).await?;
    let second = notifier
        .last_passcode()
        .context("notifier captured no passcode")?;

    if first != second {
        let stale = resolver.verify_otp(user.id, &first).await;
        ensure!(
            matches!(stale, Err(AuthError::Authentication(_))),
            "stale passcode must not verify, got {stale:?}"
        );
    }

    resolver.verify_otp(user.id, &second).await?;
    Ok(())
}
