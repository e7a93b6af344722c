//! Database access for identity records.

use crate::identity::models::{SocialProvider, User};
use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::{info_span, Instrument};

const USER_COLUMNS: &str = "id, username, email, phone_number, password_hash, \
     social_provider, social_uid, status, account_verified, profile_completed, created_at";

/// Result of an insert attempt, with unique violations mapped back to the
/// column family that fired so callers can answer precisely.
#[derive(Debug)]
pub enum InsertUserOutcome {
    Created(User),
    UsernameTaken,
    EmailTaken,
    PhoneTaken,
    /// A racing first login created the same provider identity; re-read it.
    SocialIdentityTaken,
}

pub struct UserRepo;

impl UserRepo {
    /// Insert a password-credentialed user.
    ///
    /// # Errors
    /// Returns an error if the insert fails for any reason other than a
    /// unique violation.
    pub async fn insert_local(
        pool: &PgPool,
        username: &str,
        email: Option<&str>,
        phone_number: Option<&str>,
        password_hash: &str,
    ) -> Result<InsertUserOutcome> {
        let query = format!(
            r"
            INSERT INTO users (username, email, phone_number, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
        "
        );
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query.as_str()
        );
        let result = sqlx::query_as::<_, User>(&query)
            .bind(username)
            .bind(email)
            .bind(phone_number)
            .bind(password_hash)
            .fetch_one(pool)
            .instrument(span)
            .await;
        match result {
            Ok(user) => Ok(InsertUserOutcome::Created(user)),
            Err(err) => match unique_violation_outcome(&err) {
                Some(outcome) => Ok(outcome),
                None => Err(err).context("failed to insert local user"),
            },
        }
    }

    /// Insert a provider-credentialed user. Social accounts are born verified
    /// since the provider already attested to the identity.
    ///
    /// # Errors
    /// Returns an error if the insert fails for any reason other than a
    /// unique violation.
    pub async fn insert_social(
        pool: &PgPool,
        username: &str,
        email: Option<&str>,
        provider: SocialProvider,
        subject_id: &str,
    ) -> Result<InsertUserOutcome> {
        let query = format!(
            r"
            INSERT INTO users (username, email, social_provider, social_uid, account_verified)
            VALUES ($1, $2, $3, $4, TRUE)
            RETURNING {USER_COLUMNS}
        "
        );
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query.as_str()
        );
        let result = sqlx::query_as::<_, User>(&query)
            .bind(username)
            .bind(email)
            .bind(provider.as_str())
            .bind(subject_id)
            .fetch_one(pool)
            .instrument(span)
            .await;
        match result {
            Ok(user) => Ok(InsertUserOutcome::Created(user)),
            Err(err) => match unique_violation_outcome(&err) {
                Some(outcome) => Ok(outcome),
                None => Err(err).context("failed to insert social user"),
            },
        }
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .instrument(span)
            .await
            .context("failed to fetch user by id")
    }

    /// Case-insensitive username lookup.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(username) = LOWER($1)");
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(pool)
            .instrument(span)
            .await
            .context("failed to fetch user by username")
    }

    /// Case-insensitive email lookup.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .instrument(span)
            .await
            .context("failed to fetch user by email")
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub async fn find_by_phone(pool: &PgPool, phone_number: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE phone_number = $1");
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        sqlx::query_as::<_, User>(&query)
            .bind(phone_number)
            .fetch_optional(pool)
            .instrument(span)
            .await
            .context("failed to fetch user by phone number")
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub async fn find_by_social_identity(
        pool: &PgPool,
        provider: SocialProvider,
        subject_id: &str,
    ) -> Result<Option<User>> {
        let query = format!(
            r"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE social_provider = $1
              AND social_uid = $2
        "
        );
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        sqlx::query_as::<_, User>(&query)
            .bind(provider.as_str())
            .bind(subject_id.to_string())
            .fetch_optional(pool)
            .instrument(span)
            .await
            .context("failed to fetch user by provider identity")
    }

    /// Flip the verification flag. Returns whether a row changed.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn set_account_verified(pool: &PgPool, id: i64) -> Result<bool> {
        let query = r"
            UPDATE users
            SET account_verified = TRUE
            WHERE id = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id)
            .execute(pool)
            .instrument(span)
            .await
            .context("failed to mark account verified")?;
        Ok(result.rows_affected() > 0)
    }
}

/// Map a unique violation (SQLSTATE 23505) to the outcome for the constraint
/// that fired. Constraint names match the migration.
fn unique_violation_outcome(err: &sqlx::Error) -> Option<InsertUserOutcome> {
    let db_err = err.as_database_error()?;
    if db_err.code().as_deref() != Some("23505") {
        return None;
    }
    match db_err.constraint() {
        Some("users_username_lower_key") => Some(InsertUserOutcome::UsernameTaken),
        Some("users_email_lower_key") => Some(InsertUserOutcome::EmailTaken),
        Some("users_phone_number_key") => Some(InsertUserOutcome::PhoneTaken),
        _ => Some(InsertUserOutcome::SocialIdentityTaken),
    }
}
