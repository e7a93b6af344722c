//! Database access for passcode challenges.

use crate::otp::models::{OtpMethod, OtpRequest};
use anyhow::{Context, Result};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{info_span, Instrument};
use uuid::Uuid;

pub struct OtpRepo;

impl OtpRepo {
    /// Serialize challenge creation per user for the rest of the transaction.
    ///
    /// Without it, two concurrent creations for the same user touch no common
    /// row: both count under the rate limit, both supersede zero rows, both
    /// insert, and two pending challenges survive. The lock is
    /// transaction-scoped and keyed on the user id.
    ///
    /// # Errors
    /// Returns an error if the lock query fails.
    pub async fn lock_user(tx: &mut Transaction<'_, Postgres>, user_id: i64) -> Result<()> {
        let query = "SELECT pg_advisory_xact_lock($1)";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(user_id)
            .execute(&mut **tx)
            .instrument(span)
            .await
            .context("failed to take per-user otp creation lock")?;
        Ok(())
    }

    /// Count challenge creations for a user inside the trailing window.
    ///
    /// Runs inside the creation transaction so the rate limit is one query
    /// against the store, correct across service instances.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn count_recent(
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
        window_seconds: i64,
    ) -> Result<i64> {
        let query = r"
            SELECT COUNT(*) AS recent
            FROM otp_requests
            WHERE user_id = $1
              AND created_at > NOW() - ($2 * INTERVAL '1 second')
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(user_id)
            .bind(window_seconds)
            .fetch_one(&mut **tx)
            .instrument(span)
            .await
            .context("failed to count recent otp requests")?;
        Ok(row.get("recent"))
    }

    /// Mark every pending challenge for the user superseded. Only the newest
    /// challenge is ever valid.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn supersede_pending(
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
    ) -> Result<u64> {
        let query = r"
            UPDATE otp_requests
            SET status = 'superseded'
            WHERE user_id = $1
              AND status = 'pending'
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(user_id)
            .execute(&mut **tx)
            .instrument(span)
            .await
            .context("failed to supersede pending otp requests")?;
        Ok(result.rows_affected())
    }

    /// Insert a new pending challenge.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
        code_hash: &[u8],
        method: OtpMethod,
        target: &str,
        ttl_seconds: i64,
    ) -> Result<Uuid> {
        let query = r"
            INSERT INTO otp_requests (id, user_id, code_hash, method, target, expires_at)
            VALUES ($1, $2, $3, $4, $5, NOW() + ($6 * INTERVAL '1 second'))
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let id = Uuid::new_v4();
        sqlx::query(query)
            .bind(id)
            .bind(user_id)
            .bind(code_hash)
            .bind(method.as_str())
            .bind(target)
            .bind(ttl_seconds)
            .execute(&mut **tx)
            .instrument(span)
            .await
            .context("failed to insert otp request")?;
        Ok(id)
    }

    /// Load the most recently created pending challenge for a user.
    /// Consumed and superseded rows are invisible here, so a stale passcode
    /// reports "no pending request" even when it matches.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn find_latest_pending(pool: &PgPool, user_id: i64) -> Result<Option<OtpRequest>> {
        let query = r"
            SELECT id, user_id, code_hash, method, target, status, attempts,
                   created_at, expires_at
            FROM otp_requests
            WHERE user_id = $1
              AND status = 'pending'
            ORDER BY created_at DESC
            LIMIT 1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        sqlx::query_as::<_, OtpRequest>(query)
            .bind(user_id)
            .fetch_optional(pool)
            .instrument(span)
            .await
            .context("failed to fetch latest pending otp request")
    }

    /// Atomically claim one verify attempt.
    ///
    /// The guard and the increment are a single conditional UPDATE, so two
    /// concurrent verifies can never both observe `attempts < limit` and both
    /// proceed. Returns the attempt count after the increment, or `None` when
    /// the row is no longer pending or already at the limit.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn claim_attempt(pool: &PgPool, id: Uuid, limit: i32) -> Result<Option<i32>> {
        let query = r"
            UPDATE otp_requests
            SET attempts = attempts + 1
            WHERE id = $1
              AND status = 'pending'
              AND attempts < $2
            RETURNING attempts
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .bind(limit)
            .fetch_optional(pool)
            .instrument(span)
            .await
            .context("failed to increment otp attempts")?;
        Ok(row.map(|row| row.get("attempts")))
    }

    /// Mark a challenge consumed after a successful match.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn mark_consumed(pool: &PgPool, id: Uuid) -> Result<()> {
        let query = r"
            UPDATE otp_requests
            SET status = 'consumed'
            WHERE id = $1
              AND status = 'pending'
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id)
            .execute(pool)
            .instrument(span)
            .await
            .context("failed to mark otp request consumed")?;
        Ok(())
    }
}
