//! SQLite claim ledger
//!
//! Persists one row per identity in `faucet_claims`.
//!
//! # Features
//!
//! - WAL mode enabled for concurrent readers
//! - Embedded schema migration on open
//! - Async operations via sqlx
//! - Conditional updates for compare-and-swap claim recording

use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tracing::{debug, info};

use super::{from_nanos, to_nanos, ClaimLedger, RecordOutcome};
use crate::types::{ClaimRecord, Fid};

/// Row shape of `faucet_claims`
#[derive(Debug, Clone, FromRow)]
struct ClaimRow {
    fid: i64,
    /// Unix epoch nanoseconds
    last_claimed_at: i64,
}

impl ClaimRow {
    fn into_record(self) -> Result<ClaimRecord> {
        let fid = u64::try_from(self.fid).map_err(|_| anyhow!("Negative fid in ledger: {}", self.fid))?;
        Ok(ClaimRecord::new(Fid(fid), from_nanos(self.last_claimed_at)))
    }
}

/// SQLite-based claim ledger
#[derive(Debug, Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Open or create a ledger database at the given path
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let url = format!("sqlite:{}?mode=rwc", path.display());

        info!("Opening claim ledger at: {}", path.display());

        let options = SqliteConnectOptions::from_str(&url)?
            .journal_mode(SqliteJournalMode::Wal)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| anyhow!("Failed to connect to SQLite: {}", e))?;

        Self::run_migrations(&pool).await?;

        info!("Claim ledger initialized");

        Ok(Self { pool })
    }

    /// Open an in-memory ledger (for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .journal_mode(SqliteJournalMode::Wal)
            .create_if_missing(true);

        // A single connection so every query sees the same in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| anyhow!("Failed to create in-memory SQLite: {}", e))?;

        Self::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        debug!("Running claim ledger migrations...");

        const MIGRATION_V1: &str = r#"
CREATE TABLE IF NOT EXISTS faucet_claims (
    fid INTEGER PRIMARY KEY,
    last_claimed_at INTEGER NOT NULL
);
"#;

        sqlx::raw_sql(MIGRATION_V1)
            .execute(pool)
            .await
            .map_err(|e| anyhow!("Migration failed: {}", e))?;

        debug!("Migrations completed successfully");
        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Number of identities with a recorded claim
    pub async fn count_claims(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM faucet_claims")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| anyhow!("Failed to count claims: {}", e))?;
        Ok(count)
    }
}

fn fid_param(fid: Fid) -> Result<i64> {
    i64::try_from(fid.get()).map_err(|_| anyhow!("fid {} does not fit the ledger key", fid))
}

#[async_trait]
impl ClaimLedger for SqliteLedger {
    async fn get_last_claim(&self, fid: Fid) -> Result<Option<ClaimRecord>> {
        let row = sqlx::query_as::<_, ClaimRow>(
            "SELECT fid, last_claimed_at FROM faucet_claims WHERE fid = ?",
        )
        .bind(fid_param(fid)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to read claim for fid {}: {}", fid, e))?;

        row.map(ClaimRow::into_record).transpose()
    }

    async fn record_claim(&self, fid: Fid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO faucet_claims (fid, last_claimed_at)
            VALUES (?, ?)
            ON CONFLICT(fid) DO UPDATE SET
                last_claimed_at = MAX(faucet_claims.last_claimed_at, excluded.last_claimed_at)
            "#,
        )
        .bind(fid_param(fid)?)
        .bind(to_nanos(at)?)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to record claim for fid {}: {}", fid, e))?;

        Ok(())
    }

    async fn record_claim_if(
        &self,
        fid: Fid,
        expected: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> Result<RecordOutcome> {
        let key = fid_param(fid)?;
        let at = to_nanos(at)?;
        let expected = expected.map(to_nanos).transpose()?;

        let result = match expected {
            None => sqlx::query(
                "INSERT INTO faucet_claims (fid, last_claimed_at) VALUES (?, ?) ON CONFLICT(fid) DO NOTHING",
            )
            .bind(key)
            .bind(at)
            .execute(&self.pool)
            .await,
            Some(expected) => sqlx::query(
                r#"
                UPDATE faucet_claims SET last_claimed_at = ?
                WHERE fid = ? AND last_claimed_at = ? AND last_claimed_at <= ?
                "#,
            )
            .bind(at)
            .bind(key)
            .bind(expected)
            .bind(at)
            .execute(&self.pool)
            .await,
        }
        .map_err(|e| anyhow!("Failed to record claim for fid {}: {}", fid, e))?;

        if result.rows_affected() == 1 {
            Ok(RecordOutcome::Recorded)
        } else {
            debug!(fid = %fid, "Conditional claim write lost to a concurrent claim");
            Ok(RecordOutcome::Conflict)
        }
    }
}
