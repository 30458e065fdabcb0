//! Claim Ledger
//!
//! Durable store of last-claim timestamps, one row per identity. The ledger is
//! the only writer of claim records; everything else reads through it.
//!
//! ## Example
//! ```rust,ignore
//! use lib_faucet::ledger::{ClaimLedger, RecordOutcome};
//!
//! async fn claim_once<L: ClaimLedger>(ledger: &L, fid: Fid, now: DateTime<Utc>) -> anyhow::Result<bool> {
//!     let seen = ledger.get_last_claim(fid).await?.map(|r| r.last_claimed_at);
//!     let outcome = ledger.record_claim_if(fid, seen, now).await?;
//!     Ok(outcome == RecordOutcome::Recorded)
//! }
//! ```

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{ClaimRecord, Fid};

pub use memory::MemoryLedger;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteLedger;

/// Result of a conditional ledger write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The write landed.
    Recorded,
    /// Another claim was recorded since the caller read the ledger.
    Conflict,
}

/// Async claim ledger abstraction.
#[async_trait]
pub trait ClaimLedger: Send + Sync {
    /// Last successful claim for `fid`, or `None` if it never claimed.
    async fn get_last_claim(&self, fid: Fid) -> Result<Option<ClaimRecord>>;

    /// Upsert the last claim time.
    ///
    /// Implementations must keep `last_claimed_at` monotonic: an older
    /// timestamp never overwrites a newer one. The value read back by
    /// `get_last_claim` equals `at` exactly.
    async fn record_claim(&self, fid: Fid, at: DateTime<Utc>) -> Result<()>;

    /// Compare-and-swap write.
    ///
    /// Succeeds only if the stored timestamp still equals `expected` (or the
    /// row is still absent when `expected` is `None`) and `at` does not move
    /// the record backwards.
    async fn record_claim_if(
        &self,
        fid: Fid,
        expected: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> Result<RecordOutcome>;
}

/// Stored representation: Unix epoch nanoseconds. Every timestamp between
/// 1677 and 2262 round-trips exactly; anything outside that range is refused.
pub(crate) fn to_nanos(at: DateTime<Utc>) -> Result<i64> {
    at.timestamp_nanos_opt()
        .ok_or_else(|| anyhow::anyhow!("Claim timestamp {} outside the storable range", at))
}

pub(crate) fn from_nanos(nanos: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_nanos(nanos)
}
