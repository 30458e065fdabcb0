//! In-memory claim ledger for tests and ephemeral development runs.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{from_nanos, to_nanos, ClaimLedger, RecordOutcome};
use crate::types::{ClaimRecord, Fid};

/// Ledger backed by a shared map of fid -> epoch nanoseconds.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    claims: Arc<RwLock<HashMap<Fid, i64>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identities that have claimed at least once.
    pub async fn len(&self) -> usize {
        self.claims.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.claims.read().await.is_empty()
    }
}

#[async_trait]
impl ClaimLedger for MemoryLedger {
    async fn get_last_claim(&self, fid: Fid) -> Result<Option<ClaimRecord>> {
        let claims = self.claims.read().await;
        match claims.get(&fid) {
            Some(&nanos) => Ok(Some(ClaimRecord::new(fid, from_nanos(nanos)))),
            None => Ok(None),
        }
    }

    async fn record_claim(&self, fid: Fid, at: DateTime<Utc>) -> Result<()> {
        let at = to_nanos(at)?;
        let mut claims = self.claims.write().await;
        let entry = claims.entry(fid).or_insert(at);
        *entry = (*entry).max(at);
        Ok(())
    }

    async fn record_claim_if(
        &self,
        fid: Fid,
        expected: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> Result<RecordOutcome> {
        let at = to_nanos(at)?;
        let expected = expected.map(to_nanos).transpose()?;
        let mut claims = self.claims.write().await;

        let current = claims.get(&fid).copied();
        if current != expected || current.is_some_and(|stored| at < stored) {
            return Ok(RecordOutcome::Conflict);
        }

        claims.insert(fid, at);
        Ok(RecordOutcome::Recorded)
    }
}
