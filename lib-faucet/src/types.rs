//! Faucet Type Definitions
//!
//! Identities, persisted claim records and the transient per-request attempt.

use std::fmt;

use alloy_primitives::{Address, TxHash, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Farcaster id of a claimant. One ledger row per fid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fid(pub u64);

impl Fid {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Fid {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Last successful claim of an identity, as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub fid: Fid,
    /// Time of the most recent confirmed disbursement. Never moves backwards.
    pub last_claimed_at: DateTime<Utc>,
}

impl ClaimRecord {
    pub fn new(fid: Fid, last_claimed_at: DateTime<Utc>) -> Self {
        Self { fid, last_claimed_at }
    }
}

/// A confirmed on-chain transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disbursement {
    pub tx_hash: TxHash,
    pub to: Address,
    pub amount: U256,
}

/// How a single claim attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    CooldownBlocked,
    NoAddress,
    Disbursed,
    Failed,
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::CooldownBlocked => write!(f, "cooldown_blocked"),
            AttemptOutcome::NoAddress => write!(f, "no_address"),
            AttemptOutcome::Disbursed => write!(f, "disbursed"),
            AttemptOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// Transient view of one claim request. Never persisted, only logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimAttempt {
    pub fid: Option<Fid>,
    pub address: Option<Address>,
    pub cooldown_ends_at: Option<DateTime<Utc>>,
    pub outcome: AttemptOutcome,
}

impl ClaimAttempt {
    pub fn new(outcome: AttemptOutcome) -> Self {
        Self {
            fid: None,
            address: None,
            cooldown_ends_at: None,
            outcome,
        }
    }
}
