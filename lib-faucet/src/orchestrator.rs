//! Claim Orchestrator
//!
//! Runs one claim request end to end:
//!
//! ```text
//! Received -> Verifying -> CheckingEligibility -> Blocked
//!                                             \-> ResolvingAddress -> NoAddress
//!                                                                 \-> Disbursing -> Recording -> Success
//!                                                                                \-> Failed    \-> DisbursedButUnrecorded
//! ```
//!
//! Every step returns an explicit result. The outcome or error is turned into
//! a [`ClaimReply`] exactly once, in [`ClaimOrchestrator::handle_claim`].

use std::sync::Arc;

use alloy_primitives::TxHash;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::collaborators::{ActionVerifier, AddressResolver};
use crate::disbursement::DisbursementEngine;
use crate::eligibility::{check_eligibility, Eligibility};
use crate::error::{ClaimError, GENERIC_ERROR_MESSAGE};
use crate::guard::ClaimLocks;
use crate::ledger::{ClaimLedger, RecordOutcome};
use crate::policy::FaucetPolicy;
use crate::types::{AttemptOutcome, ClaimAttempt, Disbursement, Fid};

/// Source of the current time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Expected terminal states of a claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    CooldownActive { fid: Fid, until: DateTime<Utc> },
    NoPayoutAddress { fid: Fid },
    Disbursed {
        fid: Fid,
        disbursement: Disbursement,
        recorded_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Ok,
    BadRequest,
    InternalError,
}

impl ReplyStatus {
    pub fn as_u16(&self) -> u16 {
        match self {
            ReplyStatus::Ok => 200,
            ReplyStatus::BadRequest => 400,
            ReplyStatus::InternalError => 500,
        }
    }

    fn from_code(code: u16) -> Self {
        match code {
            400 => ReplyStatus::BadRequest,
            200 => ReplyStatus::Ok,
            _ => ReplyStatus::InternalError,
        }
    }
}

/// Frame image shown with the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameImage {
    Initial,
    Success,
    Cooldown,
    Error,
}

impl FrameImage {
    pub fn file_name(&self) -> &'static str {
        match self {
            FrameImage::Initial => "initial.svg",
            FrameImage::Success => "success.svg",
            FrameImage::Cooldown => "cooldown.svg",
            FrameImage::Error => "error.svg",
        }
    }
}

/// Rendering-neutral reply for one claim request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimReply {
    pub status: ReplyStatus,
    pub image: FrameImage,
    pub message: String,
    /// Transfer to link to, when funds moved.
    pub transaction: Option<TxHash>,
}

impl ClaimReply {
    /// Generic failure reply for faults outside the claim workflow itself.
    pub fn internal_error() -> Self {
        Self {
            status: ReplyStatus::InternalError,
            image: FrameImage::Error,
            message: GENERIC_ERROR_MESSAGE.to_string(),
            transaction: None,
        }
    }

    /// Failure reply for `err`. Keeps the transaction link when funds moved.
    pub fn from_error(err: &ClaimError) -> Self {
        let transaction = match err {
            ClaimError::Unrecorded { tx_hash, .. } => Some(*tx_hash),
            _ => None,
        };

        Self {
            status: ReplyStatus::from_code(err.status_code()),
            image: FrameImage::Error,
            message: err.user_message(),
            transaction,
        }
    }
}

pub struct ClaimOrchestrator {
    verifier: Arc<dyn ActionVerifier>,
    resolver: Arc<dyn AddressResolver>,
    ledger: Arc<dyn ClaimLedger>,
    engine: Arc<DisbursementEngine>,
    policy: FaucetPolicy,
    locks: ClaimLocks,
    clock: Clock,
}

impl ClaimOrchestrator {
    pub fn new(
        verifier: Arc<dyn ActionVerifier>,
        resolver: Arc<dyn AddressResolver>,
        ledger: Arc<dyn ClaimLedger>,
        engine: Arc<DisbursementEngine>,
        policy: FaucetPolicy,
    ) -> Self {
        Self {
            verifier,
            resolver,
            ledger,
            engine,
            policy,
            locks: ClaimLocks::new(),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Share a lock registry between orchestrators serving the same ledger.
    pub fn with_locks(mut self, locks: ClaimLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn policy(&self) -> &FaucetPolicy {
        &self.policy
    }

    /// Handle one frame action and shape the reply. Never fails.
    pub async fn handle_claim(&self, message_bytes: &[u8]) -> ClaimReply {
        let mut attempt = ClaimAttempt::new(AttemptOutcome::Failed);
        let result = self.run(message_bytes, &mut attempt).await;

        let reply = match result {
            Ok(outcome) => self.reply_for_outcome(&outcome),
            Err(err) => ClaimReply::from_error(&err),
        };

        info!(
            fid = ?attempt.fid.map(|f| f.get()),
            address = ?attempt.address,
            cooldown_ends_at = ?attempt.cooldown_ends_at,
            outcome = %attempt.outcome,
            status = reply.status.as_u16(),
            "Claim finished"
        );

        reply
    }

    /// Run the claim workflow without shaping a reply.
    pub async fn process_claim(&self, message_bytes: &[u8]) -> Result<ClaimOutcome, ClaimError> {
        let mut attempt = ClaimAttempt::new(AttemptOutcome::Failed);
        self.run(message_bytes, &mut attempt).await
    }

    async fn run(
        &self,
        message_bytes: &[u8],
        attempt: &mut ClaimAttempt,
    ) -> Result<ClaimOutcome, ClaimError> {
        // Verifying
        let action = self.verifier.verify(message_bytes).await.map_err(|e| {
            warn!("Frame action rejected: {}", e);
            ClaimError::from(e)
        })?;
        let fid = action.fid;
        attempt.fid = Some(fid);
        debug!(fid = %fid, "Frame action verified");

        // Held until the claim is recorded or abandoned.
        let _guard = self.locks.acquire(fid).await;

        // CheckingEligibility
        let record = self.ledger.get_last_claim(fid).await.map_err(|e| {
            error!(fid = %fid, "Claim ledger read failed: {:#}", e);
            ClaimError::Ledger(e)
        })?;
        let observed = record.as_ref().map(|r| r.last_claimed_at);

        let now = (self.clock)();
        if let Eligibility::Blocked { until } =
            check_eligibility(record.as_ref(), now, self.policy.cooldown_chrono())
        {
            attempt.cooldown_ends_at = Some(until);
            attempt.outcome = AttemptOutcome::CooldownBlocked;
            debug!(fid = %fid, until = %until, "Claim blocked by cooldown");
            return Ok(ClaimOutcome::CooldownActive { fid, until });
        }

        // ResolvingAddress
        let resolved = self.resolver.resolve(fid).await.map_err(|e| {
            error!(fid = %fid, service = %e.service, "Address lookup failed: {}", e);
            ClaimError::from(e)
        })?;
        let Some(address) = resolved else {
            attempt.outcome = AttemptOutcome::NoAddress;
            return Ok(ClaimOutcome::NoPayoutAddress { fid });
        };
        attempt.address = Some(address);

        // Disbursing
        let disbursement = self.engine.disburse(address).await.map_err(|e| {
            error!(fid = %fid, to = %address, tx = ?e.tx_hash(), "Disbursement failed: {}", e);
            ClaimError::from(e)
        })?;

        // Recording
        let recorded_at = {
            let now = (self.clock)();
            observed.map_or(now, |prev| now.max(prev))
        };
        match self.ledger.record_claim_if(fid, observed, recorded_at).await {
            Ok(RecordOutcome::Recorded) => {
                attempt.outcome = AttemptOutcome::Disbursed;
                Ok(ClaimOutcome::Disbursed {
                    fid,
                    disbursement,
                    recorded_at,
                })
            }
            Ok(RecordOutcome::Conflict) => {
                error!(
                    fid = %fid,
                    tx = %disbursement.tx_hash,
                    "Transfer confirmed but a concurrent claim was recorded first"
                );
                Err(ClaimError::Unrecorded {
                    tx_hash: disbursement.tx_hash,
                    reason: "a concurrent claim was recorded first".to_string(),
                })
            }
            Err(e) => {
                error!(
                    fid = %fid,
                    tx = %disbursement.tx_hash,
                    "Transfer confirmed but ledger write failed: {:#}",
                    e
                );
                Err(ClaimError::Unrecorded {
                    tx_hash: disbursement.tx_hash,
                    reason: format!("{:#}", e),
                })
            }
        }
    }

    fn reply_for_outcome(&self, outcome: &ClaimOutcome) -> ClaimReply {
        match outcome {
            ClaimOutcome::CooldownActive { until, .. } => ClaimReply {
                status: ReplyStatus::Ok,
                image: FrameImage::Cooldown,
                message: format!(
                    "You have already claimed. Try again after {}.",
                    until.format("%Y-%m-%d %H:%M:%S UTC")
                ),
                transaction: None,
            },
            ClaimOutcome::NoPayoutAddress { .. } => ClaimReply {
                status: ReplyStatus::Ok,
                image: FrameImage::Error,
                message: "No verified wallet address found for your Farcaster account.".to_string(),
                transaction: None,
            },
            ClaimOutcome::Disbursed { disbursement, .. } => ClaimReply {
                status: ReplyStatus::Ok,
                image: FrameImage::Success,
                message: format!(
                    "Successfully sent {} {}!",
                    self.policy.display_amount(),
                    self.policy.token_symbol
                ),
                transaction: Some(disbursement.tx_hash),
            },
        }
    }
}
