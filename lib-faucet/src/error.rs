//! Claim error taxonomy
//!
//! Expected outcomes (cooldown, no address) are not errors; see
//! `orchestrator::ClaimOutcome`. Everything here ends the request with a
//! failure reply.

use alloy_primitives::TxHash;
use thiserror::Error;

use crate::collaborators::{CollaboratorError, VerifyError};
use crate::disbursement::DisbursementError;

/// Shown when nothing more specific can be said.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred.";

#[derive(Debug, Error)]
pub enum ClaimError {
    /// Verification failed or the payload was malformed.
    #[error("Invalid frame action: {0}")]
    InvalidAction(String),

    /// Verification, lookup or another external call failed.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// Reading the claim ledger failed.
    #[error("Claim ledger error: {0}")]
    Ledger(anyhow::Error),

    /// Transfer submission or confirmation failed. The ledger is untouched.
    #[error(transparent)]
    Disbursement(#[from] DisbursementError),

    /// Funds were sent but the claim could not be recorded.
    #[error("Transfer {tx_hash} confirmed but claim not recorded: {reason}")]
    Unrecorded { tx_hash: TxHash, reason: String },
}

impl From<VerifyError> for ClaimError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Invalid(reason) => ClaimError::InvalidAction(reason),
            VerifyError::Service(err) => ClaimError::Collaborator(err),
        }
    }
}

impl ClaimError {
    /// HTTP status code for the reply.
    pub fn status_code(&self) -> u16 {
        match self {
            ClaimError::InvalidAction(_) => 400,
            _ => 500,
        }
    }

    /// Message safe to show the claimant.
    pub fn user_message(&self) -> String {
        match self {
            ClaimError::InvalidAction(_) => "Invalid frame action".to_string(),
            ClaimError::Collaborator(err) => err
                .detail
                .clone()
                .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string()),
            ClaimError::Ledger(_) | ClaimError::Disbursement(_) => GENERIC_ERROR_MESSAGE.to_string(),
            ClaimError::Unrecorded { .. } => {
                "Tokens were sent, but your claim could not be recorded.".to_string()
            }
        }
    }
}
