//! External Collaborators
//!
//! Interfaces the claim workflow consumes: frame action verification,
//! identity-to-address lookup and the chain client. Implementations live in
//! the server crate; tests provide their own.

use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use thiserror::Error;

use crate::types::Fid;

/// Failure reported by (or while talking to) an external service.
#[derive(Debug, Clone, Error)]
#[error("{service} request failed: {message}")]
pub struct CollaboratorError {
    /// Service name for logs, e.g. `"neynar"`.
    pub service: &'static str,
    /// User-facing message supplied by the service, when it sent one.
    pub detail: Option<String>,
    /// Diagnostic message for operators.
    pub message: String,
}

impl CollaboratorError {
    pub fn new(service: &'static str, message: impl Into<String>) -> Self {
        Self {
            service,
            detail: None,
            message: message.into(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Identity extracted from an authenticated frame action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedAction {
    pub fid: Fid,
}

#[derive(Debug, Clone, Error)]
pub enum VerifyError {
    /// The action is malformed or its signature does not check out.
    #[error("invalid frame action: {0}")]
    Invalid(String),

    /// The verification service could not be reached or errored.
    #[error(transparent)]
    Service(#[from] CollaboratorError),
}

/// Authenticates signed frame actions.
#[async_trait]
pub trait ActionVerifier: Send + Sync {
    async fn verify(&self, message_bytes: &[u8]) -> Result<VerifiedAction, VerifyError>;
}

/// Maps an identity to its first verified payout address.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// `Ok(None)` means the identity has no verified address, which is final.
    async fn resolve(&self, fid: Fid) -> Result<Option<Address>, CollaboratorError>;
}

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    /// The node refused the transaction (insufficient funds, nonce, bad address...).
    #[error("transfer rejected: {0}")]
    Rejected(String),

    /// Transport or RPC failure before a transaction hash was known.
    #[error("chain RPC error: {0}")]
    Rpc(String),

    /// The transaction was mined but execution failed.
    #[error("transaction {0} reverted")]
    Reverted(TxHash),

    /// Waiting for confirmation failed.
    #[error("confirmation failed: {0}")]
    Confirmation(String),
}

/// Funding-account transfer primitive.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Sign and broadcast a value transfer from the faucet account.
    async fn submit_transfer(&self, to: Address, amount: U256) -> Result<TxHash, ChainError>;

    /// Wait until `tx_hash` is included and final per the network's rule.
    async fn await_confirmation(&self, tx_hash: TxHash) -> Result<(), ChainError>;
}
