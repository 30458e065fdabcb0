//! Disbursement Engine
//!
//! Sends the fixed payout to a resolved address and waits for confirmation.
//! Submissions from the funding account go through a single sequencer so two
//! claims never race for the same nonce; confirmation waits run concurrently
//! and are bounded. Nothing here retries: a retry is a new claim request.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, TxHash, U256};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::collaborators::{ChainClient, ChainError};
use crate::types::Disbursement;

/// Default bound on the confirmation wait.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);
/// Default bound on a single submission, sequencer wait excluded.
pub const DEFAULT_SUBMISSION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Error)]
pub enum DisbursementError {
    /// Submission failed; nothing was broadcast.
    #[error(transparent)]
    Rejected(ChainError),

    /// The node never answered the submission. Whether it was broadcast is unknown.
    #[error("transfer submission did not complete within {timeout:?}")]
    SubmissionTimeout { timeout: Duration },

    /// Broadcast succeeded but the transfer did not confirm.
    #[error("transfer {tx_hash} not confirmed: {reason}")]
    Unconfirmed { tx_hash: TxHash, reason: ChainError },

    #[error("transfer {tx_hash} not confirmed within {timeout:?}")]
    ConfirmationTimeout { tx_hash: TxHash, timeout: Duration },
}

impl DisbursementError {
    /// Hash of the broadcast transaction, if one exists.
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            DisbursementError::Rejected(_) | DisbursementError::SubmissionTimeout { .. } => None,
            DisbursementError::Unconfirmed { tx_hash, .. }
            | DisbursementError::ConfirmationTimeout { tx_hash, .. } => Some(*tx_hash),
        }
    }
}

pub struct DisbursementEngine {
    chain: Arc<dyn ChainClient>,
    amount: U256,
    confirmation_timeout: Duration,
    submission_timeout: Duration,
    /// One submission at a time per funding account.
    sequencer: Mutex<()>,
}

impl DisbursementEngine {
    pub fn new(chain: Arc<dyn ChainClient>, amount: U256) -> Self {
        Self {
            chain,
            amount,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            submission_timeout: DEFAULT_SUBMISSION_TIMEOUT,
            sequencer: Mutex::new(()),
        }
    }

    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    pub fn with_submission_timeout(mut self, timeout: Duration) -> Self {
        self.submission_timeout = timeout;
        self
    }

    pub fn amount(&self) -> U256 {
        self.amount
    }

    pub fn confirmation_timeout(&self) -> Duration {
        self.confirmation_timeout
    }

    pub fn submission_timeout(&self) -> Duration {
        self.submission_timeout
    }

    /// Submit the payout to `to` and block until it confirms.
    pub async fn disburse(&self, to: Address) -> Result<Disbursement, DisbursementError> {
        let tx_hash = {
            let _turn = self.sequencer.lock().await;
            debug!(to = %to, amount = %self.amount, "Submitting faucet transfer");
            match tokio::time::timeout(self.submission_timeout, self.chain.submit_transfer(to, self.amount)).await {
                Ok(result) => result.map_err(DisbursementError::Rejected)?,
                Err(_) => {
                    warn!(to = %to, timeout = ?self.submission_timeout, "Faucet transfer submission timed out");
                    return Err(DisbursementError::SubmissionTimeout {
                        timeout: self.submission_timeout,
                    });
                }
            }
        };

        info!(to = %to, tx = %tx_hash, "Faucet transfer broadcast, awaiting confirmation");

        match tokio::time::timeout(self.confirmation_timeout, self.chain.await_confirmation(tx_hash)).await {
            Ok(Ok(())) => {
                info!(to = %to, tx = %tx_hash, "Faucet transfer confirmed");
                Ok(Disbursement {
                    tx_hash,
                    to,
                    amount: self.amount,
                })
            }
            Ok(Err(reason)) => {
                warn!(tx = %tx_hash, "Faucet transfer failed to confirm: {}", reason);
                Err(DisbursementError::Unconfirmed { tx_hash, reason })
            }
            Err(_) => {
                warn!(tx = %tx_hash, timeout = ?self.confirmation_timeout, "Faucet transfer confirmation timed out");
                Err(DisbursementError::ConfirmationTimeout {
                    tx_hash,
                    timeout: self.confirmation_timeout,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    /// Chain stub that tracks how many submissions overlap.
    struct SlowChain {
        submit_delay: Duration,
        confirm_delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        next: AtomicU64,
    }

    impl SlowChain {
        fn new(submit_delay: Duration, confirm_delay: Duration) -> Self {
            Self {
                submit_delay,
                confirm_delay,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                next: AtomicU64::new(1),
            }
        }
    }

    #[async_trait]
    impl ChainClient for SlowChain {
        async fn submit_transfer(&self, _to: Address, _amount: U256) -> Result<TxHash, ChainError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.submit_delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(TxHash::with_last_byte(self.next.fetch_add(1, Ordering::SeqCst) as u8))
        }

        async fn await_confirmation(&self, _tx_hash: TxHash) -> Result<(), ChainError> {
            tokio::time::sleep(self.confirm_delay).await;
            Ok(())
        }
    }

    /// First submission never returns; later ones succeed at once.
    struct StallingChain {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChainClient for StallingChain {
        async fn submit_transfer(&self, _to: Address, _amount: U256) -> Result<TxHash, ChainError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                std::future::pending::<()>().await;
            }
            Ok(TxHash::with_last_byte(7))
        }

        async fn await_confirmation(&self, _tx_hash: TxHash) -> Result<(), ChainError> {
            Ok(())
        }
    }

    struct RejectingChain;

    #[async_trait]
    impl ChainClient for RejectingChain {
        async fn submit_transfer(&self, _to: Address, _amount: U256) -> Result<TxHash, ChainError> {
            Err(ChainError::Rejected("insufficient funds for gas * price + value".into()))
        }

        async fn await_confirmation(&self, _tx_hash: TxHash) -> Result<(), ChainError> {
            unreachable!("nothing was submitted")
        }
    }

    #[tokio::test]
    async fn test_submissions_are_serialized() {
        let chain = Arc::new(SlowChain::new(Duration::from_millis(20), Duration::from_millis(1)));
        let engine = Arc::new(DisbursementEngine::new(chain.clone(), U256::from(5u64)));

        let mut handles = Vec::new();
        for i in 0..4u8 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine.disburse(Address::with_last_byte(i)).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(chain.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejection_has_no_tx_hash() {
        let engine = DisbursementEngine::new(Arc::new(RejectingChain), U256::from(1u64));
        let err = engine.disburse(Address::ZERO).await.unwrap_err();
        assert!(matches!(err, DisbursementError::Rejected(ChainError::Rejected(_))));
        assert!(err.tx_hash().is_none());
        assert!(err.to_string().contains("insufficient funds"));
    }

    #[tokio::test]
    async fn test_stalled_submission_releases_sequencer() {
        let chain = Arc::new(StallingChain {
            calls: AtomicUsize::new(0),
        });
        let engine = DisbursementEngine::new(chain.clone(), U256::from(1u64))
            .with_submission_timeout(Duration::from_millis(20));

        let err = engine.disburse(Address::ZERO).await.unwrap_err();
        assert!(matches!(err, DisbursementError::SubmissionTimeout { .. }));
        assert!(err.tx_hash().is_none());

        let next = tokio::time::timeout(Duration::from_secs(1), engine.disburse(Address::ZERO))
            .await
            .expect("sequencer must be free after a stalled submission")
            .unwrap();
        assert_eq!(next.tx_hash, TxHash::with_last_byte(7));
        assert_eq!(chain.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_confirmation_wait_is_bounded() {
        let chain = Arc::new(SlowChain::new(Duration::ZERO, Duration::from_secs(30)));
        let engine = DisbursementEngine::new(chain, U256::from(1u64))
            .with_confirmation_timeout(Duration::from_millis(20));

        let err = engine.disburse(Address::ZERO).await.unwrap_err();
        assert!(matches!(err, DisbursementError::ConfirmationTimeout { .. }));
        assert!(err.tx_hash().is_some());
    }
}
