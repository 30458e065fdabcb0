//! Frame Faucet Claim Workflow
//!
//! Rate-limited token faucet driven by social "frame" button presses. A claim
//! request is verified, checked against the per-identity cooldown, resolved to
//! a verified payout address, paid out on-chain and finally recorded in the
//! claim ledger.
//!
//! # Architecture
//!
//! ```text
//! Frame action (signed message bytes)
//!     |
//!     v
//! [ActionVerifier] --> invalid action (400)
//!     |
//!     v
//! [ClaimLocks] --> one in-flight claim per identity
//!     |
//!     v
//! [ClaimLedger] + [Eligibility Gate] --> cooldown active (200)
//!     |
//!     v
//! [AddressResolver] --> no verified address (200)
//!     |
//!     v
//! [DisbursementEngine] --> submit + confirm transfer
//!     |
//!     v
//! [ClaimLedger] conditional write --> success (200)
//! ```
//!
//! # Modules
//!
//! - `types`         - identities, claim records, attempt outcomes
//! - `policy`        - cooldown, payout amount and token symbol
//! - `eligibility`   - pure cooldown gate
//! - `ledger`        - claim ledger trait with SQLite and in-memory backends
//! - `collaborators` - traits for the verification, lookup and chain services
//! - `disbursement`  - serialized submission and bounded confirmation
//! - `guard`         - per-identity claim locks
//! - `orchestrator`  - end-to-end claim handling and reply shaping
//! - `error`         - claim error taxonomy

pub mod collaborators;
pub mod disbursement;
pub mod eligibility;
pub mod error;
pub mod guard;
pub mod ledger;
pub mod orchestrator;
pub mod policy;
pub mod types;

pub use collaborators::{
    ActionVerifier, AddressResolver, ChainClient, ChainError, CollaboratorError, VerifiedAction,
    VerifyError,
};
pub use disbursement::{
    DisbursementEngine, DisbursementError, DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_SUBMISSION_TIMEOUT,
};
pub use eligibility::{check_eligibility, Eligibility};
pub use error::{ClaimError, GENERIC_ERROR_MESSAGE};
pub use guard::{ClaimGuard, ClaimLocks};
pub use ledger::{ClaimLedger, MemoryLedger, RecordOutcome};
#[cfg(feature = "sqlite")]
pub use ledger::SqliteLedger;
pub use orchestrator::{ClaimOrchestrator, ClaimOutcome, ClaimReply, Clock, FrameImage, ReplyStatus};
pub use policy::FaucetPolicy;
pub use types::*;
