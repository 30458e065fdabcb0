//! Frame Faucet Server
//!
//! HTTP front end for the claim workflow in `lib-faucet`: configuration,
//! the Neynar and EVM collaborators, frame rendering and the axum server.

pub mod chain;
pub mod config;
pub mod frame;
pub mod neynar;
pub mod server;

pub use chain::EvmChainClient;
pub use config::{ConfigError, FaucetArgs};
pub use frame::{FrameHtml, FrameRenderer};
pub use neynar::NeynarClient;
pub use server::{router, serve, FaucetState};
