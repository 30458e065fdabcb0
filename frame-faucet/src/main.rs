//! Frame Faucet
//!
//! Main entry point: loads configuration, wires the collaborators into the
//! claim orchestrator and serves the frame until Ctrl-C.

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use lib_faucet::{ClaimOrchestrator, DisbursementEngine, SqliteLedger};
use tokio::net::TcpListener;
use tracing::{info, warn};

use frame_faucet::{
    router, serve, ConfigError, EvmChainClient, FaucetArgs, FaucetState, FrameRenderer,
    NeynarClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = FaucetArgs::parse();
    let policy = args.policy().map_err(|e| match e {
        ConfigError::Invalid(errors) => {
            anyhow::anyhow!("Invalid configuration:\n  - {}", errors.join("\n  - "))
        }
        other => anyhow::Error::new(other),
    })?;

    info!(
        cooldown_hours = args.cooldown_hours,
        amount = %policy.display_amount(),
        symbol = %policy.token_symbol,
        "Starting frame faucet"
    );

    let ledger = SqliteLedger::open(&args.storage_path)
        .await
        .with_context(|| format!("Failed to open claim ledger at {}", args.storage_path.display()))?;
    let ledger = Arc::new(ledger);
    info!("Claim ledger opened at {}", args.storage_path.display());

    let neynar = Arc::new(NeynarClient::new(&args.neynar_api_url, &args.neynar_api_key)?);

    let chain = EvmChainClient::connect(&args.rpc_url, &args.faucet_private_key, args.confirmations)?;
    match chain.funding_balance().await {
        Ok(balance) => info!(funding = %chain.funding_address(), balance = %balance, "Funding account"),
        Err(e) => warn!("Could not read funding account balance: {:#}", e),
    }

    let engine = DisbursementEngine::new(Arc::new(chain), policy.amount)
        .with_confirmation_timeout(args.confirmation_timeout())
        .with_submission_timeout(args.submission_timeout());

    let renderer = FrameRenderer::new(args.base_url(), &args.explorer_tx_url, &policy);
    let orchestrator = ClaimOrchestrator::new(
        neynar.clone(),
        neynar,
        ledger.clone(),
        Arc::new(engine),
        policy,
    );

    let state = FaucetState::new(Arc::new(orchestrator), renderer)
        .with_claim_timeout(args.claim_timeout());
    let app = router(state);

    let listener = TcpListener::bind(args.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen_addr))?;

    serve(listener, app).await?;
    ledger.close().await;
    Ok(())
}
