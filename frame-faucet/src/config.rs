//! Faucet Server Configuration
//!
//! Every setting is a command-line flag backed by an environment variable, so
//! the server runs unchanged from a shell, a container or a process manager.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use alloy_primitives::utils::parse_ether;
use alloy_primitives::U256;
use clap::Parser;
use lib_faucet::FaucetPolicy;
use thiserror::Error;

pub const DEFAULT_NEYNAR_API_URL: &str = "https://api.neynar.com";
pub const DEFAULT_EXPLORER_TX_URL: &str = "https://explorer.helioschainlabs.org/tx/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("invalid faucet amount {amount:?}: {reason}")]
    Amount { amount: String, reason: String },
}

/// Frame faucet server
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(name = "frame-faucet")]
pub struct FaucetArgs {
    /// Neynar API key used for frame validation and user lookup
    #[arg(long, env = "NEYNAR_API_KEY", hide_env_values = true)]
    pub neynar_api_key: String,

    /// Neynar API base URL
    #[arg(long, default_value = DEFAULT_NEYNAR_API_URL, env = "NEYNAR_API_URL")]
    pub neynar_api_url: String,

    /// Hex private key of the funding account
    #[arg(long, env = "FAUCET_PRIVATE_KEY", hide_env_values = true)]
    pub faucet_private_key: String,

    /// JSON-RPC endpoint of the chain
    #[arg(long, env = "HELIOS_RPC_URL")]
    pub rpc_url: String,

    /// Public base URL the frame is served from
    #[arg(long, default_value = "http://localhost:3000", env = "APP_URL")]
    pub app_url: String,

    /// SQLite file holding the claim ledger
    #[arg(long, default_value = "faucet_claims.db", env = "STORAGE_PATH")]
    pub storage_path: PathBuf,

    /// Address the HTTP server binds to
    #[arg(long, default_value = "0.0.0.0:3000", env = "FAUCET_LISTEN_ADDR")]
    pub listen_addr: SocketAddr,

    /// Hours between two claims of the same account
    #[arg(long, default_value_t = 6, env = "FAUCET_COOLDOWN_HOURS")]
    pub cooldown_hours: u64,

    /// Payout per claim, in whole tokens (e.g. "0.5")
    #[arg(long, default_value = "0.5", env = "FAUCET_AMOUNT")]
    pub amount: String,

    /// Token symbol shown in frame messages
    #[arg(long, default_value = "HLS", env = "FAUCET_TOKEN_SYMBOL")]
    pub token_symbol: String,

    /// Explorer URL prefix; the transaction hash is appended
    #[arg(long, default_value = DEFAULT_EXPLORER_TX_URL, env = "EXPLORER_TX_URL")]
    pub explorer_tx_url: String,

    /// Block confirmations required before a claim counts
    #[arg(long, default_value_t = 1, env = "FAUCET_CONFIRMATIONS")]
    pub confirmations: u64,

    /// Upper bound on the confirmation wait, in seconds
    #[arg(long, default_value_t = 120, env = "FAUCET_CONFIRMATION_TIMEOUT_SECS")]
    pub confirmation_timeout_secs: u64,

    /// Upper bound on a single transfer submission, in seconds
    #[arg(long, default_value_t = 30, env = "FAUCET_SUBMISSION_TIMEOUT_SECS")]
    pub submission_timeout_secs: u64,
}

/// Headroom on top of the chain bounds for verification, lookup and the ledger.
const CLAIM_TIMEOUT_SLACK: Duration = Duration::from_secs(60);

impl FaucetArgs {
    /// Validate the configuration at startup.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.neynar_api_key.trim().is_empty() {
            errors.push("NEYNAR_API_KEY must not be empty".into());
        }
        if self.faucet_private_key.trim().is_empty() {
            errors.push("FAUCET_PRIVATE_KEY must not be empty".into());
        }
        for (name, url) in [
            ("NEYNAR_API_URL", &self.neynar_api_url),
            ("HELIOS_RPC_URL", &self.rpc_url),
            ("APP_URL", &self.app_url),
            ("EXPLORER_TX_URL", &self.explorer_tx_url),
        ] {
            if let Err(e) = reqwest::Url::parse(url) {
                errors.push(format!("{} is not a valid URL ({}): {}", name, url, e));
            }
        }
        if self.cooldown_hours == 0 {
            errors.push("FAUCET_COOLDOWN_HOURS must be > 0".into());
        }
        if let Err(e) = self.amount_wei() {
            errors.push(e.to_string());
        }
        if self.token_symbol.trim().is_empty() {
            errors.push("FAUCET_TOKEN_SYMBOL must not be empty".into());
        }
        if self.confirmations == 0 {
            errors.push("FAUCET_CONFIRMATIONS must be > 0".into());
        }
        if self.confirmation_timeout_secs == 0 {
            errors.push("FAUCET_CONFIRMATION_TIMEOUT_SECS must be > 0".into());
        }
        if self.submission_timeout_secs == 0 {
            errors.push("FAUCET_SUBMISSION_TIMEOUT_SECS must be > 0".into());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Payout amount in base units.
    pub fn amount_wei(&self) -> Result<U256, ConfigError> {
        let amount = parse_ether(self.amount.trim()).map_err(|e| ConfigError::Amount {
            amount: self.amount.clone(),
            reason: e.to_string(),
        })?;
        if amount.is_zero() {
            return Err(ConfigError::Amount {
                amount: self.amount.clone(),
                reason: "must be greater than zero".into(),
            });
        }
        Ok(amount)
    }

    /// Build the claim policy after validation.
    pub fn policy(&self) -> Result<FaucetPolicy, ConfigError> {
        self.validate().map_err(ConfigError::Invalid)?;

        let policy = FaucetPolicy {
            cooldown: Duration::from_secs(self.cooldown_hours.saturating_mul(3600)),
            amount: self.amount_wei()?,
            token_symbol: self.token_symbol.trim().to_string(),
        };
        policy.validate().map_err(ConfigError::Invalid)?;
        Ok(policy)
    }

    /// Public base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.app_url.trim_end_matches('/')
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn submission_timeout(&self) -> Duration {
        Duration::from_secs(self.submission_timeout_secs)
    }

    /// Longest a claim request may run before it is answered with an error frame.
    pub fn claim_timeout(&self) -> Duration {
        self.submission_timeout() + self.confirmation_timeout() + CLAIM_TIMEOUT_SLACK
    }
}
