//! Faucet Policy
//!
//! Cooldown window, payout amount and token symbol. These are configuration
//! values so deployments and tests can vary them.

use std::time::Duration;

use alloy_primitives::utils::format_ether;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Default cooldown between two successful claims: 6 hours.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(6 * 60 * 60);

/// Default payout: 0.5 token at 18 decimals.
pub const DEFAULT_AMOUNT_WEI: u128 = 500_000_000_000_000_000;

/// Default token symbol shown in frame messages.
pub const DEFAULT_TOKEN_SYMBOL: &str = "HLS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaucetPolicy {
    /// Minimum time between two successful claims by the same identity.
    pub cooldown: Duration,
    /// Fixed amount sent per claim, in base units.
    pub amount: U256,
    /// Ticker used in user-facing messages.
    pub token_symbol: String,
}

impl Default for FaucetPolicy {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            amount: U256::from(DEFAULT_AMOUNT_WEI),
            token_symbol: DEFAULT_TOKEN_SYMBOL.to_string(),
        }
    }
}

impl FaucetPolicy {
    /// Validate the policy at startup.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.cooldown.is_zero() {
            errors.push("cooldown must be > 0".into());
        }
        if self.amount.is_zero() {
            errors.push("amount must be > 0".into());
        }
        if self.token_symbol.trim().is_empty() {
            errors.push("token_symbol must not be empty".into());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Payout amount as a trimmed decimal string, e.g. `"0.5"`.
    pub fn display_amount(&self) -> String {
        let formatted = format_ether(self.amount);
        if formatted.contains('.') {
            formatted
                .trim_end_matches('0')
                .trim_end_matches('.')
                .to_string()
        } else {
            formatted
        }
    }

    /// Cooldown as a chrono duration for timestamp arithmetic.
    pub fn cooldown_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.cooldown).unwrap_or(chrono::Duration::MAX)
    }
}
