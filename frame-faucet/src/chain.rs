//! EVM Chain Client
//!
//! Signs value transfers from the faucet's funding account and waits for
//! their receipts over JSON-RPC.

use std::str::FromStr;

use alloy::network::{EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::{RpcError, TransportErrorKind};
use alloy_primitives::{Address, TxHash, U256};
use anyhow::{Context, Result};
use async_trait::async_trait;
use lib_faucet::{ChainClient, ChainError};
use tracing::{debug, info};

pub struct EvmChainClient {
    provider: DynProvider,
    funding_address: Address,
    confirmations: u64,
}

impl EvmChainClient {
    /// Connect to `rpc_url` with a wallet built from `private_key` (hex, with
    /// or without `0x`).
    pub fn connect(rpc_url: &str, private_key: &str, confirmations: u64) -> Result<Self> {
        let signer = PrivateKeySigner::from_str(private_key.trim())
            .context("Failed to parse faucet private key")?;
        let funding_address = signer.address();
        let url = rpc_url
            .parse()
            .with_context(|| format!("Invalid RPC URL: {}", rpc_url))?;

        // The nonce is read from the node's pending count on every send, so a
        // rejected submission never leaves a gap. Submissions are serialized
        // upstream, which keeps the pending count accurate.
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .with_gas_estimation()
            .with_simple_nonce_management()
            .fetch_chain_id()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        info!(funding = %funding_address, rpc = %rpc_url, "Chain client ready");

        Ok(Self {
            provider,
            funding_address,
            confirmations: confirmations.max(1),
        })
    }

    pub fn funding_address(&self) -> Address {
        self.funding_address
    }

    /// Current balance of the funding account.
    pub async fn funding_balance(&self) -> Result<U256> {
        self.provider
            .get_balance(self.funding_address)
            .await
            .context("Failed to fetch funding account balance")
    }
}

#[async_trait]
impl ChainClient for EvmChainClient {
    async fn submit_transfer(&self, to: Address, amount: U256) -> Result<TxHash, ChainError> {
        let tx = TransactionRequest::default().with_to(to).with_value(amount);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(classify_send_error)?;
        let tx_hash = *pending.tx_hash();

        debug!(to = %to, tx = %tx_hash, "Transfer submitted");
        Ok(tx_hash)
    }

    async fn await_confirmation(&self, tx_hash: TxHash) -> Result<(), ChainError> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
            .with_required_confirmations(self.confirmations)
            .get_receipt()
            .await
            .map_err(|e| ChainError::Confirmation(e.to_string()))?;

        if receipt.status() {
            Ok(())
        } else {
            Err(ChainError::Reverted(tx_hash))
        }
    }
}

/// Node-side refusals (insufficient funds, nonce too low, ...) come back as
/// JSON-RPC error responses; everything else is transport trouble.
fn classify_send_error(err: RpcError<TransportErrorKind>) -> ChainError {
    match err.as_error_resp() {
        Some(payload) => ChainError::Rejected(payload.message.to_string()),
        None => ChainError::Rpc(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use alloy::consensus::{Transaction, TxEnvelope};
    use alloy::eips::eip2718::Decodable2718;
    use alloy_primitives::keccak256;
    use axum::{extract::State, routing::post, Json, Router};
    use serde_json::{json, Value};

    // Well-known development key (anvil account #1).
    const DEV_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    #[test]
    fn test_connect_derives_funding_address() {
        let client = EvmChainClient::connect("http://127.0.0.1:8545", DEV_KEY, 0).unwrap();
        assert_eq!(
            client.funding_address(),
            "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse::<Address>().unwrap()
        );
        assert_eq!(client.confirmations, 1);
    }

    #[test]
    fn test_bad_key_is_rejected() {
        assert!(EvmChainClient::connect("http://127.0.0.1:8545", "0x1234", 1).is_err());
    }

    #[test]
    fn test_bad_rpc_url_is_rejected() {
        assert!(EvmChainClient::connect("not a url", DEV_KEY, 1).is_err());
    }

    /// JSON-RPC node that always reports pending nonce 5 and refuses the first
    /// raw transaction it is sent.
    #[derive(Default)]
    struct MockNode {
        nonce_queries: usize,
        sent_nonces: Vec<u64>,
    }

    async fn rpc_handler(
        State(node): State<Arc<Mutex<MockNode>>>,
        Json(request): Json<Value>,
    ) -> Json<Value> {
        let id = request["id"].clone();
        let mut node = node.lock().unwrap();
        let result = match request["method"].as_str().unwrap_or_default() {
            "eth_chainId" => json!("0x1"),
            "eth_getTransactionCount" => {
                node.nonce_queries += 1;
                json!("0x5")
            }
            "eth_estimateGas" => json!("0x5208"),
            "eth_gasPrice" | "eth_maxPriorityFeePerGas" => json!("0x3b9aca00"),
            "eth_feeHistory" => json!({
                "oldestBlock": "0x1",
                "baseFeePerGas": ["0x3b9aca00", "0x3b9aca00"],
                "gasUsedRatio": [0.5],
                "reward": [["0x3b9aca00"]]
            }),
            "eth_sendRawTransaction" => {
                let raw = request["params"][0].as_str().unwrap_or_default();
                let bytes = hex::decode(raw.trim_start_matches("0x")).unwrap();
                let envelope = TxEnvelope::decode_2718(&mut bytes.as_slice()).unwrap();
                node.sent_nonces.push(envelope.nonce());
                if node.sent_nonces.len() == 1 {
                    return Json(json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": {"code": -32000, "message": "insufficient funds for gas * price + value"}
                    }));
                }
                json!(keccak256(&bytes))
            }
            other => {
                return Json(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {"code": -32601, "message": format!("method not found: {}", other)}
                }));
            }
        };
        Json(json!({"jsonrpc": "2.0", "id": id, "result": result}))
    }

    #[tokio::test]
    async fn test_rejected_send_does_not_consume_nonce() {
        let node = Arc::new(Mutex::new(MockNode::default()));
        let app = Router::new()
            .route("/", post(rpc_handler))
            .with_state(node.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = EvmChainClient::connect(&format!("http://{}", addr), DEV_KEY, 1).unwrap();
        let to = Address::with_last_byte(0x42);

        let first = client.submit_transfer(to, U256::from(1u64)).await;
        assert!(matches!(first, Err(ChainError::Rejected(ref m)) if m.contains("insufficient funds")));

        let second = client.submit_transfer(to, U256::from(1u64)).await;
        assert!(second.is_ok(), "{:?}", second);

        let node = node.lock().unwrap();
        assert_eq!(node.sent_nonces, vec![5, 5]);
        assert_eq!(node.nonce_queries, 2);

        server.abort();
    }
}
