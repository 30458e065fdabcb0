//! Neynar HTTP Client
//!
//! Frame action validation and verified-address lookup against Neynar's v2
//! REST API.
//! See: https://docs.neynar.com/reference/validate-frame-action

use std::time::Duration;

use alloy_primitives::Address;
use async_trait::async_trait;
use lib_faucet::{
    ActionVerifier, AddressResolver, CollaboratorError, Fid, VerifiedAction, VerifyError,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const SERVICE: &str = "neynar";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Neynar HTTP client.
pub struct NeynarClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

/// Request for `/v2/farcaster/frame/validate`.
#[derive(Debug, Serialize)]
pub struct ValidateFrameRequest {
    pub message_bytes_in_hex: String,
}

/// Response from `/v2/farcaster/frame/validate`.
#[derive(Debug, Deserialize)]
pub struct ValidateFrameResponse {
    pub valid: bool,
    #[serde(default)]
    pub action: Option<FrameAction>,
}

#[derive(Debug, Deserialize)]
pub struct FrameAction {
    pub interactor: FrameInteractor,
}

#[derive(Debug, Deserialize)]
pub struct FrameInteractor {
    pub fid: u64,
}

/// Response from `/v2/farcaster/user/bulk`.
#[derive(Debug, Deserialize)]
pub struct BulkUsersResponse {
    #[serde(default)]
    pub users: Vec<NeynarUser>,
}

#[derive(Debug, Deserialize)]
pub struct NeynarUser {
    pub fid: u64,
    #[serde(default)]
    pub verified_addresses: VerifiedAddresses,
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifiedAddresses {
    #[serde(default)]
    pub eth_addresses: Vec<String>,
}

/// Error body returned on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct NeynarErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

impl NeynarClient {
    /// Create a new client pointing to the given base URL.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build Neynar HTTP client: {}", e))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Validate a signed frame action and return the raw response.
    pub async fn validate_frame_action(
        &self,
        message_bytes: &[u8],
    ) -> Result<ValidateFrameResponse, CollaboratorError> {
        let url = format!("{}/v2/farcaster/frame/validate", self.base_url);
        let req = ValidateFrameRequest {
            message_bytes_in_hex: hex::encode(message_bytes),
        };
        debug!("Neynar validate: message_len={}", message_bytes.len());

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| transport_error("validate request", e))?;

        read_json(resp, "validate").await
    }

    /// Fetch user profiles for the given fids.
    pub async fn fetch_bulk_users(&self, fids: &[Fid]) -> Result<BulkUsersResponse, CollaboratorError> {
        let url = format!("{}/v2/farcaster/user/bulk", self.base_url);
        let fids = fids
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(",");
        debug!("Neynar bulk users: fids={}", fids);

        let resp = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .query(&[("fids", fids.as_str())])
            .send()
            .await
            .map_err(|e| transport_error("user lookup", e))?;

        read_json(resp, "user lookup").await
    }
}

#[async_trait]
impl ActionVerifier for NeynarClient {
    async fn verify(&self, message_bytes: &[u8]) -> Result<VerifiedAction, VerifyError> {
        let resp = self.validate_frame_action(message_bytes).await?;
        action_from_response(resp)
    }
}

#[async_trait]
impl AddressResolver for NeynarClient {
    async fn resolve(&self, fid: Fid) -> Result<Option<Address>, CollaboratorError> {
        let resp = self.fetch_bulk_users(&[fid]).await?;
        first_verified_address(&resp, fid)
    }
}

/// Identity of a validated action; an invalid signature or missing action
/// is an invalid request rather than a service failure.
pub fn action_from_response(resp: ValidateFrameResponse) -> Result<VerifiedAction, VerifyError> {
    if !resp.valid {
        return Err(VerifyError::Invalid("signature rejected by Neynar".into()));
    }
    let action = resp
        .action
        .ok_or_else(|| VerifyError::Invalid("validated message carries no action".into()))?;
    Ok(VerifiedAction {
        fid: Fid(action.interactor.fid),
    })
}

/// First verified ETH address of `fid`, if any.
pub fn first_verified_address(
    resp: &BulkUsersResponse,
    fid: Fid,
) -> Result<Option<Address>, CollaboratorError> {
    let user = resp
        .users
        .iter()
        .find(|u| u.fid == fid.get())
        .or_else(|| resp.users.first());

    let Some(raw) = user.and_then(|u| u.verified_addresses.eth_addresses.first()) else {
        return Ok(None);
    };

    raw.parse::<Address>().map(Some).map_err(|e| {
        warn!(fid = %fid, address = %raw, "Malformed verified address: {}", e);
        CollaboratorError::new(SERVICE, format!("malformed verified address {:?}: {}", raw, e))
    })
}

fn transport_error(what: &str, err: reqwest::Error) -> CollaboratorError {
    CollaboratorError::new(SERVICE, format!("Failed to send {}: {}", what, err))
}

async fn read_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
    what: &str,
) -> Result<T, CollaboratorError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(api_error(status, &body, what));
    }

    resp.json::<T>().await.map_err(|e| {
        CollaboratorError::new(SERVICE, format!("Failed to parse {} response: {}", what, e))
    })
}

/// Map a non-2xx response to an error, keeping Neynar's own message as the
/// user-facing detail when the body carries one.
pub fn api_error(status: reqwest::StatusCode, body: &str, what: &str) -> CollaboratorError {
    let err = CollaboratorError::new(
        SERVICE,
        format!("Neynar {} failed: HTTP {} - {}", what, status, body),
    );
    match serde_json::from_str::<NeynarErrorBody>(body) {
        Ok(parsed) if !parsed.message.is_empty() => err.with_detail(parsed.message),
        _ => err,
    }
}
