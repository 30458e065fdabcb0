//! Frame Route Tests
//!
//! Exercises the HTTP surface with mock collaborators behind a real
//! orchestrator and an in-memory ledger.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use axum::body::{to_bytes, Bytes};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};

use frame_faucet::server::{claim_handler, image_handler, initial_handler};
use frame_faucet::{router, FaucetState, FrameRenderer};
use lib_faucet::{
    ActionVerifier, AddressResolver, ChainClient, ChainError, ClaimLedger, ClaimOrchestrator,
    CollaboratorError, DisbursementEngine, FaucetPolicy, Fid, MemoryLedger, VerifiedAction,
    VerifyError,
};

const EXPLORER: &str = "https://explorer.helioschainlabs.org/tx/";

/// Message bytes are the fid as UTF-8 digits.
struct DigitsVerifier;

#[async_trait]
impl ActionVerifier for DigitsVerifier {
    async fn verify(&self, message_bytes: &[u8]) -> Result<VerifiedAction, VerifyError> {
        std::str::from_utf8(message_bytes)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(|fid| VerifiedAction { fid: Fid(fid) })
            .ok_or_else(|| VerifyError::Invalid("bad signature".into()))
    }
}

/// Every fid below 100 has a verified address.
struct RangeResolver;

#[async_trait]
impl AddressResolver for RangeResolver {
    async fn resolve(&self, fid: Fid) -> Result<Option<Address>, CollaboratorError> {
        Ok((fid.get() < 100).then(|| Address::with_last_byte(fid.get() as u8)))
    }
}

#[derive(Default)]
struct CountingChain {
    submissions: AtomicUsize,
}

#[async_trait]
impl ChainClient for CountingChain {
    async fn submit_transfer(&self, _to: Address, _amount: U256) -> Result<TxHash, ChainError> {
        let n = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TxHash::with_last_byte(n as u8))
    }

    async fn await_confirmation(&self, _tx_hash: TxHash) -> Result<(), ChainError> {
        Ok(())
    }
}

/// Submissions never complete.
struct HangingChain;

#[async_trait]
impl ChainClient for HangingChain {
    async fn submit_transfer(&self, _to: Address, _amount: U256) -> Result<TxHash, ChainError> {
        std::future::pending().await
    }

    async fn await_confirmation(&self, _tx_hash: TxHash) -> Result<(), ChainError> {
        Ok(())
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
}

struct Fixture {
    state: FaucetState,
    chain: Arc<CountingChain>,
    ledger: Arc<MemoryLedger>,
}

fn state_with(chain: Arc<dyn ChainClient>, ledger: Arc<MemoryLedger>) -> FaucetState {
    let policy = FaucetPolicy::default();
    let engine = Arc::new(DisbursementEngine::new(chain, policy.amount));
    let renderer = FrameRenderer::new("https://faucet.example", EXPLORER, &policy);
    let at = now();
    let orchestrator = ClaimOrchestrator::new(
        Arc::new(DigitsVerifier),
        Arc::new(RangeResolver),
        ledger,
        engine,
        policy,
    )
    .with_clock(Arc::new(move || at));

    FaucetState::new(Arc::new(orchestrator), renderer)
}

fn fixture() -> Fixture {
    let chain = Arc::new(CountingChain::default());
    let ledger = Arc::new(MemoryLedger::new());

    Fixture {
        state: state_with(chain.clone(), ledger.clone()),
        chain,
        ledger,
    }
}

fn frame_body(message: &str) -> Bytes {
    Bytes::from(format!(
        r#"{{"untrustedData":{{"fid":0}},"trustedData":{{"messageBytes":"{}"}}}}"#,
        hex::encode(message)
    ))
}

async fn body_text(resp: Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_initial_frame_page() {
    let f = fixture();
    let html = initial_handler(State(f.state)).await.0;

    assert!(html.contains("<title>Helios Faucet</title>"));
    assert!(html.contains(r#"content="Claim 0.5 HLS""#));
    assert!(html.contains(r#"content="https://faucet.example/api/claim""#));
}

#[tokio::test]
async fn test_successful_claim_returns_transaction_link() {
    let f = fixture();

    let resp = claim_handler(State(f.state.clone()), frame_body("5")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;

    assert!(html.contains("Successfully sent 0.5 HLS!"));
    assert!(html.contains(&format!("{}{}", EXPLORER, TxHash::with_last_byte(1))));
    assert!(html.contains("success.svg"));

    let record = f.ledger.get_last_claim(Fid(5)).await.unwrap().unwrap();
    assert_eq!(record.last_claimed_at, now());
}

#[tokio::test]
async fn test_repeat_claim_hits_cooldown() {
    let f = fixture();

    let first = claim_handler(State(f.state.clone()), frame_body("8")).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = claim_handler(State(f.state.clone()), frame_body("8")).await;
    assert_eq!(second.status(), StatusCode::OK);
    let html = body_text(second).await;

    assert!(html.contains("You have already claimed. Try again after 2024-07-01 18:00:00 UTC."));
    assert!(html.contains("cooldown.svg"));
    assert!(html.contains(r#"content="Try Again""#));
    assert_eq!(f.chain.submissions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_address_is_ok_without_transfer() {
    let f = fixture();

    let resp = claim_handler(State(f.state.clone()), frame_body("250")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;

    assert!(html.contains("No verified wallet address found for your Farcaster account."));
    assert_eq!(f.chain.submissions.load(Ordering::SeqCst), 0);
    assert!(f.ledger.is_empty().await);
}

#[tokio::test]
async fn test_malformed_bodies_are_bad_requests() {
    let f = fixture();

    for body in [
        Bytes::from_static(b"{}"),
        Bytes::from_static(b"garbage"),
        Bytes::from_static(br#"{"trustedData":{"messageBytes":"xyz"}}"#),
        frame_body("not-a-fid"),
    ] {
        let resp = claim_handler(State(f.state.clone()), body).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(resp).await.contains("Invalid frame action"));
    }
    assert_eq!(f.chain.submissions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_images_are_served() {
    let resp = image_handler(Path("initial.svg".to_string())).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "image/svg+xml"
    );
    assert!(body_text(resp).await.starts_with("<svg"));

    let missing = image_handler(Path("../Cargo.toml".to_string())).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_router_over_tcp() {
    let f = fixture();
    let app = router(f.state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{}/api/claim", addr))
        .header("content-type", "application/json")
        .body(frame_body("9"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert!(resp.text().await.unwrap().contains("Successfully sent"));

    let oversized = client
        .post(format!("http://{}/api/claim", addr))
        .body(vec![b'a'; 256 * 1024])
        .send()
        .await
        .unwrap();
    assert_eq!(oversized.status().as_u16(), 413);

    server.abort();
}

#[tokio::test]
async fn test_stalled_claim_gets_error_frame() {
    let ledger = Arc::new(MemoryLedger::new());
    let state = state_with(Arc::new(HangingChain), ledger.clone())
        .with_claim_timeout(Duration::from_millis(200));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let resp = reqwest::Client::new()
        .post(format!("http://{}/api/claim", addr))
        .header("content-type", "application/json")
        .body(frame_body("3"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 500);
    let html = resp.text().await.unwrap();
    assert!(html.contains("<p>An error occurred.</p>"));
    assert!(html.contains("error.svg"));
    assert!(html.contains(r#"content="Try Again""#));
    assert!(ledger.is_empty().await);

    server.abort();
}
