//! Frame HTTP Server
//!
//! Serves the initial frame, the frame images and the claim endpoint.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use lib_faucet::{ClaimError, ClaimOrchestrator, ClaimReply, FrameImage};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::frame::FrameRenderer;

/// Frame action payloads are small; anything larger is not a frame.
const MAX_REQUEST_BODY_SIZE: usize = 64 * 1024;
/// Default bound on one claim request, matching the engine's default chain bounds.
pub const DEFAULT_CLAIM_TIMEOUT: Duration = Duration::from_secs(210);
/// The router-level timeout only fires if a handler overruns its own bound.
const REQUEST_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

const INITIAL_SVG: &str = include_str!("../static/images/initial.svg");
const SUCCESS_SVG: &str = include_str!("../static/images/success.svg");
const COOLDOWN_SVG: &str = include_str!("../static/images/cooldown.svg");
const ERROR_SVG: &str = include_str!("../static/images/error.svg");

/// Shared handler state.
#[derive(Clone)]
pub struct FaucetState {
    pub orchestrator: Arc<ClaimOrchestrator>,
    pub renderer: Arc<FrameRenderer>,
    pub claim_timeout: Duration,
}

impl FaucetState {
    pub fn new(orchestrator: Arc<ClaimOrchestrator>, renderer: FrameRenderer) -> Self {
        Self {
            orchestrator,
            renderer: Arc::new(renderer),
            claim_timeout: DEFAULT_CLAIM_TIMEOUT,
        }
    }

    pub fn with_claim_timeout(mut self, timeout: Duration) -> Self {
        self.claim_timeout = timeout;
        self
    }
}

/// Frame action body. Only the signed message is trusted.
#[derive(Debug, Deserialize)]
pub struct FrameActionBody {
    #[serde(rename = "trustedData")]
    pub trusted_data: TrustedData,
}

#[derive(Debug, Deserialize)]
pub struct TrustedData {
    #[serde(rename = "messageBytes")]
    pub message_bytes: String,
}

/// Decode the signed message bytes from a frame action body.
pub fn parse_frame_action(body: &[u8]) -> Result<Vec<u8>, ClaimError> {
    let action: FrameActionBody = serde_json::from_slice(body)
        .map_err(|e| ClaimError::InvalidAction(format!("malformed frame body: {}", e)))?;
    let raw = action.trusted_data.message_bytes.trim();
    let raw = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(raw).map_err(|e| ClaimError::InvalidAction(format!("messageBytes is not hex: {}", e)))
}

pub fn router(state: FaucetState) -> Router {
    let request_timeout = state.claim_timeout + REQUEST_TIMEOUT_SLACK;
    Router::new()
        .route("/", get(initial_handler))
        .route("/api/claim", post(claim_handler))
        .route("/images/:name", get(image_handler))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_SIZE))
        .with_state(state)
}

/// `GET /`: landing frame with the claim button.
pub async fn initial_handler(State(state): State<FaucetState>) -> Html<String> {
    Html(state.renderer.initial().render())
}

/// `POST /api/claim`: run one claim and answer with a frame document.
pub async fn claim_handler(State(state): State<FaucetState>, body: Bytes) -> Response {
    let reply = match parse_frame_action(&body) {
        Ok(message_bytes) => {
            let orchestrator = state.orchestrator.clone();
            // Detached so a disconnecting client cannot cancel a transfer mid-flight.
            let task =
                tokio::spawn(async move { orchestrator.handle_claim(&message_bytes).await });
            // On expiry the task keeps running to completion; only the reply is given up.
            match tokio::time::timeout(state.claim_timeout, task).await {
                Ok(Ok(reply)) => reply,
                Ok(Err(e)) => {
                    error!("Claim task failed: {}", e);
                    ClaimReply::internal_error()
                }
                Err(_) => {
                    error!(timeout = ?state.claim_timeout, "Claim did not finish in time");
                    ClaimReply::internal_error()
                }
            }
        }
        Err(err) => {
            warn!("Rejected claim body: {}", err);
            ClaimReply::from_error(&err)
        }
    };

    frame_response(&state.renderer, &reply)
}

/// `GET /images/:name`: bundled frame images.
pub async fn image_handler(Path(name): Path<String>) -> Response {
    let svg = match name.as_str() {
        n if n == FrameImage::Initial.file_name() => INITIAL_SVG,
        n if n == FrameImage::Success.file_name() => SUCCESS_SVG,
        n if n == FrameImage::Cooldown.file_name() => COOLDOWN_SVG,
        n if n == FrameImage::Error.file_name() => ERROR_SVG,
        _ => return StatusCode::NOT_FOUND.into_response(),
    };

    (
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "public, max-age=300"),
        ],
        svg,
    )
        .into_response()
}

fn frame_response(renderer: &FrameRenderer, reply: &ClaimReply) -> Response {
    let status =
        StatusCode::from_u16(reply.status.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Html(renderer.reply(reply).render())).into_response()
}

/// Serve until Ctrl-C.
pub async fn serve(listener: TcpListener, app: Router) -> Result<()> {
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!("Frame faucet listening on: {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Frame faucet server error")?;

    info!("Frame faucet stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, draining in-flight requests"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}
