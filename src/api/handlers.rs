//! HTTP endpoint handlers
//!
//! The webhook POST handler always answers 200: Meta redelivers on any other
//! status, so failures are logged here instead of reported upstream.

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tracing::{debug, error, info, warn};

use crate::{
    error::Result,
    state::AppState,
    tasks::{handle_message, run_expiry_sweep},
};
use super::{responses::HealthResponse, webhook::WebhookPayload};

/// Handle GET /api/whatsapp - Webhook subscription handshake
pub async fn verify_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let token = params.get("hub.verify_token").map(String::as_str);

    if state.verify_webhook_token(token) {
        info!("WhatsApp webhook verified");
        let challenge = params.get("hub.challenge").cloned().unwrap_or_default();
        (StatusCode::OK, challenge).into_response()
    } else {
        warn!("WhatsApp webhook verification rejected");
        (StatusCode::FORBIDDEN, "Forbidden").into_response()
    }
}

/// Handle POST /api/whatsapp - Inbound message delivery
pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Err(e) = process_webhook(&state, &headers, &body).await {
        error!("Failed to process WhatsApp webhook: {}", e);
    }
    StatusCode::OK
}

async fn process_webhook(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<()> {
    let payload: WebhookPayload = serde_json::from_slice(body)?;

    let Some((from, text)) = payload.first_message() else {
        debug!("Webhook notification without a message, ignoring");
        return Ok(());
    };

    let host = headers.get(header::HOST).and_then(|h| h.to_str().ok());
    handle_message(state, from, text, host).await
}

/// Handle GET|POST /api/cron - Delayed expiry callback
pub async fn cron_handler(State(state): State<Arc<AppState>>) -> &'static str {
    run_expiry_sweep(&state.timers).await;
    "ok"
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(state.get_uptime()))
}
