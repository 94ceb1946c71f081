use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    models::{WebhookVerifyQuery, WhatsAppWebhook},
    services::chat::{self, ChatCommand},
    state::AppState,
};

/// Handler for the WhatsApp subscription handshake
pub async fn verify_whatsapp(
    State(state): State<AppState>,
    Query(query): Query<WebhookVerifyQuery>,
) -> (StatusCode, String) {
    let (Some(mode), Some(token)) = (query.mode.as_deref(), query.verify_token.as_deref()) else {
        return (StatusCode::BAD_REQUEST, "Missing parameters".to_string());
    };

    if mode != "subscribe" {
        tracing::warn!(mode = %mode, "Unsupported WhatsApp webhook mode");
        return (StatusCode::BAD_REQUEST, "Unsupported mode".to_string());
    }

    if state.whatsapp_verify_token.as_deref() == Some(token) {
        tracing::info!("WhatsApp webhook verified");
        (StatusCode::OK, query.challenge.unwrap_or_default())
    } else {
        tracing::warn!("WhatsApp webhook verification failed");
        (StatusCode::FORBIDDEN, "Verification failed".to_string())
    }
}

/// Handler for inbound WhatsApp notifications
///
/// Always answers 200 so the platform does not redeliver; failures are
/// reported in the body and the logs.
pub async fn receive_whatsapp(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    let webhook: WhatsAppWebhook = match serde_json::from_slice(&body) {
        Ok(webhook) => webhook,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed WhatsApp webhook body");
            return Json(json!({ "status": "error", "message": e.to_string() }));
        }
    };

    let Some((from, text)) = webhook.first_text_message() else {
        tracing::debug!("WhatsApp notification without a text message");
        return Json(json!({ "status": "success" }));
    };

    let reply = chat::respond(&state.chat_context(), from, ChatCommand::parse(text)).await;

    let Some(messenger) = state.messenger.as_ref() else {
        tracing::warn!("No chat messenger configured; reply dropped");
        return Json(json!({ "status": "error", "message": "messaging not configured" }));
    };

    match messenger.send_text(from, &reply).await {
        Ok(()) => Json(json!({ "status": "success" })),
        Err(e) => {
            tracing::error!(error = %e, provider = messenger.name(), "Failed to send chat reply");
            Json(json!({ "status": "error", "message": e.to_string() }))
        }
    }
}
