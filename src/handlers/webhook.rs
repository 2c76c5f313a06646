// src/handlers/webhook.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::{
    config::AppState,
    services::webhook_service::{process_webhook, WebhookResult},
};

// POST /api/webhook/whatsapp
// Público: o gateway não tem token de usuário
pub async fn receive_whatsapp(
    State(app_state): State<AppState>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    match process_webhook(&app_state, &payload).await {
        Ok(WebhookResult::Ignored(event)) => {
            (StatusCode::OK, Json(json!({ "success": true, "ignored": event })))
        }
        Ok(WebhookResult::Processed(outcomes)) => {
            (StatusCode::OK, Json(json!({ "success": true, "processed": outcomes.len() })))
        }
        Err(e) => {
            tracing::error!(error = ?e, "❌ Falha no webhook");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() })))
        }
    }
}
