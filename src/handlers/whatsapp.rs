// src/handlers/whatsapp.rs

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    clients::{OutboundMedia, SendError, TemplateMessage},
    common::error::AppError,
    config::AppState,
    models::conversation::MediaKind,
    services::{
        credentials::{InvocationConfig, DEFAULT_TEMPLATE_LANGUAGE},
        sender_service::{History, OutboundSender, SentMessage},
    },
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendTextPayload {
    #[validate(length(min = 1, message = "O telefone é obrigatório."))]
    pub phone: String,
    #[validate(length(min = 1, message = "A mensagem é obrigatória."))]
    pub message: String,
    pub conversation_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMediaPayload {
    #[validate(length(min = 1, message = "O telefone é obrigatório."))]
    pub phone: String,
    #[validate(url(message = "URL da mídia inválida."))]
    pub media_url: String,
    pub media_type: String,
    pub file_name: Option<String>,
    pub caption: Option<String>,
    pub conversation_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendTemplatePayload {
    #[validate(length(min = 1, message = "O telefone é obrigatório."))]
    pub phone: String,
    #[validate(length(min = 1, message = "O nome do template é obrigatório."))]
    pub template_name: String,
    pub template_language: Option<String>,
    #[serde(default)]
    pub parameters: Vec<String>,
    pub conversation_id: Option<Uuid>,
}

fn history_for(conversation_id: Option<Uuid>) -> History {
    conversation_id.map(History::Into).unwrap_or(History::ByPhone(None))
}

// Corpo `{success, data|error, code?}` consumido pelo painel
fn send_response(result: Result<SentMessage, SendError>) -> Response {
    match result {
        Ok(sent) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "phone": sent.phone,
                    "messageId": sent.receipt.message_id,
                    "message": sent.message,
                }
            })),
        )
            .into_response(),
        Err(e) => {
            let status = match e {
                SendError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                SendError::Gateway(_) => StatusCode::BAD_GATEWAY,
                SendError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            };
            (status, Json(json!({ "success": false, "error": e.to_string(), "code": e.code() }))).into_response()
        }
    }
}

// POST /api/whatsapp/send-text
pub async fn send_text(
    State(app_state): State<AppState>,
    Json(payload): Json<SendTextPayload>,
) -> Result<Response, AppError> {
    payload.validate()?;

    let config = InvocationConfig::load(&app_state).await?;
    let sender = OutboundSender::new(&app_state, &config);
    let result = sender
        .send_text(&payload.phone, &payload.message, history_for(payload.conversation_id))
        .await;

    Ok(send_response(result))
}

// POST /api/whatsapp/send-media
pub async fn send_media(
    State(app_state): State<AppState>,
    Json(payload): Json<SendMediaPayload>,
) -> Result<Response, AppError> {
    payload.validate()?;

    let Some(kind) = MediaKind::parse(&payload.media_type) else {
        return Ok(send_response(Err(SendError::InvalidMediaType)));
    };

    let config = InvocationConfig::load(&app_state).await?;
    let sender = OutboundSender::new(&app_state, &config);
    let media = OutboundMedia {
        kind,
        url: payload.media_url,
        file_name: payload.file_name,
        caption: payload.caption,
    };
    let result = sender
        .send_media(&payload.phone, &media, history_for(payload.conversation_id))
        .await;

    Ok(send_response(result))
}

// POST /api/whatsapp/send-template
pub async fn send_template(
    State(app_state): State<AppState>,
    Json(payload): Json<SendTemplatePayload>,
) -> Result<Response, AppError> {
    payload.validate()?;

    let config = InvocationConfig::load(&app_state).await?;
    let sender = OutboundSender::new(&app_state, &config);
    let template = TemplateMessage {
        name: payload.template_name,
        language: payload
            .template_language
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TEMPLATE_LANGUAGE.to_string()),
        parameters: payload.parameters,
    };
    let result = sender
        .send_template(&payload.phone, &template, history_for(payload.conversation_id))
        .await;

    Ok(send_response(result))
}
