// src/handlers/conversations.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    models::conversation::{ConversationFilter, UpdateConversationStatusRequest},
    services::conversation_service,
};

// GET /api/conversations?status=active
pub async fn list_conversations(
    State(app_state): State<AppState>,
    Query(filter): Query<ConversationFilter>,
) -> Result<impl IntoResponse, AppError> {
    let conversations = app_state.store.list_conversations(filter.status).await?;
    Ok((StatusCode::OK, Json(conversations)))
}

// GET /api/conversations/{id}/messages
pub async fn list_messages(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let messages = conversation_service::messages(app_state.store.as_ref(), id).await?;
    Ok((StatusCode::OK, Json(messages)))
}

// POST /api/conversations/{id}/read
pub async fn mark_read(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    conversation_service::mark_read(app_state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// PATCH /api/conversations/{id}/status
pub async fn update_status(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateConversationStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let conversation = conversation_service::change_status(app_state.store.as_ref(), id, payload.status).await?;
    Ok((StatusCode::OK, Json(conversation)))
}
