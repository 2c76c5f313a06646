// src/handlers/blacklist.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        phone::{is_valid_length, normalize},
    },
    config::AppState,
    models::blacklist::AddBlacklistRequest,
};

// GET /api/blacklist
pub async fn list_blacklist(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let entries = app_state.store.list_blacklist().await?;
    Ok((StatusCode::OK, Json(entries)))
}

// POST /api/blacklist
pub async fn add_to_blacklist(
    State(app_state): State<AppState>,
    Json(payload): Json<AddBlacklistRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let phone = normalize(&payload.phone);
    if !is_valid_length(&phone) {
        return Err(AppError::InvalidInput(format!("telefone inválido: {}", payload.phone)));
    }

    if !app_state.store.add_to_blacklist(&phone, payload.reason.as_deref()).await? {
        return Err(AppError::Conflict(format!("{} já está na blacklist", phone)));
    }

    tracing::info!(%phone, "🚫 Telefone adicionado à blacklist");
    Ok((StatusCode::CREATED, Json(json!({ "phone": phone }))))
}
