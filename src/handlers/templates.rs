// src/handlers/templates.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    models::template::{CreateTemplateRequest, UpdateTemplateStatusRequest},
    services::template_service,
};

// GET /api/templates
pub async fn list_templates(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let templates = app_state.store.list_templates().await?;
    Ok((StatusCode::OK, Json(templates)))
}

// POST /api/templates
pub async fn create_template(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateTemplateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let template = template_service::create(app_state.store.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

// PATCH /api/templates/{id}/status
pub async fn update_status(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTemplateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let template = template_service::change_status(app_state.store.as_ref(), id, payload.status).await?;
    Ok((StatusCode::OK, Json(template)))
}
