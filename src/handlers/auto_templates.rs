// src/handlers/auto_templates.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::{
    common::error::AppError,
    config::AppState,
    services::{auto_template_service, credentials::InvocationConfig},
};

// POST /api/auto-templates/run
pub async fn run(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let config = InvocationConfig::load(&app_state).await?;

    let body = match auto_template_service::run_auto_templates(&app_state, &config).await? {
        Some(report) => json!({ "success": true, "report": report }),
        None => json!({ "success": true, "skipped": true, "reason": "auto_template_enabled desligado" }),
    };

    Ok((StatusCode::OK, Json(body)))
}
