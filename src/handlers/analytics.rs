// src/handlers/analytics.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{common::error::AppError, config::AppState};

// GET /api/analytics/drivers
pub async fn driver_performance(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let drivers = app_state.store.driver_performance().await?;
    Ok((StatusCode::OK, Json(drivers)))
}
