// src/handlers/surveys.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    models::survey::{ExpireSurveysRequest, SendSurveysRequest},
    services::{credentials::InvocationConfig, survey_service},
};

// POST /api/surveys/send
pub async fn send_surveys(
    State(app_state): State<AppState>,
    Json(payload): Json<SendSurveysRequest>,
) -> Result<impl IntoResponse, AppError> {
    let config = InvocationConfig::load(&app_state).await?;
    let report = survey_service::send_surveys(&app_state, &config, payload.campaign_send_ids.as_deref()).await?;
    Ok((StatusCode::OK, Json(report)))
}

// POST /api/surveys/{id}/cancel
pub async fn cancel_survey(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let survey = survey_service::cancel_survey(app_state.store.as_ref(), id).await?;
    Ok((StatusCode::OK, Json(survey)))
}

// POST /api/surveys/expire
pub async fn expire_surveys(
    State(app_state): State<AppState>,
    Json(payload): Json<ExpireSurveysRequest>,
) -> Result<impl IntoResponse, AppError> {
    let expired = survey_service::expire_surveys(app_state.store.as_ref(), payload.max_age_hours).await?;
    Ok((StatusCode::OK, Json(json!({ "expired": expired }))))
}
