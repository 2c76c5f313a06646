// src/handlers/campaigns.rs

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
    middleware::auth::AuthenticatedUser,
    models::campaign::CreateCampaignRequest,
    services::{campaign_service, credentials::InvocationConfig},
};

// POST /api/campaigns
// Responde 202 na hora; o disparo segue em segundo plano
pub async fn create_campaign(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateCampaignRequest>,
) -> Result<impl IntoResponse, AppError> {
    let config = InvocationConfig::load(&app_state).await?;
    let campaign = campaign_service::start_campaign(&app_state, &payload).await?;
    tracing::info!(campaign_id = %campaign.id, user_id = %user.id, "Campanha criada pelo painel");

    let response = json!({ "campaignId": campaign.id, "status": campaign.status });
    tokio::spawn(campaign_service::run_campaign(
        app_state.clone(),
        config,
        campaign,
        payload.recipients,
    ));

    Ok((StatusCode::ACCEPTED, Json(response)))
}

// GET /api/campaigns
pub async fn list_campaigns(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let campaigns = app_state.store.list_campaigns().await?;
    Ok((StatusCode::OK, Json(campaigns)))
}

// GET /api/campaigns/{id}
pub async fn get_campaign(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let campaign = app_state
        .store
        .get_campaign(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("campanha {}", id)))?;

    Ok((StatusCode::OK, Json(campaign)))
}
