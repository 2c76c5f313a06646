// src/lib.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};

pub mod clients;
pub mod common;
pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::{config::AppState, middleware::auth::auth_guard};

pub fn build_router(app_state: AppState) -> Router {
    // Chamado pelo gateway (sem token de usuário)
    let webhook_routes = Router::new()
        .route("/whatsapp", post(handlers::webhook::receive_whatsapp));

    let whatsapp_routes = Router::new()
        .route("/send-text", post(handlers::whatsapp::send_text))
        .route("/send-media", post(handlers::whatsapp::send_media))
        .route("/send-template", post(handlers::whatsapp::send_template));

    let campaign_routes = Router::new()
        .route("/"
               ,post(handlers::campaigns::create_campaign)
               .get(handlers::campaigns::list_campaigns)
        )
        .route("/{id}", get(handlers::campaigns::get_campaign));

    let survey_routes = Router::new()
        .route("/send", post(handlers::surveys::send_surveys))
        .route("/expire", post(handlers::surveys::expire_surveys))
        .route("/{id}/cancel", post(handlers::surveys::cancel_survey));

    let conversation_routes = Router::new()
        .route("/", get(handlers::conversations::list_conversations))
        .route("/{id}/messages", get(handlers::conversations::list_messages))
        .route("/{id}/read", post(handlers::conversations::mark_read))
        .route("/{id}/status", patch(handlers::conversations::update_status));

    let blacklist_routes = Router::new()
        .route("/"
               ,get(handlers::blacklist::list_blacklist)
               .post(handlers::blacklist::add_to_blacklist)
        );

    let template_routes = Router::new()
        .route("/"
               ,get(handlers::templates::list_templates)
               .post(handlers::templates::create_template)
        )
        .route("/{id}/status", patch(handlers::templates::update_status));

    // Tudo abaixo exige o token de acesso do Supabase
    let protected_routes = Router::new()
        .nest("/whatsapp", whatsapp_routes)
        .nest("/campaigns", campaign_routes)
        .nest("/surveys", survey_routes)
        .route("/auto-templates/run", post(handlers::auto_templates::run))
        .nest("/conversations", conversation_routes)
        .nest("/blacklist", blacklist_routes)
        .nest("/templates", template_routes)
        .route("/analytics/drivers", get(handlers::analytics::driver_performance))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/webhook", webhook_routes)
        .nest("/api", protected_routes)
        .with_state(app_state)
}
