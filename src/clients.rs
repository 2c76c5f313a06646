// src/clients.rs

//! Portas para os serviços externos: gateway WhatsApp, Storage e API de pedidos.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::{
    common::error::AppError,
    models::{conversation::MediaKind, order::ExternalOrder},
    services::credentials::EvolutionCredentials,
};

pub mod evolution;
pub use evolution::EvolutionConnector;
pub mod storage;
pub use storage::SupabaseStorage;
pub mod orders;
pub use orders::HttpOrderSource;

/// Motivos tipados de falha de envio, com o código devolvido ao painel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("blocked by blacklist")]
    Blacklisted,

    #[error("telefone inválido: {0}")]
    InvalidPhone(String),

    #[error("número não está no WhatsApp")]
    NumberNotOnWhatsApp,

    #[error("tipo de mídia inválido")]
    InvalidMediaType,

    #[error("tempo esgotado (Timed Out)")]
    Timeout,

    #[error("{0}")]
    Gateway(String),

    // Falha do nosso lado (ex.: consulta da blacklist), o gateway nem foi chamado
    #[error("erro interno: {0}")]
    Internal(String),
}

impl SendError {
    pub fn code(&self) -> &'static str {
        match self {
            SendError::Blacklisted => "blocked_by_blacklist",
            SendError::InvalidPhone(_) => "invalid_phone",
            SendError::NumberNotOnWhatsApp => "number_not_on_whatsapp",
            SendError::InvalidMediaType => "invalid_mediatype",
            SendError::Timeout => "timeout",
            SendError::Gateway(_) => "gateway_error",
            SendError::Internal(_) => "internal_error",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GatewayReceipt {
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMedia {
    pub kind: MediaKind,
    pub url: String,
    pub file_name: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMessage {
    pub name: String,
    pub language: String,
    pub parameters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedMedia {
    pub bytes: Vec<u8>,
    pub mimetype: Option<String>,
}

#[async_trait]
pub trait WhatsAppGateway: Send + Sync {
    async fn send_text(&self, number: &str, text: &str) -> Result<GatewayReceipt, SendError>;
    async fn send_media(&self, number: &str, media: &OutboundMedia) -> Result<GatewayReceipt, SendError>;
    async fn send_template(&self, number: &str, template: &TemplateMessage) -> Result<GatewayReceipt, SendError>;
    async fn fetch_media(&self, message_id: &str) -> Result<DownloadedMedia, SendError>;
}

/// Monta o cliente do gateway com as credenciais resolvidas na requisição.
pub trait GatewayConnector: Send + Sync {
    fn connect(&self, credentials: &EvolutionCredentials) -> Arc<dyn WhatsAppGateway>;
}

#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Envia o arquivo e devolve a URL pública.
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, AppError>;
}

#[async_trait]
pub trait OrderSource: Send + Sync {
    async fn fetch_orders(&self) -> Result<Vec<ExternalOrder>, AppError>;
}

impl From<AppError> for SendError {
    fn from(err: AppError) -> Self {
        tracing::error!(error = ?err, "❌ Erro interno durante o envio");
        SendError::Internal(err.to_string())
    }
}
