// src/clients/orders.rs

use async_trait::async_trait;

use super::OrderSource;
use crate::{
    common::error::AppError,
    models::order::{ExternalOrder, OrdersEnvelope},
};

// API de pedidos do ERP, autenticada com usuário/senha (basic auth)
#[derive(Clone)]
pub struct HttpOrderSource {
    http: reqwest::Client,
    url: String,
    username: String,
    password: String,
}

impl HttpOrderSource {
    pub fn new(http: reqwest::Client, url: &str, username: &str, password: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

#[async_trait]
impl OrderSource for HttpOrderSource {
    async fn fetch_orders(&self) -> Result<Vec<ExternalOrder>, AppError> {
        let resp = self
            .http
            .get(&self.url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!("API de pedidos respondeu {}: {}", status, text)));
        }

        let envelope: OrdersEnvelope = resp.json().await?;
        Ok(envelope.into_orders())
    }
}

/// Sem ORDERS_API_URL configurada o envio automático não tem de onde ler pedidos.
pub struct UnconfiguredOrderSource;

#[async_trait]
impl OrderSource for UnconfiguredOrderSource {
    async fn fetch_orders(&self) -> Result<Vec<ExternalOrder>, AppError> {
        Err(AppError::Configuration("ORDERS_API_URL/ORDERS_API_USERNAME/ORDERS_API_PASSWORD".to_string()))
    }
}
