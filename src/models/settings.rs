// src/models/settings.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Chaves da tabela app_settings (chave/valor)
pub const KEY_AUTO_TEMPLATE_ENABLED: &str = "auto_template_enabled";
pub const KEY_AUTO_TEMPLATE_MIN_DATE: &str = "auto_template_min_date";
pub const KEY_AUTO_TEMPLATE_LAST_RUN: &str = "auto_template_last_run";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "evolution_config_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EvolutionConfigType {
    // API oficial do WhatsApp Business (Meta) via Evolution
    Official,
    // Instância por QR code
    Unofficial,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionConfigRow {
    pub id: Uuid,
    pub config_type: EvolutionConfigType,
    pub api_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub instance_name: Option<String>,
    pub template_name: Option<String>,
    pub template_language: Option<String>,
    pub is_active: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AppSetting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Chaves de funcionalidade lidas uma vez por requisição.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureToggles {
    pub auto_template_enabled: bool,
    pub auto_template_min_date: Option<NaiveDate>,
}

impl FeatureToggles {
    pub fn from_values(enabled: Option<&str>, min_date: Option<&str>) -> Self {
        let auto_template_enabled = enabled
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on"))
            .unwrap_or(false);

        // Aceita "2024-05-01" e também timestamps completos
        let auto_template_min_date = min_date.and_then(|v| {
            let v = v.trim();
            NaiveDate::parse_from_str(v, "%Y-%m-%d")
                .ok()
                .or_else(|| DateTime::parse_from_rfc3339(v).ok().map(|dt| dt.date_naive()))
        });

        Self { auto_template_enabled, auto_template_min_date }
    }
}
