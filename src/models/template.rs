// src/models/template.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::status::{status_names, StatusMachine};

// A aprovação é feita pela Meta; aqui só espelhamos o resultado
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "template_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TemplateStatus {
    Pending,
    Approved,
    Rejected,
}

status_names!(TemplateStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

impl StatusMachine for TemplateStatus {
    const ENTITY: &'static str = "whatsapp_template";

    fn allows(self, next: Self) -> bool {
        self != next
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppTemplate {
    pub id: Uuid,
    pub name: String,
    pub language: String,
    pub category: Option<String>,
    pub body: String,
    pub variables: Vec<String>,
    pub status: TemplateStatus,
    // Status de pedido que dispara o envio automático deste template
    pub trigger_status: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AutomaticTemplateSend {
    pub id: Uuid,
    pub order_number: String,
    pub trigger_status: String,
    pub template_name: String,
    pub phone: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAutomaticSend {
    pub order_number: String,
    pub trigger_status: String,
    pub template_name: String,
    pub phone: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    #[validate(length(min = 1, message = "required"))]
    pub name: String,
    #[serde(default = "default_language")]
    pub language: String,
    pub category: Option<String>,
    #[validate(length(min = 1, message = "required"))]
    pub body: String,
    #[serde(default)]
    pub variables: Vec<String>,
    pub trigger_status: Option<String>,
}

fn default_language() -> String {
    "pt_BR".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplateStatusRequest {
    pub status: TemplateStatus,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct AutoTemplateReport {
    pub checked: u32,
    pub sent: u32,
    pub skipped: u32,
    pub failed: u32,
}
