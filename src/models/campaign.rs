// src/models/campaign.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::status::{status_names, StatusMachine};

// --- ENUMS ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "campaign_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Sending,
    Completed,
    CompletedWithErrors,
}

status_names!(CampaignStatus {
    Draft => "draft",
    Sending => "sending",
    Completed => "completed",
    CompletedWithErrors => "completed_with_errors",
});

impl StatusMachine for CampaignStatus {
    const ENTITY: &'static str = "campaign";

    fn allows(self, next: Self) -> bool {
        use CampaignStatus::*;
        matches!(
            (self, next),
            (Draft, Sending) | (Sending, Completed) | (Sending, CompletedWithErrors)
        )
    }
}

impl CampaignStatus {
    pub fn terminal_for(failed: u32) -> Self {
        if failed == 0 {
            CampaignStatus::Completed
        } else {
            CampaignStatus::CompletedWithErrors
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "campaign_send_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CampaignSendStatus {
    Pending,
    Success,
    Failed,
    Blocked,
    Confirmed,
    RescheduleRequested,
}

status_names!(CampaignSendStatus {
    Pending => "pending",
    Success => "success",
    Failed => "failed",
    Blocked => "blocked",
    Confirmed => "confirmed",
    RescheduleRequested => "reschedule_requested",
});

impl StatusMachine for CampaignSendStatus {
    const ENTITY: &'static str = "campaign_send";

    fn allows(self, next: Self) -> bool {
        use CampaignSendStatus::*;
        matches!(
            (self, next),
            (Pending, Success)
                | (Pending, Failed)
                | (Pending, Blocked)
                | (Success, Confirmed)
                | (Success, RescheduleRequested)
                | (Success, Blocked)
                | (Confirmed, RescheduleRequested)
                | (RescheduleRequested, Confirmed)
        )
    }
}

impl CampaignSendStatus {
    // A entrega chegou ao cliente; só esses envios recebem pesquisa
    pub fn was_delivered(&self) -> bool {
        matches!(
            self,
            CampaignSendStatus::Success
                | CampaignSendStatus::Confirmed
                | CampaignSendStatus::RescheduleRequested
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "campaign_response_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Confirmed,
    Reschedule,
    WrongNumber,
}

// --- TABELAS ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub message_template: String,
    pub status: CampaignStatus,
    pub total_recipients: i32,
    pub sent_count: i32,
    pub failed_count: i32,
    pub blocked_count: i32,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSend {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub driver_name: Option<String>,
    pub order_number: Option<String>,
    pub total_weight: Option<Decimal>,
    pub total_value: Option<Decimal>,
    pub sku_count: Option<i32>,
    pub status: CampaignSendStatus,
    pub error_message: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CampaignResponse {
    pub id: Uuid,
    pub campaign_send_id: Uuid,
    pub conversation_id: Option<Uuid>,
    pub phone: String,
    pub response_type: ResponseType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCampaignSend {
    pub campaign_id: Uuid,
    pub recipient: CampaignRecipient,
    pub customer_phone: String,
    pub status: CampaignSendStatus,
    pub error_message: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewCampaignResponse {
    pub campaign_send_id: Uuid,
    pub conversation_id: Option<Uuid>,
    pub phone: String,
    pub response_type: ResponseType,
}

// --- PAYLOADS ---

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CampaignRecipient {
    #[validate(length(min = 1, message = "required"))]
    pub customer_name: String,
    pub phone: String,
    pub driver_name: Option<String>,
    pub order_number: Option<String>,
    pub total_weight: Option<Decimal>,
    pub total_value: Option<Decimal>,
    pub sku_count: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignRequest {
    #[validate(length(min = 1, message = "O nome da campanha é obrigatório."))]
    pub name: String,

    #[validate(length(min = 1, message = "A mensagem da campanha é obrigatória."))]
    pub message_template: String,

    #[validate(length(min = 1, message = "Informe ao menos um destinatário."))]
    #[validate(nested)]
    pub recipients: Vec<CampaignRecipient>,
}

/// Contadores finais de um disparo.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CampaignReport {
    pub campaign_id: Uuid,
    pub success: u32,
    pub failed: u32,
    pub blocked: u32,
}
