// src/models/blacklist.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

pub const REASON_WRONG_NUMBER: &str = "Cliente informou número errado";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistEntry {
    pub id: Uuid,
    pub phone: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddBlacklistRequest {
    #[validate(length(min = 8, message = "Telefone inválido."))]
    pub phone: String,
    pub reason: Option<String>,
}
