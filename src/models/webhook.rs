// src/models/webhook.rs

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::conversation::MediaKind;

/// Mensagem recebida já no formato canônico, independente do envelope do gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub message_id: Option<String>,
    // Sempre normalizado (common::phone::normalize)
    pub phone: String,
    pub push_name: Option<String>,
    // Texto, legenda ou marcador da mídia ("[Áudio]")
    pub text: String,
    pub media: Option<InboundMedia>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InboundMedia {
    pub kind: MediaKind,
    pub url: Option<String>,
    pub mimetype: Option<String>,
    pub file_name: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    FromMe,
    Group,
    UnresolvedLinkedId,
    InvalidPhone(String),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedWebhook {
    Ignored(String),
    Messages(Vec<Result<InboundMessage, SkipReason>>),
}

/// O que aconteceu com cada mensagem processada.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    SurveyRated,
    SurveyInvalidRating,
    CampaignConfirmed,
    RescheduleRequested,
    WrongNumber,
    DuplicateCampaignResponse,
    NoConversationForResponse,
    FeedbackRecorded,
    ConversationMessage,
}
