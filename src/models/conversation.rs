// src/models/conversation.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::{status_names, StatusMachine};

// Tags de conversa aplicadas pelas respostas de campanha
pub const TAG_CONFIRMED: &str = "confirmado";
pub const TAG_RESCHEDULE: &str = "reagendar";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "conversation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Active,
    Closed,
}

status_names!(ConversationStatus { Active => "active", Closed => "closed" });

impl StatusMachine for ConversationStatus {
    const ENTITY: &'static str = "conversation";

    fn allows(self, next: Self) -> bool {
        self != next
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "sender_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    Customer,
    Operator,
    Agent,
    Bot,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "message_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Received,
    Sent,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "media_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Audio,
    Image,
    Video,
    Document,
    Sticker,
}

status_names!(MediaKind {
    Audio => "audio",
    Image => "image",
    Video => "video",
    Document => "document",
    Sticker => "sticker",
});

impl MediaKind {
    // Texto exibido no chat quando a mídia chega sem legenda
    pub fn placeholder(&self) -> &'static str {
        match self {
            MediaKind::Audio => "[Áudio]",
            MediaKind::Image => "[Imagem]",
            MediaKind::Video => "[Vídeo]",
            MediaKind::Document => "[Documento]",
            MediaKind::Sticker => "[Figurinha]",
        }
    }

    pub fn default_extension(&self) -> &'static str {
        match self {
            MediaKind::Audio => "ogg",
            MediaKind::Image => "jpg",
            MediaKind::Video => "mp4",
            MediaKind::Document => "pdf",
            MediaKind::Sticker => "webp",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "audio" => Some(MediaKind::Audio),
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            "document" => Some(MediaKind::Document),
            "sticker" => Some(MediaKind::Sticker),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    pub phone: String,
    pub name: Option<String>,
    pub status: ConversationStatus,
    pub unread_count: i32,
    pub last_message_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_type: SenderType,
    pub content: String,
    pub media_type: Option<MediaKind>,
    pub media_url: Option<String>,
    pub status: MessageStatus,
    pub whatsapp_message_id: Option<String>,
    pub reply_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewConversation {
    pub phone: String,
    pub name: Option<String>,
    pub last_message_at: DateTime<Utc>,
    pub unread_count: i32,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: Uuid,
    pub sender_type: SenderType,
    pub content: String,
    pub media_type: Option<MediaKind>,
    pub media_url: Option<String>,
    pub status: MessageStatus,
    pub whatsapp_message_id: Option<String>,
    pub reply_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConversationFilter {
    pub status: Option<ConversationStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConversationStatusRequest {
    pub status: ConversationStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_only_flips_between_states() {
        assert!(ConversationStatus::Active.transition(ConversationStatus::Closed).is_ok());
        assert!(ConversationStatus::Closed.transition(ConversationStatus::Active).is_ok());
        assert!(ConversationStatus::Closed.transition(ConversationStatus::Closed).is_err());
    }

    #[test]
    fn parses_gateway_media_names() {
        assert_eq!(MediaKind::parse("IMAGE"), Some(MediaKind::Image));
        assert_eq!(MediaKind::parse("gif"), None);
        assert_eq!(MediaKind::Audio.placeholder(), "[Áudio]");
    }
}
