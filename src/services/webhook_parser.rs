// src/services/webhook_parser.rs

//! Normalização dos envelopes do gateway.
//!
//! Ao longo das versões a Evolution API já entregou `data.messages[]`,
//! `data.message`, `messages[]` na raiz e o próprio `data` com `key`. Toda essa
//! detecção fica aqui; o resto do sistema só enxerga `InboundMessage`.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::{
    common::phone,
    models::{
        conversation::MediaKind,
        webhook::{InboundMedia, InboundMessage, ParsedWebhook, SkipReason},
    },
};

const MESSAGE_EVENT: &str = "messages.upsert";

pub fn parse_webhook(payload: &Value) -> ParsedWebhook {
    let event = payload.get("event").and_then(Value::as_str);

    if let Some(name) = event {
        if normalize_event_name(name) != MESSAGE_EVENT {
            return ParsedWebhook::Ignored(name.to_string());
        }
    }

    let raw_messages = collect_raw_messages(payload);
    if event.is_none() && raw_messages.is_empty() {
        return ParsedWebhook::Ignored("unknown".to_string());
    }

    ParsedWebhook::Messages(raw_messages.into_iter().map(extract_message).collect())
}

// "MESSAGES_UPSERT" e "messages.upsert" são o mesmo evento
fn normalize_event_name(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace('_', ".")
}

fn collect_raw_messages(payload: &Value) -> Vec<&Value> {
    let data = payload.get("data");

    if let Some(list) = data.and_then(|d| d.get("messages")).and_then(Value::as_array) {
        return list.iter().collect();
    }
    if let Some(data) = data {
        if data.get("key").is_some() {
            return vec![data];
        }
        if let Some(msg) = data.get("message").filter(|m| m.get("key").is_some()) {
            return vec![msg];
        }
        if let Some(list) = data.as_array() {
            return list.iter().collect();
        }
    }
    if let Some(list) = payload.get("messages").and_then(Value::as_array) {
        return list.iter().collect();
    }
    Vec::new()
}

fn extract_message(raw: &Value) -> Result<InboundMessage, SkipReason> {
    let key = raw.get("key").unwrap_or(&Value::Null);

    if key.get("fromMe").and_then(Value::as_bool).unwrap_or(false) {
        return Err(SkipReason::FromMe);
    }

    let phone = extract_phone(raw, key)?;
    let content = unwrap_content(raw.get("message").unwrap_or(&Value::Null));
    let media = classify_media(content);

    let text = extract_text(content)
        .or_else(|| media.as_ref().and_then(|m| m.caption.clone()))
        .or_else(|| media.as_ref().map(|m| m.kind.placeholder().to_string()))
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(SkipReason::Empty);
    }

    Ok(InboundMessage {
        message_id: str_field(key, "id"),
        phone,
        push_name: str_field(raw, "pushName").filter(|n| !n.trim().is_empty()),
        text,
        media,
        received_at: extract_timestamp(raw),
    })
}

fn extract_phone(raw: &Value, key: &Value) -> Result<String, SkipReason> {
    let remote_jid = str_field(key, "remoteJid").unwrap_or_default();

    if remote_jid.ends_with("@g.us") || remote_jid.ends_with("@broadcast") {
        return Err(SkipReason::Group);
    }

    // LID esconde o número real; só seguimos se o gateway mandou um campo alternativo
    let jid = if remote_jid.ends_with("@lid") {
        str_field(key, "remoteJidAlt")
            .or_else(|| str_field(key, "senderPn"))
            .or_else(|| str_field(raw, "senderPn"))
            .or_else(|| str_field(key, "participantAlt"))
            .filter(|alt| !alt.ends_with("@lid"))
            .ok_or(SkipReason::UnresolvedLinkedId)?
    } else {
        remote_jid
    };

    // "5511999999999:12@s.whatsapp.net" -> "5511999999999"
    let user = jid.split('@').next().unwrap_or_default();
    let user = user.split(':').next().unwrap_or_default();

    if !phone::is_valid_length(user) {
        return Err(SkipReason::InvalidPhone(user.to_string()));
    }
    Ok(phone::normalize(user))
}

// Mensagens temporárias e de visualização única embrulham o conteúdo real
fn unwrap_content(content: &Value) -> &Value {
    for wrapper in ["ephemeralMessage", "viewOnceMessage", "viewOnceMessageV2"] {
        if let Some(inner) = content.get(wrapper).and_then(|w| w.get("message")) {
            return unwrap_content(inner);
        }
    }
    content
}

fn classify_media(content: &Value) -> Option<InboundMedia> {
    let document_with_caption = content
        .get("documentWithCaptionMessage")
        .and_then(|d| d.get("message"))
        .and_then(|m| m.get("documentMessage"));

    let (kind, node) = if let Some(node) = content.get("audioMessage") {
        (MediaKind::Audio, node)
    } else if let Some(node) = content.get("imageMessage") {
        (MediaKind::Image, node)
    } else if let Some(node) = content.get("videoMessage") {
        (MediaKind::Video, node)
    } else if let Some(node) = content.get("documentMessage").or(document_with_caption) {
        (MediaKind::Document, node)
    } else if let Some(node) = content.get("stickerMessage") {
        (MediaKind::Sticker, node)
    } else {
        return None;
    };

    Some(InboundMedia {
        kind,
        url: str_field(node, "url"),
        mimetype: str_field(node, "mimetype"),
        file_name: str_field(node, "fileName"),
        caption: str_field(node, "caption").filter(|c| !c.trim().is_empty()),
    })
}

fn extract_text(content: &Value) -> Option<String> {
    let candidates = [
        content.get("conversation"),
        content.get("extendedTextMessage").and_then(|m| m.get("text")),
        content.get("buttonsResponseMessage").and_then(|m| m.get("selectedDisplayText")),
        content.get("templateButtonReplyMessage").and_then(|m| m.get("selectedDisplayText")),
        content.get("listResponseMessage").and_then(|m| m.get("title")),
    ];

    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .find(|text| !text.trim().is_empty())
}

// messageTimestamp vem em segundos, às vezes como string
fn extract_timestamp(raw: &Value) -> DateTime<Utc> {
    let seconds = match raw.get("messageTimestamp") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.parse::<i64>().ok(),
        _ => None,
    };

    seconds
        .and_then(|s| Utc.timestamp_opt(s, 0).single())
        .unwrap_or_else(Utc::now)
}

fn str_field(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
