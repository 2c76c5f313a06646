// src/services/conversation_service.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::Store,
    models::{
        conversation::{Conversation, ConversationStatus, Message},
        status::StatusMachine,
    },
};

async fn require(store: &dyn Store, id: Uuid) -> Result<Conversation, AppError> {
    store
        .get_conversation(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("conversa {}", id)))
}

pub async fn messages(store: &dyn Store, id: Uuid) -> Result<Vec<Message>, AppError> {
    require(store, id).await?;
    store.list_messages(id).await
}

pub async fn mark_read(store: &dyn Store, id: Uuid) -> Result<(), AppError> {
    require(store, id).await?;
    store.mark_conversation_read(id).await
}

/// Encerra ou reabre a conversa. Nunca apaga: só troca o status.
pub async fn change_status(store: &dyn Store, id: Uuid, to: ConversationStatus) -> Result<Conversation, AppError> {
    let conversation = require(store, id).await?;
    let next = conversation.status.transition(to)?;

    if !store.set_conversation_status(id, conversation.status, next).await? {
        return Err(AppError::Conflict(format!("conversa {} mudou de status", id)));
    }

    tracing::info!(conversation_id = %id, from = %conversation.status, to = %next, "Status da conversa alterado");
    Ok(Conversation { status: next, ..conversation })
}
