// src/db/conversation_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{ConversationStore, PgStore};
use crate::{
    common::error::AppError,
    models::conversation::{Conversation, ConversationStatus, Message, NewConversation, NewMessage},
};

#[async_trait]
impl ConversationStore for PgStore {
    async fn find_conversation_by_phone(&self, variants: &[String]) -> Result<Option<Conversation>, AppError> {
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT * FROM conversations
            WHERE phone = ANY($1)
            ORDER BY last_message_at DESC NULLS LAST
            LIMIT 1
            "#,
        )
        .bind(variants)
        .fetch_optional(&self.pool)
        .await?;

        Ok(conversation)
    }

    async fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>, AppError> {
        let conversation = sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(conversation)
    }

    async fn create_conversation(&self, input: NewConversation) -> Result<Conversation, AppError> {
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            INSERT INTO conversations (phone, name, status, unread_count, last_message_at)
            VALUES ($1, $2, 'active', $3, $4)
            RETURNING *
            "#,
        )
        .bind(&input.phone)
        .bind(&input.name)
        .bind(input.unread_count)
        .bind(input.last_message_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(conversation)
    }

    async fn touch_conversation_inbound(&self, id: Uuid, at: DateTime<Utc>, name: Option<&str>) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE conversations
            SET last_message_at = $2,
                unread_count = unread_count + 1,
                name = COALESCE(NULLIF(name, ''), $3)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(at)
        .bind(name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn touch_conversation_outbound(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE conversations SET last_message_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn add_conversation_tag(&self, id: Uuid, tag: &str) -> Result<(), AppError> {
        // Só acrescenta se a tag ainda não estiver no array
        sqlx::query(
            r#"
            UPDATE conversations
            SET tags = array_append(tags, $2)
            WHERE id = $1 AND NOT ($2 = ANY(tags))
            "#,
        )
        .bind(id)
        .bind(tag)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_conversation_status(&self, id: Uuid, from: ConversationStatus, to: ConversationStatus) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE conversations SET status = $3 WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(from)
            .bind(to)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_conversation_read(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE conversations SET unread_count = 0 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_conversations(&self, status: Option<ConversationStatus>) -> Result<Vec<Conversation>, AppError> {
        let conversations = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT * FROM conversations
            WHERE ($1::conversation_status IS NULL OR status = $1)
            ORDER BY last_message_at DESC NULLS LAST
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(conversations)
    }

    async fn insert_message(&self, input: NewMessage) -> Result<Message, AppError> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (
                conversation_id, sender_type, content, media_type, media_url,
                status, whatsapp_message_id, reply_to, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(input.conversation_id)
        .bind(input.sender_type)
        .bind(&input.content)
        .bind(input.media_type)
        .bind(&input.media_url)
        .bind(input.status)
        .bind(&input.whatsapp_message_id)
        .bind(input.reply_to)
        .bind(input.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, AppError> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE conversation_id = $1 ORDER BY created_at ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }
}
