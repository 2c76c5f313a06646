// src/db/template_repo.rs

use async_trait::async_trait;
use uuid::Uuid;

use super::{PgStore, TemplateStore};
use crate::{
    common::error::{is_unique_violation, AppError},
    models::template::{CreateTemplateRequest, NewAutomaticSend, TemplateStatus, WhatsAppTemplate},
};

#[async_trait]
impl TemplateStore for PgStore {
    async fn list_templates(&self) -> Result<Vec<WhatsAppTemplate>, AppError> {
        let templates = sqlx::query_as::<_, WhatsAppTemplate>("SELECT * FROM whatsapp_templates ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(templates)
    }

    async fn create_template(&self, input: CreateTemplateRequest) -> Result<WhatsAppTemplate, AppError> {
        sqlx::query_as::<_, WhatsAppTemplate>(
            r#"
            INSERT INTO whatsapp_templates (name, language, category, body, variables, status, trigger_status)
            VALUES ($1, $2, $3, $4, $5, 'pending', $6)
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.language)
        .bind(&input.category)
        .bind(&input.body)
        .bind(&input.variables)
        .bind(&input.trigger_status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Tratamento de erro de chave duplicada
            if is_unique_violation(&e) {
                return AppError::Conflict(format!("O template '{}' já existe.", input.name));
            }
            e.into()
        })
    }

    async fn get_template(&self, id: Uuid) -> Result<Option<WhatsAppTemplate>, AppError> {
        let template = sqlx::query_as::<_, WhatsAppTemplate>("SELECT * FROM whatsapp_templates WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(template)
    }

    async fn set_template_status(&self, id: Uuid, status: TemplateStatus) -> Result<(), AppError> {
        sqlx::query("UPDATE whatsapp_templates SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn approved_templates_for_trigger(&self, trigger_status: &str) -> Result<Vec<WhatsAppTemplate>, AppError> {
        let templates = sqlx::query_as::<_, WhatsAppTemplate>(
            r#"
            SELECT * FROM whatsapp_templates
            WHERE status = 'approved' AND lower(trigger_status) = lower($1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(trigger_status)
        .fetch_all(&self.pool)
        .await?;

        Ok(templates)
    }

    async fn automatic_send_exists(&self, order_number: &str, trigger_status: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM automatic_template_sends WHERE order_number = $1 AND trigger_status = $2)",
        )
        .bind(order_number)
        .bind(trigger_status)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn record_automatic_send(&self, input: NewAutomaticSend) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO automatic_template_sends (order_number, trigger_status, template_name, phone)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (order_number, trigger_status) DO NOTHING
            "#,
        )
        .bind(&input.order_number)
        .bind(&input.trigger_status)
        .bind(&input.template_name)
        .bind(&input.phone)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
