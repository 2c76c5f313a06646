// src/db/campaign_repo.rs

use async_trait::async_trait;
use uuid::Uuid;

use super::{CampaignStore, PgStore};
use crate::{
    common::error::{is_unique_violation, AppError},
    models::campaign::{
        Campaign, CampaignResponse, CampaignSend, CampaignSendStatus, CampaignStatus,
        NewCampaignResponse, NewCampaignSend,
    },
};

#[async_trait]
impl CampaignStore for PgStore {
    // =========================================================================
    //  CAMPANHAS
    // =========================================================================

    async fn create_campaign(&self, name: &str, message_template: &str, total_recipients: i32) -> Result<Campaign, AppError> {
        let campaign = sqlx::query_as::<_, Campaign>(
            r#"
            INSERT INTO campaigns (name, message_template, status, total_recipients)
            VALUES ($1, $2, 'draft', $3)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(message_template)
        .bind(total_recipients)
        .fetch_one(&self.pool)
        .await?;

        Ok(campaign)
    }

    async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>, AppError> {
        let campaign = sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(campaign)
    }

    async fn list_campaigns(&self) -> Result<Vec<Campaign>, AppError> {
        let campaigns = sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(campaigns)
    }

    async fn set_campaign_status(&self, id: Uuid, from: CampaignStatus, to: CampaignStatus) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE campaigns
            SET status = $3,
                finished_at = CASE WHEN $3 IN ('completed', 'completed_with_errors') THEN NOW() ELSE finished_at END
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_campaign_progress(&self, id: Uuid, sent: i32, failed: i32, blocked: i32) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE campaigns SET sent_count = $2, failed_count = $3, blocked_count = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(sent)
        .bind(failed)
        .bind(blocked)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    //  ENVIOS (UMA LINHA POR DESTINATÁRIO)
    // =========================================================================

    async fn insert_campaign_send(&self, input: NewCampaignSend) -> Result<CampaignSend, AppError> {
        let recipient = &input.recipient;
        let send = sqlx::query_as::<_, CampaignSend>(
            r#"
            INSERT INTO campaign_sends (
                campaign_id, customer_name, customer_phone, driver_name, order_number,
                total_weight, total_value, sku_count, status, error_message, sent_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(input.campaign_id)
        .bind(&recipient.customer_name)
        .bind(&input.customer_phone)
        .bind(&recipient.driver_name)
        .bind(&recipient.order_number)
        .bind(recipient.total_weight)
        .bind(recipient.total_value)
        .bind(recipient.sku_count)
        .bind(input.status)
        .bind(&input.error_message)
        .bind(input.sent_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(send)
    }

    async fn get_campaign_sends(&self, ids: &[Uuid]) -> Result<Vec<CampaignSend>, AppError> {
        let sends = sqlx::query_as::<_, CampaignSend>(
            "SELECT * FROM campaign_sends WHERE id = ANY($1) ORDER BY created_at ASC",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(sends)
    }

    async fn latest_campaign_send_for_phone(&self, variants: &[String]) -> Result<Option<CampaignSend>, AppError> {
        let send = sqlx::query_as::<_, CampaignSend>(
            r#"
            SELECT * FROM campaign_sends
            WHERE customer_phone = ANY($1)
            ORDER BY COALESCE(sent_at, created_at) DESC
            LIMIT 1
            "#,
        )
        .bind(variants)
        .fetch_optional(&self.pool)
        .await?;

        Ok(send)
    }

    async fn set_campaign_send_status(&self, id: Uuid, from: CampaignSendStatus, to: CampaignSendStatus) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE campaign_sends SET status = $3 WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(from)
            .bind(to)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  RESPOSTAS (1 / 2 / 3)
    // =========================================================================

    async fn find_campaign_response(&self, campaign_send_id: Uuid) -> Result<Option<CampaignResponse>, AppError> {
        let response = sqlx::query_as::<_, CampaignResponse>(
            "SELECT * FROM campaign_responses WHERE campaign_send_id = $1",
        )
        .bind(campaign_send_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(response)
    }

    async fn insert_campaign_response(&self, input: NewCampaignResponse) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO campaign_responses (campaign_send_id, conversation_id, phone, response_type)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(input.campaign_send_id)
        .bind(input.conversation_id)
        .bind(&input.phone)
        .bind(input.response_type)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            // Reentrega do mesmo evento: a chave única já barrou
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
