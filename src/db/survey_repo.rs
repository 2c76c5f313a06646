// src/db/survey_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{PgStore, SurveyStore};
use crate::{
    common::error::AppError,
    models::{
        campaign::CampaignSend,
        survey::{NewSurvey, SatisfactionSurvey, SurveyStatus},
    },
};

#[async_trait]
impl SurveyStore for PgStore {
    async fn surveys_with_status(&self, status: SurveyStatus) -> Result<Vec<SatisfactionSurvey>, AppError> {
        let surveys = sqlx::query_as::<_, SatisfactionSurvey>(
            "SELECT * FROM satisfaction_surveys WHERE status = $1 ORDER BY sent_at DESC NULLS LAST",
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(surveys)
    }

    async fn get_survey(&self, id: Uuid) -> Result<Option<SatisfactionSurvey>, AppError> {
        let survey = sqlx::query_as::<_, SatisfactionSurvey>("SELECT * FROM satisfaction_surveys WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(survey)
    }

    async fn active_survey_for_send(&self, campaign_send_id: Uuid) -> Result<Option<SatisfactionSurvey>, AppError> {
        let survey = sqlx::query_as::<_, SatisfactionSurvey>(
            "SELECT * FROM satisfaction_surveys WHERE campaign_send_id = $1 AND status <> 'cancelled'",
        )
        .bind(campaign_send_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(survey)
    }

    async fn create_survey(&self, input: NewSurvey) -> Result<Option<SatisfactionSurvey>, AppError> {
        // O índice único parcial garante uma pesquisa ativa por envio, mesmo com
        // o painel e o disparo agendado escrevendo ao mesmo tempo.
        let survey = sqlx::query_as::<_, SatisfactionSurvey>(
            r#"
            INSERT INTO satisfaction_surveys (campaign_send_id, customer_name, customer_phone, driver_name, status)
            VALUES ($1, $2, $3, $4, 'pending')
            ON CONFLICT (campaign_send_id) WHERE status <> 'cancelled' DO NOTHING
            RETURNING *
            "#,
        )
        .bind(input.campaign_send_id)
        .bind(&input.customer_name)
        .bind(&input.customer_phone)
        .bind(&input.driver_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(survey)
    }

    async fn sends_without_survey(&self) -> Result<Vec<CampaignSend>, AppError> {
        let sends = sqlx::query_as::<_, CampaignSend>(
            r#"
            SELECT cs.* FROM campaign_sends cs
            WHERE cs.status IN ('success', 'confirmed')
              AND NOT EXISTS (
                  SELECT 1 FROM satisfaction_surveys s
                  WHERE s.campaign_send_id = cs.id AND s.status <> 'cancelled'
              )
            ORDER BY cs.created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(sends)
    }

    async fn record_survey_rating(&self, id: Uuid, rating: i16) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE satisfaction_surveys
            SET rating = $2, status = 'awaiting_feedback', responded_at = NOW()
            WHERE id = $1 AND status = 'sent' AND rating IS NULL
            "#,
        )
        .bind(id)
        .bind(rating)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_survey_feedback(&self, id: Uuid, feedback: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE satisfaction_surveys
            SET feedback = $2, status = 'responded', responded_at = NOW()
            WHERE id = $1 AND status = 'awaiting_feedback'
            "#,
        )
        .bind(id)
        .bind(feedback)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_survey_delivery(&self, id: Uuid, from: SurveyStatus, to: SurveyStatus, error: Option<&str>) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE satisfaction_surveys
            SET status = $3,
                error_message = $4,
                sent_at = CASE WHEN $3 = 'sent' THEN NOW() ELSE sent_at END
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn expire_surveys(&self, older_than: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE satisfaction_surveys
            SET status = 'expired'
            WHERE status IN ('sent', 'awaiting_feedback') AND sent_at < $1
            "#,
        )
        .bind(older_than)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
