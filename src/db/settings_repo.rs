// src/db/settings_repo.rs

use async_trait::async_trait;

use super::{PgStore, SettingsStore};
use crate::{common::error::AppError, models::settings::EvolutionConfigRow};

#[async_trait]
impl SettingsStore for PgStore {
    async fn active_evolution_config(&self) -> Result<Option<EvolutionConfigRow>, AppError> {
        let config = sqlx::query_as::<_, EvolutionConfigRow>(
            "SELECT * FROM evolution_configs WHERE is_active ORDER BY updated_at DESC NULLS LAST LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(config)
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, AppError> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM app_settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), AppError> {
        // UPSERT (Insert or Update)
        sqlx::query(
            r#"
            INSERT INTO app_settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key)
            DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
