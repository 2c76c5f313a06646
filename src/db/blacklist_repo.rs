// src/db/blacklist_repo.rs

use async_trait::async_trait;

use super::{BlacklistStore, PgStore};
use crate::{common::error::AppError, models::blacklist::BlacklistEntry};

#[async_trait]
impl BlacklistStore for PgStore {
    async fn is_blacklisted(&self, variants: &[String]) -> Result<bool, AppError> {
        let blocked: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM blacklist WHERE phone = ANY($1))")
            .bind(variants)
            .fetch_one(&self.pool)
            .await?;

        Ok(blocked)
    }

    async fn add_to_blacklist(&self, phone: &str, reason: Option<&str>) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT INTO blacklist (phone, reason) VALUES ($1, $2) ON CONFLICT (phone) DO NOTHING",
        )
        .bind(phone)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_blacklist(&self) -> Result<Vec<BlacklistEntry>, AppError> {
        let entries = sqlx::query_as::<_, BlacklistEntry>("SELECT * FROM blacklist ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }
}
