// src/db/dashboard_repo.rs

use async_trait::async_trait;

use super::{DashboardStore, PgStore};
use crate::{common::error::AppError, models::dashboard::DriverPerformance};

#[async_trait]
impl DashboardStore for PgStore {
    // Desempenho por motorista: entregas, respostas à campanha e notas das pesquisas
    async fn driver_performance(&self) -> Result<Vec<DriverPerformance>, AppError> {
        let rows = sqlx::query_as::<_, DriverPerformance>(
            r#"
            SELECT
                cs.driver_name AS driver_name,
                COUNT(*) FILTER (WHERE cs.status IN ('success', 'confirmed', 'reschedule_requested')) AS deliveries,
                COUNT(*) FILTER (WHERE cs.status = 'confirmed') AS confirmed,
                COUNT(*) FILTER (WHERE cs.status = 'reschedule_requested') AS reschedules,
                COUNT(s.rating) AS surveys_answered,
                AVG(s.rating)::FLOAT8 AS average_rating
            FROM campaign_sends cs
            LEFT JOIN satisfaction_surveys s
                   ON s.campaign_send_id = cs.id AND s.status <> 'cancelled'
            WHERE cs.driver_name IS NOT NULL AND cs.driver_name <> ''
            GROUP BY cs.driver_name
            ORDER BY deliveries DESC, cs.driver_name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
