// src/models/dashboard.rs

use serde::Serialize;
use sqlx::FromRow;

// Desempenho por motorista (tela de análises)
#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriverPerformance {
    pub driver_name: String,
    pub deliveries: i64,
    pub confirmed: i64,
    pub reschedules: i64,
    pub surveys_answered: i64,
    pub average_rating: Option<f64>,
}
