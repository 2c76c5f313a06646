// src/models/order.rs

use chrono::NaiveDate;
use serde::Deserialize;

// Pedido vindo da API externa de pedidos (nomes de campo variam entre versões)
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ExternalOrder {
    #[serde(alias = "numero_pedido", alias = "pedido", alias = "orderNumber")]
    pub order_number: String,

    #[serde(alias = "cliente", alias = "customerName", default)]
    pub customer_name: String,

    #[serde(alias = "telefone", alias = "celular")]
    pub phone: Option<String>,

    #[serde(alias = "situacao")]
    pub status: String,

    #[serde(alias = "data", alias = "orderDate", default)]
    pub order_date: Option<NaiveDate>,

    #[serde(alias = "motorista", alias = "driverName", default)]
    pub driver_name: Option<String>,
}

// A API responde ora com a lista direta, ora embrulhada em `data`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OrdersEnvelope {
    List(Vec<ExternalOrder>),
    Wrapped { data: Vec<ExternalOrder> },
}

impl OrdersEnvelope {
    pub fn into_orders(self) -> Vec<ExternalOrder> {
        match self {
            OrdersEnvelope::List(orders) | OrdersEnvelope::Wrapped { data: orders } => orders,
        }
    }
}
