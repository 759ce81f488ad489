use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::OrderStatus;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderHistoryEntry {
    pub order_id: i64,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_amount: i64,
    pub items: Vec<OrderHistoryItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OrderHistoryItem {
    pub product_id: i64,
    pub name: String,
    pub image: Option<String>,
    pub quantity: i32,
    pub price: i64,
    pub subtotal: i64,
}
