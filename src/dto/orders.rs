use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::models::{Order, OrderItem, OrderStatus};

/// Checkout payload as the storefront sends it. Numeric fields are kept
/// loose (number or numeric string) and validated by the order workflow.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderLineRequest>,
    #[serde(default, alias = "totalAmount")]
    #[schema(value_type = f64)]
    pub total_amount: Value,
    pub shipping_address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderLineRequest {
    #[serde(default)]
    #[schema(value_type = Option<i64>)]
    pub id: Value,
    #[serde(default)]
    #[schema(value_type = Option<i32>)]
    pub quantity: Value,
    #[serde(default)]
    #[schema(value_type = Option<i64>)]
    pub price: Value,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderCreated {
    pub order_id: i64,
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
