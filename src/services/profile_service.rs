use std::collections::HashMap;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use sqlx::FromRow;

use crate::{
    dto::profile::{OrderHistoryEntry, OrderHistoryItem},
    entity::orders::{Column as OrderCol, Entity as Orders},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Customer, Order},
    response::{ApiResponse, Meta},
    services::order_service::order_from_entity,
    state::AppState,
};

/// One purchased line with whatever the catalog still knows about it.
#[derive(Debug, Clone, FromRow)]
pub struct HistoryItemRow {
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub price: i64,
    pub product_name: Option<String>,
    pub product_image: Option<String>,
}

impl HistoryItemRow {
    fn into_item(self) -> OrderHistoryItem {
        let name = self
            .product_name
            .unwrap_or_else(|| format!("Product #{}", self.product_id));
        OrderHistoryItem {
            product_id: self.product_id,
            name,
            image: self.product_image,
            quantity: self.quantity,
            subtotal: self.price.saturating_mul(i64::from(self.quantity)),
            price: self.price,
        }
    }
}

/// Attach item rows to their orders, keeping the order sequence as given.
/// Rows for orders not in `orders` are ignored.
pub fn assemble_history(orders: Vec<Order>, rows: Vec<HistoryItemRow>) -> Vec<OrderHistoryEntry> {
    let mut entries: Vec<OrderHistoryEntry> = orders
        .into_iter()
        .map(|order| OrderHistoryEntry {
            order_id: order.id,
            order_date: order.order_date,
            status: order.status,
            total_amount: order.total_amount,
            items: Vec::new(),
        })
        .collect();

    let positions: HashMap<i64, usize> = entries
        .iter()
        .enumerate()
        .map(|(pos, entry)| (entry.order_id, pos))
        .collect();

    for row in rows {
        if let Some(&pos) = positions.get(&row.order_id) {
            entries[pos].items.push(row.into_item());
        }
    }

    entries
}

pub async fn order_history(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<Vec<OrderHistoryEntry>>> {
    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::OrderDate)
        .order_by_desc(OrderCol::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    // LEFT JOIN: products deleted since purchase still come back, without a name.
    let rows = sqlx::query_as::<_, HistoryItemRow>(
        r#"
        SELECT oi.order_id, oi.product_id, oi.quantity, oi.price,
               p.name AS product_name, p.image AS product_image
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        LEFT JOIN products p ON p.id = oi.product_id
        WHERE o.user_id = $1
        ORDER BY oi.order_id, oi.id
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    let total = orders.len() as i64;
    let entries = assemble_history(orders, rows);
    Ok(ApiResponse::success(
        "Order history",
        entries,
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Customer>> {
    let profile = sqlx::query_as::<_, Customer>(
        r#"
        SELECT id, name, email, phone, shipping_address, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user.user_id)
    .fetch_optional(&state.pool)
    .await?;

    match profile {
        Some(p) => Ok(ApiResponse::success("Profile", p, Some(Meta::empty()))),
        None => Err(AppError::NotFound),
    }
}
