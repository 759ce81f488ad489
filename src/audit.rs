use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

/// Actions worth keeping a trail of. Each one belongs to exactly one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    UserRegister,
    UserLogin,
    ProductCreate,
    ProductUpdate,
    ProductDelete,
    CartAdd,
    CartSync,
    CartRemove,
    WishlistAdd,
    WishlistRemove,
    OrderCreate,
    OrderCancel,
    OrderStatusUpdate,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserRegister => "user_register",
            AuditAction::UserLogin => "user_login",
            AuditAction::ProductCreate => "product_create",
            AuditAction::ProductUpdate => "product_update",
            AuditAction::ProductDelete => "product_delete",
            AuditAction::CartAdd => "cart_add",
            AuditAction::CartSync => "cart_sync",
            AuditAction::CartRemove => "cart_remove",
            AuditAction::WishlistAdd => "wishlist_add",
            AuditAction::WishlistRemove => "wishlist_remove",
            AuditAction::OrderCreate => "order_create",
            AuditAction::OrderCancel => "order_cancel",
            AuditAction::OrderStatusUpdate => "order_status_update",
        }
    }

    pub fn resource(&self) -> &'static str {
        match self {
            AuditAction::UserRegister | AuditAction::UserLogin => "users",
            AuditAction::ProductCreate | AuditAction::ProductUpdate | AuditAction::ProductDelete => {
                "products"
            }
            AuditAction::CartAdd | AuditAction::CartSync | AuditAction::CartRemove => "cart_lines",
            AuditAction::WishlistAdd | AuditAction::WishlistRemove => "wishlist_items",
            AuditAction::OrderCreate | AuditAction::OrderCancel | AuditAction::OrderStatusUpdate => {
                "orders"
            }
        }
    }
}

async fn insert_entry(
    pool: &DbPool,
    actor_id: Option<i64>,
    action: AuditAction,
    metadata: &Value,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(actor_id)
    .bind(action.as_str())
    .bind(action.resource())
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// Write an audit row for `actor_id`. Failures are logged and swallowed; the
/// business write that triggered the entry has already happened.
pub async fn record(pool: &DbPool, actor_id: Option<i64>, action: AuditAction, metadata: Value) {
    if let Err(err) = insert_entry(pool, actor_id, action, &metadata).await {
        tracing::warn!(error = %err, action = action.as_str(), "audit log failed");
    }
}
