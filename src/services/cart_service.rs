//! Server-side mirror of the browser cart.
//!
//! Every statement here is scoped to `cart_lines`; purchased order lines live
//! in a different table and cannot be reached from a cart mutation.

use std::collections::HashMap;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::{
    audit::{self, AuditAction},
    dto::cart::{
        AddToCartRequest, AffectedRows, CartAddResult, CartLineInput, CartList, SyncCartRequest,
        UpdateCartLineRequest,
    },
    entity::cart_lines::{Column as CartCol, Entity as CartLines},
    error::{AppError, AppResult, NUMERIC_OUT_OF_RANGE},
    middleware::auth::{AuthUser, ensure_owner},
    models::CartLine,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// A sync line after duplicates in the snapshot were folded together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedCartLine {
    pub product_id: i64,
    pub quantity: i32,
    pub price: Option<i64>,
}

fn checked_quantity(quantity: Option<i32>, product_id: i64) -> AppResult<i32> {
    let quantity = quantity.unwrap_or(1);
    if quantity < 1 {
        return Err(AppError::BadRequest(format!(
            "quantity for product {product_id} must be at least 1"
        )));
    }
    Ok(quantity)
}

fn checked_price(price: Option<i64>, product_id: i64) -> AppResult<Option<i64>> {
    match price {
        Some(p) if p < 0 => Err(AppError::BadRequest(format!(
            "price for product {product_id} must not be negative"
        ))),
        other => Ok(other),
    }
}

/// Fold a client snapshot into one line per product, keeping first-seen order.
/// Quantities of repeated products add up; the last price sent wins.
pub fn merge_cart_lines(items: &[CartLineInput]) -> AppResult<Vec<MergedCartLine>> {
    let mut merged: Vec<MergedCartLine> = Vec::with_capacity(items.len());
    let mut index: HashMap<i64, usize> = HashMap::new();

    for item in items {
        if item.product_id <= 0 {
            return Err(AppError::BadRequest("productId must be a positive id".into()));
        }
        let quantity = checked_quantity(item.quantity, item.product_id)?;
        let price = checked_price(item.price, item.product_id)?;

        match index.get(&item.product_id) {
            Some(&pos) => {
                let line = &mut merged[pos];
                line.quantity = line.quantity.checked_add(quantity).ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "quantity for product {} is too large",
                        item.product_id
                    ))
                })?;
                if price.is_some() {
                    line.price = price;
                }
            }
            None => {
                index.insert(item.product_id, merged.len());
                merged.push(MergedCartLine {
                    product_id: item.product_id,
                    quantity,
                    price,
                });
            }
        }
    }

    Ok(merged)
}

pub async fn list_cart(
    state: &AppState,
    user: &AuthUser,
    user_id: i64,
) -> AppResult<ApiResponse<CartList>> {
    ensure_owner(user, user_id)?;
    let items = sqlx::query_as::<_, CartLine>(
        r#"
        SELECT c.id, c.user_id, c.product_id, c.quantity, c.price,
               p.name, p.image, c.updated_at
        FROM cart_lines c
        JOIN products p ON p.id = c.product_id
        WHERE c.user_id = $1
        ORDER BY c.created_at, c.id
        "#,
    )
    .bind(user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success("OK", CartList { items }, Some(Meta::empty())))
}

/// Add units of a product. A single upsert statement increments an existing
/// line, so two concurrent adds both land.
pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    user_id: i64,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartAddResult>> {
    ensure_owner(user, user_id)?;
    let quantity = checked_quantity(payload.quantity, payload.product_id)?;
    let price = checked_price(payload.price, payload.product_id)?;

    let catalog: Option<(i64,)> = sqlx::query_as("SELECT price FROM products WHERE id = $1")
        .bind(payload.product_id)
        .fetch_optional(&state.pool)
        .await?;
    let catalog_price = match catalog {
        Some((p,)) => p,
        None => return Err(AppError::BadRequest("product not found".to_string())),
    };

    let (item_id, new_quantity, inserted): (i64, i32, bool) = sqlx::query_as(
        r#"
        INSERT INTO cart_lines (user_id, product_id, quantity, price)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, product_id) DO UPDATE
        SET quantity = cart_lines.quantity + EXCLUDED.quantity,
            price = EXCLUDED.price,
            updated_at = now()
        RETURNING id, quantity, (xmax = 0) AS inserted
        "#,
    )
    .bind(user_id)
    .bind(payload.product_id)
    .bind(quantity)
    .bind(price.unwrap_or(catalog_price))
    .fetch_one(&state.pool)
    .await
    .map_err(|err| {
        AppError::from(err).on_sqlstate(
            NUMERIC_OUT_OF_RANGE,
            format!("quantity for product {} is too large", payload.product_id),
        )
    })?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::CartAdd,
        serde_json::json!({ "user_id": user_id, "product_id": payload.product_id, "quantity": quantity }),
    )
    .await;

    let result = CartAddResult {
        item_id,
        new_quantity: (!inserted).then_some(new_quantity),
    };
    Ok(ApiResponse::success("OK", result, Some(Meta::empty())))
}

/// Replace the user's whole cart with a client snapshot, all or nothing.
pub async fn sync_cart(
    state: &AppState,
    user: &AuthUser,
    user_id: i64,
    payload: SyncCartRequest,
) -> AppResult<ApiResponse<AffectedRows>> {
    ensure_owner(user, user_id)?;
    let lines = merge_cart_lines(&payload.items)?;

    let mut tx = state.pool.begin().await?;

    let product_ids: Vec<i64> = lines.iter().map(|l| l.product_id).collect();
    let catalog: HashMap<i64, i64> = if product_ids.is_empty() {
        HashMap::new()
    } else {
        sqlx::query_as::<_, (i64, i64)>("SELECT id, price FROM products WHERE id = ANY($1)")
            .bind(&product_ids)
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .collect()
    };

    let prices = lines
        .iter()
        .map(|l| match catalog.get(&l.product_id) {
            Some(&catalog_price) => Ok(l.price.unwrap_or(catalog_price)),
            None => Err(AppError::BadRequest(format!("product {} not found", l.product_id))),
        })
        .collect::<AppResult<Vec<i64>>>()?;

    sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let mut affected_rows = 0;
    if !lines.is_empty() {
        let quantities: Vec<i32> = lines.iter().map(|l| l.quantity).collect();

        affected_rows = sqlx::query(
            r#"
            INSERT INTO cart_lines (user_id, product_id, quantity, price)
            SELECT $1, product_id, quantity, price
            FROM UNNEST($2::BIGINT[], $3::INTEGER[], $4::BIGINT[])
                AS snapshot(product_id, quantity, price)
            "#,
        )
        .bind(user_id)
        .bind(&product_ids)
        .bind(&quantities)
        .bind(&prices)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    tx.commit().await?;

    tracing::debug!(user_id, lines = affected_rows, "cart synced");

    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::CartSync,
        serde_json::json!({ "user_id": user_id, "lines": affected_rows }),
    )
    .await;

    Ok(ApiResponse::success(
        "Cart synced",
        AffectedRows { affected_rows },
        Some(Meta::empty()),
    ))
}

pub async fn update_cart_line(
    state: &AppState,
    user: &AuthUser,
    user_id: i64,
    product_id: i64,
    payload: UpdateCartLineRequest,
) -> AppResult<ApiResponse<CartAddResult>> {
    ensure_owner(user, user_id)?;
    let quantity = checked_quantity(Some(payload.quantity), product_id)?;

    let updated: Option<(i64, i32)> = sqlx::query_as(
        r#"
        UPDATE cart_lines
        SET quantity = $3, updated_at = now()
        WHERE user_id = $1 AND product_id = $2
        RETURNING id, quantity
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(&state.pool)
    .await?;

    let (item_id, new_quantity) = match updated {
        Some(row) => row,
        None => return Err(AppError::NotFound),
    };

    Ok(ApiResponse::success(
        "Cart updated",
        CartAddResult {
            item_id,
            new_quantity: Some(new_quantity),
        },
        Some(Meta::empty()),
    ))
}

pub async fn remove_cart_line(
    state: &AppState,
    user: &AuthUser,
    user_id: i64,
    product_id: i64,
) -> AppResult<ApiResponse<AffectedRows>> {
    ensure_owner(user, user_id)?;
    let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::CartRemove,
        serde_json::json!({ "user_id": user_id, "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from cart",
        AffectedRows {
            affected_rows: result.rows_affected(),
        },
        Some(Meta::empty()),
    ))
}

pub async fn clear_cart(
    state: &AppState,
    user: &AuthUser,
    user_id: i64,
) -> AppResult<ApiResponse<AffectedRows>> {
    ensure_owner(user, user_id)?;
    let result = CartLines::delete_many()
        .filter(CartCol::UserId.eq(user_id))
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Cart cleared",
        AffectedRows {
            affected_rows: result.rows_affected,
        },
        Some(Meta::empty()),
    ))
}
