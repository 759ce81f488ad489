use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::{
    audit::{self, AuditAction},
    dto::orders::{CreateOrderRequest, OrderCreated, OrderList, OrderWithItems},
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem, OrderStatus},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::checkout::{ShippingDetails, price_order, validate_order_request},
    state::AppState,
};

/// Place an order from a cart snapshot.
///
/// Validation runs first, then the order and all of its lines are written in
/// one transaction. Any error before `commit` drops the transaction, which
/// rolls it back, so a failed checkout leaves no rows behind.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderCreated>> {
    let validated = validate_order_request(&payload)?;

    let txn = state.orm.begin().await?;

    let catalog: HashMap<i64, i64> = Products::find()
        .filter(ProdCol::Id.is_in(validated.product_ids()))
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| (p.id, p.price))
        .collect();

    let priced = price_order(&validated, &catalog)?;

    let now = Utc::now();
    let ShippingDetails {
        shipping_address,
        phone,
        email,
        name,
    } = validated.shipping.clone();

    let order = OrderActive {
        id: NotSet,
        user_id: Set(user.user_id),
        order_date: Set(now.into()),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        total_amount: Set(validated.total_amount),
        shipping_address: Set(shipping_address),
        contact_name: Set(name),
        contact_email: Set(email),
        contact_phone: Set(phone),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    for line in &priced {
        OrderItemActive {
            id: NotSet,
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            price: Set(line.price),
            user_id: Set(user.user_id),
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    tracing::info!(
        order_id = order.id,
        user_id = user.user_id,
        lines = priced.len(),
        total_amount = order.total_amount,
        "order created"
    );

    if let Some(address) = validated.shipping.shipping_address.as_deref() {
        remember_shipping_address(state, user.user_id, address, validated.shipping.phone.as_deref())
            .await;
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::OrderCreate,
        serde_json::json!({ "order_id": order.id, "total_amount": order.total_amount }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created",
        OrderCreated {
            order_id: order.id,
            status: OrderStatus::Pending,
        },
        Some(Meta::empty()),
    ))
}

// Best effort; the committed order is not affected by a failure here.
async fn remember_shipping_address(
    state: &AppState,
    user_id: i64,
    address: &str,
    phone: Option<&str>,
) {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET shipping_address = $2, phone = COALESCE($3, phone)
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(address)
    .bind(phone)
    .execute(&state.pool)
    .await;

    if let Err(err) = result {
        tracing::warn!(error = %err, user_id, "failed to store shipping address");
    }
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    list_orders_matching(state, condition, query).await
}

/// Shared listing for the storefront and the admin console.
pub(crate) async fn list_orders_matching(
    state: &AppState,
    mut condition: Condition,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        let status = parse_requested_status(status)?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::OrderDate),
        SortOrder::Desc => finder.order_by_desc(OrderCol::OrderDate),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let data = find_order_with_items(&state.orm, id, Some(user.user_id)).await?;
    Ok(ApiResponse::success("OK", data, Some(Meta::empty())))
}

/// Load an order and its lines; `owner` restricts the lookup to one user.
pub(crate) async fn find_order_with_items<C: ConnectionTrait>(
    conn: &C,
    id: i64,
    owner: Option<i64>,
) -> AppResult<OrderWithItems> {
    let mut condition = Condition::all().add(OrderCol::Id.eq(id));
    if let Some(user_id) = owner {
        condition = condition.add(OrderCol::UserId.eq(user_id));
    }

    let order = match Orders::find().filter(condition).one(conn).await? {
        Some(o) => order_from_entity(o)?,
        None => return Err(AppError::NotFound),
    };

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    Ok(OrderWithItems { order, items })
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let current = stored_status(&order)?;
    if !current.can_cancel() {
        return Err(AppError::BadRequest(format!(
            "Order is already {current} and cannot be cancelled"
        )));
    }

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(order_id = order.id, user_id = user.user_id, "order cancelled");

    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::OrderCancel,
        serde_json::json!({ "order_id": order.id, "previous_status": current.as_str() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order cancelled",
        order_from_entity(order)?,
        Some(Meta::empty()),
    ))
}

pub(crate) fn parse_requested_status(status: &str) -> AppResult<OrderStatus> {
    status
        .trim()
        .to_ascii_lowercase()
        .parse::<OrderStatus>()
        .map_err(|_| AppError::BadRequest("Invalid order status".into()))
}

pub(crate) fn stored_status(model: &OrderModel) -> AppResult<OrderStatus> {
    model
        .status
        .parse::<OrderStatus>()
        .map_err(|err| AppError::Internal(anyhow::Error::new(err)))
}

pub(crate) fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    let status = stored_status(&model)?;
    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        order_date: model.order_date.with_timezone(&Utc),
        status,
        total_amount: model.total_amount,
        shipping_address: model.shipping_address,
        contact_name: model.contact_name,
        contact_email: model.contact_email,
        contact_phone: model.contact_phone,
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

pub(crate) fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        quantity: model.quantity,
        price: model.price,
        user_id: model.user_id,
    }
}
