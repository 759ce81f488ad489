use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::dto::products::{CreateProductRequest, DeletedProduct, ProductList, UpdateProductRequest};
use crate::{
    audit::{self, AuditAction},
    entity::products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult, UNIQUE_VIOLATION},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

const DUPLICATE_NAME: &str = "A product with this name already exists";

/// Catalog pricing rules: a price is never negative and a struck-through
/// `old_price` must be higher than the selling price.
pub fn validate_pricing(price: i64, old_price: Option<i64>) -> AppResult<()> {
    if price < 0 {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if let Some(old) = old_price {
        if old <= price {
            return Err(AppError::BadRequest(
                "old_price must be greater than price".into(),
            ));
        }
    }
    Ok(())
}

/// Apply a partial price change on top of the stored values and check the
/// result. `requested_old` of `Some(None)` removes the struck-through price.
pub fn merge_pricing(
    current_price: i64,
    current_old: Option<i64>,
    requested_price: Option<i64>,
    requested_old: Option<Option<i64>>,
) -> AppResult<(i64, Option<i64>)> {
    let price = requested_price.unwrap_or(current_price);
    let old_price = requested_old.unwrap_or(current_old);
    validate_pricing(price, old_price)?;
    Ok((price, old_price))
}

fn required_text(value: String, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(category) = query.category.as_deref().filter(|s| !s.is_empty()) {
        condition = condition.add(Column::Category.eq(category));
    }

    if let Some(product_type) = query.product_type.as_deref().filter(|s| !s.is_empty()) {
        condition = condition.add(Column::ProductType.eq(product_type));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    let data = ProductList { items };
    Ok(ApiResponse::success("Products", data, Some(meta)))
}

pub async fn get_product(state: &AppState, id: i64) -> AppResult<ApiResponse<Product>> {
    let result = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(product_from_entity);
    let result = match result {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Product", result, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    validate_pricing(payload.price, payload.old_price)?;
    let name = required_text(payload.name, "name")?;
    let category = required_text(payload.category, "category")?;

    let now = Utc::now();
    let active = ActiveModel {
        id: NotSet,
        name: Set(name),
        description: Set(payload.description),
        price: Set(payload.price),
        old_price: Set(payload.old_price),
        category: Set(category),
        product_type: Set(payload.product_type),
        image: Set(payload.image),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    let product = active
        .insert(&state.orm)
        .await
        .map_err(|err| AppError::from(err).on_sqlstate(UNIQUE_VIOLATION, DUPLICATE_NAME))?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::ProductCreate,
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let (price, old_price) =
        merge_pricing(existing.price, existing.old_price, payload.price, payload.old_price)?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(required_text(name, "name")?);
    }
    if let Some(category) = payload.category {
        active.category = Set(required_text(category, "category")?);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(product_type) = payload.product_type {
        active.product_type = Set(Some(product_type));
    }
    if let Some(image) = payload.image {
        active.image = Set(Some(image));
    }
    active.price = Set(price);
    active.old_price = Set(old_price);
    active.updated_at = Set(Utc::now().into());

    let product = active
        .update(&state.orm)
        .await
        .map_err(|err| AppError::from(err).on_sqlstate(UNIQUE_VIOLATION, DUPLICATE_NAME))?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::ProductUpdate,
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

/// Remove a product. Cart and wishlist rows go with it; purchased order
/// lines keep their copy of the id and price.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<DeletedProduct>> {
    ensure_admin(user)?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        AuditAction::ProductDelete,
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        DeletedProduct { id },
        Some(Meta::empty()),
    ))
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        old_price: model.old_price,
        category: model.category,
        product_type: model.product_type,
        image: model.image,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
