use axum::{
    Json, Router,
    extract::State,
    routing::{delete, get, post, put},
};

use crate::{
    dto::cart::{
        AddToCartRequest, AffectedRows, CartAddResult, CartList, SyncCartRequest,
        UpdateCartLineRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::extract::{ApiJson, ApiPath},
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{user_id}", get(cart_list))
        .route("/add/{user_id}", post(add_to_cart))
        .route("/sync/{user_id}", post(sync_cart))
        .route("/update/{user_id}/{product_id}", put(update_cart_line))
        .route("/remove/{user_id}/{product_id}", delete(remove_cart_line))
        .route("/clear/{user_id}", delete(clear_cart))
}

#[utoipa::path(
    get,
    path = "/api/cart/{user_id}",
    params(("user_id" = i64, Path, description = "Cart owner")),
    responses(
        (status = 200, description = "Cart lines with product details", body = ApiResponse<CartList>),
        (status = 403, description = "Not the cart owner"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn cart_list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(user_id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<CartList>>> {
    let resp = cart_service::list_cart(&state, &user, user_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/add/{user_id}",
    params(("user_id" = i64, Path, description = "Cart owner")),
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Line inserted or incremented", body = ApiResponse<CartAddResult>),
        (status = 400, description = "Unknown product or invalid quantity"),
        (status = 403, description = "Not the cart owner"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(user_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartAddResult>>> {
    let resp = cart_service::add_to_cart(&state, &user, user_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/sync/{user_id}",
    params(("user_id" = i64, Path, description = "Cart owner")),
    request_body = SyncCartRequest,
    responses(
        (status = 200, description = "Cart replaced by the snapshot", body = ApiResponse<AffectedRows>),
        (status = 400, description = "Unknown product or invalid line"),
        (status = 403, description = "Not the cart owner"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn sync_cart(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(user_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<SyncCartRequest>,
) -> AppResult<Json<ApiResponse<AffectedRows>>> {
    let resp = cart_service::sync_cart(&state, &user, user_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/cart/update/{user_id}/{product_id}",
    params(
        ("user_id" = i64, Path, description = "Cart owner"),
        ("product_id" = i64, Path, description = "Product ID")
    ),
    request_body = UpdateCartLineRequest,
    responses(
        (status = 200, description = "Quantity set", body = ApiResponse<CartAddResult>),
        (status = 404, description = "No such cart line"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_cart_line(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath((user_id, product_id)): ApiPath<(i64, i64)>,
    ApiJson(payload): ApiJson<UpdateCartLineRequest>,
) -> AppResult<Json<ApiResponse<CartAddResult>>> {
    let resp = cart_service::update_cart_line(&state, &user, user_id, product_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/remove/{user_id}/{product_id}",
    params(
        ("user_id" = i64, Path, description = "Cart owner"),
        ("product_id" = i64, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Line removed", body = ApiResponse<AffectedRows>),
        (status = 404, description = "No such cart line"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_cart_line(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath((user_id, product_id)): ApiPath<(i64, i64)>,
) -> AppResult<Json<ApiResponse<AffectedRows>>> {
    let resp = cart_service::remove_cart_line(&state, &user, user_id, product_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/clear/{user_id}",
    params(("user_id" = i64, Path, description = "Cart owner")),
    responses(
        (status = 200, description = "Cart emptied", body = ApiResponse<AffectedRows>),
        (status = 403, description = "Not the cart owner"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(user_id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<AffectedRows>>> {
    let resp = cart_service::clear_cart(&state, &user, user_id).await?;
    Ok(Json(resp))
}
