//! End-to-end service flows against a real Postgres. Skipped unless
//! TEST_DATABASE_URL or DATABASE_URL is set.

use prosthetics_store_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    dto::{
        admin::UpdateOrderStatusRequest,
        auth::RegisterRequest,
        cart::{AddToCartRequest, CartLineInput, SyncCartRequest, UpdateCartLineRequest},
        orders::CreateOrderRequest,
        products::{CreateProductRequest, UpdateProductRequest},
        wishlist::AddWishlistRequest,
    },
    error::AppError,
    middleware::auth::{AuthUser, ROLE_ADMIN, ROLE_USER},
    models::OrderStatus,
    routes::params::Pagination,
    services::{
        admin_service,
        auth_service::{hash_password, register_user},
        cart_service, order_service, product_service, profile_service, wishlist_service,
    },
    state::AppState,
};
use serde_json::json;
use uuid::Uuid;

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run store flow tests.");
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url, 5).await?;
    run_migrations(&pool).await?;

    let config = AppConfig {
        database_url,
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "flow-test-secret".into(),
        jwt_ttl_hours: 1,
        db_max_connections: 5,
        run_migrations: false,
    };
    Ok(Some(AppState::new(pool, config)))
}

async fn create_user(state: &AppState, role: &str) -> anyhow::Result<AuthUser> {
    let email = format!("{}-{}@example.com", role, Uuid::new_v4());
    let password_hash = hash_password("secret123").map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let (user_id,): (i64,) = sqlx::query_as(
        "INSERT INTO users (name, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind("Flow Tester")
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(&state.pool)
    .await?;
    Ok(AuthUser {
        user_id,
        role: role.to_string(),
    })
}

async fn create_product(state: &AppState, admin: &AuthUser, price: i64) -> anyhow::Result<i64> {
    let response = product_service::create_product(
        state,
        admin,
        CreateProductRequest {
            name: format!("Test Socket {}", Uuid::new_v4()),
            description: None,
            price,
            old_price: None,
            category: "accessories".into(),
            product_type: None,
            image: None,
        },
    )
    .await?;
    Ok(response.data.expect("product").id)
}

async fn count(state: &AppState, sql: &str, user_id: i64) -> anyhow::Result<i64> {
    let (n,): (i64,) = sqlx::query_as(sql).bind(user_id).fetch_one(&state.pool).await?;
    Ok(n)
}

fn order_request(body: serde_json::Value) -> CreateOrderRequest {
    serde_json::from_value(body).expect("order json")
}

#[tokio::test]
async fn order_is_written_with_all_lines() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = create_user(&state, ROLE_ADMIN).await?;
    let user = create_user(&state, ROLE_USER).await?;
    let socket = create_product(&state, &admin, 100).await?;
    let liner = create_product(&state, &admin, 50).await?;

    let created = order_service::create_order(
        &state,
        &user,
        order_request(json!({
            "items": [
                { "id": socket, "quantity": 2, "price": 100 },
                { "id": liner, "quantity": 1, "price": 50 }
            ],
            "totalAmount": 250,
            "shipping_address": "1 Dock Street",
            "phone": "555-0101"
        })),
    )
    .await?
    .data
    .expect("order created");
    assert_eq!(created.status, OrderStatus::Pending);

    let orders = count(&state, "SELECT COUNT(*) FROM orders WHERE user_id = $1", user.user_id).await?;
    let lines = count(&state, "SELECT COUNT(*) FROM order_items WHERE user_id = $1", user.user_id).await?;
    assert_eq!((orders, lines), (1, 2));

    let (address,): (Option<String>,) =
        sqlx::query_as("SELECT shipping_address FROM users WHERE id = $1")
            .bind(user.user_id)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(address.as_deref(), Some("1 Dock Street"));

    let detail = order_service::get_order(&state, &user, created.order_id)
        .await?
        .data
        .expect("order detail");
    assert_eq!(detail.order.total_amount, 250);
    assert_eq!(detail.items.len(), 2);

    // Another customer cannot see it.
    let stranger = create_user(&state, ROLE_USER).await?;
    assert!(matches!(
        order_service::get_order(&state, &stranger, created.order_id).await,
        Err(AppError::NotFound)
    ));
    Ok(())
}

#[tokio::test]
async fn rejected_order_leaves_no_rows() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = create_user(&state, ROLE_ADMIN).await?;
    let user = create_user(&state, ROLE_USER).await?;
    let product = create_product(&state, &admin, 100).await?;

    let missing_id = order_service::create_order(
        &state,
        &user,
        order_request(json!({
            "items": [{ "id": product, "quantity": 1 }, { "quantity": 1 }],
            "totalAmount": 200
        })),
    )
    .await;
    assert!(matches!(missing_id, Err(AppError::BadRequest(_))));

    let wrong_total = order_service::create_order(
        &state,
        &user,
        order_request(json!({
            "items": [{ "id": product, "quantity": 1 }],
            "totalAmount": 1
        })),
    )
    .await;
    assert!(matches!(wrong_total, Err(AppError::BadRequest(_))));

    let orders = count(&state, "SELECT COUNT(*) FROM orders WHERE user_id = $1", user.user_id).await?;
    let lines = count(&state, "SELECT COUNT(*) FROM order_items WHERE user_id = $1", user.user_id).await?;
    assert_eq!((orders, lines), (0, 0));
    Ok(())
}

#[tokio::test]
async fn repeated_adds_accumulate_and_sync_replaces() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = create_user(&state, ROLE_ADMIN).await?;
    let user = create_user(&state, ROLE_USER).await?;
    let first = create_product(&state, &admin, 100).await?;
    let second = create_product(&state, &admin, 40).await?;

    let add = |quantity| AddToCartRequest {
        product_id: first,
        quantity: Some(quantity),
        price: None,
    };
    let inserted = cart_service::add_to_cart(&state, &user, user.user_id, add(1))
        .await?
        .data
        .expect("cart add");
    assert_eq!(inserted.new_quantity, None);

    let updated = cart_service::add_to_cart(&state, &user, user.user_id, add(2))
        .await?
        .data
        .expect("cart add");
    assert_eq!(updated.item_id, inserted.item_id);
    assert_eq!(updated.new_quantity, Some(3));

    let synced = cart_service::sync_cart(
        &state,
        &user,
        user.user_id,
        SyncCartRequest {
            items: vec![
                CartLineInput { product_id: second, quantity: Some(1), price: None },
                CartLineInput { product_id: second, quantity: Some(4), price: None },
            ],
        },
    )
    .await?
    .data
    .expect("sync");
    assert_eq!(synced.affected_rows, 1);

    let cart = cart_service::list_cart(&state, &user, user.user_id)
        .await?
        .data
        .expect("cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].product_id, second);
    assert_eq!(cart.items[0].quantity, 5);
    assert_eq!(cart.items[0].price, 40);

    // An unknown product aborts the sync and keeps the previous cart.
    let failed = cart_service::sync_cart(
        &state,
        &user,
        user.user_id,
        SyncCartRequest {
            items: vec![CartLineInput { product_id: i64::MAX, quantity: None, price: None }],
        },
    )
    .await;
    assert!(matches!(failed, Err(AppError::BadRequest(_))));
    let lines = count(&state, "SELECT COUNT(*) FROM cart_lines WHERE user_id = $1", user.user_id).await?;
    assert_eq!(lines, 1);

    let cleared = cart_service::sync_cart(&state, &user, user.user_id, SyncCartRequest { items: vec![] })
        .await?
        .data
        .expect("sync");
    assert_eq!(cleared.affected_rows, 0);
    let lines = count(&state, "SELECT COUNT(*) FROM cart_lines WHERE user_id = $1", user.user_id).await?;
    assert_eq!(lines, 0);
    Ok(())
}

#[tokio::test]
async fn cancellation_and_status_rules() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = create_user(&state, ROLE_ADMIN).await?;
    let user = create_user(&state, ROLE_USER).await?;
    let product = create_product(&state, &admin, 75).await?;

    let place = || {
        order_request(json!({ "items": [{ "id": product, "quantity": 1 }], "totalAmount": 75 }))
    };

    let first = order_service::create_order(&state, &user, place()).await?.data.expect("order");
    let cancelled = order_service::cancel_order(&state, &user, first.order_id)
        .await?
        .data
        .expect("cancelled");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert!(matches!(
        order_service::cancel_order(&state, &user, first.order_id).await,
        Err(AppError::BadRequest(_))
    ));

    let second = order_service::create_order(&state, &user, place()).await?.data.expect("order");
    let status = |s: &str| UpdateOrderStatusRequest { status: s.to_string() };

    let shipped = admin_service::update_order_status(&state, &admin, second.order_id, status("shipped"))
        .await?
        .data
        .expect("shipped");
    assert_eq!(shipped.status, OrderStatus::Shipped);
    assert!(matches!(
        admin_service::update_order_status(&state, &admin, second.order_id, status("pending")).await,
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        admin_service::update_order_status(&state, &user, second.order_id, status("delivered")).await,
        Err(AppError::Forbidden)
    ));
    admin_service::update_order_status(&state, &admin, second.order_id, status("delivered")).await?;
    assert!(matches!(
        order_service::cancel_order(&state, &user, second.order_id).await,
        Err(AppError::BadRequest(_))
    ));
    Ok(())
}

#[tokio::test]
async fn history_survives_product_deletion() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = create_user(&state, ROLE_ADMIN).await?;
    let user = create_user(&state, ROLE_USER).await?;
    let product = create_product(&state, &admin, 120).await?;

    let created = order_service::create_order(
        &state,
        &user,
        order_request(json!({ "items": [{ "id": product, "quantity": 2 }], "totalAmount": 240 })),
    )
    .await?
    .data
    .expect("order");

    product_service::delete_product(&state, &admin, product).await?;

    let history = profile_service::order_history(&state, &user)
        .await?
        .data
        .expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].order_id, created.order_id);
    assert_eq!(history[0].items.len(), 1);
    assert_eq!(history[0].items[0].name, format!("Product #{product}"));
    assert_eq!(history[0].items[0].subtotal, 240);
    Ok(())
}

#[tokio::test]
async fn cart_line_edits_and_clear() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = create_user(&state, ROLE_ADMIN).await?;
    let user = create_user(&state, ROLE_USER).await?;
    let first = create_product(&state, &admin, 30).await?;
    let second = create_product(&state, &admin, 60).await?;

    for product_id in [first, second] {
        cart_service::add_to_cart(
            &state,
            &user,
            user.user_id,
            AddToCartRequest { product_id, quantity: None, price: None },
        )
        .await?;
    }

    let updated = cart_service::update_cart_line(
        &state,
        &user,
        user.user_id,
        first,
        UpdateCartLineRequest { quantity: 4 },
    )
    .await?
    .data
    .expect("updated line");
    assert_eq!(updated.new_quantity, Some(4));

    assert!(matches!(
        cart_service::update_cart_line(&state, &user, user.user_id, first, UpdateCartLineRequest { quantity: 0 })
            .await,
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        cart_service::update_cart_line(&state, &user, user.user_id, i64::MAX, UpdateCartLineRequest { quantity: 2 })
            .await,
        Err(AppError::NotFound)
    ));

    let removed = cart_service::remove_cart_line(&state, &user, user.user_id, second)
        .await?
        .data
        .expect("removed");
    assert_eq!(removed.affected_rows, 1);
    assert!(matches!(
        cart_service::remove_cart_line(&state, &user, user.user_id, second).await,
        Err(AppError::NotFound)
    ));

    cart_service::add_to_cart(
        &state,
        &user,
        user.user_id,
        AddToCartRequest { product_id: second, quantity: Some(2), price: None },
    )
    .await?;
    let cleared = cart_service::clear_cart(&state, &user, user.user_id)
        .await?
        .data
        .expect("cleared");
    assert_eq!(cleared.affected_rows, 2);
    let lines = count(&state, "SELECT COUNT(*) FROM cart_lines WHERE user_id = $1", user.user_id).await?;
    assert_eq!(lines, 0);
    Ok(())
}

#[tokio::test]
async fn cart_quantity_overflow_is_a_bad_request() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = create_user(&state, ROLE_ADMIN).await?;
    let user = create_user(&state, ROLE_USER).await?;
    let product = create_product(&state, &admin, 10).await?;

    let add = || AddToCartRequest {
        product_id: product,
        quantity: Some(i32::MAX),
        price: None,
    };
    cart_service::add_to_cart(&state, &user, user.user_id, add()).await?;
    assert!(matches!(
        cart_service::add_to_cart(&state, &user, user.user_id, add()).await,
        Err(AppError::BadRequest(_))
    ));

    let cart = cart_service::list_cart(&state, &user, user.user_id)
        .await?
        .data
        .expect("cart");
    assert_eq!(cart.items[0].quantity, i32::MAX);
    Ok(())
}

#[tokio::test]
async fn wishlist_add_is_idempotent() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = create_user(&state, ROLE_ADMIN).await?;
    let user = create_user(&state, ROLE_USER).await?;
    let product = create_product(&state, &admin, 80).await?;

    let first = wishlist_service::add_to_wishlist(&state, &user, AddWishlistRequest { product_id: product })
        .await?
        .data
        .expect("wishlist item");
    let again = wishlist_service::add_to_wishlist(&state, &user, AddWishlistRequest { product_id: product })
        .await?
        .data
        .expect("wishlist item");
    assert_eq!(first.id, again.id);

    let listed = wishlist_service::list_wishlist(&state, &user, Pagination::default())
        .await?
        .data
        .expect("wishlist");
    assert_eq!(listed.items.len(), 1);
    assert_eq!(listed.items[0].id, product);

    assert!(matches!(
        wishlist_service::add_to_wishlist(&state, &user, AddWishlistRequest { product_id: i64::MAX }).await,
        Err(AppError::BadRequest(_))
    ));

    wishlist_service::remove_from_wishlist(&state, &user, product).await?;
    assert!(matches!(
        wishlist_service::remove_from_wishlist(&state, &user, product).await,
        Err(AppError::NotFound)
    ));
    Ok(())
}

#[tokio::test]
async fn customer_can_cancel_processing_and_shipped_orders() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = create_user(&state, ROLE_ADMIN).await?;
    let user = create_user(&state, ROLE_USER).await?;
    let product = create_product(&state, &admin, 20).await?;

    for status in ["processing", "shipped"] {
        let order = order_service::create_order(
            &state,
            &user,
            order_request(json!({ "items": [{ "id": product, "quantity": 1 }], "totalAmount": 20 })),
        )
        .await?
        .data
        .expect("order");

        admin_service::update_order_status(
            &state,
            &admin,
            order.order_id,
            UpdateOrderStatusRequest { status: status.to_string() },
        )
        .await?;

        let cancelled = order_service::cancel_order(&state, &user, order.order_id)
            .await?
            .data
            .expect("cancelled");
        assert_eq!(cancelled.status, OrderStatus::Cancelled, "cancel from {status}");
    }
    Ok(())
}

#[tokio::test]
async fn old_price_can_be_cleared_on_update() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = create_user(&state, ROLE_ADMIN).await?;
    let product = create_product(&state, &admin, 100).await?;

    let with_old: UpdateProductRequest = serde_json::from_value(json!({ "old_price": 120 }))?;
    product_service::update_product(&state, &admin, product, with_old).await?;

    let raise_only: UpdateProductRequest = serde_json::from_value(json!({ "price": 150 }))?;
    assert!(matches!(
        product_service::update_product(&state, &admin, product, raise_only).await,
        Err(AppError::BadRequest(_))
    ));

    let raise_and_clear: UpdateProductRequest =
        serde_json::from_value(json!({ "price": 150, "old_price": null }))?;
    let updated = product_service::update_product(&state, &admin, product, raise_and_clear)
        .await?
        .data
        .expect("product");
    assert_eq!((updated.price, updated.old_price), (150, None));
    Ok(())
}

#[tokio::test]
async fn duplicate_names_and_emails_are_bad_requests() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = create_user(&state, ROLE_ADMIN).await?;
    let name = format!("Duplicate Knee {}", Uuid::new_v4());
    let request = || CreateProductRequest {
        name: name.clone(),
        description: None,
        price: 500,
        old_price: None,
        category: "lower-limb".into(),
        product_type: None,
        image: None,
    };
    product_service::create_product(&state, &admin, request()).await?;
    assert!(matches!(
        product_service::create_product(&state, &admin, request()).await,
        Err(AppError::BadRequest(_))
    ));

    let email = format!("twice-{}@example.com", Uuid::new_v4());
    let register = || RegisterRequest {
        name: "Twice".into(),
        email: email.clone(),
        password: "secret123".into(),
    };
    register_user(&state, register()).await?;
    assert!(matches!(
        register_user(&state, register()).await,
        Err(AppError::BadRequest(_))
    ));
    Ok(())
}
