use chrono::{TimeZone, Utc};
use prosthetics_store_api::{
    config::AppConfig,
    dto::{cart::CartLineInput, products::UpdateProductRequest},
    error::{AppError, NUMERIC_OUT_OF_RANGE, UNIQUE_VIOLATION},
    middleware::auth::{AuthUser, ensure_admin, ensure_owner, verify_token},
    models::{Order, OrderStatus},
    routes::params::Pagination,
    services::{
        auth_service::issue_token,
        cart_service::{MergedCartLine, merge_cart_lines},
        product_service::{merge_pricing, validate_pricing},
        profile_service::{HistoryItemRow, assemble_history},
    },
};

fn config() -> AppConfig {
    AppConfig {
        database_url: "postgres://localhost/unused".into(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        jwt_ttl_hours: 1,
        db_max_connections: 1,
        run_migrations: false,
    }
}

fn order(id: i64, status: OrderStatus, total_amount: i64) -> Order {
    let at = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
    Order {
        id,
        user_id: 1,
        order_date: at,
        status,
        total_amount,
        shipping_address: None,
        contact_name: None,
        contact_email: None,
        contact_phone: None,
        updated_at: at,
    }
}

fn row(order_id: i64, product_id: i64, quantity: i32, price: i64, name: Option<&str>) -> HistoryItemRow {
    HistoryItemRow {
        order_id,
        product_id,
        quantity,
        price,
        product_name: name.map(str::to_string),
        product_image: None,
    }
}

#[test]
fn status_moves_forward_only() {
    use OrderStatus::*;
    assert!(Pending.can_transition_to(Processing));
    assert!(Pending.can_transition_to(Shipped));
    assert!(Processing.can_transition_to(Delivered));
    assert!(Shipped.can_transition_to(Cancelled));
    assert!(!Shipped.can_transition_to(Pending));
    assert!(!Processing.can_transition_to(Processing));
    assert!(!Delivered.can_transition_to(Cancelled));
    assert!(!Cancelled.can_transition_to(Pending));
}

#[test]
fn only_open_orders_can_be_cancelled() {
    assert!(OrderStatus::Pending.can_cancel());
    assert!(OrderStatus::Shipped.can_cancel());
    assert!(!OrderStatus::Delivered.can_cancel());
    assert!(!OrderStatus::Cancelled.can_cancel());
}

#[test]
fn status_names_round_trip_through_text() {
    for status in OrderStatus::ALL {
        assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
    }
    assert!("refunded".parse::<OrderStatus>().is_err());
    assert_eq!(
        serde_json::to_value(OrderStatus::Shipped).unwrap(),
        serde_json::json!("shipped")
    );
}

#[test]
fn sync_snapshot_merges_duplicate_products() {
    let items = vec![
        CartLineInput { product_id: 4, quantity: Some(1), price: Some(100) },
        CartLineInput { product_id: 2, quantity: None, price: None },
        CartLineInput { product_id: 4, quantity: Some(2), price: Some(120) },
    ];
    let merged = merge_cart_lines(&items).unwrap();
    assert_eq!(
        merged,
        vec![
            MergedCartLine { product_id: 4, quantity: 3, price: Some(120) },
            MergedCartLine { product_id: 2, quantity: 1, price: None },
        ]
    );
}

#[test]
fn sync_snapshot_rejects_bad_lines() {
    let bad_id = vec![CartLineInput { product_id: 0, quantity: Some(1), price: None }];
    assert!(matches!(merge_cart_lines(&bad_id), Err(AppError::BadRequest(_))));

    let bad_quantity = vec![CartLineInput { product_id: 1, quantity: Some(0), price: None }];
    assert!(matches!(merge_cart_lines(&bad_quantity), Err(AppError::BadRequest(_))));

    let bad_price = vec![CartLineInput { product_id: 1, quantity: Some(1), price: Some(-5) }];
    assert!(matches!(merge_cart_lines(&bad_price), Err(AppError::BadRequest(_))));

    assert!(merge_cart_lines(&[]).unwrap().is_empty());
}

#[test]
fn catalog_pricing_rules() {
    assert!(validate_pricing(0, None).is_ok());
    assert!(validate_pricing(100, Some(150)).is_ok());
    assert!(validate_pricing(-1, None).is_err());
    assert!(validate_pricing(100, Some(100)).is_err());
    assert!(validate_pricing(100, Some(80)).is_err());
}

#[test]
fn history_keeps_deleted_products_with_placeholder_name() {
    let orders = vec![order(2, OrderStatus::Pending, 300), order(1, OrderStatus::Delivered, 250)];
    let rows = vec![
        row(1, 10, 2, 100, Some("Silicone Liner")),
        row(1, 11, 1, 50, None),
        row(2, 12, 3, 100, Some("Sock Pack")),
        row(9, 13, 1, 1, Some("Someone else's")),
    ];

    let history = assemble_history(orders, rows);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].order_id, 2);
    assert_eq!(history[0].items.len(), 1);
    assert_eq!(history[0].items[0].subtotal, 300);

    let older = &history[1];
    assert_eq!(older.status, OrderStatus::Delivered);
    assert_eq!(older.items.len(), 2);
    assert_eq!(older.items[0].name, "Silicone Liner");
    assert_eq!(older.items[0].subtotal, 200);
    assert_eq!(older.items[1].name, "Product #11");
    assert_eq!(older.items[1].price, 50);
}

#[test]
fn order_without_surviving_lines_still_appears() {
    let history = assemble_history(vec![order(5, OrderStatus::Pending, 100)], Vec::new());
    assert_eq!(history.len(), 1);
    assert!(history[0].items.is_empty());
}

#[test]
fn issued_token_verifies_to_same_identity() {
    let config = config();
    let token = issue_token(&config, 42, "admin").unwrap();
    let user = verify_token(&config.jwt_secret, &token).unwrap();
    assert_eq!(user.user_id, 42);
    assert!(user.is_admin());

    assert!(matches!(
        verify_token("another-secret", &token),
        Err(AppError::Unauthorized(_))
    ));
    assert!(verify_token(&config.jwt_secret, "not-a-jwt").is_err());
}

#[test]
fn owner_or_admin_may_touch_a_cart() {
    let user = AuthUser { user_id: 7, role: "user".into() };
    let admin = AuthUser { user_id: 1, role: "admin".into() };

    assert!(ensure_owner(&user, 7).is_ok());
    assert!(matches!(ensure_owner(&user, 8), Err(AppError::Forbidden)));
    assert!(ensure_owner(&admin, 8).is_ok());
    assert!(matches!(ensure_admin(&user), Err(AppError::Forbidden)));
}

#[test]
fn page_count_rounds_up() {
    use prosthetics_store_api::response::Meta;
    assert_eq!(Meta::new(1, 10, 25).total_pages, Some(3));
    assert_eq!(Meta::new(1, 10, 0).total_pages, Some(0));
    assert_eq!(Meta::new(2, 10, 20).total_pages, Some(2));
    assert_eq!(Meta::empty().total_pages, None);
}

#[test]
fn huge_page_numbers_do_not_overflow() {
    let pagination = Pagination {
        page: Some(i64::MAX),
        per_page: Some(100),
    };
    let (page, per_page, offset) = pagination.normalize();
    assert_eq!((page, per_page), (i64::MAX, 100));
    assert_eq!(offset, i64::MAX);

    let defaults = Pagination::default().normalize();
    assert_eq!(defaults, (1, 20, 0));
    let clamped = Pagination { page: Some(-4), per_page: Some(1000) }.normalize();
    assert_eq!(clamped, (1, 100, 0));
}

#[test]
fn product_update_can_drop_the_old_price() {
    // Raising the price above the struck-through one only works once it is cleared.
    assert!(merge_pricing(100, Some(120), Some(150), None).is_err());
    assert_eq!(merge_pricing(100, Some(120), Some(150), Some(None)).unwrap(), (150, None));
    assert_eq!(merge_pricing(100, Some(120), None, None).unwrap(), (100, Some(120)));
    assert_eq!(merge_pricing(100, None, None, Some(Some(130))).unwrap(), (100, Some(130)));
    assert!(merge_pricing(100, None, None, Some(Some(90))).is_err());
}

#[test]
fn old_price_null_differs_from_missing() {
    let missing: UpdateProductRequest = serde_json::from_value(serde_json::json!({ "price": 150 })).unwrap();
    assert_eq!(missing.old_price, None);

    let cleared: UpdateProductRequest =
        serde_json::from_value(serde_json::json!({ "price": 150, "old_price": null })).unwrap();
    assert_eq!(cleared.old_price, Some(None));

    let set: UpdateProductRequest =
        serde_json::from_value(serde_json::json!({ "old_price": 200 })).unwrap();
    assert_eq!(set.old_price, Some(Some(200)));
}

#[test]
fn non_database_errors_keep_their_kind() {
    assert_eq!(AppError::NotFound.sqlstate(), None);
    assert!(matches!(
        AppError::NotFound.on_sqlstate(UNIQUE_VIOLATION, "taken"),
        AppError::NotFound
    ));
    assert!(matches!(
        AppError::Forbidden.on_sqlstate(NUMERIC_OUT_OF_RANGE, "too large"),
        AppError::Forbidden
    ));
}
