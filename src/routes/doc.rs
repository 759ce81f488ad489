use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{CustomerList, UpdateOrderStatusRequest},
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{
            AddToCartRequest, AffectedRows, CartAddResult, CartLineInput, CartList,
            SyncCartRequest, UpdateCartLineRequest,
        },
        orders::{CreateOrderRequest, OrderCreated, OrderLineRequest, OrderList, OrderWithItems},
        products::{CreateProductRequest, DeletedProduct, ProductList, UpdateProductRequest},
        profile::{OrderHistoryEntry, OrderHistoryItem},
        wishlist::{AddWishlistRequest, RemovedWishlistItem, WishlistProductList},
    },
    models::{CartLine, Customer, Order, OrderItem, OrderStatus, Product, WishlistItem},
    response::Meta,
    routes::{admin, auth, cart, health, orders, params, products, profile, wishlist},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness,
        auth::login,
        auth::register,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        cart::cart_list,
        cart::add_to_cart,
        cart::sync_cart,
        cart::update_cart_line,
        cart::remove_cart_line,
        cart::clear_cart,
        wishlist::list_wishlist,
        wishlist::add_to_wishlist,
        wishlist::remove_from_wishlist,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::cancel_order,
        profile::get_profile,
        profile::order_history,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::list_customers
    ),
    components(
        schemas(
            Product,
            CartLine,
            WishlistItem,
            Order,
            OrderItem,
            OrderStatus,
            Customer,
            Meta,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            DeletedProduct,
            AddToCartRequest,
            CartAddResult,
            CartLineInput,
            SyncCartRequest,
            UpdateCartLineRequest,
            AffectedRows,
            CartList,
            AddWishlistRequest,
            WishlistProductList,
            RemovedWishlistItem,
            CreateOrderRequest,
            OrderLineRequest,
            OrderCreated,
            OrderWithItems,
            OrderList,
            OrderHistoryEntry,
            OrderHistoryItem,
            UpdateOrderStatusRequest,
            CustomerList,
            params::SortOrder,
            params::ProductSortBy
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Auth", description = "Registration and login"),
        (name = "Products", description = "Prosthetics catalog"),
        (name = "Cart", description = "Server-side cart mirror"),
        (name = "Wishlist", description = "Saved products"),
        (name = "Orders", description = "Checkout and order tracking"),
        (name = "Profile", description = "Account and order history"),
        (name = "Admin", description = "Admin console"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
