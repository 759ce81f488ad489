use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Product;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AddWishlistRequest {
    #[serde(alias = "productId")]
    pub product_id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WishlistProductList {
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RemovedWishlistItem {
    pub product_id: i64,
}
