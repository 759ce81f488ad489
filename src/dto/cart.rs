use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::CartLine;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    #[serde(alias = "productId")]
    pub product_id: i64,
    pub quantity: Option<i32>,
    pub price: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartAddResult {
    pub item_id: i64,
    /// Present only when an existing line was incremented.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_quantity: Option<i32>,
}

/// One line of the browser-held cart. `name` and `image` may be sent along
/// but are always re-read from the catalog.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CartLineInput {
    #[serde(alias = "productId")]
    pub product_id: i64,
    pub quantity: Option<i32>,
    pub price: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SyncCartRequest {
    #[serde(default)]
    pub items: Vec<CartLineInput>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartLineRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AffectedRows {
    pub affected_rows: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartList {
    pub items: Vec<CartLine>,
}
