//! Request validation and catalog repricing for order placement.
//!
//! Everything here is pure: it runs before the order transaction opens, so a
//! rejected request never touches the database.

use std::collections::HashMap;

use serde_json::Value;

use crate::{
    dto::orders::{CreateOrderRequest, OrderLineRequest},
    error::{AppError, AppResult},
};

/// A cart line that passed shape validation but has not been priced yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedLine {
    pub product_id: i64,
    pub quantity: i32,
    pub client_price: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: i64,
    pub quantity: i32,
    pub price: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShippingDetails {
    pub shipping_address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    pub lines: Vec<RequestedLine>,
    pub total_amount: i64,
    pub shipping: ShippingDetails,
}

impl ValidatedOrder {
    pub fn product_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.lines.iter().map(|l| l.product_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Parse a whole amount from a JSON number or numeric string.
///
/// Fractional, non-finite and out-of-range values yield `None`.
pub fn parse_amount(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_from_f64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_from_f64))
        }
        _ => None,
    }
}

fn whole_from_f64(v: f64) -> Option<i64> {
    if !v.is_finite() || v.fract() != 0.0 || v.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(v as i64)
}

/// A product id is usable when it is a positive integer.
pub fn parse_id(value: &Value) -> Option<i64> {
    parse_amount(value).filter(|id| *id > 0)
}

/// Missing quantity means one unit; anything present must be a whole number >= 1.
pub fn parse_quantity(value: &Value, product_id: i64) -> AppResult<i32> {
    if value.is_null() {
        return Ok(1);
    }
    parse_amount(value)
        .filter(|q| *q >= 1)
        .and_then(|q| i32::try_from(q).ok())
        .ok_or_else(|| {
            AppError::BadRequest(format!("Invalid quantity for product {product_id}"))
        })
}

/// Missing price defers to the catalog; a present price must be a whole
/// non-negative amount.
pub fn parse_price(value: &Value, product_id: i64) -> AppResult<Option<i64>> {
    if value.is_null() {
        return Ok(None);
    }
    match parse_amount(value) {
        Some(p) if p >= 0 => Ok(Some(p)),
        _ => Err(AppError::BadRequest(format!(
            "Invalid price for product {product_id}"
        ))),
    }
}

fn parse_line(index: usize, line: &OrderLineRequest) -> AppResult<RequestedLine> {
    let product_id = parse_id(&line.id)
        .ok_or_else(|| AppError::BadRequest(format!("Item {index} is missing a product id")))?;
    let quantity = parse_quantity(&line.quantity, product_id)?;
    let client_price = parse_price(&line.price, product_id)?;
    Ok(RequestedLine {
        product_id,
        quantity,
        client_price,
    })
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn validate_order_request(payload: &CreateOrderRequest) -> AppResult<ValidatedOrder> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("Order must contain at least one item".into()));
    }

    let lines = payload
        .items
        .iter()
        .enumerate()
        .map(|(index, line)| parse_line(index, line))
        .collect::<AppResult<Vec<_>>>()?;

    let total_amount = parse_amount(&payload.total_amount)
        .filter(|t| *t > 0)
        .ok_or_else(|| AppError::BadRequest("totalAmount must be a positive amount".into()))?;

    Ok(ValidatedOrder {
        lines,
        total_amount,
        shipping: ShippingDetails {
            shipping_address: non_blank(&payload.shipping_address),
            phone: non_blank(&payload.phone),
            email: non_blank(&payload.email),
            name: non_blank(&payload.name),
        },
    })
}

/// Price every line from the catalog and check the caller's figures against it.
///
/// `catalog` maps product id to its current price.
pub fn price_order(
    order: &ValidatedOrder,
    catalog: &HashMap<i64, i64>,
) -> AppResult<Vec<PricedLine>> {
    let mut computed_total: i64 = 0;
    let mut priced = Vec::with_capacity(order.lines.len());

    for line in &order.lines {
        let price = *catalog.get(&line.product_id).ok_or_else(|| {
            AppError::BadRequest(format!("Product {} is not available", line.product_id))
        })?;

        if let Some(client_price) = line.client_price {
            if client_price != price {
                return Err(AppError::BadRequest(format!(
                    "Price for product {} has changed to {}",
                    line.product_id, price
                )));
            }
        }

        computed_total = price
            .checked_mul(i64::from(line.quantity))
            .and_then(|subtotal| computed_total.checked_add(subtotal))
            .ok_or_else(|| AppError::BadRequest("Order total is too large".into()))?;

        priced.push(PricedLine {
            product_id: line.product_id,
            quantity: line.quantity,
            price,
        });
    }

    if computed_total != order.total_amount {
        return Err(AppError::BadRequest(format!(
            "totalAmount {} does not match the order total {}",
            order.total_amount, computed_total
        )));
    }

    Ok(priced)
}
