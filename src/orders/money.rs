//! Money calculation for order totals
//!
//! All arithmetic runs on `Decimal` and is rounded to 2 places before being
//! converted to `f64` at the storage boundary.

use crate::error::{AppError, AppResult};
use rust_decimal::RoundingStrategy;
use rust_decimal::prelude::*;

/// VAT applied to every order subtotal (19%)
pub const TAX_RATE: Decimal = Decimal::from_parts(19, 0, 0, false, 2);

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: f64 = 0.01;

/// Rounding for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// One line of a new order; the unit price is snapshotted at creation time.
#[derive(Debug, Clone)]
pub struct LineItemInput {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: f64,
}

/// Computed monetary breakdown: `total = subtotal + tax - discount`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub discount: f64,
    pub total: f64,
}

fn to_decimal(value: f64, field: &str) -> AppResult<Decimal> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::Validation(format!(
            "{field} must be a non-negative finite number, got {value}"
        )));
    }
    Decimal::from_f64(value)
        .ok_or_else(|| AppError::Validation(format!("{field} is out of range: {value}")))
}

fn to_f64(value: Decimal, field: &str) -> AppResult<f64> {
    value
        .to_f64()
        .ok_or_else(|| AppError::Internal(format!("{field} out of f64 range: {value}")))
}

fn round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

fn line_subtotal_dec(item: &LineItemInput) -> AppResult<Decimal> {
    if item.quantity <= 0 {
        return Err(AppError::Validation(format!(
            "quantity must be positive, got {} for product {}",
            item.quantity, item.product_id
        )));
    }
    let price = to_decimal(item.unit_price, "unit_price")?;
    Ok(round(price * Decimal::from(item.quantity)))
}

/// Line subtotal: `quantity * unit_price`, rounded to cents
pub fn line_subtotal(item: &LineItemInput) -> AppResult<f64> {
    to_f64(line_subtotal_dec(item)?, "line subtotal")
}

/// Full order breakdown with `tax = subtotal * TAX_RATE`
pub fn order_totals(items: &[LineItemInput], discount: Option<f64>) -> AppResult<OrderTotals> {
    if items.is_empty() {
        return Err(AppError::Validation(
            "order must contain at least one line item".to_string(),
        ));
    }

    let mut subtotal = Decimal::ZERO;
    for item in items {
        subtotal += line_subtotal_dec(item)?;
    }
    let subtotal = round(subtotal);
    let tax = round(subtotal * TAX_RATE);
    let discount = round(to_decimal(discount.unwrap_or(0.0), "discount")?);
    let total = subtotal + tax - discount;

    if total < Decimal::ZERO {
        return Err(AppError::Validation(format!(
            "discount {discount} exceeds order total {}",
            subtotal + tax
        )));
    }

    Ok(OrderTotals {
        subtotal: to_f64(subtotal, "subtotal")?,
        tax: to_f64(tax, "tax")?,
        discount: to_f64(discount, "discount")?,
        total: to_f64(total, "total")?,
    })
}
