//! Money arithmetic
//!
//! All monetary calculation is done in `Decimal` and converted to `f64` only
//! at the storage/serialization boundary, so summing line totals never
//! accumulates binary floating point error.

use rust_decimal::prelude::*;
use tracing::warn;

/// Monetary values are stored with 2 decimal places, half-up
const DECIMAL_PLACES: u32 = 2;

pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_else(|| {
        warn!(value, "non-finite monetary value treated as zero");
        Decimal::ZERO
    })
}

pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(0.0)
}

/// Unit price times quantity, rounded to cents
pub fn line_total(unit_price: f64, quantity: i64) -> Decimal {
    (to_decimal(unit_price) * Decimal::from(quantity))
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}
