//! Common types used across the platform

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// Unit count of a stock item. Quantities are whole units.
pub type Quantity = i32;

/// Decimal places kept for weighted-average unit costs
pub const COST_SCALE: u32 = 4;

/// Decimal places used when rendering money in reports
pub const MONEY_SCALE: u32 = 2;

/// Round a monetary amount for display
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp(MONEY_SCALE)
}

/// Deserialize a field that distinguishes "absent" from "explicit null".
///
/// Use together with `#[serde(default)]` on an `Option<Option<T>>` field:
/// absent -> `None`, `null` -> `Some(None)`, value -> `Some(Some(v))`.
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
